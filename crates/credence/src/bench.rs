use credence_bif::{Network, build_graph, parse_file};
use credence_error::CredenceResult;
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::time::Instant;

/// Convergence tolerance used by the benchmark driver.
pub const DEFAULT_CONVERGENCE: f64 = 1e-6;
/// Iteration cap used by the benchmark driver.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Which propagation algorithm a benchmark row measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropagationKind {
    Regular,
    Loopy,
}

impl Display for PropagationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PropagationKind::Regular => write!(f, "regular"),
            PropagationKind::Loopy => write!(f, "loopy"),
        }
    }
}

/// One CSV row of benchmark output.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkRecord {
    pub file_name: String,
    pub kind: PropagationKind,
    pub num_nodes: usize,
    pub num_edges: usize,
    pub diameter: usize,
    pub num_iterations: usize,
    pub run_time_seconds: f64,
}

impl BenchmarkRecord {
    pub const CSV_HEADER: &'static str =
        "File Name,Propagation Type,Number of Nodes,Number of Edges,Diameter,Number of Iterations,BP Run Time(s)";
}

impl Display for BenchmarkRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{:.6}",
            self.file_name,
            self.kind,
            self.num_nodes,
            self.num_edges,
            self.diameter,
            self.num_iterations,
            self.run_time_seconds
        )
    }
}

/// Builds the graph and times one tree ("regular") propagation run. The
/// iteration count of a regular run is its two sweeps.
pub fn run_regular(network: &Network, file_name: &str) -> CredenceResult<BenchmarkRecord> {
    let mut graph = build_graph(network)?;
    let diameter = graph.calculate_diameter();

    let start = Instant::now();
    graph.run_tree_propagation();
    let run_time_seconds = start.elapsed().as_secs_f64();

    Ok(BenchmarkRecord {
        file_name: file_name.to_string(),
        kind: PropagationKind::Regular,
        num_nodes: graph.num_nodes(),
        num_edges: graph.num_edges(),
        diameter,
        num_iterations: 2,
        run_time_seconds,
    })
}

/// Builds the graph and times one loopy propagation run to convergence.
pub fn run_loopy(
    network: &Network,
    file_name: &str,
    convergence: f64,
    max_iterations: usize,
) -> CredenceResult<BenchmarkRecord> {
    let mut graph = build_graph(network)?;
    let diameter = graph.calculate_diameter();

    let start = Instant::now();
    graph.init_previous_edge();
    let report = graph.loopy_propagate_until(convergence, max_iterations);
    let run_time_seconds = start.elapsed().as_secs_f64();

    Ok(BenchmarkRecord {
        file_name: file_name.to_string(),
        kind: PropagationKind::Loopy,
        num_nodes: graph.num_nodes(),
        num_edges: graph.num_edges(),
        diameter,
        num_iterations: report.iterations,
        run_time_seconds,
    })
}

/// Parses one BIF file once and benchmarks both algorithms `repeats`
/// times each: all regular runs first, then all loopy runs.
pub fn run_benchmarks(
    path: impl AsRef<Path>,
    repeats: usize,
    convergence: f64,
    max_iterations: usize,
) -> CredenceResult<Vec<BenchmarkRecord>> {
    let path = path.as_ref();
    let network = parse_file(path)?;
    let file_name = path.display().to_string();

    let mut records = Vec::with_capacity(repeats * 2);
    for _ in 0..repeats {
        records.push(run_regular(&network, &file_name)?);
    }
    for _ in 0..repeats {
        records.push(run_loopy(
            &network,
            &file_name,
            convergence,
            max_iterations,
        )?);
    }
    Ok(records)
}
