use clap::{Parser, ValueEnum};
use credence::{
    BenchmarkRecord, CredenceResult, DEFAULT_CONVERGENCE, DEFAULT_MAX_ITERATIONS, Format,
    graph_from_file, parse_file, run_loopy, run_regular,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Runs belief propagation benchmarks over BIF networks and prints one
/// CSV row per run.
#[derive(Parser, Debug)]
#[command(name = "credence", version, about)]
struct Args {
    /// BIF network files to benchmark.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Propagation algorithm to run.
    #[arg(long, value_enum, default_value_t = Algorithm::Both)]
    algorithm: Algorithm,

    /// Convergence tolerance for loopy propagation.
    #[arg(long, default_value_t = DEFAULT_CONVERGENCE)]
    convergence: f64,

    /// Iteration cap for loopy propagation.
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// How many times to repeat each run.
    #[arg(long, default_value_t = 1)]
    repeats: usize,

    /// Print every node's marginal belief after the benchmark rows.
    #[arg(long)]
    print_beliefs: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    Regular,
    Loopy,
    Both,
}

fn main() -> ExitCode {
    credence::init_logging();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("credence: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> CredenceResult<()> {
    println!("{}", BenchmarkRecord::CSV_HEADER);

    for path in &args.files {
        let network = parse_file(path)?;
        let file_name = path.display().to_string();

        if args.algorithm != Algorithm::Loopy {
            for _ in 0..args.repeats {
                println!("{}", run_regular(&network, &file_name)?);
            }
        }
        if args.algorithm != Algorithm::Regular {
            for _ in 0..args.repeats {
                println!(
                    "{}",
                    run_loopy(&network, &file_name, args.convergence, args.max_iterations)?
                );
            }
        }

        if args.print_beliefs {
            let mut graph = graph_from_file(path)?;
            match args.algorithm {
                Algorithm::Regular => graph.run_tree_propagation(),
                _ => {
                    graph.init_previous_edge();
                    graph.loopy_propagate_until(args.convergence, args.max_iterations);
                }
            }
            print!("{}", graph.format());
        }
    }

    Ok(())
}
