mod bench;

pub use bench::{
    BenchmarkRecord, DEFAULT_CONVERGENCE, DEFAULT_MAX_ITERATIONS, PropagationKind, run_benchmarks,
    run_loopy, run_regular,
};

pub use credence_bif::{
    Lexer, Network, Parser, ProbabilityDecl, ProbabilityEntry, Token, VariableDecl, build_graph,
    graph_from_file, graph_from_str, parse_file, parse_str,
};
pub use credence_core::{
    Belief, Edge, Format, Graph, IncidenceTable, MAX_STATES, Node, PropagationReport, Termination,
    ZeroPolicy,
};
pub use credence_error::{CredenceError, CredenceResult, ErrorCode, credence_err, ensure};

pub mod prelude {
    pub use super::bench::{BenchmarkRecord, PropagationKind, run_benchmarks};
    pub use credence_bif::{build_graph, graph_from_file, graph_from_str, parse_file, parse_str};
    pub use credence_core::{
        Format, Graph, MAX_STATES, PropagationReport, Termination, ZeroPolicy,
    };
    pub use credence_error::{CredenceError, CredenceResult, ErrorCode};
}

pub fn init_logging() {
    pub use std::sync::Once;
    static INIT_LOGGING: Once = Once::new();

    INIT_LOGGING.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        std::panic::set_hook(Box::new(|info| {
            tracing::error!("PANIC: {}", info);
        }));

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .compact(),
            )
            .init();
    });
}
