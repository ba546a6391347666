pub mod belief;
mod diameter;
pub mod edge;
mod format;
pub mod graph;
pub mod incidence;
mod levels;
mod loopy;
pub mod node;

pub use belief::{Belief, MAX_STATES, ZeroPolicy, combine, normalize, uniform};
pub use edge::{Edge, normalize_rows};
pub use format::Format;
pub use graph::Graph;
pub use incidence::IncidenceTable;
pub use loopy::{PropagationReport, Termination};
pub use node::Node;

pub use credence_error::{CredenceError, CredenceResult, ErrorCode};
