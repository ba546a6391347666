pub mod ast;
pub mod build;
pub mod parser;
pub mod token;

pub use ast::{Network, ProbabilityDecl, ProbabilityEntry, VariableDecl};
pub use build::build_graph;
pub use parser::{Parser, parse_str};
pub use token::{Lexer, Token};

use credence_core::Graph;
use credence_error::{CredenceResult, credence_err};
use std::path::Path;

/// Reads and parses one BIF file.
pub fn parse_file(path: impl AsRef<Path>) -> CredenceResult<Network> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .map_err(|e| credence_err!(Io: "cannot read '{}': {}", path.display(), e))?;
    parse_str(&source)
}

/// Parses BIF source text and builds the inference graph in one step.
pub fn graph_from_str(source: &str) -> CredenceResult<Graph> {
    build_graph(&parse_str(source)?)
}

/// Reads one BIF file and builds the inference graph in one step.
pub fn graph_from_file(path: impl AsRef<Path>) -> CredenceResult<Graph> {
    build_graph(&parse_file(path)?)
}
