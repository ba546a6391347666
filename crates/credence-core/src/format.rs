use crate::graph::Graph;
use std::fmt::Write;

/// Human-readable rendering for debugging and tracing output.
pub trait Format {
    fn format(&self) -> String;
}

impl Graph {
    /// Renders one node with its per-state beliefs.
    pub fn format_node(&self, index: usize) -> String {
        let mut out = String::new();
        let node = self.node(index);
        let labels = self.state_labels(index);

        let _ = writeln!(out, "Node {} [", self.node_name(index));
        for (state, &belief) in node.states().iter().enumerate() {
            match labels.get(state) {
                Some(label) => {
                    let _ = writeln!(out, "  {}:\t{:.6}", label, belief);
                }
                None => {
                    let _ = writeln!(out, "  {}:\t{:.6}", state, belief);
                }
            }
        }
        out.push(']');
        out
    }

    /// Renders one edge with its conditional table.
    pub fn format_edge(&self, index: usize) -> String {
        let mut out = String::new();
        let edge = &self.current_edges()[index];

        let _ = writeln!(
            out,
            "Edge {} -> {} [",
            self.node_name(edge.src()),
            self.node_name(edge.dest())
        );
        for i in 0..edge.x_dim() {
            out.push_str("  [");
            for j in 0..edge.y_dim() {
                let _ = write!(out, "\t{:.6}", edge.joint(i, j));
            }
            out.push_str("\t]\n");
        }
        out.push(']');
        out
    }
}

impl Format for Graph {
    fn format(&self) -> String {
        let mut out = String::new();
        for index in 0..self.num_nodes() {
            out.push_str(&self.format_node(index));
            out.push('\n');
        }
        for index in 0..self.num_edges() {
            out.push_str(&self.format_edge(index));
            out.push('\n');
        }
        out
    }
}
