use crate::belief::{Belief, combine};
use crate::graph::Graph;
use tracing::debug;

/// Why a loopy propagation run stopped.
///
/// All three are success terminals: a stalled or exhausted run still leaves
/// every belief marginalized and normalized. Callers that want to treat an
/// exhausted run as an error can convert the report via
/// [PropagationReport::into_result].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Termination {
    /// Total message change fell below the convergence tolerance.
    Converged,
    /// Total message change repeated exactly: a limit cycle.
    Stalled,
    /// The iteration cap was reached.
    Exhausted,
}

/// Outcome of [Graph::loopy_propagate_until].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropagationReport {
    pub iterations: usize,
    pub delta: f64,
    pub termination: Termination,
}

impl PropagationReport {
    /// Maps an exhausted run to an error for callers that treat the
    /// iteration cap as a failure; the engine itself never raises it.
    pub fn into_result(self) -> credence_error::CredenceResult<Self> {
        match self.termination {
            Termination::Exhausted => Err(credence_error::CredenceError::MaxIterations {
                iterations: self.iterations,
            }),
            _ => Ok(self),
        }
    }
}

impl Graph {
    /// Seeds the previous-message arena: every node sends its current
    /// belief through each of its outgoing edges. Priors flow first.
    pub fn init_previous_edge(&mut self) {
        self.ensure_incidence();
        let parts = self.parts_mut();
        let Some(src) = parts.src else { return };
        for node in 0..parts.nodes.len() {
            for &edge_index in src.edges_of(node) {
                parts.previous[edge_index].send(parts.nodes[node].states());
            }
        }
    }

    /// One synchronous iteration: every node reads the previous arena,
    /// writes the current arena, then all beliefs are marginalized and the
    /// arenas swap roles.
    ///
    /// Within an iteration no node observes another node's new message;
    /// iteration `k` depends only on iteration `k - 1`.
    fn loopy_propagate_one_iteration(&mut self) {
        let parts = self.parts_mut();
        let (Some(src), Some(dest)) = (parts.src, parts.dest) else {
            return;
        };

        let mut buffer: Belief = Belief::new();
        for node in 0..parts.nodes.len() {
            // Seed the buffer from the node's local information only: a
            // source node's states (its prior or evidence) flow, but a
            // belief that was marginalized from incoming messages must
            // not be multiplied back in, or every message would be
            // counted twice and the fixed point would drift off the
            // tree-exact marginals.
            buffer.clear();
            if dest.edges_of(node).is_empty() {
                buffer.extend_from_slice(parts.nodes[node].states());
            } else {
                buffer.resize(parts.nodes[node].num_states(), 1.0);
            }

            for &edge_index in dest.edges_of(node) {
                combine(
                    &mut buffer,
                    parts.previous[edge_index].message(),
                    parts.zero_policy,
                );
            }

            for &edge_index in src.edges_of(node) {
                parts.current[edge_index].send(&buffer);
            }
        }

        for node in 0..self.num_nodes() {
            self.marginalize_node(node);
        }
        self.swap_message_buffers();
    }

    /// Total L1 change between the two message arenas.
    pub fn message_delta(&self) -> f64 {
        self.current_edges()
            .iter()
            .zip(self.previous_edges().iter())
            .map(|(a, b)| {
                a.message()
                    .iter()
                    .zip(b.message().iter())
                    .map(|(x, y)| (x - y).abs())
                    .sum::<f64>()
            })
            .sum()
    }

    /// Runs synchronous loopy propagation until the total message change
    /// falls below `convergence`, repeats exactly (a limit cycle), or
    /// `max_iterations` is reached. Call [Graph::init_previous_edge] first.
    ///
    /// A graph with no edges converges in zero iterations and leaves every
    /// belief untouched.
    pub fn loopy_propagate_until(
        &mut self,
        convergence: f64,
        max_iterations: usize,
    ) -> PropagationReport {
        self.ensure_incidence();
        if self.num_edges() == 0 {
            return PropagationReport {
                iterations: 0,
                delta: 0.0,
                termination: Termination::Converged,
            };
        }

        let mut previous_delta = -1.0;
        let mut delta = 0.0;
        for iteration in 1..=max_iterations {
            self.loopy_propagate_one_iteration();
            delta = self.message_delta();
            debug!(iteration, delta, "loopy iteration");

            if delta < convergence {
                return PropagationReport {
                    iterations: iteration,
                    delta,
                    termination: Termination::Converged,
                };
            }
            if delta == previous_delta {
                return PropagationReport {
                    iterations: iteration,
                    delta,
                    termination: Termination::Stalled,
                };
            }
            previous_delta = delta;
        }

        PropagationReport {
            iterations: max_iterations,
            delta,
            termination: Termination::Exhausted,
        }
    }
}
