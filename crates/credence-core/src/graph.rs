use crate::belief::{Belief, MAX_STATES, ZeroPolicy, combine, normalize};
use crate::edge::{Edge, normalize_rows};
use crate::incidence::IncidenceTable;
use crate::node::Node;
use compact_str::CompactString;
use credence_error::{CredenceResult, ensure};
use smallvec::smallvec;

/// A discrete Bayesian network laid out for message passing.
///
/// The graph owns every arena the inference algorithms touch: the node
/// vector (a node's index equals its position), two structurally identical
/// edge arenas with independent message buffers, the two CSR incidence
/// tables, the visited bitset, and the per-level node lists used by tree
/// propagation.
///
/// The two edge arenas realize the `previous`/`current` double buffer of
/// synchronous loopy propagation: `parity` selects which arena is current,
/// and a swap flips the parity bit rather than copying messages. Tree
/// propagation only ever touches the current arena.
///
/// Capacities are fixed at construction: `with_capacity(n, e)` freezes the
/// totals and [Graph::add_node] / [Graph::add_edge] refuse to grow past
/// them, so no arena reallocates once inference begins.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Graph {
    nodes: Vec<Node>,
    node_names: Vec<CompactString>,
    state_labels: Vec<Vec<CompactString>>,
    arenas: [Vec<Edge>; 2],
    parity: usize,
    src_incidence: Option<IncidenceTable>,
    dest_incidence: Option<IncidenceTable>,
    visited: Vec<bool>,
    pub(crate) levels: Vec<Vec<usize>>,
    pub(crate) level_of: Vec<usize>,
    pub(crate) diameter: Option<usize>,
    zero_policy: ZeroPolicy,
    total_vertices: usize,
    total_edges: usize,
}

impl Graph {
    /// Creates an empty graph with frozen vertex and edge capacities.
    pub fn with_capacity(total_vertices: usize, total_edges: usize) -> Self {
        Graph {
            nodes: Vec::with_capacity(total_vertices),
            node_names: Vec::with_capacity(total_vertices),
            state_labels: Vec::with_capacity(total_vertices),
            arenas: [
                Vec::with_capacity(total_edges),
                Vec::with_capacity(total_edges),
            ],
            parity: 0,
            src_incidence: None,
            dest_incidence: None,
            visited: Vec::with_capacity(total_vertices),
            levels: Vec::new(),
            level_of: Vec::new(),
            diameter: None,
            zero_policy: ZeroPolicy::default(),
            total_vertices,
            total_edges,
        }
    }

    /// Appends a node and returns its index.
    pub fn add_node(&mut self, num_states: usize, name: &str) -> CredenceResult<usize> {
        ensure!(
            num_states >= 1 && num_states <= MAX_STATES,
            DimensionMismatch: "node '{}' declares {} states, supported range is 1..={}",
            name, num_states, MAX_STATES
        );
        ensure!(
            self.nodes.len() < self.total_vertices,
            DimensionMismatch: "node '{}' exceeds the declared vertex capacity of {}",
            name, self.total_vertices
        );

        let index = self.nodes.len();
        self.nodes.push(Node::new(index, num_states));
        self.node_names.push(CompactString::from(name));
        self.state_labels.push(Vec::new());
        self.visited.push(false);
        Ok(index)
    }

    /// Attaches per-state display labels to a node.
    pub fn set_state_labels(
        &mut self,
        node: usize,
        labels: Vec<CompactString>,
    ) -> CredenceResult<()> {
        ensure!(
            labels.len() == self.nodes[node].num_states(),
            DimensionMismatch: "node '{}' has {} states but {} labels were supplied",
            self.node_names[node], self.nodes[node].num_states(), labels.len()
        );
        self.state_labels[node] = labels;
        Ok(())
    }

    /// Replaces a node's belief with a prior distribution, without marking
    /// it observed.
    pub fn set_node_prior(&mut self, node: usize, prior: &[f64]) -> CredenceResult<()> {
        ensure!(
            prior.len() == self.nodes[node].num_states(),
            DimensionMismatch: "prior for node '{}' has {} entries, expected {}",
            self.node_names[node], prior.len(), self.nodes[node].num_states()
        );
        self.nodes[node].set_prior(prior);
        Ok(())
    }

    /// Injects evidence: replaces the node's belief and sets its observed
    /// flag. The flag is bookkeeping only; marginalization treats the node
    /// like any other.
    pub fn set_node_state(&mut self, node: usize, states: &[f64]) -> CredenceResult<()> {
        ensure!(
            states.len() == self.nodes[node].num_states(),
            DimensionMismatch: "evidence for node '{}' has {} entries, expected {}",
            self.node_names[node], states.len(), self.nodes[node].num_states()
        );
        self.nodes[node].observe(states);
        Ok(())
    }

    /// Appends a directed edge carrying the row-major `x_dim x y_dim` CPT
    /// slice `joint` and returns its index.
    ///
    /// Rows are renormalized defensively; an all-zero row is replaced by
    /// the uniform distribution with a warning. The edge is materialized in
    /// both message arenas.
    pub fn add_edge(
        &mut self,
        src: usize,
        dest: usize,
        x_dim: usize,
        y_dim: usize,
        mut joint: Vec<f64>,
    ) -> CredenceResult<usize> {
        ensure!(
            src < self.nodes.len() && dest < self.nodes.len(),
            DimensionMismatch: "edge references node {} but only {} nodes exist",
            src.max(dest), self.nodes.len()
        );
        ensure!(
            x_dim == self.nodes[src].num_states(),
            DimensionMismatch: "edge src '{}' has {} states but the CPT declares {} rows",
            self.node_names[src], self.nodes[src].num_states(), x_dim
        );
        ensure!(
            y_dim == self.nodes[dest].num_states(),
            DimensionMismatch: "edge dest '{}' has {} states but the CPT declares {} columns",
            self.node_names[dest], self.nodes[dest].num_states(), y_dim
        );
        ensure!(
            joint.len() == x_dim * y_dim,
            DimensionMismatch: "CPT for edge '{}' -> '{}' has {} entries, expected {}",
            self.node_names[src], self.node_names[dest], joint.len(), x_dim * y_dim
        );
        ensure!(
            self.arenas[0].len() < self.total_edges,
            DimensionMismatch: "edge '{}' -> '{}' exceeds the declared edge capacity of {}",
            self.node_names[src], self.node_names[dest], self.total_edges
        );

        normalize_rows(&mut joint, x_dim, y_dim);

        let index = self.arenas[0].len();
        self.arenas[0].push(Edge::new(index, src, dest, x_dim, y_dim, joint.clone()));
        self.arenas[1].push(Edge::new(index, src, dest, x_dim, y_dim, joint));
        // adjacency is stale now
        self.src_incidence = None;
        self.dest_incidence = None;
        Ok(index)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.arenas[0].len()
    }

    pub fn total_vertices(&self) -> usize {
        self.total_vertices
    }

    pub fn total_edges(&self) -> usize {
        self.total_edges
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_name(&self, index: usize) -> &str {
        &self.node_names[index]
    }

    pub fn state_labels(&self, index: usize) -> &[CompactString] {
        &self.state_labels[index]
    }

    /// Looks a node up by its display name.
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.node_names.iter().position(|n| n == name)
    }

    pub fn zero_policy(&self) -> ZeroPolicy {
        self.zero_policy
    }

    pub fn set_zero_policy(&mut self, policy: ZeroPolicy) {
        self.zero_policy = policy;
    }

    /// Builds the src-keyed incidence table. Idempotent per edge list.
    pub fn set_up_src_nodes_to_edges(&mut self) {
        let keys: Vec<usize> = self.arenas[0].iter().map(|e| e.src()).collect();
        self.src_incidence = Some(IncidenceTable::build(self.nodes.len(), &keys));
    }

    /// Builds the dest-keyed incidence table. Idempotent per edge list.
    pub fn set_up_dest_nodes_to_edges(&mut self) {
        let keys: Vec<usize> = self.arenas[0].iter().map(|e| e.dest()).collect();
        self.dest_incidence = Some(IncidenceTable::build(self.nodes.len(), &keys));
    }

    pub(crate) fn ensure_incidence(&mut self) {
        if self.src_incidence.is_none() {
            self.set_up_src_nodes_to_edges();
        }
        if self.dest_incidence.is_none() {
            self.set_up_dest_nodes_to_edges();
        }
    }

    /// Indices of the edges leaving `node`. Empty until the src incidence
    /// table has been set up.
    pub fn edges_from(&self, node: usize) -> &[usize] {
        self.src_incidence
            .as_ref()
            .map(|t| t.edges_of(node))
            .unwrap_or(&[])
    }

    /// Indices of the edges entering `node`. Empty until the dest incidence
    /// table has been set up.
    pub fn edges_into(&self, node: usize) -> &[usize] {
        self.dest_incidence
            .as_ref()
            .map(|t| t.edges_of(node))
            .unwrap_or(&[])
    }

    pub fn src_incidence(&self) -> Option<&IncidenceTable> {
        self.src_incidence.as_ref()
    }

    pub fn dest_incidence(&self) -> Option<&IncidenceTable> {
        self.dest_incidence.as_ref()
    }

    /// The edge arena messages are currently being written into.
    pub fn current_edges(&self) -> &[Edge] {
        &self.arenas[self.parity]
    }

    /// The edge arena holding the previous iteration's messages.
    pub fn previous_edges(&self) -> &[Edge] {
        &self.arenas[self.parity ^ 1]
    }

    /// Swap is a parity flip, never a copy; the two arenas always reference
    /// distinct physical storage.
    pub(crate) fn swap_message_buffers(&mut self) {
        self.parity ^= 1;
    }

    /// Splits the graph into the disjoint borrows the propagation loops
    /// need: both message arenas, the node slice, the incidence tables,
    /// and the visited bitset.
    pub(crate) fn parts_mut(&mut self) -> EngineParts<'_> {
        let [a0, a1] = &mut self.arenas;
        let (current, previous) = if self.parity == 0 { (a0, a1) } else { (a1, a0) };
        EngineParts {
            current,
            previous,
            nodes: &mut self.nodes,
            src: self.src_incidence.as_ref(),
            dest: self.dest_incidence.as_ref(),
            visited: &mut self.visited,
            zero_policy: self.zero_policy,
        }
    }

    /// Clears the visited bitset. A precondition of every traversal entry
    /// point.
    pub fn reset_visited(&mut self) {
        self.visited.fill(false);
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Longest shortest path computed by [Graph::calculate_diameter];
    /// `None` until then.
    pub fn diameter(&self) -> Option<usize> {
        self.diameter
    }

    /// Folds every node's incoming messages (from the current arena) into
    /// its belief and normalizes.
    ///
    /// A node with no incoming edges keeps its states: it carries its
    /// prior. A folded sum of zero freezes the vector instead of dividing
    /// by zero.
    pub fn marginalize(&mut self) {
        self.ensure_incidence();
        for index in 0..self.nodes.len() {
            self.marginalize_node(index);
        }
    }

    pub(crate) fn marginalize_node(&mut self, index: usize) {
        let num_states = self.nodes[index].num_states();

        let mut folded: Belief = smallvec![1.0; num_states];
        let incoming = self
            .dest_incidence
            .as_ref()
            .map(|t| t.edges_of(index))
            .unwrap_or(&[]);

        let current = &self.arenas[self.parity];
        let mut has_incoming = false;
        for &edge_index in incoming {
            combine(&mut folded, current[edge_index].message(), self.zero_policy);
            has_incoming = true;
        }

        let states = self.nodes[index].states_mut();
        if has_incoming {
            states.copy_from_slice(&folded);
        }
        normalize(states);
    }
}

/// Disjoint mutable views over a [Graph]'s engine state, produced by
/// [Graph::parts_mut]. `current` is the arena selected by the parity bit.
pub(crate) struct EngineParts<'a> {
    pub current: &'a mut Vec<Edge>,
    pub previous: &'a mut Vec<Edge>,
    pub nodes: &'a mut Vec<Node>,
    pub src: Option<&'a IncidenceTable>,
    pub dest: Option<&'a IncidenceTable>,
    pub visited: &'a mut Vec<bool>,
    pub zero_policy: ZeroPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_graph() -> Graph {
        // a -> b -> c with identity CPTs
        let mut graph = Graph::with_capacity(3, 2);
        let a = graph.add_node(2, "a").unwrap();
        let b = graph.add_node(2, "b").unwrap();
        let c = graph.add_node(2, "c").unwrap();
        graph
            .add_edge(a, b, 2, 2, vec![1.0, 0.0, 0.0, 1.0])
            .unwrap();
        graph
            .add_edge(b, c, 2, 2, vec![1.0, 0.0, 0.0, 1.0])
            .unwrap();
        graph
    }

    #[test]
    fn node_indices_match_insertion_order() {
        let graph = chain_graph();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.node_index("b"), Some(1));
        assert_eq!(graph.node(1).index(), 1);
    }

    #[test]
    fn add_node_rejects_excess_arity() {
        let mut graph = Graph::with_capacity(1, 0);
        let err = graph.add_node(MAX_STATES + 1, "wide").unwrap_err();
        assert_eq!(
            err.code(),
            credence_error::ErrorCode::DimensionMismatch
        );
    }

    #[test]
    fn add_node_respects_frozen_capacity() {
        let mut graph = Graph::with_capacity(1, 0);
        graph.add_node(2, "a").unwrap();
        assert!(graph.add_node(2, "b").is_err());
    }

    #[test]
    fn add_edge_rejects_mismatched_dimensions() {
        let mut graph = Graph::with_capacity(2, 1);
        graph.add_node(2, "a").unwrap();
        graph.add_node(3, "b").unwrap();
        // claims 2x2 but b has 3 states
        let err = graph.add_edge(0, 1, 2, 2, vec![0.5; 4]).unwrap_err();
        assert_eq!(
            err.code(),
            credence_error::ErrorCode::DimensionMismatch
        );
    }

    #[test]
    fn edge_rows_sum_to_one_after_construction() {
        let mut graph = Graph::with_capacity(2, 1);
        graph.add_node(2, "a").unwrap();
        graph.add_node(2, "b").unwrap();
        // rounded rows get rescaled
        graph
            .add_edge(0, 1, 2, 2, vec![0.3, 0.3, 0.2, 0.9])
            .unwrap();
        for i in 0..2 {
            let row_sum: f64 = graph.current_edges()[0].row(i).iter().sum();
            assert!((row_sum - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn incidence_tables_cover_every_edge_once() {
        let mut graph = chain_graph();
        graph.set_up_src_nodes_to_edges();
        graph.set_up_dest_nodes_to_edges();

        assert_eq!(graph.edges_from(0), &[0]);
        assert_eq!(graph.edges_from(1), &[1]);
        assert_eq!(graph.edges_into(1), &[0]);
        assert_eq!(graph.edges_into(2), &[1]);
        assert_eq!(graph.edges_into(0), &[] as &[usize]);
    }

    #[test]
    fn rebuilt_incidence_tables_are_identical() {
        let mut graph = chain_graph();
        graph.set_up_src_nodes_to_edges();
        let first = graph.src_incidence().unwrap().as_slice().to_vec();
        graph.set_up_src_nodes_to_edges();
        assert_eq!(graph.src_incidence().unwrap().as_slice(), &first[..]);
    }

    #[test]
    fn marginalize_without_incoming_edges_keeps_the_prior() {
        let mut graph = Graph::with_capacity(1, 0);
        graph.add_node(2, "lone").unwrap();
        graph.set_node_prior(0, &[0.7, 0.3]).unwrap();
        graph.marginalize();
        assert_eq!(graph.node(0).states(), &[0.7, 0.3]);
    }

    #[test]
    fn marginalize_treats_observed_nodes_like_any_other() {
        let mut graph = chain_graph();
        graph.set_node_state(0, &[0.9, 0.1]).unwrap();
        graph.set_node_state(1, &[1.0, 0.0]).unwrap();
        graph.marginalize();

        // evidence on a node with no incoming edges survives untouched
        assert_eq!(graph.node(0).states(), &[0.9, 0.1]);
        // a node with incoming edges is overwritten by the fold, observed
        // or not; unsent (all-zero) messages fold to the identity
        assert_eq!(graph.node(1).states(), &[0.5, 0.5]);
    }

    #[test]
    fn swap_flips_parity_without_copying() {
        let mut graph = chain_graph();
        let before = graph.current_edges().as_ptr();
        graph.swap_message_buffers();
        assert_eq!(graph.previous_edges().as_ptr(), before);
        graph.swap_message_buffers();
        assert_eq!(graph.current_edges().as_ptr(), before);
    }
}
