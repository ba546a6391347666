/// A CSR-style incidence table mapping nodes to edge indices.
///
/// The layout mirrors the classic offset-plus-entries scheme in a single
/// array of length `num_nodes + num_edges`: the first `num_nodes` entries
/// are offsets into the same array, and entries `[num_nodes..)` list edge
/// indices grouped by node. Offset `i` gives the start of node `i`'s
/// adjacency slice; offset `i + 1` (or the array length for the last node)
/// gives its end. Building from the same edge list is deterministic, so two
/// builds over identical input produce identical tables.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IncidenceTable {
    table: Vec<usize>,
    num_nodes: usize,
    num_edges: usize,
}

impl IncidenceTable {
    /// Builds the table from `keys`, where `keys[e]` is the node that edge
    /// `e` is grouped under (its src or its dest). Within one node's slice,
    /// edges appear in ascending edge-index order.
    pub fn build(num_nodes: usize, keys: &[usize]) -> Self {
        let num_edges = keys.len();
        let mut table = vec![0usize; num_nodes + num_edges];

        // counting pass: degree of each node
        let mut counts = vec![0usize; num_nodes];
        for &k in keys {
            counts[k] += 1;
        }

        // prefix-sum the offsets; entries start right after the offsets
        let mut offset = num_nodes;
        for i in 0..num_nodes {
            table[i] = offset;
            offset += counts[i];
        }

        // stable fill in edge-index order
        let mut cursors = table[..num_nodes].to_vec();
        for (edge_index, &k) in keys.iter().enumerate() {
            table[cursors[k]] = edge_index;
            cursors[k] += 1;
        }

        IncidenceTable {
            table,
            num_nodes,
            num_edges,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Start of node `i`'s adjacency slice within the backing array.
    pub fn offset(&self, node: usize) -> usize {
        self.table[node]
    }

    /// The edge indices adjacent to `node`.
    pub fn edges_of(&self, node: usize) -> &[usize] {
        let start = self.table[node];
        let end = if node + 1 == self.num_nodes {
            self.num_nodes + self.num_edges
        } else {
            self.table[node + 1]
        };
        &self.table[start..end]
    }

    /// The raw offsets-plus-entries array.
    pub fn as_slice(&self) -> &[usize] {
        &self.table
    }
}
