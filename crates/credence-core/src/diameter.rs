use crate::graph::Graph;
use std::collections::VecDeque;

impl Graph {
    /// Longest shortest path between any pair of nodes, ignoring edge
    /// direction, via BFS from every node. Telemetry only: inference never
    /// reads it. The result is cached on the graph and returned.
    pub fn calculate_diameter(&mut self) -> usize {
        self.ensure_incidence();
        let n = self.num_nodes();
        let mut best = 0usize;
        let mut dist = vec![usize::MAX; n];
        let mut queue = VecDeque::new();

        for start in 0..n {
            dist.fill(usize::MAX);
            dist[start] = 0;
            queue.clear();
            queue.push_back(start);

            while let Some(node) = queue.pop_front() {
                let next = dist[node] + 1;
                for &edge_index in self.edges_from(node) {
                    let neighbor = self.current_edges()[edge_index].dest();
                    if dist[neighbor] == usize::MAX {
                        dist[neighbor] = next;
                        best = best.max(next);
                        queue.push_back(neighbor);
                    }
                }
                for &edge_index in self.edges_into(node) {
                    let neighbor = self.current_edges()[edge_index].src();
                    if dist[neighbor] == usize::MAX {
                        dist[neighbor] = next;
                        best = best.max(next);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        self.diameter = Some(best);
        best
    }
}
