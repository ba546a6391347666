use crate::belief::{Belief, combine};
use crate::graph::Graph;
use std::collections::VecDeque;

impl Graph {
    /// Computes per-node levels for tree propagation and groups nodes into
    /// per-level lists. Returns the number of levels.
    ///
    /// Nodes with no incoming edges form level 0; every other node sits one
    /// past its deepest parent. Nodes caught in a cycle never resolve a
    /// level and are appended as one final level in index order: tree
    /// propagation is only meaningful on acyclic structure, but it must not
    /// spin on cyclic input.
    pub fn init_levels_to_nodes(&mut self) -> usize {
        self.ensure_incidence();
        let n = self.num_nodes();

        let mut indegree = vec![0usize; n];
        for node in 0..n {
            indegree[node] = self.edges_into(node).len();
        }

        let mut level_of = vec![usize::MAX; n];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for node in 0..n {
            if indegree[node] == 0 {
                level_of[node] = 0;
                queue.push_back(node);
            }
        }

        while let Some(node) = queue.pop_front() {
            for &edge_index in self.edges_from(node) {
                let dest = self.current_edges()[edge_index].dest();
                let candidate = level_of[node] + 1;
                if level_of[dest] == usize::MAX || candidate > level_of[dest] {
                    level_of[dest] = candidate;
                }
                indegree[dest] -= 1;
                if indegree[dest] == 0 {
                    queue.push_back(dest);
                }
            }
        }

        let mut num_levels = level_of
            .iter()
            .filter(|&&l| l != usize::MAX)
            .max()
            .map_or(0, |&max| max + 1);

        // cyclic leftovers land together in one final level
        if level_of.contains(&usize::MAX) {
            for l in level_of.iter_mut() {
                if *l == usize::MAX {
                    *l = num_levels;
                }
            }
            num_levels += 1;
        }

        let mut levels = vec![Vec::new(); num_levels];
        for (node, &level) in level_of.iter().enumerate() {
            levels[level].push(node);
        }

        self.levels = levels;
        self.level_of = level_of;
        num_levels
    }

    /// Level-0 pass: every root sends its belief (its prior) through all of
    /// its outgoing edges. Clears the visited bitset first.
    pub fn propagate_using_levels_start(&mut self) {
        self.reset_visited();
        let roots = match self.levels.first() {
            Some(level) => level.clone(),
            None => return,
        };

        let parts = self.parts_mut();
        let Some(src) = parts.src else { return };
        for node in roots {
            parts.visited[node] = true;
            for &edge_index in src.edges_of(node) {
                parts.current[edge_index].send(parts.nodes[node].states());
            }
        }
    }

    /// Processes one level: each node folds its incoming messages into a
    /// working buffer and sends the buffer through every outgoing edge
    /// whose destination has not been visited yet.
    pub fn propagate_using_levels(&mut self, level: usize) {
        let members = match self.levels.get(level) {
            Some(members) => members.clone(),
            None => return,
        };

        let parts = self.parts_mut();
        let (Some(src), Some(dest)) = (parts.src, parts.dest) else {
            return;
        };

        let mut buffer: Belief = Belief::new();
        for node in members {
            parts.visited[node] = true;

            let num_states = parts.nodes[node].num_states();
            buffer.clear();
            buffer.resize(num_states, 1.0);
            for &edge_index in dest.edges_of(node) {
                combine(
                    &mut buffer,
                    parts.current[edge_index].message(),
                    parts.zero_policy,
                );
            }

            for &edge_index in src.edges_of(node) {
                if !parts.visited[parts.current[edge_index].dest()] {
                    parts.current[edge_index].send(&buffer);
                }
            }
        }
    }

    /// Full tree ("regular") propagation: levels, forward sweep, backward
    /// sweep, marginalize.
    pub fn run_tree_propagation(&mut self) {
        let num_levels = self.init_levels_to_nodes();
        self.propagate_using_levels_start();
        for level in 1..num_levels.saturating_sub(1) {
            self.propagate_using_levels(level);
        }
        self.reset_visited();
        for level in (1..num_levels).rev() {
            self.propagate_using_levels(level);
        }
        self.marginalize();
    }
}
