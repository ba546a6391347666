use crate::ast::{Network, ProbabilityDecl, ProbabilityEntry};
use compact_str::CompactString;
use credence_core::Graph;
use credence_error::{CredenceResult, credence_bail, credence_err, ensure};
use hashbrown::HashMap;
use tracing::warn;

/// Materializes a parsed [Network] into an inference-ready [Graph].
///
/// Two passes over the AST: the first sizes the arenas (one vertex per
/// variable, `max(1, parents)` edge slots per probability block), the
/// second creates nodes in source order and one edge per conditioning
/// parent. When several probability blocks condition the same child, only
/// the last one is materialized. Incidence tables are set up before the
/// graph is returned.
pub fn build_graph(network: &Network) -> CredenceResult<Graph> {
    let num_vertices = network.variables.len();
    let num_edges: usize = network
        .probabilities
        .iter()
        .map(|p| p.parents().len().max(1))
        .sum();

    let mut graph = Graph::with_capacity(num_vertices, num_edges);
    let mut index_by_name: HashMap<CompactString, usize> = HashMap::new();

    for variable in &network.variables {
        ensure!(
            variable.states.len() == variable.num_states,
            DimensionMismatch: "variable '{}' declares {} states but lists {} labels",
            variable.name, variable.num_states, variable.states.len()
        );
        let index = graph.add_node(variable.num_states, &variable.name)?;
        graph.set_state_labels(index, variable.states.clone())?;
        index_by_name.insert(variable.name.clone(), index);
    }

    // a child conditioned by several blocks: the last block wins
    let mut chosen: HashMap<usize, usize> = HashMap::new();
    for (decl_index, probability) in network.probabilities.iter().enumerate() {
        let child = resolve(&index_by_name, probability.child())?;
        if let Some(previous) = chosen.insert(child, decl_index) {
            warn!(
                "probability block {} for '{}' is overridden by a later block",
                previous,
                probability.child()
            );
        }
    }

    for (decl_index, probability) in network.probabilities.iter().enumerate() {
        let child = resolve(&index_by_name, probability.child())?;
        if chosen.get(&child) != Some(&decl_index) {
            continue;
        }

        let child_dim = graph.node(child).num_states();
        if probability.parents().is_empty() {
            let prior = prior_distribution(probability, child_dim)?;
            graph.set_node_prior(child, &prior)?;
        } else {
            let parents = probability
                .parents()
                .iter()
                .map(|name| resolve(&index_by_name, name))
                .collect::<CredenceResult<Vec<_>>>()?;
            let parent_dims: Vec<usize> = parents
                .iter()
                .map(|&p| graph.node(p).num_states())
                .collect();

            let joint = assemble_joint(&graph, probability, &parents, &parent_dims, child_dim)?;
            for (position, &parent) in parents.iter().enumerate() {
                let projected = project_onto_parent(&joint, &parent_dims, position, child_dim);
                graph.add_edge(parent, child, parent_dims[position], child_dim, projected)?;
            }
        }
    }

    graph.set_up_src_nodes_to_edges();
    graph.set_up_dest_nodes_to_edges();
    Ok(graph)
}

fn resolve(index_by_name: &HashMap<CompactString, usize>, name: &str) -> CredenceResult<usize> {
    index_by_name
        .get(name)
        .copied()
        .ok_or_else(|| credence_err!(UnknownVariable: "{}", name))
}

/// Extracts the prior of a parentless probability block from its single
/// `table` or `default` entry.
fn prior_distribution(
    probability: &ProbabilityDecl,
    child_dim: usize,
) -> CredenceResult<Vec<f64>> {
    let values = match probability.entries.as_slice() {
        [ProbabilityEntry::Table(values)] | [ProbabilityEntry::Default(values)] => values,
        [] => credence_bail!(
            DimensionMismatch: "probability block for '{}' is empty",
            probability.child()
        ),
        _ => credence_bail!(
            DimensionMismatch: "prior for '{}' must be a single 'table' or 'default' entry",
            probability.child()
        ),
    };
    ensure!(
        values.len() == child_dim,
        DimensionMismatch: "prior for '{}' lists {} probabilities, expected {}",
        probability.child(), values.len(), child_dim
    );
    let mut prior = values.clone();
    let total: f64 = prior.iter().sum();
    if total <= 0.0 {
        warn!(
            "prior for '{}' sums to {}, replacing with uniform",
            probability.child(),
            total
        );
        prior.fill(1.0 / child_dim as f64);
    } else {
        for p in prior.iter_mut() {
            *p /= total;
        }
    }
    Ok(prior)
}

/// Assembles the full joint table `P(child | parents...)` with one row per
/// parent configuration, configurations enumerated in lexicographic order
/// with the rightmost parent varying fastest.
fn assemble_joint(
    graph: &Graph,
    probability: &ProbabilityDecl,
    parents: &[usize],
    parent_dims: &[usize],
    child_dim: usize,
) -> CredenceResult<Vec<f64>> {
    let rows: usize = parent_dims.iter().product();

    let mut table_entry: Option<&Vec<f64>> = None;
    let mut default_row: Option<&Vec<f64>> = None;
    let mut explicit: Vec<Option<Vec<f64>>> = vec![None; rows];
    let mut has_conditional = false;

    for entry in &probability.entries {
        match entry {
            ProbabilityEntry::Table(values) => table_entry = Some(values),
            ProbabilityEntry::Default(values) => {
                ensure!(
                    values.len() == child_dim,
                    DimensionMismatch: "default entry for '{}' lists {} probabilities, expected {}",
                    probability.child(), values.len(), child_dim
                );
                default_row = Some(values);
            }
            ProbabilityEntry::Conditional { states, values } => {
                has_conditional = true;
                ensure!(
                    states.len() == parents.len(),
                    DimensionMismatch: "entry for '{}' names {} parent states, expected {}",
                    probability.child(), states.len(), parents.len()
                );
                ensure!(
                    values.len() == child_dim,
                    DimensionMismatch: "entry for '{}' lists {} probabilities, expected {}",
                    probability.child(), values.len(), child_dim
                );
                let row = row_index(graph, probability, parents, parent_dims, states)?;
                // an explicit row overrides the default and any earlier
                // duplicate of itself
                explicit[row] = Some(values.clone());
            }
        }
    }

    if let Some(values) = table_entry {
        ensure!(
            !has_conditional && default_row.is_none(),
            DimensionMismatch: "probability block for '{}' mixes 'table' with other entries",
            probability.child()
        );
        ensure!(
            values.len() == rows * child_dim,
            DimensionMismatch: "table for '{}' lists {} probabilities, expected {}",
            probability.child(), values.len(), rows * child_dim
        );
        return Ok(values.clone());
    }

    let mut joint = Vec::with_capacity(rows * child_dim);
    for (row, filled) in explicit.iter().enumerate() {
        match (filled, default_row) {
            (Some(values), _) => joint.extend_from_slice(values),
            (None, Some(values)) => joint.extend_from_slice(values),
            (None, None) => credence_bail!(
                DimensionMismatch: "no probabilities for configuration {} of '{}' and no default",
                row, probability.child()
            ),
        }
    }
    Ok(joint)
}

/// Maps a tuple of parent-state labels to its row in the joint table.
fn row_index(
    graph: &Graph,
    probability: &ProbabilityDecl,
    parents: &[usize],
    parent_dims: &[usize],
    states: &[CompactString],
) -> CredenceResult<usize> {
    let mut row = 0usize;
    for (position, state) in states.iter().enumerate() {
        let parent = parents[position];
        let state_index = graph
            .state_labels(parent)
            .iter()
            .position(|label| label == state)
            .ok_or_else(|| {
                credence_err!(
                    DimensionMismatch: "variable '{}' has no state '{}' (entry in block for '{}')",
                    graph.node_name(parent), state, probability.child()
                )
            })?;
        row = row * parent_dims[position] + state_index;
    }
    Ok(row)
}

/// Projects the full joint onto one parent: row `a` of the result is the
/// distribution of the child conditioned on that parent being in state
/// `a`, the other parents marginalized uniformly.
fn project_onto_parent(
    joint: &[f64],
    parent_dims: &[usize],
    position: usize,
    child_dim: usize,
) -> Vec<f64> {
    let rows: usize = parent_dims.iter().product();
    let dim = parent_dims[position];
    let stride: usize = parent_dims[position + 1..].iter().product();
    let configs_per_state = (rows / dim) as f64;

    let mut projected = vec![0.0; dim * child_dim];
    for row in 0..rows {
        let state = (row / stride) % dim;
        for j in 0..child_dim {
            projected[state * child_dim + j] += joint[row * child_dim + j];
        }
    }
    for value in projected.iter_mut() {
        *value /= configs_per_state;
    }
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    fn build(source: &str) -> CredenceResult<Graph> {
        build_graph(&parse_str(source).unwrap())
    }

    #[test]
    fn nodes_follow_declaration_order() {
        let graph = build(
            r#"
            network test { }
            variable a { type discrete [ 2 ] { x y } ; }
            variable b { type discrete [ 3 ] { p q r } ; }
            "#,
        )
        .unwrap();
        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(graph.node_index("a"), Some(0));
        assert_eq!(graph.node_index("b"), Some(1));
        assert_eq!(graph.node(1).num_states(), 3);
    }

    #[test]
    fn parentless_blocks_set_the_prior_without_edges() {
        let graph = build(
            r#"
            network test { }
            variable a { type discrete [ 2 ] { x y } ; }
            probability ( a ) { table 0.2 0.8 ; }
            "#,
        )
        .unwrap();
        assert_eq!(graph.num_edges(), 0);
        assert_eq!(graph.node(0).states(), &[0.2, 0.8]);
    }

    #[test]
    fn one_edge_per_conditioning_parent() {
        let graph = build(
            r#"
            network test { }
            variable a { type discrete [ 2 ] { t f } ; }
            variable b { type discrete [ 2 ] { t f } ; }
            variable c { type discrete [ 2 ] { t f } ; }
            probability ( c | a b ) {
                ( t t ) 0.9 0.1 ;
                ( t f ) 0.8 0.2 ;
                ( f t ) 0.3 0.7 ;
                ( f f ) 0.1 0.9 ;
            }
            "#,
        )
        .unwrap();
        assert_eq!(graph.num_edges(), 2);

        // projection of P(c | a, b) onto a: rows averaged over b
        let edge = &graph.current_edges()[0];
        assert_eq!(edge.src(), 0);
        assert_eq!(edge.dest(), 2);
        assert!((edge.joint(0, 0) - 0.85).abs() < 1e-12);
        assert!((edge.joint(1, 0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn table_rows_run_rightmost_parent_fastest() {
        let graph = build(
            r#"
            network test { }
            variable a { type discrete [ 2 ] { t f } ; }
            variable b { type discrete [ 2 ] { t f } ; }
            variable c { type discrete [ 2 ] { t f } ; }
            probability ( c | a b ) {
                table 0.9 0.1 0.8 0.2 0.3 0.7 0.1 0.9 ;
            }
            "#,
        )
        .unwrap();
        // identical numbers to the entry form above
        let edge = &graph.current_edges()[0];
        assert!((edge.joint(0, 0) - 0.85).abs() < 1e-12);
        assert!((edge.joint(1, 0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn explicit_entries_override_the_default() {
        let graph = build(
            r#"
            network test { }
            variable a { type discrete [ 2 ] { t f } ; }
            variable b { type discrete [ 2 ] { t f } ; }
            probability ( b | a ) {
                default 0.5 0.5 ;
                ( t ) 0.9 0.1 ;
            }
            "#,
        )
        .unwrap();
        let edge = &graph.current_edges()[0];
        assert!((edge.joint(0, 0) - 0.9).abs() < 1e-12);
        assert!((edge.joint(1, 0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn last_probability_block_wins_for_a_repeated_child() {
        let graph = build(
            r#"
            network test { }
            variable a { type discrete [ 2 ] { t f } ; }
            variable b { type discrete [ 2 ] { t f } ; }
            probability ( b | a ) {
                ( t ) 0.9 0.1 ;
                ( f ) 0.2 0.8 ;
            }
            probability ( b ) { table 0.4 0.6 ; }
            "#,
        )
        .unwrap();
        // the earlier conditional block is dropped entirely
        assert_eq!(graph.num_edges(), 0);
        assert_eq!(graph.node(1).states(), &[0.4, 0.6]);
    }

    #[test]
    fn unknown_variables_are_fatal() {
        let err = build(
            r#"
            network test { }
            variable a { type discrete [ 2 ] { t f } ; }
            probability ( a | ghost ) { default 0.5 0.5 ; }
            "#,
        )
        .unwrap_err();
        assert_eq!(err.code(), credence_error::ErrorCode::UnknownVariable);
    }

    #[test]
    fn wrong_entry_width_is_a_dimension_mismatch() {
        let err = build(
            r#"
            network test { }
            variable a { type discrete [ 2 ] { t f } ; }
            probability ( a ) { table 0.2 0.3 0.5 ; }
            "#,
        )
        .unwrap_err();
        assert_eq!(err.code(), credence_error::ErrorCode::DimensionMismatch);
    }

    #[test]
    fn declared_arity_must_match_the_labels() {
        let err = build(
            r#"
            network test { }
            variable a { type discrete [ 3 ] { t f } ; }
            "#,
        )
        .unwrap_err();
        assert_eq!(err.code(), credence_error::ErrorCode::DimensionMismatch);
    }

    #[test]
    fn missing_rows_without_default_are_rejected() {
        let err = build(
            r#"
            network test { }
            variable a { type discrete [ 2 ] { t f } ; }
            variable b { type discrete [ 2 ] { t f } ; }
            probability ( b | a ) {
                ( t ) 0.9 0.1 ;
            }
            "#,
        )
        .unwrap_err();
        assert_eq!(err.code(), credence_error::ErrorCode::DimensionMismatch);
    }
}
