use credence::{Termination, graph_from_str};

// The JavaBayes dog-problem network: five binary variables, two roots,
// one collider, structured as a polytree.
const DOG_PROBLEM: &str = r#"
// Bayesian Network in the Interchange Format
// Produced by BayesianNetworks package in JavaBayes
network "Dog-Problem" { //5 variables and 5 probability distributions
property "credal-set constant-density-bounded 1.1" ;
}
variable  "light-on" { //2 values
type discrete[2] {  "true"  "false" };
property "position = (218, 195)" ;
}
variable  "bowel-problem" { //2 values
type discrete[2] {  "true"  "false" };
property "position = (335, 99)" ;
}
variable  "dog-out" { //2 values
type discrete[2] {  "true"  "false" };
property "position = (300, 195)" ;
}
variable  "hear-bark" { //2 values
type discrete[2] {  "true"  "false" };
property "position = (296, 268)" ;
}
variable  "family-out" { //2 values
type discrete[2] {  "true"  "false" };
property "position = (257, 99)" ;
}
probability (  "light-on" | "family-out" ) { //2 variable(s) and 4 values
( "true" ) 0.6 0.4 ;
( "false" ) 0.05 0.95 ;
}
probability (  "bowel-problem" ) { //1 variable(s) and 2 values
table 0.01 0.99 ;
}
probability (  "dog-out" | "bowel-problem"  "family-out" ) { //3 variable(s) and 8 values
table 0.99 0.01 0.97 0.03 0.9 0.1 0.3 0.7 ;
}
probability (  "hear-bark" | "dog-out" ) { //2 variable(s) and 4 values
( "true" ) 0.7 0.3 ;
( "false" ) 0.01 0.99 ;
}
probability (  "family-out" ) { //1 variable(s) and 2 values
table 0.15 0.85 ;
}
"#;

#[test]
fn loopy_marginals_match_the_exact_root_and_chain_marginals() {
    let mut graph = graph_from_str(DOG_PROBLEM).unwrap();
    assert_eq!(graph.num_nodes(), 5);
    assert_eq!(graph.num_edges(), 4);

    graph.init_previous_edge();
    let report = graph.loopy_propagate_until(1e-12, 10_000);
    assert_eq!(report.termination, Termination::Converged);

    // every belief is a distribution
    for node in graph.nodes() {
        let total: f64 = node.states().iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "{:?}", node.states());
    }

    // roots carry their priors exactly
    let family_out = graph.node_index("family-out").unwrap();
    let states = graph.node(family_out).states();
    assert!((states[0] - 0.15).abs() < 1e-6);
    assert!((states[1] - 0.85).abs() < 1e-6);

    let bowel = graph.node_index("bowel-problem").unwrap();
    let states = graph.node(bowel).states();
    assert!((states[0] - 0.01).abs() < 1e-6);

    // a single-parent child gets its exact marginal:
    // P(light-on) = 0.15 * 0.6 + 0.85 * 0.05 = 0.1325
    let light_on = graph.node_index("light-on").unwrap();
    let states = graph.node(light_on).states();
    assert!((states[0] - 0.1325).abs() < 1e-6, "{:?}", states);
    assert!((states[1] - 0.8675).abs() < 1e-6, "{:?}", states);
}

#[test]
fn tree_and_loopy_agree_on_the_dog_problem() {
    let mut regular = graph_from_str(DOG_PROBLEM).unwrap();
    let mut loopy = regular.clone();

    regular.run_tree_propagation();
    loopy.init_previous_edge();
    loopy.loopy_propagate_until(1e-12, 10_000);

    for index in 0..regular.num_nodes() {
        let a = regular.node(index).states();
        let b = loopy.node(index).states();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!(
                (x - y).abs() < 1e-6,
                "{}: tree {:?} vs loopy {:?}",
                regular.node_name(index),
                a,
                b
            );
        }
    }
}

#[test]
fn the_dog_problem_diameter_is_three() {
    // family-out .. bowel-problem meet at dog-out; the longest shortest
    // path runs light-on / hear-bark to bowel-problem
    let mut graph = graph_from_str(DOG_PROBLEM).unwrap();
    assert_eq!(graph.calculate_diameter(), 3);
}
