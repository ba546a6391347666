use compact_str::CompactString;

/// The parsed form of one BIF source file.
///
/// Declarations keep their source order: a variable's position in
/// `variables` becomes its node index when the graph is built.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Network {
    pub name: String,
    pub properties: Vec<String>,
    pub variables: Vec<VariableDecl>,
    pub probabilities: Vec<ProbabilityDecl>,
}

impl Network {
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.probabilities.is_empty()
    }
}

/// `variable <name> { type discrete [ n ] { <label>+ } ; }`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableDecl {
    pub name: CompactString,
    /// The declared arity, from `discrete [ n ]`. Must match `states.len()`.
    pub num_states: usize,
    pub states: Vec<CompactString>,
    pub properties: Vec<String>,
}

/// `probability ( <child> | <parent>* ) { <entry>* }`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbabilityDecl {
    /// The conditioned variable first, then its conditioning parents.
    pub variables: Vec<CompactString>,
    pub entries: Vec<ProbabilityEntry>,
}

impl ProbabilityDecl {
    pub fn child(&self) -> &str {
        &self.variables[0]
    }

    pub fn parents(&self) -> &[CompactString] {
        &self.variables[1..]
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProbabilityEntry {
    /// `default <p>+ ;` fills every row not explicitly listed.
    Default(Vec<f64>),
    /// `( <parent state>+ ) <p>+ ;` gives one row of the joint table.
    Conditional {
        states: Vec<CompactString>,
        values: Vec<f64>,
    },
    /// `table <p>+ ;` lists the full joint in parent-state lexicographic
    /// order, rightmost parent varying fastest.
    Table(Vec<f64>),
}
