use crate::ast::{Network, ProbabilityDecl, ProbabilityEntry, VariableDecl};
use crate::token::{Lexer, Token};
use compact_str::CompactString;
use credence_error::{CredenceResult, credence_bail, credence_err};

/// Parses BIF source text into a [Network].
///
/// On a grammar mismatch the error carries the offending line and the
/// expected symbols; no partial AST is returned.
pub fn parse_str(source: &str) -> CredenceResult<Network> {
    Parser::new(source)?.parse()
}

/// Recursive-descent parser state: the token stream plus one token of
/// lookahead. All of the grammar lives in the `parse_*` methods; the
/// lexer owns position and line tracking.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Option<(Token, usize)>,
    line: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> CredenceResult<Self> {
        let mut lexer = Lexer::new(source);
        let lookahead = lexer.next_token()?;
        Ok(Parser {
            lexer,
            lookahead,
            line: 1,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.lookahead.as_ref().map(|(token, _)| token)
    }

    fn advance(&mut self) -> CredenceResult<Option<Token>> {
        let consumed = self.lookahead.take();
        if let Some((_, line)) = &consumed {
            self.line = *line;
        }
        self.lookahead = self.lexer.next_token()?;
        Ok(consumed.map(|(token, _)| token))
    }

    fn expect(&mut self, expected: Token) -> CredenceResult<()> {
        match self.advance()? {
            Some(token) if token == expected => Ok(()),
            Some(token) => credence_bail!(
                Parse: self.line,
                "expected {}, found {}",
                expected.describe(), token.describe()
            ),
            None => credence_bail!(
                Parse: self.line,
                "expected {}, found end of input",
                expected.describe()
            ),
        }
    }

    fn expect_word(&mut self, what: &str) -> CredenceResult<String> {
        match self.advance()? {
            Some(Token::Word(word)) => Ok(word),
            // bare numeric labels are tolerated where a word is expected
            Some(Token::Decimal(value)) => Ok(value.to_string()),
            Some(token) => credence_bail!(
                Parse: self.line,
                "expected {}, found {}",
                what, token.describe()
            ),
            None => credence_bail!(
                Parse: self.line,
                "expected {}, found end of input",
                what
            ),
        }
    }

    fn expect_decimal(&mut self, what: &str) -> CredenceResult<i64> {
        match self.advance()? {
            Some(Token::Decimal(value)) => Ok(value),
            Some(token) => credence_bail!(
                Parse: self.line,
                "expected {}, found {}",
                what, token.describe()
            ),
            None => credence_bail!(
                Parse: self.line,
                "expected {}, found end of input",
                what
            ),
        }
    }

    /// `compilation_unit := network_declaration variable_or_probability*`
    pub fn parse(mut self) -> CredenceResult<Network> {
        let mut network = self.parse_network_declaration()?;

        loop {
            match self.peek() {
                Some(Token::Variable) => {
                    self.advance()?;
                    let variable = self.parse_variable_declaration()?;
                    network.variables.push(variable);
                }
                Some(Token::Probability) => {
                    self.advance()?;
                    let probability = self.parse_probability_declaration()?;
                    network.probabilities.push(probability);
                }
                None => break,
                Some(token) => credence_bail!(
                    Parse: self.line,
                    "expected 'variable', 'probability' or end of input, found {}",
                    token.describe()
                ),
            }
        }

        Ok(network)
    }

    /// `network_declaration := NETWORK WORD L_CURLY property* R_CURLY`
    fn parse_network_declaration(&mut self) -> CredenceResult<Network> {
        self.expect(Token::Network)?;
        let name = self.expect_word("a network name")?;
        self.expect(Token::LCurly)?;

        let mut properties = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Property(_)) => {
                    if let Some(Token::Property(text)) = self.advance()? {
                        properties.push(text);
                    }
                }
                _ => break,
            }
        }
        self.expect(Token::RCurly)?;

        Ok(Network {
            name,
            properties,
            variables: Vec::new(),
            probabilities: Vec::new(),
        })
    }

    /// `variable_declaration := VARIABLE WORD L_CURLY
    ///      (property | variable_discrete)* R_CURLY`
    fn parse_variable_declaration(&mut self) -> CredenceResult<VariableDecl> {
        let name = self.expect_word("a variable name")?;
        self.expect(Token::LCurly)?;

        let mut properties = Vec::new();
        let mut discrete: Option<(usize, Vec<CompactString>)> = None;

        loop {
            match self.peek() {
                Some(Token::Property(_)) => {
                    if let Some(Token::Property(text)) = self.advance()? {
                        properties.push(text);
                    }
                }
                Some(Token::VariableType) => {
                    self.advance()?;
                    // a repeated type block: the last one wins
                    discrete = Some(self.parse_variable_discrete()?);
                }
                Some(Token::RCurly) => {
                    self.advance()?;
                    break;
                }
                Some(token) => credence_bail!(
                    Parse: self.line,
                    "expected 'type', a property or '}}' in variable '{}', found {}",
                    name, token.describe()
                ),
                None => credence_bail!(
                    Parse: self.line,
                    "unterminated variable '{}' block", name
                ),
            }
        }

        let Some((num_states, states)) = discrete else {
            credence_bail!(
                Parse: self.line,
                "variable '{}' has no 'type discrete' declaration", name
            );
        };

        Ok(VariableDecl {
            name: CompactString::from(name),
            num_states,
            states,
            properties,
        })
    }

    /// `variable_discrete := VARIABLETYPE DISCRETE L_BRACKET DECIMAL
    ///      R_BRACKET L_CURLY WORD+ R_CURLY SEMICOLON`
    fn parse_variable_discrete(&mut self) -> CredenceResult<(usize, Vec<CompactString>)> {
        self.expect(Token::Discrete)?;
        self.expect(Token::LBracket)?;
        let declared = self.expect_decimal("a state count")?;
        if declared < 1 {
            credence_bail!(Parse: self.line, "state count must be positive, found {}", declared);
        }
        self.expect(Token::RBracket)?;
        self.expect(Token::LCurly)?;

        let mut states = Vec::new();
        while !matches!(self.peek(), Some(Token::RCurly)) {
            states.push(CompactString::from(self.expect_word("a state label")?));
        }
        self.expect(Token::RCurly)?;
        self.expect(Token::Semicolon)?;

        Ok((declared as usize, states))
    }

    /// `probability_declaration := PROBABILITY L_PARENS WORD+ R_PARENS
    ///      L_CURLY probability_content_entries* R_CURLY`
    fn parse_probability_declaration(&mut self) -> CredenceResult<ProbabilityDecl> {
        self.expect(Token::LParens)?;
        let mut variables = Vec::new();
        while !matches!(self.peek(), Some(Token::RParens)) {
            variables.push(CompactString::from(self.expect_word("a variable name")?));
        }
        self.expect(Token::RParens)?;
        if variables.is_empty() {
            credence_bail!(Parse: self.line, "probability declaration names no variables");
        }

        self.expect(Token::LCurly)?;
        let mut entries = Vec::new();
        loop {
            match self.peek() {
                Some(Token::DefaultValue) => {
                    self.advance()?;
                    let values = self.parse_number_list("a probability")?;
                    self.expect(Token::Semicolon)?;
                    entries.push(ProbabilityEntry::Default(values));
                }
                Some(Token::TableValues) => {
                    self.advance()?;
                    let values = self.parse_number_list("a probability")?;
                    self.expect(Token::Semicolon)?;
                    entries.push(ProbabilityEntry::Table(values));
                }
                Some(Token::LParens) => {
                    self.advance()?;
                    let mut states = Vec::new();
                    while !matches!(self.peek(), Some(Token::RParens)) {
                        states.push(CompactString::from(self.expect_word("a state label")?));
                    }
                    self.expect(Token::RParens)?;
                    let values = self.parse_number_list("a probability")?;
                    self.expect(Token::Semicolon)?;
                    entries.push(ProbabilityEntry::Conditional { states, values });
                }
                Some(Token::RCurly) => {
                    self.advance()?;
                    break;
                }
                Some(token) => credence_bail!(
                    Parse: self.line,
                    "expected 'default', 'table', '(' or '}}', found {}",
                    token.describe()
                ),
                None => credence_bail!(
                    Parse: self.line,
                    "unterminated probability block for '{}'", variables[0]
                ),
            }
        }

        Ok(ProbabilityDecl { variables, entries })
    }

    /// `floating_point_list := (FLOAT | DECIMAL)+`
    fn parse_number_list(&mut self, what: &str) -> CredenceResult<Vec<f64>> {
        let mut values = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Float(_)) => {
                    if let Some(Token::Float(value)) = self.advance()? {
                        values.push(value);
                    }
                }
                Some(Token::Decimal(_)) => {
                    if let Some(Token::Decimal(value)) = self.advance()? {
                        values.push(value as f64);
                    }
                }
                _ if values.is_empty() => {
                    let found = self
                        .peek()
                        .map_or("end of input", |token| token.describe());
                    return Err(credence_err!(
                        Parse: self.line,
                        "expected {}, found {}",
                        what, found
                    ));
                }
                _ => break,
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_network_header() {
        let network = parse_str("network \"Dog-Problem\" { property \"x\" ; }").unwrap();
        assert_eq!(network.name, "Dog-Problem");
        assert_eq!(network.properties.len(), 1);
        assert!(network.is_empty());
    }

    #[test]
    fn parses_variable_blocks_with_interleaved_properties() {
        let source = r#"
            network test { }
            variable "rain" {
                property "position = (100, 100)" ;
                type discrete [ 2 ] { "yes" "no" } ;
                property "weight = 1" ;
            }
        "#;
        let network = parse_str(source).unwrap();
        assert_eq!(network.variables.len(), 1);
        let rain = &network.variables[0];
        assert_eq!(rain.name, "rain");
        assert_eq!(rain.num_states, 2);
        assert_eq!(rain.states, vec!["yes", "no"]);
        assert_eq!(rain.properties.len(), 2);
    }

    #[test]
    fn parses_probability_tables_and_entries() {
        let source = r#"
            network test { }
            probability ( a ) { table 0.2 0.8 ; }
            probability ( b | a c ) {
                default 0.5 0.5 ;
                ( yes, yes ) 0.9 0.1 ;
            }
        "#;
        let network = parse_str(source).unwrap();
        assert_eq!(network.probabilities.len(), 2);

        let prior = &network.probabilities[0];
        assert_eq!(prior.child(), "a");
        assert!(prior.parents().is_empty());
        assert_eq!(prior.entries, vec![ProbabilityEntry::Table(vec![0.2, 0.8])]);

        let cond = &network.probabilities[1];
        assert_eq!(cond.child(), "b");
        assert_eq!(cond.parents(), &["a", "c"]);
        assert_eq!(cond.entries.len(), 2);
        assert_eq!(
            cond.entries[1],
            ProbabilityEntry::Conditional {
                states: vec!["yes".into(), "yes".into()],
                values: vec![0.9, 0.1],
            }
        );
    }

    #[test]
    fn integer_probabilities_are_accepted() {
        let network = parse_str("network test { } probability ( a ) { table 1 0 ; }").unwrap();
        assert_eq!(
            network.probabilities[0].entries,
            vec![ProbabilityEntry::Table(vec![1.0, 0.0])]
        );
    }

    #[test]
    fn syntax_errors_carry_line_and_expectation() {
        let err = parse_str("network test { }\nvariable x ;").unwrap_err();
        assert_eq!(err.code(), credence_error::ErrorCode::Parse);
        let text = err.to_string();
        assert!(text.contains("line 2"), "{}", text);
        assert!(text.contains("'{'"), "{}", text);
    }

    #[test]
    fn missing_discrete_block_is_rejected() {
        let err = parse_str("network test { } variable x { }").unwrap_err();
        assert!(err.to_string().contains("no 'type discrete'"));
    }
}
