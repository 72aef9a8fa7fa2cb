#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate stopwatch;

use std::{error, fmt};

mod core;

pub use core::{
    feat::{unify, Bindings, FeatureStructure, Value},
    parse::{
        bottom_up_parser,
        chart::{AttrValue, Chart, ChartManager, Edge, EdgeHandle},
        def_parser,
        forest::Forest,
        grammar::{self, Grammar, Rule, Symbol},
        EarleyParser, Parser, PermutationParser, Token, Tree,
    },
};

/// Which chart-construction strategy a runner uses.
pub enum Strategy {
    TopDown,
    BottomUp,
    Permutation,
}

/// A grammar compiled once and reused across inputs, together with the
/// strategy it is parsed under.
pub struct ParseRunner {
    grammar: Grammar,
    parser: Box<dyn Parser>,
}

impl ParseRunner {
    pub fn build(
        rules: Vec<Rule>,
        start: &str,
        strategy: Strategy,
    ) -> Result<ParseRunner, BuildError> {
        let grammar = Grammar::build(rules, start)?;
        let parser: Box<dyn Parser> = match strategy {
            Strategy::TopDown => def_parser(),
            Strategy::BottomUp => bottom_up_parser(),
            Strategy::Permutation => Box::new(PermutationParser::new()),
        };

        Ok(ParseRunner { grammar, parser })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn parse(&self, tokens: &[Token]) -> ChartManager {
        self.parser.parse(tokens, &self.grammar)
    }

    pub fn recognize(&self, tokens: &[Token]) -> bool {
        self.parse(tokens).is_recognized()
    }
}

#[derive(Debug)]
pub enum BuildError {
    GrammarErr(grammar::BuildError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            BuildError::GrammarErr(ref err) => write!(f, "Failed to build grammar: {}", err),
        }
    }
}

impl error::Error for BuildError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            BuildError::GrammarErr(ref err) => Some(err),
        }
    }
}

impl From<grammar::BuildError> for BuildError {
    fn from(err: grammar::BuildError) -> BuildError {
        BuildError::GrammarErr(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    fn toy_rules() -> Vec<Rule> {
        vec![
            Rule::new(
                FeatureStructure::with_type("S"),
                vec![
                    Symbol::nt(FeatureStructure::with_type("NP")),
                    Symbol::nt(FeatureStructure::with_type("VP")),
                ],
            ),
            Rule::new(
                FeatureStructure::with_type("NP"),
                vec![Symbol::terminal("Mary")],
            ),
            Rule::new(
                FeatureStructure::with_type("VP"),
                vec![Symbol::terminal("ran")],
            ),
        ]
    }

    #[test]
    fn runner_recognizes_and_enumerates() {
        //setup
        let runner = ParseRunner::build(toy_rules(), "S", Strategy::TopDown).unwrap();

        //exercise
        let manager = runner.parse(&Token::sequence(&["Mary", "ran"]));

        //verify
        assert!(manager.is_recognized());
        assert_eq!(manager.trees().count(), 1);
        assert!(!runner.recognize(&Token::sequence(&["ran", "Mary"])));
    }

    #[test]
    fn failed_grammar_build() {
        //setup
        let rules = vec![Rule::new(
            FeatureStructure::new().attr("case", Value::atom("nom")),
            vec![Symbol::terminal("x")],
        )];

        //exercise
        let res = ParseRunner::build(rules, "S", Strategy::TopDown);

        //verify
        assert!(res.is_err());

        let err: &Error = &res.err().unwrap();
        assert_eq!(
            format!("{}", err),
            "Failed to build grammar: Production '_[case: nom] -> 'x'' has no type on its left-hand side"
        );

        let err = err.source().unwrap();
        assert_eq!(
            format!("{}", err),
            "Production '_[case: nom] -> 'x'' has no type on its left-hand side"
        );

        assert!(err.source().is_none());
    }

    #[test]
    fn failed_missing_start() {
        //setup
        let res = ParseRunner::build(toy_rules(), "TOP", Strategy::BottomUp);

        //verify
        assert!(res.is_err());

        let err: &Error = &res.err().unwrap();
        assert_eq!(
            format!("{}", err),
            "Failed to build grammar: Start category 'TOP' has no productions"
        );
    }
}
