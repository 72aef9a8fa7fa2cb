use {
    core::feat::FeatureStructure,
    std::{collections::HashMap, error, fmt, rc::Rc},
};

/// One position of a rule's right-hand side: either a literal terminal or a
/// nonterminal feature structure. A nonterminal may carry an explicit
/// `optional` annotation, which the free-word-order parser is allowed to
/// skip without consuming input.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Symbol {
    Terminal(String),
    NonTerminal {
        fs: FeatureStructure,
        optional: bool,
    },
}

impl Symbol {
    pub fn terminal(text: &str) -> Symbol {
        Symbol::Terminal(text.to_string())
    }

    pub fn nt(fs: FeatureStructure) -> Symbol {
        Symbol::NonTerminal {
            fs,
            optional: false,
        }
    }

    pub fn optional(fs: FeatureStructure) -> Symbol {
        Symbol::NonTerminal { fs, optional: true }
    }

    pub fn is_terminal(&self) -> bool {
        match *self {
            Symbol::Terminal(_) => true,
            Symbol::NonTerminal { .. } => false,
        }
    }

    pub fn typ(&self) -> Option<&str> {
        match *self {
            Symbol::Terminal(_) => None,
            Symbol::NonTerminal { ref fs, .. } => fs.typ(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Symbol::Terminal(ref text) => write!(f, "'{}'", text),
            Symbol::NonTerminal {
                ref fs,
                optional: false,
            } => write!(f, "{}", fs),
            Symbol::NonTerminal {
                ref fs,
                optional: true,
            } => write!(f, "({})", fs),
        }
    }
}

/// An immutable production. Rules marked order-free have their right-hand
/// side matched as a multiset instead of a fixed sequence.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Rule {
    lhs: FeatureStructure,
    rhs: Vec<Symbol>,
    order_free: bool,
}

impl Rule {
    pub fn new(lhs: FeatureStructure, rhs: Vec<Symbol>) -> Rule {
        Rule {
            lhs,
            rhs,
            order_free: false,
        }
    }

    pub fn order_free(lhs: FeatureStructure, rhs: Vec<Symbol>) -> Rule {
        Rule {
            lhs,
            rhs,
            order_free: true,
        }
    }

    pub fn lhs(&self) -> &FeatureStructure {
        &self.lhs
    }

    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }

    pub fn is_order_free(&self) -> bool {
        self.order_free
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rhs: Vec<String> = self.rhs.iter().map(|sym| sym.to_string()).collect();
        write!(f, "{} -> {}", self.lhs, rhs.join(" "))
    }
}

/// A rule set indexed once, at construction, by lhs type (for prediction)
/// and by rhs nonterminal type (for the bottom-up predictor). Immutable for
/// its whole lifetime.
pub struct Grammar {
    prods_by_lhs_type: HashMap<String, Vec<Rc<Rule>>>,
    prods_by_rhs_type: HashMap<String, Vec<Rc<Rule>>>,
    prods_by_anchor: HashMap<String, Vec<Rc<Rule>>>,
    start: FeatureStructure,
}

impl Grammar {
    pub fn build(rules: Vec<Rule>, start: &str) -> Result<Grammar, BuildError> {
        let mut prods_by_lhs_type: HashMap<String, Vec<Rc<Rule>>> = HashMap::new();
        let mut prods_by_rhs_type: HashMap<String, Vec<Rc<Rule>>> = HashMap::new();
        let mut prods_by_anchor: HashMap<String, Vec<Rc<Rule>>> = HashMap::new();

        for rule in rules {
            let lhs_type = match rule.lhs().typ() {
                Some(lhs_type) => lhs_type.to_string(),
                None => return Err(BuildError::UntypedLhs(rule.to_string())),
            };

            // An edge tracks its matched rhs positions in a 64-bit mask.
            if rule.rhs().len() > 64 {
                return Err(BuildError::OversizedRhs(rule.to_string()));
            }

            let rule = Rc::new(rule);

            for sym in rule.rhs() {
                if let Some(rhs_type) = sym.typ() {
                    prods_by_rhs_type
                        .entry(rhs_type.to_string())
                        .or_insert_with(Vec::new)
                        .push(Rc::clone(&rule));
                }
            }

            if let Some(&Symbol::Terminal(ref text)) = rule.rhs().first() {
                prods_by_anchor
                    .entry(text.clone())
                    .or_insert_with(Vec::new)
                    .push(Rc::clone(&rule));
            }

            prods_by_lhs_type
                .entry(lhs_type)
                .or_insert_with(Vec::new)
                .push(rule);
        }

        if !prods_by_lhs_type.contains_key(start) {
            return Err(BuildError::UnknownStart(start.to_string()));
        }

        Ok(Grammar {
            prods_by_lhs_type,
            prods_by_rhs_type,
            prods_by_anchor,
            start: FeatureStructure::with_type(start),
        })
    }

    /// All rules whose lhs carries the given type. Unknown types yield no
    /// productions rather than an error.
    pub fn productions(&self, lhs_type: &str) -> &[Rc<Rule>] {
        match self.prods_by_lhs_type.get(lhs_type) {
            Some(prods) => &prods[..],
            None => &[],
        }
    }

    /// All rules whose rhs contains a nonterminal of the given type.
    pub fn productions_with_rhs_type(&self, rhs_type: &str) -> &[Rc<Rule>] {
        match self.prods_by_rhs_type.get(rhs_type) {
            Some(prods) => &prods[..],
            None => &[],
        }
    }

    /// All rules whose rhs begins with the given terminal, used to seed
    /// bottom-up parses at their lexical anchors.
    pub fn productions_anchored_by(&self, lexeme: &str) -> &[Rc<Rule>] {
        match self.prods_by_anchor.get(lexeme) {
            Some(prods) => &prods[..],
            None => &[],
        }
    }

    pub fn start(&self) -> &FeatureStructure {
        &self.start
    }
}

#[derive(Debug)]
pub enum BuildError {
    UntypedLhs(String),
    OversizedRhs(String),
    UnknownStart(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            BuildError::UntypedLhs(ref rule) => {
                write!(f, "Production '{}' has no type on its left-hand side", rule)
            }
            BuildError::OversizedRhs(ref rule) => write!(
                f,
                "Production '{}' has more than 64 right-hand-side symbols",
                rule
            ),
            BuildError::UnknownStart(ref category) => {
                write!(f, "Start category '{}' has no productions", category)
            }
        }
    }
}

impl error::Error for BuildError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        core::feat::Value,
    };

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
                FeatureStructure::with_type("NP"),
                vec![Symbol::terminal("Jan")],
            ),
            Rule::new(
                FeatureStructure::with_type("VP"),
                vec![
                    Symbol::terminal("called"),
                    Symbol::nt(FeatureStructure::with_type("NP")),
                ],
            ),
        ]
    }

    #[test]
    fn groups_by_lhs_type() {
        //setup
        let grammar = Grammar::build(toy_rules(), "S").unwrap();

        //exercise/verify
        assert_eq!(grammar.productions("S").len(), 1);
        assert_eq!(grammar.productions("NP").len(), 2);
        assert_eq!(grammar.productions("VP").len(), 1);
    }

    #[test]
    fn unknown_type_yields_no_productions() {
        //setup
        let grammar = Grammar::build(toy_rules(), "S").unwrap();

        //exercise/verify
        assert!(grammar.productions("PP").is_empty());
    }

    #[test]
    fn indexes_by_rhs_type() {
        //setup
        let grammar = Grammar::build(toy_rules(), "S").unwrap();

        //exercise
        let containing_np = grammar.productions_with_rhs_type("NP");

        //verify
        assert_eq!(containing_np.len(), 2);
        assert!(containing_np
            .iter()
            .any(|rule| rule.lhs().typ() == Some("S")));
        assert!(containing_np
            .iter()
            .any(|rule| rule.lhs().typ() == Some("VP")));
    }

    #[test]
    fn indexes_by_anchor_terminal() {
        //setup
        let grammar = Grammar::build(toy_rules(), "S").unwrap();

        //exercise/verify
        assert_eq!(grammar.productions_anchored_by("called").len(), 1);
        assert_eq!(grammar.productions_anchored_by("Mary").len(), 1);
        assert!(grammar.productions_anchored_by("ran").is_empty());
    }

    #[test]
    fn untyped_lhs_is_fatal() {
        //setup
        let rules = vec![Rule::new(
            FeatureStructure::new().attr("case", Value::atom("nom")),
            vec![Symbol::terminal("x")],
        )];

        //exercise
        let res = Grammar::build(rules, "S");

        //verify
        match res {
            Err(BuildError::UntypedLhs(ref rule)) => {
                assert!(rule.contains("case: nom"));
            }
            other => panic!("Unexpected build result: {:?}", other.err()),
        }
    }

    #[test]
    fn oversized_rhs_is_fatal() {
        //setup
        let widest: Vec<Symbol> = (0..64).map(|i| Symbol::terminal(&format!("t{}", i))).collect();
        let too_wide: Vec<Symbol> = (0..65).map(|i| Symbol::terminal(&format!("t{}", i))).collect();

        //exercise
        let ok = Grammar::build(
            vec![Rule::new(FeatureStructure::with_type("S"), widest)],
            "S",
        );
        let res = Grammar::build(
            vec![Rule::new(FeatureStructure::with_type("S"), too_wide)],
            "S",
        );

        //verify
        assert!(ok.is_ok());
        match res {
            Err(BuildError::OversizedRhs(ref rule)) => assert!(rule.contains("'t64'")),
            other => panic!("Unexpected build result: {:?}", other.err()),
        }
    }

    #[test]
    fn missing_start_is_fatal() {
        //setup
        let rules = toy_rules();

        //exercise
        let res = Grammar::build(rules, "TOP");

        //verify
        match res {
            Err(BuildError::UnknownStart(ref category)) => assert_eq!(category, "TOP"),
            other => panic!("Unexpected build result: {:?}", other.err()),
        }
    }
}
