use {
    core::feat::FeatureStructure,
    std::fmt,
};

pub mod chart;
pub mod forest;
pub mod grammar;
pub mod inference;

mod earley;
mod permute;

pub use self::earley::EarleyParser;
pub use self::permute::PermutationParser;

/// A pluggable chart-construction strategy. Construction never fails: an
/// unparseable input simply yields a chart with no accepting states.
pub trait Parser {
    fn parse(&self, tokens: &[Token], grammar: &grammar::Grammar) -> chart::ChartManager;
}

/// The default strategy: top-down prediction with unification filtering.
pub fn def_parser() -> Box<dyn Parser> {
    Box::new(EarleyParser::top_down())
}

pub fn bottom_up_parser() -> Box<dyn Parser> {
    Box::new(EarleyParser::bottom_up())
}

/// One unit of pre-tokenized input, produced by an external tokenizer.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct Token {
    lexeme: String,
}

impl Token {
    pub fn new(lexeme: &str) -> Token {
        Token {
            lexeme: lexeme.to_string(),
        }
    }

    pub fn sequence(lexemes: &[&str]) -> Vec<Token> {
        lexemes.iter().map(|lexeme| Token::new(lexeme)).collect()
    }

    pub fn lexeme(&self) -> &str {
        &self.lexeme[..]
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}'", self.lexeme)
    }
}

/// A derivation tree: typed interior nodes carrying bindings-applied
/// feature structures, token leaves, and a `borrowed` marking on material
/// spliced in from a sibling conjunct. Borrowed material is zero-width and
/// is excluded from the consumed-leaf yield.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Tree {
    Leaf {
        token: Token,
        borrowed: bool,
    },
    Branch {
        lhs: FeatureStructure,
        children: Vec<Tree>,
        borrowed: bool,
    },
}

impl Tree {
    pub fn leaf(token: Token) -> Tree {
        Tree::Leaf {
            token,
            borrowed: false,
        }
    }

    pub fn branch(lhs: FeatureStructure, children: Vec<Tree>) -> Tree {
        Tree::Branch {
            lhs,
            children,
            borrowed: false,
        }
    }

    pub fn mark_borrowed(self) -> Tree {
        match self {
            Tree::Leaf { token, .. } => Tree::Leaf {
                token,
                borrowed: true,
            },
            Tree::Branch { lhs, children, .. } => Tree::Branch {
                lhs,
                children,
                borrowed: true,
            },
        }
    }

    pub fn is_borrowed(&self) -> bool {
        match *self {
            Tree::Leaf { borrowed, .. } => borrowed,
            Tree::Branch { borrowed, .. } => borrowed,
        }
    }

    pub fn lhs(&self) -> Option<&FeatureStructure> {
        match *self {
            Tree::Leaf { .. } => None,
            Tree::Branch { ref lhs, .. } => Some(lhs),
        }
    }

    pub fn children(&self) -> &[Tree] {
        match *self {
            Tree::Leaf { .. } => &[],
            Tree::Branch { ref children, .. } => &children[..],
        }
    }

    /// Every leaf token, borrowed material included, left to right.
    pub fn leaves(&self) -> Vec<&Token> {
        let mut acc = Vec::new();
        self.collect_leaves(false, &mut acc);
        acc
    }

    /// The leaf tokens actually consumed from this conjunct's input, with
    /// borrowed subtrees skipped.
    pub fn consumed_leaves(&self) -> Vec<&Token> {
        let mut acc = Vec::new();
        self.collect_leaves(true, &mut acc);
        acc
    }

    fn collect_leaves<'leaves>(
        &'leaves self,
        skip_borrowed: bool,
        acc: &mut Vec<&'leaves Token>,
    ) {
        if skip_borrowed && self.is_borrowed() {
            return;
        }

        match *self {
            Tree::Leaf { ref token, .. } => acc.push(token),
            Tree::Branch { ref children, .. } => {
                for child in children {
                    child.collect_leaves(skip_borrowed, acc);
                }
            }
        }
    }

    fn fmt_internal(&self, f: &mut fmt::Formatter, prefix: &str, is_tail: bool) -> fmt::Result {
        let connector = if is_tail { "└── " } else { "├── " };
        let borrowed_tag = if self.is_borrowed() { " [spliced]" } else { "" };

        match *self {
            Tree::Leaf { ref token, .. } => {
                writeln!(f, "{}{}{}{}", prefix, connector, token, borrowed_tag)?;
            }
            Tree::Branch {
                ref lhs,
                ref children,
                ..
            } => {
                writeln!(f, "{}{}{}{}", prefix, connector, lhs, borrowed_tag)?;
                let child_prefix = format!("{}{}", prefix, if is_tail { "    " } else { "│   " });
                let last = children.len().saturating_sub(1);
                for (i, child) in children.iter().enumerate() {
                    child.fmt_internal(f, &child_prefix, i == last)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_internal(f, "", true)
    }
}
