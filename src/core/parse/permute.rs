use {
    core::{
        feat::{unify, Bindings, FeatureStructure},
        parse::{
            chart::{AttrValue, ChartManager, Edge, EdgeHandle},
            earley::exhaust,
            grammar::{Grammar, Rule, Symbol},
            inference::RuleSet,
            Parser, Token,
        },
    },
    std::{collections::HashSet, rc::Rc},
    stopwatch::Stopwatch,
};

lazy_static! {
    /// Attributes that mark a constituent as belonging to one particular
    /// conjunct of a coordination. They are stripped from both sides of
    /// the compatibility check when borrowing across conjuncts, so lemma
    /// and agreement features still have to match.
    static ref CONJUNCT_FEATURES: HashSet<&'static str> = {
        let mut features = HashSet::new();
        features.insert("conj");
        features
    };
}

/// Chart construction for free word order: order-free rules match their
/// rhs as a multiset, optional symbols may be skipped, and a conjunct
/// whose chart gets stuck may borrow completed constituents from a
/// sibling conjunct's chart as zero-width spliced edges (gapping).
pub struct PermutationParser {
    rules: RuleSet,
}

impl PermutationParser {
    pub fn new() -> PermutationParser {
        PermutationParser {
            rules: RuleSet::permutation(),
        }
    }

    /// Parses one conjunct with a sibling conjunct's finished chart as the
    /// source of elided material. Splicing only begins once the ordinary
    /// fixed point fails to recognize the input, and repeats until the
    /// input is recognized or no stuck expectation can be satisfied.
    pub fn parse_with_sibling(
        &self,
        tokens: &[Token],
        grammar: &Grammar,
        sibling: &ChartManager,
    ) -> ChartManager {
        let sw = Stopwatch::start_new();

        let mut manager = ChartManager::new(tokens.to_vec(), grammar.start().clone());
        for edge in self.rules.seed_edges(grammar, manager.tokens()) {
            manager.insert(edge);
        }
        exhaust(&mut manager, grammar, &self.rules, true);

        let mut spliced: HashSet<(String, usize)> = HashSet::new();
        while !manager.is_recognized() {
            let borrowed = splice_candidates(&manager, sibling, &mut spliced);
            if borrowed.is_empty() {
                break;
            }

            debug!("Splicing {} borrowed edge(s)", borrowed.len());
            for edge in borrowed {
                manager.insert(edge);
            }
            exhaust(&mut manager, grammar, &self.rules, true);
        }

        debug!(
            "Conjunct chart construction took {}ms: recognized={}",
            sw.elapsed_ms(),
            manager.is_recognized()
        );

        manager
    }
}

impl Parser for PermutationParser {
    fn parse(&self, tokens: &[Token], grammar: &Grammar) -> ChartManager {
        let sw = Stopwatch::start_new();

        let mut manager = ChartManager::new(tokens.to_vec(), grammar.start().clone());
        for edge in self.rules.seed_edges(grammar, manager.tokens()) {
            manager.insert(edge);
        }
        exhaust(&mut manager, grammar, &self.rules, true);

        debug!(
            "Permutation chart construction of {} tokens took {}ms: recognized={}",
            tokens.len(),
            sw.elapsed_ms(),
            manager.is_recognized()
        );

        manager
    }
}

/// Zero-width edges for every stuck expectation the sibling can satisfy.
/// An expectation is stuck when no completed edge of a compatible
/// category starts where it is needed. Each (category, position) pair is
/// spliced at most once per parse, which bounds the splice loop.
fn splice_candidates(
    manager: &ChartManager,
    sibling: &ChartManager,
    spliced: &mut HashSet<(String, usize)>,
) -> Vec<Edge> {
    let mut proposed = Vec::new();

    for pos in 0..manager.positions() {
        let actives = manager
            .chart(pos)
            .select(&[("complete", AttrValue::Flag(false))])
            .unwrap();

        for idx in actives {
            let edge = manager.chart(pos).edge(idx);
            let rhs = edge.rhs_applied();

            for slot in edge.candidate_slots(true) {
                let expected = match rhs[slot] {
                    Symbol::Terminal(_) => continue,
                    Symbol::NonTerminal { ref fs, .. } => fs,
                };

                let expected_type = match expected.typ() {
                    Some(expected_type) => expected_type.to_string(),
                    None => continue,
                };

                let key = (expected_type, pos);
                if spliced.contains(&key) || locally_satisfiable(manager, pos, expected) {
                    continue;
                }

                if let Some((from, rule, lhs)) = best_borrowable(sibling, expected) {
                    spliced.insert(key);
                    proposed.push(Edge::borrowed(rule, pos, lhs, from));
                }
            }
        }
    }

    proposed
}

fn locally_satisfiable(manager: &ChartManager, at: usize, expected: &FeatureStructure) -> bool {
    for pos in at..manager.positions() {
        let completes = manager
            .chart(pos)
            .select(&[
                ("complete", AttrValue::Flag(true)),
                ("start", AttrValue::Pos(at)),
            ])
            .unwrap();

        for idx in completes {
            let complete = manager.chart(pos).edge(idx);
            if unify(expected, complete.lhs(), &Bindings::new(), true).is_some() {
                return true;
            }
        }
    }

    false
}

/// The sibling constituent to borrow for an expectation, if any:
/// conjunct-specific features are stripped from both sides before the
/// compatibility check, and ties are broken leftmost first, then by
/// shortest span, then by insertion order.
fn best_borrowable(
    sibling: &ChartManager,
    expected: &FeatureStructure,
) -> Option<(EdgeHandle, Rc<Rule>, FeatureStructure)> {
    let stripped_expected = expected.without(&CONJUNCT_FEATURES);
    let mut best: Option<(usize, usize, usize, usize)> = None;

    for pos in 0..sibling.positions() {
        let completes = sibling
            .chart(pos)
            .select(&[("complete", AttrValue::Flag(true))])
            .unwrap();

        for idx in completes {
            let edge = sibling.chart(pos).edge(idx);
            let stripped = edge.lhs().without(&CONJUNCT_FEATURES);
            if unify(&stripped_expected, &stripped, &Bindings::new(), true).is_none() {
                continue;
            }

            let key = (edge.start(), edge.end() - edge.start(), pos, idx);
            if best.map_or(true, |current| key < current) {
                best = Some(key);
            }
        }
    }

    best.map(|(_, _, pos, idx)| {
        let edge = sibling.chart(pos).edge(idx);
        (
            EdgeHandle::new(pos, idx),
            Rc::clone(edge.rule()),
            edge.lhs().without(&CONJUNCT_FEATURES),
        )
    })
}
