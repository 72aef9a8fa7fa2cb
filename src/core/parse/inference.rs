use {
    core::{
        feat::{unify, Bindings},
        parse::{
            chart::{AttrValue, ChartManager, Edge, EdgeHandle},
            grammar::{Grammar, Symbol},
            Token,
        },
    },
    std::rc::Rc,
};

/// Read-only view of the parse state an inference rule fires against.
pub struct Ctx<'ctx> {
    pub grammar: &'ctx Grammar,
    pub manager: &'ctx ChartManager,
    /// Order-free rules match their rhs as a multiset when set; otherwise
    /// every rule is matched left to right.
    pub permute: bool,
}

/// One deduction step of the chart algebra. A rule inspects the edge at
/// `trigger` together with the committed chart state and proposes new
/// edges; the driver owns insertion and deduplication, so rules stay free
/// of mutation and can be composed into arbitrary strategies.
pub trait InferenceRule {
    fn name(&self) -> &'static str;

    fn apply(&self, ctx: &Ctx, trigger: EdgeHandle) -> Vec<Edge>;
}

/// Top-down prediction: for each nonterminal an active edge expects next,
/// introduce zero-dot edges for every production of that type whose lhs is
/// unifiable with the expectation, carrying the ground subset of the
/// unified environment. Variable-to-variable links are not carried: they
/// would make alpha-variant predictions distinct edges and left-recursive
/// grammars non-terminating, and the fundamental rule re-establishes them
/// at completion time anyway.
pub struct UnifyingPredictor;

impl InferenceRule for UnifyingPredictor {
    fn name(&self) -> &'static str {
        "predict"
    }

    fn apply(&self, ctx: &Ctx, trigger: EdgeHandle) -> Vec<Edge> {
        let edge = ctx.manager.edge(trigger);
        if edge.is_complete() {
            return Vec::new();
        }

        let at = edge.end();
        let rhs = edge.rhs_applied();
        let mut proposed = Vec::new();

        for slot in edge.candidate_slots(ctx.permute) {
            let expected = match rhs[slot] {
                Symbol::Terminal(_) => continue,
                Symbol::NonTerminal { ref fs, .. } => fs,
            };

            let expected_type = match expected.typ() {
                Some(expected_type) => expected_type,
                None => continue,
            };

            for rule in ctx.grammar.productions(expected_type) {
                if let Some((_, env)) = unify(rule.lhs(), expected, &Bindings::new(), true) {
                    proposed.push(Edge::predicted(Rc::clone(rule), at, env.ground_subset()));
                }
            }
        }

        proposed
    }
}

/// Bottom-up (left-corner) prediction: a completed constituent of type `T`
/// introduces zero-dot edges, at its own start, for every production that
/// can begin with `T`.
pub struct BottomUpPredictor;

impl InferenceRule for BottomUpPredictor {
    fn name(&self) -> &'static str {
        "predict-lc"
    }

    fn apply(&self, ctx: &Ctx, trigger: EdgeHandle) -> Vec<Edge> {
        let edge = ctx.manager.edge(trigger);
        if !edge.is_complete() {
            return Vec::new();
        }

        let completed_type = match edge.lhs().typ() {
            Some(completed_type) => completed_type,
            None => return Vec::new(),
        };

        let mut proposed = Vec::new();
        for rule in ctx.grammar.productions_with_rhs_type(completed_type) {
            let corner = if ctx.permute && rule.is_order_free() {
                rule.rhs()
                    .iter()
                    .any(|sym| sym.typ() == Some(completed_type))
            } else {
                rule.rhs().first().map(|sym| sym.typ()) == Some(Some(completed_type))
            };

            if corner {
                proposed.push(Edge::predicted(Rc::clone(rule), edge.start(), Bindings::new()));
            }
        }

        proposed
    }
}

/// The fundamental rule: an active edge expecting a nonterminal meets a
/// completed edge of a unifiable category at its end position, yielding an
/// advanced copy of the active edge under the merged environment.
///
/// The rule fires from both sides. The complete trigger combines with the
/// (already frozen) active edges ending at its start; the active trigger
/// combines with completed edges already present at its own end, which is
/// how zero-width completions such as spliced edges are picked up.
pub struct FundamentalRule;

impl FundamentalRule {
    fn combine(
        ctx: &Ctx,
        active: &Edge,
        complete: &Edge,
        complete_handle: EdgeHandle,
    ) -> Vec<Edge> {
        let rhs = active.rhs_applied();
        let mut advanced = Vec::new();

        for slot in active.candidate_slots(ctx.permute) {
            let expected = match rhs[slot] {
                Symbol::Terminal(_) => continue,
                Symbol::NonTerminal { ref fs, .. } => fs,
            };

            if let Some((_, env)) = unify(expected, complete.lhs(), active.bindings(), true) {
                advanced.push(active.advanced(
                    slot,
                    complete.end(),
                    env,
                    Some(complete_handle),
                ));
            }
        }

        advanced
    }
}

impl InferenceRule for FundamentalRule {
    fn name(&self) -> &'static str {
        "fundamental"
    }

    fn apply(&self, ctx: &Ctx, trigger: EdgeHandle) -> Vec<Edge> {
        let edge = ctx.manager.edge(trigger);
        let mut proposed = Vec::new();

        if edge.is_complete() {
            let anchor = edge.start();
            let actives = ctx.manager
                .chart(anchor)
                .select(&[("complete", AttrValue::Flag(false))])
                .unwrap();

            for idx in actives {
                let active = ctx.manager.chart(anchor).edge(idx);
                proposed.extend(FundamentalRule::combine(ctx, active, edge, trigger));
            }
        } else {
            let at = edge.end();
            for pos in at..ctx.manager.positions() {
                let completes = ctx.manager
                    .chart(pos)
                    .select(&[
                        ("complete", AttrValue::Flag(true)),
                        ("start", AttrValue::Pos(at)),
                    ])
                    .unwrap();

                for idx in completes {
                    let complete = ctx.manager.chart(pos).edge(idx);
                    proposed.extend(FundamentalRule::combine(
                        ctx,
                        edge,
                        complete,
                        EdgeHandle::new(pos, idx),
                    ));
                }
            }
        }

        proposed
    }
}

/// Terminal matching: an active edge expecting the literal at its end
/// position consumes it and advances one position.
pub struct Scanner;

impl InferenceRule for Scanner {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn apply(&self, ctx: &Ctx, trigger: EdgeHandle) -> Vec<Edge> {
        let edge = ctx.manager.edge(trigger);
        if edge.is_complete() {
            return Vec::new();
        }

        let at = edge.end();
        let token = match ctx.manager.tokens().get(at) {
            Some(token) => token,
            None => return Vec::new(),
        };

        let mut proposed = Vec::new();
        for slot in edge.candidate_slots(ctx.permute) {
            if let Symbol::Terminal(ref text) = edge.rule().rhs()[slot] {
                if text == token.lexeme() {
                    proposed.push(edge.advanced(slot, at + 1, edge.bindings().clone(), None));
                }
            }
        }

        proposed
    }
}

/// Skips a rhs position annotated optional without consuming input or
/// touching the environment. The skipped slot keeps no child backpointer.
pub struct OptionalSkip;

impl InferenceRule for OptionalSkip {
    fn name(&self) -> &'static str {
        "skip-optional"
    }

    fn apply(&self, ctx: &Ctx, trigger: EdgeHandle) -> Vec<Edge> {
        let edge = ctx.manager.edge(trigger);
        if edge.is_complete() {
            return Vec::new();
        }

        let mut proposed = Vec::new();
        for slot in edge.candidate_slots(ctx.permute) {
            if let Symbol::NonTerminal { optional: true, .. } = edge.rule().rhs()[slot] {
                proposed.push(edge.advanced(slot, edge.end(), edge.bindings().clone(), None));
            }
        }

        proposed
    }
}

/// Where a strategy introduces its first edges.
pub enum Seed {
    /// Zero-dot edges for every start production at position 0.
    StartSymbol,
    /// Zero-dot edges wherever a production's anchor terminal occurs.
    LexicalAnchors,
}

/// A deduction strategy: a seeding policy plus the inference rules the
/// driver exhausts, in order, against every chart edge.
pub struct RuleSet {
    seed: Seed,
    rules: Vec<Box<dyn InferenceRule>>,
}

impl RuleSet {
    pub fn top_down() -> RuleSet {
        RuleSet {
            seed: Seed::StartSymbol,
            rules: vec![
                Box::new(FundamentalRule),
                Box::new(UnifyingPredictor),
                Box::new(Scanner),
            ],
        }
    }

    pub fn bottom_up() -> RuleSet {
        RuleSet {
            seed: Seed::LexicalAnchors,
            rules: vec![
                Box::new(FundamentalRule),
                Box::new(BottomUpPredictor),
                Box::new(Scanner),
            ],
        }
    }

    /// Top-down strategy extended with optional-symbol skipping, used by
    /// the free-word-order parser.
    pub fn permutation() -> RuleSet {
        RuleSet {
            seed: Seed::StartSymbol,
            rules: vec![
                Box::new(FundamentalRule),
                Box::new(UnifyingPredictor),
                Box::new(Scanner),
                Box::new(OptionalSkip),
            ],
        }
    }

    pub fn rules(&self) -> &[Box<dyn InferenceRule>] {
        &self.rules[..]
    }

    pub fn seed_edges(&self, grammar: &Grammar, tokens: &[Token]) -> Vec<Edge> {
        match self.seed {
            Seed::StartSymbol => {
                let start_type = grammar.start().typ().unwrap_or("");
                grammar
                    .productions(start_type)
                    .iter()
                    .map(|rule| Edge::predicted(Rc::clone(rule), 0, Bindings::new()))
                    .collect()
            }
            Seed::LexicalAnchors => {
                let mut seeded = Vec::new();
                for (pos, token) in tokens.iter().enumerate() {
                    for rule in grammar.productions_anchored_by(token.lexeme()) {
                        seeded.push(Edge::predicted(Rc::clone(rule), pos, Bindings::new()));
                    }
                }
                seeded
            }
        }
    }
}
