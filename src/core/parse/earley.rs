use {
    core::parse::{
        chart::{ChartManager, EdgeHandle},
        grammar::Grammar,
        inference::{Ctx, RuleSet},
        Parser, Token,
    },
    stopwatch::Stopwatch,
};

/// Agenda-driven chart construction: seeds per the strategy, then exhausts
/// the inference rules position by position until no rule can add an edge.
pub struct EarleyParser {
    rules: RuleSet,
}

impl EarleyParser {
    pub fn top_down() -> EarleyParser {
        EarleyParser {
            rules: RuleSet::top_down(),
        }
    }

    pub fn bottom_up() -> EarleyParser {
        EarleyParser {
            rules: RuleSet::bottom_up(),
        }
    }
}

impl Parser for EarleyParser {
    fn parse(&self, tokens: &[Token], grammar: &Grammar) -> ChartManager {
        let sw = Stopwatch::start_new();

        let mut manager = ChartManager::new(tokens.to_vec(), grammar.start().clone());
        for edge in self.rules.seed_edges(grammar, manager.tokens()) {
            manager.insert(edge);
        }

        exhaust(&mut manager, grammar, &self.rules, false);

        debug!(
            "Chart construction of {} tokens took {}ms: recognized={}",
            tokens.len(),
            sw.elapsed_ms(),
            manager.is_recognized()
        );

        manager
    }
}

/// Runs the inference rules to their fixed point. Every edge acts as a
/// trigger exactly once, tracked per position so the cursor can rewind
/// when a rule (such as left-corner prediction) introduces an edge behind
/// it. Re-invoking after external insertions is sound: triggers fire
/// again but their proposals deduplicate, and only combinations involving
/// the new edges survive.
pub fn exhaust(manager: &mut ChartManager, grammar: &Grammar, rules: &RuleSet, permute: bool) {
    let mut processed = vec![0usize; manager.positions()];
    let mut pos = 0;

    while pos < manager.positions() {
        if processed[pos] >= manager.chart(pos).len() {
            pos += 1;
            continue;
        }

        let trigger = EdgeHandle::new(pos, processed[pos]);
        processed[pos] += 1;

        let mut proposed = Vec::new();
        {
            let ctx = Ctx {
                grammar,
                manager: &*manager,
                permute,
            };

            for rule in rules.rules() {
                let edges = rule.apply(&ctx, trigger);
                if !edges.is_empty() {
                    trace!(
                        "{} proposed {} edge(s) from {}",
                        rule.name(),
                        edges.len(),
                        ctx.manager.edge(trigger)
                    );
                }
                proposed.extend(edges);
            }
        }

        for edge in proposed {
            let end = edge.end();
            if manager.insert(edge) && end < pos {
                pos = end;
            }
        }
    }
}
