use {
    core::{
        feat::{unify, Bindings},
        parse::{
            chart::{AttrValue, ChartManager, Edge, EdgeHandle},
            grammar::Symbol,
            Tree,
        },
    },
    std::collections::{HashMap, VecDeque},
};

/// Filling state of one rhs slot during enumeration.
#[derive(Clone)]
enum Filling {
    Pending,
    Skipped,
    Filled(Tree),
}

/// Lazy enumeration of the derivation trees licensed by a finished chart.
///
/// Trees are rebuilt by re-searching the chart for every rhs slot rather
/// than by walking recorded backpointers, so every derivation is reachable,
/// not just the one that happened to complete each edge first. One binding
/// environment is threaded through each edge's slot assignment, so sibling
/// slots sharing a variable can only be filled consistently. Expansions
/// are memoized per edge; a stack of in-flight edges cuts derivation
/// cycles through zero-width constituents.
pub struct Forest<'forest> {
    manager: &'forest ChartManager,
    sibling: Option<&'forest ChartManager>,
    roots: Vec<EdgeHandle>,
    next_root: usize,
    buffer: VecDeque<Tree>,
    emitted: Vec<Tree>,
    memo: HashMap<(bool, EdgeHandle), Vec<Tree>>,
}

impl<'forest> Forest<'forest> {
    pub fn over(
        manager: &'forest ChartManager,
        sibling: Option<&'forest ChartManager>,
    ) -> Forest<'forest> {
        Forest {
            manager,
            sibling,
            roots: manager.accepting_states(),
            next_root: 0,
            buffer: VecDeque::new(),
            emitted: Vec::new(),
            memo: HashMap::new(),
        }
    }

    fn side(&self, in_sibling: bool) -> &'forest ChartManager {
        if in_sibling {
            self.sibling.unwrap_or(self.manager)
        } else {
            self.manager
        }
    }

    /// All derivation trees rooted at the given complete edge. `cut` is
    /// raised when the recursion-stack guard fired at or beneath this
    /// edge; a result truncated by a cut is not memoized, so a later
    /// cycle-free context recomputes it in full.
    fn expansions(
        &mut self,
        in_sibling: bool,
        handle: EdgeHandle,
        stack: &mut Vec<(bool, EdgeHandle)>,
        cut: &mut bool,
    ) -> Vec<Tree> {
        let key = (in_sibling, handle);
        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }
        if stack.contains(&key) {
            *cut = true;
            return Vec::new();
        }
        stack.push(key);

        let manager = self.side(in_sibling);
        let edge = manager.edge(handle);

        let mut cut_below = false;
        let trees = if let Some(from) = edge.borrowed_from() {
            if in_sibling || self.sibling.is_none() {
                Vec::new()
            } else {
                self.expansions(true, from, stack, &mut cut_below)
                    .into_iter()
                    .map(Tree::mark_borrowed)
                    .collect()
            }
        } else {
            let mut filled = vec![Filling::Pending; edge.rule().rhs().len()];
            let mut assignments = Vec::new();
            self.fill_slots(
                in_sibling,
                edge,
                &mut filled,
                edge.start(),
                edge.bindings(),
                stack,
                &mut cut_below,
                &mut assignments,
            );

            assignments
                .into_iter()
                .map(|assignment| {
                    let children: Vec<Tree> = assignment
                        .into_iter()
                        .filter_map(|filling| match filling {
                            Filling::Filled(tree) => Some(tree),
                            _ => None,
                        })
                        .collect();
                    Tree::branch(edge.lhs().clone(), children)
                })
                .collect()
        };

        stack.pop();
        if cut_below {
            *cut = true;
        } else {
            self.memo.insert(key, trees.clone());
        }
        trees
    }

    /// Extends a partial slot assignment from input position `at`, under
    /// the bindings accumulated from already-filled slots; a candidate
    /// whose lhs fails to unify under that environment is discarded, so a
    /// variable shared between sibling slots keeps one value. Ordered
    /// rules fill the leftmost pending slot; order-free rules branch over
    /// every pending slot, and the emitted duplicates collapse because
    /// children always appear in slot order.
    fn fill_slots(
        &mut self,
        in_sibling: bool,
        edge: &Edge,
        filled: &mut Vec<Filling>,
        at: usize,
        env: &Bindings,
        stack: &mut Vec<(bool, EdgeHandle)>,
        cut: &mut bool,
        out: &mut Vec<Vec<Filling>>,
    ) {
        let pending: Vec<usize> = (0..filled.len())
            .filter(|&slot| match filled[slot] {
                Filling::Pending => true,
                _ => false,
            })
            .collect();

        if pending.is_empty() {
            if at == edge.end() {
                out.push(filled.clone());
            }
            return;
        }

        let candidates = if edge.rule().is_order_free() {
            pending
        } else {
            vec![pending[0]]
        };

        let manager = self.side(in_sibling);
        let rhs = edge.rhs_applied();

        for slot in candidates {
            match rhs[slot] {
                Symbol::Terminal(ref text) => {
                    if at < edge.end() && manager.tokens()[at].lexeme() == text {
                        filled[slot] = Filling::Filled(Tree::leaf(manager.tokens()[at].clone()));
                        self.fill_slots(in_sibling, edge, filled, at + 1, env, stack, cut, out);
                        filled[slot] = Filling::Pending;
                    }
                }
                Symbol::NonTerminal { ref fs, optional } => {
                    if optional {
                        filled[slot] = Filling::Skipped;
                        self.fill_slots(in_sibling, edge, filled, at, env, stack, cut, out);
                        filled[slot] = Filling::Pending;
                    }

                    for pos in at..=edge.end() {
                        let completes = manager
                            .chart(pos)
                            .select(&[
                                ("complete", AttrValue::Flag(true)),
                                ("start", AttrValue::Pos(at)),
                            ])
                            .unwrap();

                        for idx in completes {
                            let complete = manager.chart(pos).edge(idx);
                            let extended = match unify(fs, complete.lhs(), env, true) {
                                Some((_, extended)) => extended,
                                None => continue,
                            };

                            let subtrees =
                                self.expansions(in_sibling, EdgeHandle::new(pos, idx), stack, cut);
                            for subtree in subtrees {
                                filled[slot] = Filling::Filled(subtree);
                                self.fill_slots(
                                    in_sibling, edge, filled, pos, &extended, stack, cut, out,
                                );
                            }
                            filled[slot] = Filling::Pending;
                        }
                    }
                }
            }
        }
    }
}

impl<'forest> Iterator for Forest<'forest> {
    type Item = Tree;

    fn next(&mut self) -> Option<Tree> {
        loop {
            if let Some(tree) = self.buffer.pop_front() {
                if self.emitted.contains(&tree) {
                    continue;
                }
                self.emitted.push(tree.clone());
                return Some(tree);
            }

            if self.next_root >= self.roots.len() {
                return None;
            }

            let root = self.roots[self.next_root];
            self.next_root += 1;

            let mut cut = false;
            let trees = self.expansions(false, root, &mut Vec::new(), &mut cut);
            self.buffer.extend(trees);
        }
    }
}
