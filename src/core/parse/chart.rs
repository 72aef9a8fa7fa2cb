use {
    core::{
        feat::{unify, Bindings, FeatureStructure},
        parse::{
            forest::Forest,
            grammar::{Rule, Symbol},
            Token,
        },
    },
    std::{
        cell::RefCell,
        collections::{BTreeMap, HashMap},
        error, fmt,
        rc::Rc,
    },
};

/// Stable handle of an edge: the position of the chart it ended in, plus
/// its insertion index there. Edges reference their children through
/// handles rather than direct references, so derivation graphs stay
/// acyclic from the borrow checker's point of view and the forest walker
/// can keep a cycle guard over plain integers.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone, Debug)]
pub struct EdgeHandle {
    pub pos: usize,
    pub idx: usize,
}

impl EdgeHandle {
    pub fn new(pos: usize, idx: usize) -> Self {
        EdgeHandle { pos, idx }
    }
}

/// A dotted rule instance with a recognition span and a binding
/// environment. The classical dot is generalized to a bitmask of matched
/// rhs positions so order-free rules can satisfy their right-hand side as
/// a multiset; ordered rules set bits strictly left to right, making the
/// mask equivalent to a cursor.
///
/// Edges are immutable once inserted; an inference rule that would advance
/// an edge constructs a new one instead.
#[derive(Clone, Debug)]
pub struct Edge {
    rule: Rc<Rule>,
    start: usize,
    end: usize,
    matched: u64,
    bindings: Bindings,
    children: BTreeMap<usize, EdgeHandle>,
    lhs_applied: FeatureStructure,
    borrowed_from: Option<EdgeHandle>,
}

impl Edge {
    pub fn predicted(rule: Rc<Rule>, at: usize, bindings: Bindings) -> Edge {
        let lhs_applied = rule.lhs().substitute(&bindings);
        Edge {
            rule,
            start: at,
            end: at,
            matched: 0,
            bindings,
            children: BTreeMap::new(),
            lhs_applied,
            borrowed_from: None,
        }
    }

    /// A zero-width completion spliced in from a sibling conjunct's chart.
    pub fn borrowed(
        rule: Rc<Rule>,
        at: usize,
        lhs_applied: FeatureStructure,
        from: EdgeHandle,
    ) -> Edge {
        let matched = full_mask(rule.rhs().len());
        Edge {
            rule,
            start: at,
            end: at,
            matched,
            bindings: Bindings::new(),
            children: BTreeMap::new(),
            lhs_applied,
            borrowed_from: Some(from),
        }
    }

    /// The edge obtained by satisfying rhs position `slot`, extending the
    /// span to `end`, under the merged environment. `child` records the
    /// completed edge that filled the slot; terminal matches and optional
    /// skips leave no backpointer.
    pub fn advanced(
        &self,
        slot: usize,
        end: usize,
        bindings: Bindings,
        child: Option<EdgeHandle>,
    ) -> Edge {
        let mut children = self.children.clone();
        if let Some(child) = child {
            children.insert(slot, child);
        }

        let lhs_applied = self.rule.lhs().substitute(&bindings);

        Edge {
            rule: Rc::clone(&self.rule),
            start: self.start,
            end,
            matched: self.matched | (1u64 << slot),
            bindings,
            children,
            lhs_applied,
            borrowed_from: self.borrowed_from,
        }
    }

    pub fn rule(&self) -> &Rc<Rule> {
        &self.rule
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn children(&self) -> &BTreeMap<usize, EdgeHandle> {
        &self.children
    }

    pub fn lhs(&self) -> &FeatureStructure {
        &self.lhs_applied
    }

    pub fn borrowed_from(&self) -> Option<EdgeHandle> {
        self.borrowed_from
    }

    pub fn is_complete(&self) -> bool {
        self.matched == full_mask(self.rule.rhs().len())
    }

    pub fn is_matched(&self, slot: usize) -> bool {
        self.matched & (1u64 << slot) != 0
    }

    /// Count of satisfied rhs positions; for ordered rules this is the dot.
    pub fn dot(&self) -> usize {
        self.matched.count_ones() as usize
    }

    /// The rhs positions an inference rule may try to satisfy next: the
    /// single dot position for ordered matching, every unmatched position
    /// for an order-free rule under permutation semantics.
    pub fn candidate_slots(&self, permute: bool) -> Vec<usize> {
        if self.is_complete() {
            return Vec::new();
        }

        if permute && self.rule.is_order_free() {
            (0..self.rule.rhs().len())
                .filter(|&slot| !self.is_matched(slot))
                .collect()
        } else {
            vec![self.dot()]
        }
    }

    /// The rhs with the edge's bindings applied to every nonterminal.
    pub fn rhs_applied(&self) -> Vec<Symbol> {
        self.rule
            .rhs()
            .iter()
            .map(|sym| match *sym {
                Symbol::Terminal(_) => sym.clone(),
                Symbol::NonTerminal { ref fs, optional } => Symbol::NonTerminal {
                    fs: fs.substitute(&self.bindings),
                    optional,
                },
            })
            .collect()
    }

    fn attribute(&self, name: &str) -> Result<AttrValue, Error> {
        match name {
            "start" => Ok(AttrValue::Pos(self.start)),
            "end" => Ok(AttrValue::Pos(self.end)),
            "complete" => Ok(AttrValue::Flag(self.is_complete())),
            "lhs_type" => Ok(AttrValue::Sym(
                self.lhs_applied.typ().unwrap_or("").to_string(),
            )),
            _ => Err(Error::InvalidAttribute(name.to_string())),
        }
    }
}

// Grammar::build caps rhs arity at 64, so neither shift can overflow.
fn full_mask(len: usize) -> u64 {
    if len == 0 {
        0
    } else {
        u64::max_value() >> (64 - len)
    }
}

fn valid_attribute(name: &str) -> bool {
    match name {
        "start" | "end" | "complete" | "lhs_type" => true,
        _ => false,
    }
}

impl PartialEq for Edge {
    /// Edge identity is the `(rule, span, matched)` skeleton, plus the
    /// bindings-applied lhs/rhs once complete. Bindings themselves are
    /// excluded from completed-edge identity so reapplying equal bindings
    /// cannot create semantically-duplicate edges; children are provenance,
    /// not identity.
    fn eq(&self, other: &Edge) -> bool {
        if self.rule != other.rule
            || self.start != other.start
            || self.end != other.end
            || self.matched != other.matched
            || self.borrowed_from != other.borrowed_from
        {
            return false;
        }

        if self.is_complete() {
            self.lhs_applied == other.lhs_applied && self.rhs_applied() == other.rhs_applied()
        } else {
            self.bindings == other.bindings
        }
    }
}

impl Eq for Edge {}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ->", self.lhs_applied)?;

        let ordered = !self.rule.is_order_free();
        for (i, sym) in self.rule.rhs().iter().enumerate() {
            if ordered && i == self.dot() && !self.is_complete() {
                write!(f, " .")?;
            }
            if !ordered && !self.is_matched(i) {
                write!(f, " ?{}", sym)?;
            } else {
                write!(f, " {}", sym)?;
            }
        }
        if ordered && self.is_complete() {
            write!(f, " .")?;
        }

        write!(f, " ({}..{})", self.start, self.end)?;
        if self.borrowed_from.is_some() {
            write!(f, " [spliced]")?;
        }
        Ok(())
    }
}

/// Values an edge attribute can take, for index keys and filters.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub enum AttrValue {
    Pos(usize),
    Flag(bool),
    Sym(String),
}

type Index = HashMap<Vec<AttrValue>, Vec<usize>>;

/// An append-only, deduplicated, insertion-ordered collection of edges for
/// one input position, with secondary indices keyed by attribute-name
/// tuples. Indices are built lazily on first query and kept in sync on
/// every insert, so iteration during rule firing always sees committed
/// state.
pub struct Chart {
    edges: Vec<Edge>,
    indices: RefCell<HashMap<Vec<String>, Index>>,
}

impl Chart {
    pub fn new() -> Chart {
        Chart {
            edges: Vec::new(),
            indices: RefCell::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge(&self, idx: usize) -> &Edge {
        &self.edges[idx]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges[..]
    }

    /// Set-semantics insert: `false` and no-op if an equal edge is already
    /// present, otherwise the edge is appended and every existing index is
    /// updated before the call returns.
    pub fn insert(&mut self, edge: Edge) -> bool {
        if self.edges.contains(&edge) {
            return false;
        }

        let idx = self.edges.len();
        for (names, index) in self.indices.borrow_mut().iter_mut() {
            let key: Vec<AttrValue> = names
                .iter()
                .map(|name| edge.attribute(name).unwrap())
                .collect();
            index.entry(key).or_insert_with(Vec::new).push(idx);
        }

        self.edges.push(edge);
        true
    }

    /// Restricted retrieval: the insertion indices of all edges matching
    /// every filter, in insertion order. With no filters, all edges. The
    /// index for the filter's attribute-name tuple is memoized on first
    /// use. Unknown attribute names are a contract violation and error out
    /// immediately rather than returning nothing.
    pub fn select(&self, filters: &[(&str, AttrValue)]) -> Result<Vec<usize>, Error> {
        if filters.is_empty() {
            return Ok((0..self.edges.len()).collect());
        }

        for &(name, _) in filters {
            if !valid_attribute(name) {
                return Err(Error::InvalidAttribute(name.to_string()));
            }
        }

        let mut filters: Vec<(&str, AttrValue)> = filters.to_vec();
        filters.sort_by(|a, b| a.0.cmp(b.0));

        let names: Vec<String> = filters.iter().map(|&(name, _)| name.to_string()).collect();
        let key: Vec<AttrValue> = filters.into_iter().map(|(_, value)| value).collect();

        let mut indices = self.indices.borrow_mut();
        if !indices.contains_key(&names) {
            let mut index: Index = HashMap::new();
            for (idx, edge) in self.edges.iter().enumerate() {
                let edge_key: Vec<AttrValue> = names
                    .iter()
                    .map(|name| edge.attribute(name).unwrap())
                    .collect();
                index.entry(edge_key).or_insert_with(Vec::new).push(idx);
            }
            indices.insert(names.clone(), index);
        }

        Ok(indices[&names].get(&key).cloned().unwrap_or_else(Vec::new))
    }
}

#[derive(Debug)]
pub enum Error {
    InvalidAttribute(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidAttribute(ref name) => {
                write!(f, "Edges expose no attribute named '{}'", name)
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

/// The ordered sequence of per-position charts for one parse call, plus
/// the token sequence and start category. Chart `p` holds the edges ending
/// at position `p`. Grows monotonically until the agenda empties; shared
/// read-only with the forest reconstructor afterwards.
pub struct ChartManager {
    charts: Vec<Chart>,
    tokens: Vec<Token>,
    start: FeatureStructure,
}

impl ChartManager {
    pub fn new(tokens: Vec<Token>, start: FeatureStructure) -> ChartManager {
        let charts = (0..=tokens.len()).map(|_| Chart::new()).collect();
        ChartManager {
            charts,
            tokens,
            start,
        }
    }

    pub fn positions(&self) -> usize {
        self.charts.len()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens[..]
    }

    pub fn start(&self) -> &FeatureStructure {
        &self.start
    }

    pub fn chart(&self, pos: usize) -> &Chart {
        &self.charts[pos]
    }

    pub fn edge(&self, handle: EdgeHandle) -> &Edge {
        self.charts[handle.pos].edge(handle.idx)
    }

    /// Inserts into the chart of the edge's end position.
    pub fn insert(&mut self, edge: Edge) -> bool {
        let pos = edge.end();
        self.charts[pos].insert(edge)
    }

    /// Zero-dot edges for the start category at position 0.
    pub fn initial_states(&self) -> Vec<EdgeHandle> {
        let start_type = self.start.typ().unwrap_or("");
        self.charts[0]
            .edges()
            .iter()
            .enumerate()
            .filter(|&(_, edge)| {
                edge.dot() == 0 && edge.start() == 0 && edge.lhs().typ() == Some(start_type)
            })
            .map(|(idx, _)| EdgeHandle::new(0, idx))
            .collect()
    }

    /// Complete edges spanning the whole input whose applied lhs unifies,
    /// variables renamed, with the start category.
    pub fn accepting_states(&self) -> Vec<EdgeHandle> {
        let last = self.charts.len() - 1;
        self.charts[last]
            .edges()
            .iter()
            .enumerate()
            .filter(|&(_, edge)| {
                edge.is_complete()
                    && edge.start() == 0
                    && unify(&self.start, edge.lhs(), &Bindings::new(), true).is_some()
            })
            .map(|(idx, _)| EdgeHandle::new(last, idx))
            .collect()
    }

    pub fn is_recognized(&self) -> bool {
        !self.accepting_states().is_empty()
    }

    /// Lazily enumerates the derivation trees licensed by this chart.
    /// Re-invoking produces a fresh enumeration over the same chart.
    pub fn trees(&self) -> Forest {
        Forest::over(self, None)
    }

    /// As `trees`, but borrowed (spliced) edges are expanded against the
    /// given sibling conjunct's chart.
    pub fn trees_with_sibling<'trees>(
        &'trees self,
        sibling: &'trees ChartManager,
    ) -> Forest<'trees> {
        Forest::over(self, Some(sibling))
    }
}
