use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

mod unify;

pub use self::unify::unify;

/// Attribute under which every chart-lhs carries its nonterminal category.
/// It is compared before any structural unification is attempted.
pub static TYPE_ATTR: &'static str = "type";

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Value {
    Atom(String),
    Var(String),
    Structure(FeatureStructure),
    Disj(Vec<Value>),
    Conj(Vec<Value>),
}

impl Value {
    pub fn atom(text: &str) -> Value {
        Value::Atom(text.to_string())
    }

    pub fn var(name: &str) -> Value {
        Value::Var(name.to_string())
    }

    /// True iff the value contains no variables at any depth.
    pub fn is_ground(&self) -> bool {
        match self {
            Value::Atom(_) => true,
            Value::Var(_) => false,
            Value::Structure(ref fs) => fs.attrs.values().all(|value| value.is_ground()),
            Value::Disj(ref alts) => alts.iter().all(|alt| alt.is_ground()),
            Value::Conj(ref parts) => parts.iter().all(|part| part.is_ground()),
        }
    }

    fn substitute(&self, env: &Bindings) -> Value {
        match self {
            Value::Atom(_) => self.clone(),
            Value::Var(_) => env.resolve(self),
            Value::Structure(ref fs) => Value::Structure(fs.substitute(env)),
            Value::Disj(ref alts) => {
                Value::Disj(alts.iter().map(|alt| alt.substitute(env)).collect())
            }
            Value::Conj(ref parts) => {
                Value::Conj(parts.iter().map(|part| part.substitute(env)).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Atom(ref text) => write!(f, "{}", text),
            Value::Var(ref name) => write!(f, "{}", name),
            Value::Structure(ref fs) => write!(f, "{}", fs),
            Value::Disj(ref alts) => {
                let rendered: Vec<String> = alts.iter().map(|alt| alt.to_string()).collect();
                write!(f, "({})", rendered.join(" | "))
            }
            Value::Conj(ref parts) => {
                let rendered: Vec<String> = parts.iter().map(|part| part.to_string()).collect();
                write!(f, "({})", rendered.join(" & "))
            }
        }
    }
}

/// A typed attribute-value map. Attribute order is fixed by the map so edge
/// identity and rendering are deterministic.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct FeatureStructure {
    attrs: BTreeMap<String, Value>,
}

impl FeatureStructure {
    pub fn new() -> Self {
        FeatureStructure {
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_type(category: &str) -> Self {
        FeatureStructure::new().attr(TYPE_ATTR, Value::atom(category))
    }

    pub fn attr(mut self, key: &str, value: Value) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn typ(&self) -> Option<&str> {
        match self.attrs.get(TYPE_ATTR) {
            Some(&Value::Atom(ref category)) => Some(&category[..]),
            _ => None,
        }
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attrs
    }

    pub fn substitute(&self, env: &Bindings) -> FeatureStructure {
        FeatureStructure {
            attrs: self
                .attrs
                .iter()
                .map(|(key, value)| (key.clone(), value.substitute(env)))
                .collect(),
        }
    }

    pub fn without(&self, keys: &HashSet<&str>) -> FeatureStructure {
        FeatureStructure {
            attrs: self
                .attrs
                .iter()
                .filter(|&(key, _)| !keys.contains(&key[..]))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

impl fmt::Display for FeatureStructure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.typ() {
            Some(category) => write!(f, "{}", category)?,
            None => write!(f, "_")?,
        }

        let rest: Vec<String> = self
            .attrs
            .iter()
            .filter(|&(key, _)| key != TYPE_ATTR)
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect();

        if !rest.is_empty() {
            write!(f, "[{}]", rest.join(", "))?;
        }

        Ok(())
    }
}

/// A partial variable environment. Extension never overwrites an existing
/// binding; failed unifications leave the caller's environment untouched
/// because `unify` works on a private clone.
#[derive(Clone, Debug)]
pub struct Bindings {
    map: HashMap<String, Value>,
    rename_seq: usize,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings {
            map: HashMap::new(),
            rename_seq: 0,
        }
    }

    pub fn get(&self, var: &str) -> Option<&Value> {
        self.map.get(var)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn bind(&mut self, var: &str, value: Value) {
        self.map.insert(var.to_string(), value);
    }

    pub fn fresh_suffix(&mut self) -> usize {
        self.rename_seq += 1;
        self.rename_seq
    }

    /// Chases a top-level variable chain to its terminal value, or to the
    /// last unbound variable in the chain.
    pub fn walk(&self, value: &Value) -> Value {
        let mut current = value.clone();
        let mut seen: HashSet<String> = HashSet::new();

        while let Value::Var(name) = current {
            if seen.contains(&name) {
                return Value::Var(name);
            }

            match self.map.get(&name) {
                Some(bound) => {
                    seen.insert(name);
                    current = bound.clone();
                }
                None => return Value::Var(name),
            }
        }

        current
    }

    /// The sub-environment binding variables to fully ground values.
    /// Variable-to-variable links are discarded, so the result is drawn
    /// from the finite set of ground grammar subterms. The rename counter
    /// is carried over: the subset can hold bindings for suffixed
    /// variables, so suffixes already issued must never be reissued.
    pub fn ground_subset(&self) -> Bindings {
        let mut subset = Bindings::new();
        subset.rename_seq = self.rename_seq;
        for (var, value) in &self.map {
            let resolved = self.resolve(value);
            if resolved.is_ground() {
                subset.bind(var, resolved);
            }
        }
        subset
    }

    /// Fully substitutes every resolvable variable inside `value`.
    pub fn resolve(&self, value: &Value) -> Value {
        match self.walk(value) {
            Value::Structure(fs) => Value::Structure(fs.substitute(self)),
            Value::Disj(alts) => {
                Value::Disj(alts.iter().map(|alt| alt.substitute(self)).collect())
            }
            Value::Conj(parts) => {
                Value::Conj(parts.iter().map(|part| part.substitute(self)).collect())
            }
            terminal => terminal,
        }
    }
}

impl PartialEq for Bindings {
    fn eq(&self, other: &Bindings) -> bool {
        self.map == other.map
    }
}

impl Eq for Bindings {}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut entries: Vec<String> = self
            .map
            .iter()
            .map(|(var, value)| format!("{} = {}", var, value))
            .collect();
        entries.sort();
        write!(f, "{{{}}}", entries.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_accessor() {
        //setup
        let fs = FeatureStructure::with_type("NP").attr("case", Value::atom("nom"));

        //exercise/verify
        assert_eq!(fs.typ(), Some("NP"));
        assert_eq!(fs.get("case"), Some(&Value::atom("nom")));
        assert_eq!(fs.get("missing"), None);
    }

    #[test]
    fn walk_chases_variable_chains() {
        //setup
        let mut env = Bindings::new();
        env.bind("?x", Value::var("?y"));
        env.bind("?y", Value::atom("sg"));

        //exercise
        let walked = env.walk(&Value::var("?x"));

        //verify
        assert_eq!(walked, Value::atom("sg"));
    }

    #[test]
    fn walk_stops_at_unbound() {
        //setup
        let mut env = Bindings::new();
        env.bind("?x", Value::var("?y"));

        //exercise
        let walked = env.walk(&Value::var("?x"));

        //verify
        assert_eq!(walked, Value::var("?y"));
    }

    #[test]
    fn ground_subset_drops_variable_links() {
        //setup
        let mut env = Bindings::new();
        env.bind("?n", Value::atom("sg"));
        env.bind("?a", Value::var("?b"));
        env.bind("?c", Value::var("?n"));

        //exercise
        let ground = env.ground_subset();

        //verify: ?a stays unresolved, ?c resolves through ?n
        assert_eq!(ground.get("?n"), Some(&Value::atom("sg")));
        assert_eq!(ground.get("?c"), Some(&Value::atom("sg")));
        assert_eq!(ground.get("?a"), None);
    }

    #[test]
    fn ground_subset_keeps_rename_counter() {
        //setup
        let mut env = Bindings::new();
        let used = env.fresh_suffix();
        env.bind(&format!("?a~{}", used), Value::atom("sg"));

        //exercise
        let mut ground = env.ground_subset();

        //verify: the subset still knows which suffixes are taken
        assert_eq!(ground.get("?a~1"), Some(&Value::atom("sg")));
        assert_eq!(ground.fresh_suffix(), used + 1);
    }

    #[test]
    fn substitute_resolves_nested_values() {
        //setup
        let mut env = Bindings::new();
        env.bind("?n", Value::atom("pl"));

        let fs = FeatureStructure::with_type("NP").attr(
            "agr",
            Value::Structure(FeatureStructure::new().attr("num", Value::var("?n"))),
        );

        //exercise
        let grounded = fs.substitute(&env);

        //verify
        match grounded.get("agr") {
            Some(&Value::Structure(ref agr)) => {
                assert_eq!(agr.get("num"), Some(&Value::atom("pl")));
            }
            other => panic!("Unexpected agr value: {:?}", other),
        }
    }

    #[test]
    fn without_discards_listed_attributes() {
        //setup
        let fs = FeatureStructure::with_type("V")
            .attr("lemma", Value::atom("essen"))
            .attr("conj", Value::atom("second"));

        let mut discard = HashSet::new();
        discard.insert("conj");

        //exercise
        let stripped = fs.without(&discard);

        //verify
        assert_eq!(stripped.get("conj"), None);
        assert_eq!(stripped.get("lemma"), Some(&Value::atom("essen")));
        assert_eq!(stripped.typ(), Some("V"));
    }

    #[test]
    fn display_renders_type_first() {
        //setup
        let fs = FeatureStructure::with_type("NP")
            .attr("case", Value::atom("nom"))
            .attr("num", Value::var("?n"));

        //exercise/verify
        assert_eq!(format!("{}", fs), "NP[case: nom, num: ?n]");
    }
}
