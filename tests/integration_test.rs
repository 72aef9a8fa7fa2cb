extern crate unichart;

use unichart::{
    FeatureStructure, Grammar, ParseRunner, Parser, PermutationParser, Rule, Strategy, Symbol,
    Token, Tree, Value,
};

fn case_rules(order_free: bool) -> Vec<Rule> {
    let s_rhs = vec![
        Symbol::nt(FeatureStructure::with_type("NP").attr("case", Value::atom("nom"))),
        Symbol::nt(FeatureStructure::with_type("V")),
        Symbol::nt(FeatureStructure::with_type("NP").attr("case", Value::atom("acc"))),
    ];
    let s = if order_free {
        Rule::order_free(FeatureStructure::with_type("S"), s_rhs)
    } else {
        Rule::new(FeatureStructure::with_type("S"), s_rhs)
    };

    vec![
        s,
        Rule::new(
            FeatureStructure::with_type("NP").attr("case", Value::atom("nom")),
            vec![Symbol::terminal("Jan")],
        ),
        Rule::new(
            FeatureStructure::with_type("NP").attr("case", Value::atom("acc")),
            vec![Symbol::terminal("Marie")],
        ),
        Rule::new(
            FeatureStructure::with_type("V"),
            vec![Symbol::terminal("sieht")],
        ),
    ]
}

#[test]
fn fixed_order_sentence_end_to_end() {
    //setup
    let runner = ParseRunner::build(case_rules(false), "S", Strategy::TopDown).unwrap();

    //exercise
    let manager = runner.parse(&Token::sequence(&["Jan", "sieht", "Marie"]));

    //verify
    assert!(manager.is_recognized());

    let trees: Vec<Tree> = manager.trees().collect();
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0].lhs().and_then(|lhs| lhs.typ()), Some("S"));

    let leaves: Vec<&str> = trees[0].leaves().iter().map(|t| t.lexeme()).collect();
    assert_eq!(leaves, vec!["Jan", "sieht", "Marie"]);
}

#[test]
fn ordered_grammar_rejects_permutations() {
    //setup
    let runner = ParseRunner::build(case_rules(false), "S", Strategy::TopDown).unwrap();

    //exercise/verify
    assert!(!runner.recognize(&Token::sequence(&["sieht", "Jan", "Marie"])));
    assert!(!runner.recognize(&Token::sequence(&["Marie", "sieht", "Jan"])));
}

#[test]
fn bottom_up_strategy_agrees_with_top_down() {
    //setup
    let top_down = ParseRunner::build(case_rules(false), "S", Strategy::TopDown).unwrap();
    let bottom_up = ParseRunner::build(case_rules(false), "S", Strategy::BottomUp).unwrap();

    let good = Token::sequence(&["Jan", "sieht", "Marie"]);
    let bad = Token::sequence(&["Jan", "Marie", "sieht"]);

    //exercise/verify
    assert_eq!(top_down.recognize(&good), bottom_up.recognize(&good));
    assert_eq!(top_down.recognize(&bad), bottom_up.recognize(&bad));
    assert!(bottom_up.recognize(&good));
}

#[test]
fn order_free_grammar_accepts_permutations() {
    //setup
    let runner = ParseRunner::build(case_rules(true), "S", Strategy::Permutation).unwrap();

    //exercise/verify
    assert!(runner.recognize(&Token::sequence(&["Jan", "sieht", "Marie"])));
    assert!(runner.recognize(&Token::sequence(&["Marie", "Jan", "sieht"])));
    assert!(runner.recognize(&Token::sequence(&["sieht", "Marie", "Jan"])));
}

#[test]
fn order_free_grammar_still_checks_case() {
    //setup: 'Jan' is only nominative, so it cannot fill the object slot
    let runner = ParseRunner::build(case_rules(true), "S", Strategy::Permutation).unwrap();

    //exercise/verify
    assert!(!runner.recognize(&Token::sequence(&["Jan", "sieht", "Jan"])));
    assert!(!runner.recognize(&Token::sequence(&["Jan", "sieht"])));
}

#[test]
fn shared_variable_enforces_agreement() {
    //setup: subject and verb share their number through ?n
    let rules = vec![
        Rule::new(
            FeatureStructure::with_type("S"),
            vec![
                Symbol::nt(FeatureStructure::with_type("NP").attr("num", Value::var("?n"))),
                Symbol::nt(FeatureStructure::with_type("VP").attr("num", Value::var("?n"))),
            ],
        ),
        Rule::new(
            FeatureStructure::with_type("NP").attr("num", Value::atom("sg")),
            vec![Symbol::terminal("Mary")],
        ),
        Rule::new(
            FeatureStructure::with_type("NP").attr("num", Value::atom("pl")),
            vec![Symbol::terminal("they")],
        ),
        Rule::new(
            FeatureStructure::with_type("VP").attr("num", Value::atom("sg")),
            vec![Symbol::terminal("runs")],
        ),
        Rule::new(
            FeatureStructure::with_type("VP").attr("num", Value::atom("pl")),
            vec![Symbol::terminal("run")],
        ),
    ];
    let runner = ParseRunner::build(rules, "S", Strategy::TopDown).unwrap();

    //exercise/verify
    assert!(runner.recognize(&Token::sequence(&["Mary", "runs"])));
    assert!(runner.recognize(&Token::sequence(&["they", "run"])));
    assert!(!runner.recognize(&Token::sequence(&["Mary", "run"])));
    assert!(!runner.recognize(&Token::sequence(&["they", "runs"])));
}

#[test]
fn reconstruction_respects_shared_variables() {
    //setup: A and B agree on n through ?x; both categories carry a
    //concrete and a variable-valued lexical entry, so an inconsistent
    //reconstruction would have material to pair up
    let rules = vec![
        Rule::new(
            FeatureStructure::with_type("S"),
            vec![
                Symbol::nt(FeatureStructure::with_type("A").attr("n", Value::var("?x"))),
                Symbol::nt(FeatureStructure::with_type("B").attr("n", Value::var("?x"))),
            ],
        ),
        Rule::new(
            FeatureStructure::with_type("A").attr("n", Value::atom("sg")),
            vec![Symbol::terminal("a")],
        ),
        Rule::new(
            FeatureStructure::with_type("A").attr("n", Value::var("?p")),
            vec![Symbol::terminal("a")],
        ),
        Rule::new(
            FeatureStructure::with_type("B").attr("n", Value::atom("pl")),
            vec![Symbol::terminal("b")],
        ),
        Rule::new(
            FeatureStructure::with_type("B").attr("n", Value::var("?q")),
            vec![Symbol::terminal("b")],
        ),
    ];
    let runner = ParseRunner::build(rules, "S", Strategy::TopDown).unwrap();

    //exercise
    let manager = runner.parse(&Token::sequence(&["a", "b"]));
    let trees: Vec<Tree> = manager.trees().collect();

    //verify: every emitted tree grounds the shared variable consistently
    assert!(manager.is_recognized());
    assert!(!trees.is_empty());
    for tree in &trees {
        let a_n = tree.children()[0].lhs().and_then(|lhs| lhs.get("n"));
        let b_n = tree.children()[1].lhs().and_then(|lhs| lhs.get("n"));
        if let (Some(&Value::Atom(ref a_n)), Some(&Value::Atom(ref b_n))) = (a_n, b_n) {
            assert_eq!(a_n, b_n);
        }
    }
}

#[test]
fn disjunctive_case_entry_covers_both_slots() {
    //setup: 'Kinder' is ambiguous between nominative and accusative
    let mut rules = case_rules(false);
    rules.push(Rule::new(
        FeatureStructure::with_type("NP").attr(
            "case",
            Value::Disj(vec![Value::atom("nom"), Value::atom("acc")]),
        ),
        vec![Symbol::terminal("Kinder")],
    ));
    let runner = ParseRunner::build(rules, "S", Strategy::TopDown).unwrap();

    //exercise/verify
    assert!(runner.recognize(&Token::sequence(&["Kinder", "sieht", "Marie"])));
    assert!(runner.recognize(&Token::sequence(&["Jan", "sieht", "Kinder"])));
}

#[test]
fn gapped_conjunct_borrows_verb_end_to_end() {
    //setup: "Peter isst und Maria ..." with the second conjunct's verb
    //elided
    let grammar = Grammar::build(
        vec![
            Rule::order_free(
                FeatureStructure::with_type("S"),
                vec![
                    Symbol::nt(FeatureStructure::with_type("NP")),
                    Symbol::nt(
                        FeatureStructure::with_type("V").attr("lemma", Value::atom("essen")),
                    ),
                ],
            ),
            Rule::new(
                FeatureStructure::with_type("NP"),
                vec![Symbol::terminal("Peter")],
            ),
            Rule::new(
                FeatureStructure::with_type("NP"),
                vec![Symbol::terminal("Maria")],
            ),
            Rule::new(
                FeatureStructure::with_type("V")
                    .attr("lemma", Value::atom("essen"))
                    .attr("conj", Value::atom("first")),
                vec![Symbol::terminal("isst")],
            ),
        ],
        "S",
    )
    .unwrap();

    let parser = PermutationParser::new();
    let first = parser.parse(&Token::sequence(&["Peter", "isst"]), &grammar);
    assert!(first.is_recognized());

    let gapped = Token::sequence(&["Maria"]);
    assert!(!parser.parse(&gapped, &grammar).is_recognized());

    //exercise
    let second = parser.parse_with_sibling(&gapped, &grammar, &first);

    //verify
    assert!(second.is_recognized());

    let trees: Vec<Tree> = second.trees_with_sibling(&first).collect();
    assert_eq!(trees.len(), 1);

    let all: Vec<&str> = trees[0].leaves().iter().map(|t| t.lexeme()).collect();
    let consumed: Vec<&str> = trees[0]
        .consumed_leaves()
        .iter()
        .map(|t| t.lexeme())
        .collect();
    assert_eq!(all, vec!["Maria", "isst"]);
    assert_eq!(consumed, vec!["Maria"]);
    assert!(trees[0].children()[1].is_borrowed());
}
