use crate::builder::GrammarBuilder;
use crate::error::CompileErrorKind;
use crate::grammar::{Action, Grammar, Semantics};
use crate::syntax::{Alternative, Statement};

fn sum_builder() -> GrammarBuilder {
    GrammarBuilder::default()
        .rule_action("sum", &["sum", "'+'", "num"], "do_add")
        .rule("sum", &["num"])
        .lexeme("num", &["[0-9]+"])
        .lexeme("ws", &[r"[\s]+"])
        .discard("ws")
}

fn rules_of<'g>(grammar: &'g Grammar, name: &str) -> Vec<&'g crate::grammar::Rule> {
    let id = grammar.find_symbol(name).unwrap();
    grammar.g1().rules_for(id).iter().map(|r| grammar.g1().rule(*r)).collect()
}

#[test]
fn builder_matches_text() {
    let built = sum_builder().into_grammar().unwrap();
    let text = Grammar::compile(r"
        sum ::= sum '+' num action => do_add
        sum ::= num
        num ~ [0-9]+
        ws ~ [\s]+
        :discard ~ ws
    ", "sum").unwrap();
    assert_eq!(built.to_string(), text.to_string());
    assert_eq!(built.symbols().len(), text.symbols().len());
    let add = rules_of(&built, "sum");
    assert_eq!(add[0].semantics, Semantics::Apply(Some(Action::Named("do_add".to_string()))));
    assert_eq!(add[1].semantics, Semantics::Apply(None));
}

#[test]
fn builder_errors_have_no_location() {
    let err = GrammarBuilder::default().rule("s", &["t"]).into_grammar().unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::UndefinedSymbol);
    assert_eq!(err.location, None);
    assert_eq!(err.description, "grammar");
    assert_eq!(err.to_string(), "grammar: undefined symbol: Missing Symbol: t");

    let err = GrammarBuilder::default().describe("mine").lexeme("n", &["[0-9]"])
        .into_grammar().unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::NoStartRule);
    assert_eq!(err.description, "mine");
}

#[test]
fn explicit_start_and_latm() {
    let grammar = GrammarBuilder::default()
        .rule("a", &["'x'"])
        .rule("b", &["a", "a"])
        .start("b")
        .latm(true)
        .default_action("::array")
        .into_grammar()
        .unwrap();
    assert_eq!(grammar.name(grammar.start()), "b");
    assert!(grammar.latm());
    assert_eq!(grammar.default_action(), Some(&Action::Array));
}

#[test]
fn statements_pushed_in_a_loop() {
    let mut builder = GrammarBuilder::default();
    builder.push(Statement::Structural{
        lhs: "digits".to_string(),
        tiers: vec![vec![Alternative::new(&["digit+"])]],
        offset: 0,
    });
    for (i, d) in ["0", "1", "2"].iter().enumerate() {
        builder.push(Statement::Lexical{
            lhs: "digit".to_string(),
            alternatives: vec![Alternative::new(&[format!("'{}'", d)])],
            offset: i,
        });
    }
    let grammar = builder.into_grammar().unwrap();
    let digit = grammar.find_symbol("digit").unwrap();
    assert_eq!(grammar.l0().rules_for(digit).len(), 3);
}

#[test]
fn sequence_lowering() {
    let grammar = GrammarBuilder::default()
        .alternative("list", Alternative::new(&["item*"])
                     .adverb("separator", "','").adverb("keep", "1").adverb("action", "::array"))
        .alternative("plain", Alternative::new(&["item+"])
                     .adverb("separator", "';'").adverb("proper", "1"))
        .lexeme("item", &["[a-z]+"])
        .start("list")
        .into_grammar()
        .unwrap();

    // list ::= Seq | Seq ',' | (empty)
    let list = rules_of(&grammar, "list");
    assert_eq!(list.len(), 3);
    assert!(list.iter().all(|r| r.semantics == Semantics::Apply(Some(Action::Array))));
    assert_eq!(list[1].mask, vec![true, true]);
    assert!(list[2].rhs.is_empty());
    let seq = rules_of(&grammar, "list[Seq]");
    assert_eq!(seq.len(), 2);
    assert!(seq.iter().all(|r| r.is_splice() && r.name == "list"));
    assert_eq!(seq[1].mask, vec![true, true, true]);

    // plain ::= Seq, separators dropped
    let plain = rules_of(&grammar, "plain");
    assert_eq!(plain.len(), 1);
    let seq = rules_of(&grammar, "plain[Seq]");
    assert_eq!(seq[1].mask, vec![true, false, true]);
    assert!(!seq[1].keeps(1));
}

#[test]
fn precedence_lowering() {
    let grammar = GrammarBuilder::default()
        .prioritized("e", vec![
            vec![Alternative::new(&["n"])],
            vec![Alternative::new(&["e", "'^'", "e"]).adverb("assoc", "right").adverb("action", "pow")],
            vec![Alternative::new(&["'-'", "e"]).adverb("action", "neg")],
            vec![Alternative::new(&["e", "'-'", "e"]).adverb("action", "sub")],
        ])
        .lexeme("n", &["[0-9]+"])
        .into_grammar()
        .unwrap();
    let rules = grammar.to_string();
    for expected in ["e -> e[3]", "e[3] -> e[2]", "e[1] -> e[0]", "e[0] -> n",
                     "e[1] -> e[0] '^' e[1]", "e[2] -> '-' e[2]", "e[3] -> e[3] '-' e[2]"] {
        assert!(rules.lines().any(|l| l == expected), "missing {} in\n{}", expected, rules);
    }
    let chain = rules_of(&grammar, "e");
    assert!(chain[0].is_splice());
    assert!(rules_of(&grammar, "e[3]").iter().any(|r| r.name == "e" && !r.is_splice()));
}

#[test]
fn rank_adverb() {
    let grammar = GrammarBuilder::default()
        .alternative("s", Alternative::new(&["'x'"]).adverb("rank", "-3"))
        .into_grammar()
        .unwrap();
    assert_eq!(rules_of(&grammar, "s")[0].rank, -3);
}

#[test]
fn quantified_literal() {
    let grammar = GrammarBuilder::default()
        .rule("bangs", &["'!'+"])
        .into_grammar()
        .unwrap();
    assert!(grammar.find_symbol("bangs[Seq]").is_some(), "{}", grammar);
    assert!(grammar.find_symbol("'!'").map_or(false, |s| grammar.is_lexeme(s)));
}
