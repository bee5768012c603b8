use crate::actions::RuleContext;
use crate::error::{Error, Location, ParseError};
use crate::grammar::Grammar;
use crate::parser::EarleyParser;
use crate::trace::{TerminalEvent, Tracer};
use std::cell::RefCell;
use std::fmt;

fn sum_grammar() -> Grammar {
    Grammar::compile(r"
        sum ::= num '+' num action => do_add
        num ~ [0-9]+
        :discard ~ ws
        ws ~ [\s]+
    ", "sum").unwrap()
}

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<String>>,
}

impl Tracer for Recorder {
    fn terminal(&self, event: &TerminalEvent) {
        self.events.borrow_mut().push(event.to_string());
    }

    fn value(&self, ctx: &RuleContext, value: &dyn fmt::Debug) {
        self.events.borrow_mut().push(format!("{} => {:?}", ctx.name, value));
    }
}

///////////////////////////////////////////////////////////////////////////////

#[test]
fn recognize_sum() {
    let grammar = sum_grammar();
    let trees = EarleyParser::new(&grammar, None).recognize("3 + 4").unwrap();
    assert_eq!(trees.roots().len(), 1);
    let root = trees.item(trees.roots()[0]);
    assert_eq!(root.origin, 0);
    assert_eq!(trees.roots()[0].set, 5);
    assert_eq!(trees.input(), "3 + 4");
}

#[test]
fn surrounding_whitespace_is_discarded() {
    let grammar = sum_grammar();
    let parser = EarleyParser::new(&grammar, None);
    for input in ["3+4", "  3 +\t4", "3\n+\n4\n\n", " 3 + 4 "] {
        assert!(parser.recognize(input).is_ok(), "input {:?}", input);
    }
    let trees = parser.recognize("  3 + 4").unwrap();
    assert_eq!(trees.skip(0), 2);
}

#[test]
fn incomplete_input() {
    let grammar = sum_grammar();
    let parser = EarleyParser::new(&grammar, None);
    for input in ["3 + ", "3", "", "   "] {
        match parser.recognize(input) {
            Err(Error::Parse(ParseError::IncompleteParse)) => (),
            other => panic!("input {:?} gave {:?}", input, other),
        }
    }
}

#[test]
fn unexpected_lexeme() {
    let grammar = sum_grammar();
    let parser = EarleyParser::new(&grammar, None);
    match parser.recognize("3 + x") {
        Err(Error::Parse(ParseError::NoLexemeMatch{offset, location, expected})) => {
            assert_eq!(offset, 4);
            assert_eq!(location, Location{line: 1, column: 5});
            assert_eq!(expected, vec!["num".to_string()]);
        }
        other => panic!("unexpected result {:?}", other),
    }
    match parser.recognize("3 +\n  4 4") {
        Err(Error::Parse(ParseError::NoLexemeMatch{offset, location, expected})) => {
            assert_eq!(offset, 8);
            assert_eq!(location, Location{line: 2, column: 5});
            assert!(expected.is_empty());
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn trailing_input_after_full_parse() {
    let grammar = sum_grammar();
    let err = EarleyParser::new(&grammar, None).recognize("3 + 4 5").unwrap_err();
    match &err {
        Error::Parse(ParseError::NoLexemeMatch{offset, expected, ..}) => {
            assert_eq!(*offset, 6);
            assert!(expected.is_empty());
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(err.to_string(),
               "No lexeme matches at line 1, column 7 (offset 6); expected end of input");
}

#[test]
fn anonymous_lexemes_are_expected_by_name() {
    let grammar = sum_grammar();
    match EarleyParser::new(&grammar, None).recognize("3 - 4") {
        Err(Error::Parse(ParseError::NoLexemeMatch{offset, expected, ..})) => {
            assert_eq!(offset, 2);
            assert_eq!(expected, vec!["'+'".to_string()]);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn ambiguous_grammar_exhausts_item_limit() {
    let grammar = Grammar::compile("S ::= S S | 'a'", "ambiguous").unwrap();
    let input = "a".repeat(12);
    let trees = EarleyParser::new(&grammar, None).recognize(&input).unwrap();
    assert!(trees.num_items() > 50);
    match EarleyParser::new(&grammar, Some(50)).recognize(&input) {
        Err(err @ Error::ResourceExhausted{limit: 50, ..}) => assert!(err.is_resource_exhausted()),
        other => panic!("unexpected result {:?}", other),
    }
    // the grammar is still usable after the failure
    assert!(EarleyParser::new(&grammar, Some(50)).recognize("aa").is_ok());
}

#[test]
fn all_lexeme_lengths_by_default() {
    // 'a' 'bc' and 'ab' 'x' compete at offset 0
    let text = r"
        s ::= a b | c d
        a ~ 'a'
        b ~ 'bc'
        c ~ 'ab'
        d ~ 'x'
    ";
    let grammar = Grammar::compile(text, "all").unwrap();
    assert!(!grammar.latm());
    assert!(EarleyParser::new(&grammar, None).recognize("abc").is_ok());
    assert!(EarleyParser::new(&grammar, None).recognize("abx").is_ok());
}

#[test]
fn longest_acceptable_token_match() {
    let text = r"
        lexeme default = latm => 1
        s ::= a b | c d
        a ~ 'a'
        b ~ 'bc'
        c ~ 'ab'
        d ~ 'x'
    ";
    let grammar = Grammar::compile(text, "latm").unwrap();
    assert!(grammar.latm());
    let recorder = Recorder::default();
    match EarleyParser::new(&grammar, None).parse("abc", Some(&recorder)) {
        Err(Error::Parse(ParseError::NoLexemeMatch{offset, expected, ..})) => {
            assert_eq!(offset, 2);
            assert_eq!(expected, vec!["d".to_string()]);
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(*recorder.events.borrow(), vec![
        r#"Rejected a @0-1: "a""#.to_string(),
        r#"Accepted c @0-2: "ab""#.to_string(),
    ]);
    assert!(EarleyParser::new(&grammar, None).recognize("abx").is_ok());
}

#[test]
fn discard_events() {
    let grammar = sum_grammar();
    let recorder = Recorder::default();
    EarleyParser::new(&grammar, None).parse(" 3+4", Some(&recorder)).unwrap();
    let events = recorder.events.borrow();
    assert_eq!(events[0], r#"Discarded ws @0-1: " ""#);
    assert!(events.contains(&r#"Accepted num @1-2: "3""#.to_string()));
    assert!(events.contains(&r#"Accepted '+' @2-3: "+""#.to_string()));
    assert!(events.iter().all(|e| !e.starts_with("Rejected")));
}

#[test]
fn several_discards() {
    let text = r"
        list ::= item+
        item ~ [a-z]+
        :discard ~ ws
        :discard ~ comment
        ws ~ [\s]+
        comment ~ '#' [^\n]*
    ";
    let grammar = Grammar::compile(text, "discards").unwrap();
    assert_eq!(grammar.discards().len(), 2);
    let input = "one # first\n  two three # trailing";
    let trees = EarleyParser::new(&grammar, None).recognize(input).unwrap();
    assert_eq!(trees.roots().len(), 1);
}

#[test]
fn nullable_rules() {
    let text = r"
        s ::= opt 'x' opt
        opt ::= 'y'
        opt ::=
    ";
    let grammar = Grammar::compile(text, "nullable").unwrap();
    assert!(grammar.g1().is_nullable(grammar.find_symbol("opt").unwrap()));
    let parser = EarleyParser::new(&grammar, None);
    for input in ["x", "yx", "xy", "yxy"] {
        assert!(parser.recognize(input).is_ok(), "input {:?}", input);
    }
    assert!(parser.recognize("yy").is_err());
}

#[test]
fn unicode_input() {
    let text = r"
        words ::= word+
        word ~ [\w]+
        :discard ~ ws
        ws ~ [\s]+
    ";
    let grammar = Grammar::compile(text, "unicode").unwrap();
    let parser = EarleyParser::new(&grammar, None);
    assert!(parser.recognize("λx über  ñandú").is_ok());
    match parser.recognize("λx ? y") {
        Err(Error::Parse(ParseError::NoLexemeMatch{offset, location, ..})) => {
            assert_eq!(offset, "λx ".len());
            assert_eq!(location, Location{line: 1, column: 4});
        }
        other => panic!("unexpected result {:?}", other),
    }
}
