//! Grammar text compiler. The SLIF notation is itself described by a
//! grammar built with `GrammarBuilder`; grammar text is parsed with it and
//! evaluated into statements, which are lowered like programmatic ones.

use crate::actions::{ActionRegistry, Semantic};
use crate::builder::GrammarBuilder;
use crate::error::{describe_expected, CompileError, CompileErrorKind, Error, Location, ParseError};
use crate::grammar::Grammar;
use crate::parser::EarleyParser;
use crate::syntax::{Adverb, Alternative, Quantifier, RhsItem, Statement};
use crate::trees::EarleyForest;
use lexers::LineIndex;
use once_cell::sync::Lazy;

// Source spelling of a symbol or element and where it starts
#[derive(Clone, Debug)]
struct Spelled {
    text: String,
    offset: usize,
}

#[derive(Clone, Debug)]
enum G {
    Nop,
    Text(String),
    Name(Spelled),
    Item(RhsItem),
    Items(Vec<RhsItem>),
    Adverb(Adverb),
    Adverbs(Vec<Adverb>),
    Alt(Alternative),
    Alts(Vec<Alternative>),
    Tiers(Vec<Vec<Alternative>>),
    Stmt(Statement),
    Stmts(Vec<Statement>),
}

impl Semantic for G {
    fn from_lexeme(text: &str) -> Self {
        G::Text(text.to_string())
    }

    fn undefined() -> Self {
        G::Nop
    }

    // the meta grammar binds no ::array and has no multi-lexeme default rules
    fn from_list(_: Vec<Self>) -> Self {
        G::Nop
    }
}

// use to destructure G enum into a specific alternative
macro_rules! pull {
    ($p:path, $e:expr) => {
        match $e {
            $p(value) => value,
            n => panic!("BUG: meta grammar value mismatch={:?}", n),
        }
    };
}

fn meta_grammar() -> Result<Grammar, CompileError> {
    let seq = |item: &str, separator: Option<&str>, action: &str| {
        let alt = Alternative::new(&[item]).adverb("action", action);
        match separator {
            Some(sep) => alt.adverb("separator", sep).adverb("proper", "1"),
            None => alt,
        }
    };
    GrammarBuilder::default()
        .describe("SLIF meta grammar")
        .alternative("statements", seq("statement*", None, "statements"))
        .rule_action("statement", &["':start'", "'::='", "symbol"], "start")
        .rule_action("statement", &["':default'", "'::='", "adverbs"], "default")
        .rule_action("statement", &["':discard'", "'~'", "element"], "discard")
        .rule_action("statement", &["'lexeme'", "'default'", "'='", "adverbs"], "lexeme_default")
        .rule_action("statement", &["symbol", "'::='", "tiers"], "structural")
        .rule_action("statement", &["symbol", "'~'", "alternatives"], "lexical")
        .alternative("tiers", seq("alternatives+", Some("'||'"), "tiers"))
        .alternative("alternatives", seq("alternative+", Some("'|'"), "alternatives"))
        .rule_action("alternative", &["rhs", "adverbs"], "alternative")
        .alternative("rhs", seq("rhs_item*", None, "rhs"))
        .rule_action("rhs_item", &["element"], "item")
        .rule_action("rhs_item", &["element", "quantifier"], "quantified")
        .rule_action("element", &["symbol"], "::first")
        .rule_action("element", &["literal"], "spelled")
        .rule_action("element", &["char_class"], "spelled")
        .rule_action("symbol", &["bare_name"], "spelled")
        .rule_action("symbol", &["bracketed_name"], "spelled")
        .alternative("adverbs", seq("adverb*", None, "adverbs"))
        .rule_action("adverb", &["bare_name", "'=>'", "adverb_value"], "adverb")
        .rule("adverb_value", &["bare_name"])
        .rule("adverb_value", &["bracketed_name"])
        .rule("adverb_value", &["builtin_action"])
        .rule("adverb_value", &["integer"])
        .rule("adverb_value", &["literal"])
        .rule("adverb_value", &["char_class"])
        .lexeme("bare_name", &["[a-zA-Z_]", "[a-zA-Z0-9_]*"])
        .lexeme("bracketed_name", &["'<'", r"[^>\n]+", "'>'"])
        .lexeme("builtin_action", &["'::'", "[a-z]+"])
        .lexeme("integer", &["[-]?", "[0-9]+"])
        .lexeme("literal", &["[']", "single_quoted*", "[']"])
        .lexeme("literal", &[r#"["]"#, "double_quoted*", r#"["]"#])
        .lexeme("single_quoted", &[r"[^'\\\n]"])
        .lexeme("single_quoted", &[r"[\\]", r"[^\n]"])
        .lexeme("double_quoted", &[r#"[^"\\\n]"#])
        .lexeme("double_quoted", &[r"[\\]", r"[^\n]"])
        .lexeme("char_class", &["'['", "class_char+", "']'"])
        .lexeme("class_char", &[r"[^\]\\\n]"])
        .lexeme("class_char", &[r"[\\]", r"[^\n]"])
        .lexeme("quantifier", &["[*+?]"])
        .lexeme("whitespace", &[r"[\s]+"])
        .lexeme("comment", &["'#'", r"[^\n]*"])
        .discard("whitespace")
        .discard("comment")
        .latm(true)
        .into_grammar()
}

static META_GRAMMAR: Lazy<Result<Grammar, CompileError>> = Lazy::new(meta_grammar);

fn meta_actions<'a>() -> ActionRegistry<'a, G> {
    ActionRegistry::<'a, G>::new()
        .bind("statements", |_, n| G::Stmts(n.into_iter().map(|s| pull!(G::Stmt, s)).collect()))
        .bind("start", |ctx, mut n| {
            let symbol = pull!(G::Name, n.remove(2));
            G::Stmt(Statement::Start{symbol: symbol.text, offset: ctx.start})
        })
        .bind("default", |ctx, mut n| {
            let adverbs = pull!(G::Adverbs, n.remove(2));
            G::Stmt(Statement::Default{adverbs, offset: ctx.start})
        })
        .bind("discard", |ctx, mut n| {
            let element = pull!(G::Name, n.remove(2));
            G::Stmt(Statement::Discard{element: element.text, offset: ctx.start})
        })
        .bind("lexeme_default", |ctx, mut n| {
            let adverbs = pull!(G::Adverbs, n.remove(3));
            G::Stmt(Statement::LexemeDefault{adverbs, offset: ctx.start})
        })
        .bind("structural", |ctx, mut n| {
            let tiers = pull!(G::Tiers, n.remove(2));
            let lhs = pull!(G::Name, n.remove(0));
            G::Stmt(Statement::Structural{lhs: lhs.text, tiers, offset: ctx.start})
        })
        .bind("lexical", |ctx, mut n| {
            let alternatives = pull!(G::Alts, n.remove(2));
            let lhs = pull!(G::Name, n.remove(0));
            G::Stmt(Statement::Lexical{lhs: lhs.text, alternatives, offset: ctx.start})
        })
        .bind("tiers", |_, n| G::Tiers(n.into_iter().map(|t| pull!(G::Alts, t)).collect()))
        .bind("alternatives", |_, n| G::Alts(n.into_iter().map(|a| pull!(G::Alt, a)).collect()))
        .bind("alternative", |ctx, mut n| {
            let adverbs = pull!(G::Adverbs, n.remove(1));
            let rhs = pull!(G::Items, n.remove(0));
            let offset = rhs.first().map_or(ctx.start, |item| item.offset);
            G::Alt(Alternative{rhs, adverbs, offset})
        })
        .bind("rhs", |_, n| G::Items(n.into_iter().map(|i| pull!(G::Item, i)).collect()))
        .bind("item", |_, mut n| {
            let element = pull!(G::Name, n.remove(0));
            G::Item(RhsItem{element: element.text, quantifier: Quantifier::One, offset: element.offset})
        })
        .bind("quantified", |_, mut n| {
            let quantifier = pull!(G::Text, n.remove(1));
            let element = pull!(G::Name, n.remove(0));
            let quantifier = quantifier.chars().next()
                .and_then(Quantifier::from_char)
                .unwrap_or(Quantifier::One);
            G::Item(RhsItem{element: element.text, quantifier, offset: element.offset})
        })
        .bind("spelled", |ctx, mut n| {
            let text = pull!(G::Text, n.remove(0));
            G::Name(Spelled{text, offset: ctx.start})
        })
        .bind("adverbs", |_, n| G::Adverbs(n.into_iter().map(|a| pull!(G::Adverb, a)).collect()))
        .bind("adverb", |ctx, mut n| {
            let value = pull!(G::Text, n.remove(2));
            let name = pull!(G::Text, n.remove(0));
            G::Adverb(Adverb{name, value, offset: ctx.start})
        })
}

fn syntax_error(err: Error, text: &str) -> CompileError {
    let index = LineIndex::new(text);
    let (message, offset) = match err {
        Error::Parse(ParseError::NoLexemeMatch{offset, expected, ..}) =>
            (format!("Syntax error, {}", describe_expected(&expected)), offset),
        Error::Parse(ParseError::IncompleteParse) =>
            ("Unexpected end of grammar text".to_string(), text.len()),
        other => (other.to_string(), 0),
    };
    let (line, column) = index.line_col(offset);
    let mut err = CompileError::new(CompileErrorKind::MalformedRule, message)
        .at(Some(Location{line, column}));
    err.line_text = index.line_text(line).map(str::to_string);
    err
}

/// Parse grammar text into statements and lower them.
pub(crate) fn compile(text: &str, description: &str) -> Result<Grammar, CompileError> {
    let meta = META_GRAMMAR.as_ref().map_err(|e| e.clone())?;
    let actions = meta_actions();
    let statements = EarleyParser::new(meta, None).parse(text, None)
        .and_then(|trees| EarleyForest::new(&actions, None).eval(&trees))
        .map_err(|e| {
            let mut err = syntax_error(e, text);
            err.description = description.to_string();
            err
        })?;
    let statements = pull!(G::Stmts, statements);
    log::debug!("{}: {} grammar statements", description, statements.len());
    GrammarBuilder::from_source(statements, text, description).into_grammar()
}
