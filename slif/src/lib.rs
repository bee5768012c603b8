mod charclass;
pub use crate::charclass::CharClass;

mod error;
pub use crate::error::{CompileError, CompileErrorKind, Error, EvalError, Location, ParseError};

mod grammar;
pub use crate::grammar::{Action, Grammar, Rule, RuleId, RuleTable, Semantics, Symbol, SymbolId, SymbolKind};

mod syntax;
pub use crate::syntax::{Adverb, Alternative, Quantifier, RhsItem, Statement};

mod builder;
pub use crate::builder::GrammarBuilder;

mod meta;

mod items;
pub use crate::items::{BackPointer, Item, ItemRef};

mod lexer;

mod parser;
pub use crate::parser::{EarleyParser, ParseTrees};

mod actions;
pub use crate::actions::{ActionRegistry, RuleContext, SemAction, Semantic, Value};

mod trace;
pub use crate::trace::{LogTracer, ParseOptions, TerminalEvent, TerminalKind, Tracer};

mod trees;
pub use crate::trees::EarleyForest;

mod parsers;
pub use crate::parsers::{gen_parser, Parser};

#[cfg(test)]
mod builder_test;
#[cfg(test)]
mod parser_test;
