//! Error taxonomy: grammar compilation, recognition, evaluation and
//! resource limits. All of them abort the current call and leave the
//! `Grammar` reusable.

use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompileErrorKind {
    UndefinedSymbol,
    NoStartRule,
    MalformedRule,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            CompileErrorKind::UndefinedSymbol => "undefined symbol",
            CompileErrorKind::NoStartRule => "no start rule",
            CompileErrorKind::MalformedRule => "malformed rule",
        })
    }
}

/// 1-based position in grammar or input text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{description}: {kind}: {message}{}", render_position(.location, .line_text))]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    /// Where the grammar text came from, as told by the caller.
    pub description: String,
    pub location: Option<Location>,
    /// Offending line of grammar text when known.
    pub line_text: Option<String>,
}

fn render_position(location: &Option<Location>, line_text: &Option<String>) -> String {
    match (location, line_text) {
        (Some(loc), Some(text)) => format!(" at {}: {}", loc, text.trim()),
        (Some(loc), None) => format!(" at {}", loc),
        (None, Some(text)) => format!(" in: {}", text.trim()),
        (None, None) => String::new(),
    }
}

impl CompileError {
    pub(crate) fn new(kind: CompileErrorKind, message: impl Into<String>) -> Self {
        CompileError{
            kind,
            message: message.into(),
            description: String::new(),
            location: None,
            line_text: None,
        }
    }

    pub(crate) fn at(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No expected lexeme matches the input at `offset`.
    #[error("No lexeme matches at {location} (offset {offset}); {}", describe_expected(.expected))]
    NoLexemeMatch {
        offset: usize,
        location: Location,
        expected: Vec<String>,
    },
    #[error("No parse was found after reading the entire input")]
    IncompleteParse,
}

// nothing is expected once a full parse has been recognized
pub(crate) fn describe_expected(expected: &[String]) -> String {
    match expected {
        [] => "expected end of input".to_string(),
        _ => format!("expected one of: {}", expected.join(", ")),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Action '{0}' is not bound")]
    UnboundAction(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// The recognizer created more Earley items than allowed.
    #[error("Recognizer exceeded its limit of {limit} Earley items at offset {offset}")]
    ResourceExhausted { limit: usize, offset: usize },
}

impl Error {
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Error::ResourceExhausted{..})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_parse_message() {
        let err: Error = ParseError::IncompleteParse.into();
        assert_eq!(err.to_string(), "No parse was found after reading the entire input");
    }

    #[test]
    fn compile_error_rendering() {
        let mut err = CompileError::new(CompileErrorKind::UndefinedSymbol, "Missing Symbol: term")
            .at(Some(Location{line: 3, column: 14}));
        err.description = "calc grammar".to_string();
        err.line_text = Some("  expr ::= term  ".to_string());
        assert_eq!(err.to_string(),
                   "calc grammar: undefined symbol: Missing Symbol: term at line 3, column 14: expr ::= term");
    }
}
