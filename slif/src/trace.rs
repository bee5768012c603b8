use crate::actions::RuleContext;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalKind {
    /// Lexeme fed to the structural parser.
    Accepted,
    /// Lexeme matched but dropped by longest acceptable token match.
    Rejected,
    /// Input skipped by a `:discard` symbol.
    Discarded,
}

#[derive(Clone, Debug)]
pub struct TerminalEvent<'a> {
    pub kind: TerminalKind,
    pub lexeme: &'a str,
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

impl fmt::Display for TerminalEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} {} @{}-{}: {:?}", self.kind, self.lexeme, self.start, self.end, self.text)
    }
}

/// Observer of lexing and evaluation, enabled through `ParseOptions`.
pub trait Tracer {
    fn terminal(&self, event: &TerminalEvent);
    fn value(&self, ctx: &RuleContext, value: &dyn fmt::Debug);
}

/// Default tracer, forwards everything to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn terminal(&self, event: &TerminalEvent) {
        log::trace!("{}", event);
    }

    fn value(&self, ctx: &RuleContext, value: &dyn fmt::Debug) {
        log::trace!("{} @{}-{} => {:?}", ctx.rule, ctx.start, ctx.end, value);
    }
}

/// Per parser knobs.
///
/// ```
/// use slif::ParseOptions;
/// let options = ParseOptions::default().with_max_items(10_000);
/// assert_eq!(options.max_items, Some(10_000));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Report lexemes accepted, rejected and discarded.
    pub trace_terminals: bool,
    /// Report the value computed for each rule application.
    pub trace_values: bool,
    /// Fail with `Error::ResourceExhausted` past this many Earley items.
    pub max_items: Option<usize>,
}

impl ParseOptions {
    #[must_use]
    pub fn with_trace_terminals(mut self, trace: bool) -> Self {
        self.trace_terminals = trace;
        self
    }

    #[must_use]
    pub fn with_trace_values(mut self, trace: bool) -> Self {
        self.trace_values = trace;
        self
    }

    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }
}
