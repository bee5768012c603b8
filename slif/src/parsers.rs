use crate::actions::{ActionRegistry, Semantic};
use crate::error::{CompileError, Error};
use crate::grammar::Grammar;
use crate::parser::{EarleyParser, ParseTrees};
use crate::trace::{LogTracer, ParseOptions, Tracer};
use crate::trees::EarleyForest;
use std::sync::Arc;

/// A compiled grammar bound to its own actions and options.
///
/// The grammar may be shared with other parsers (and threads), the action
/// registry belongs to this parser only.
pub struct Parser<'a, V> {
    grammar: Arc<Grammar>,
    actions: ActionRegistry<'a, V>,
    options: ParseOptions,
    tracer: Box<dyn Tracer + 'a>,
}

impl<'a, V: Semantic> Parser<'a, V> {
    pub fn new(grammar: Arc<Grammar>, actions: ActionRegistry<'a, V>, options: ParseOptions) -> Self {
        Parser{grammar, actions, options, tracer: Box::new(LogTracer)}
    }

    /// Replace the default `LogTracer`. Events are only emitted when
    /// enabled in `ParseOptions`.
    pub fn with_tracer(mut self, tracer: impl Tracer + 'a) -> Self {
        self.tracer = Box::new(tracer);
        self
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Run the recognizer only.
    pub fn recognize<'i>(&self, input: &'i str) -> Result<ParseTrees<'_, 'i>, Error> {
        let tracer = self.options.trace_terminals.then_some(&*self.tracer);
        EarleyParser::new(&self.grammar, self.options.max_items).parse(input, tracer)
    }

    pub fn parse(&self, input: &str) -> Result<V, Error> {
        let trees = self.recognize(input)?;
        let tracer = self.options.trace_values.then_some(&*self.tracer);
        EarleyForest::new(&self.actions, tracer).eval(&trees)
    }
}

/// Compile `grammar` and return a parser function for it. Grammar errors
/// are reported here, parse and evaluation errors by each call.
///
/// ```
/// use slif::{gen_parser, ActionRegistry, ParseOptions, Value};
///
/// let grammar = r#"
///     sum ::= num '+' num action => do_add
///     num ~ [0-9]+
///     :discard ~ ws
///     ws ~ [\s]+
/// "#;
/// let actions = ActionRegistry::new().bind("do_add", |_, args: Vec<Value>| {
///     Value::from(args[0].as_f64().unwrap() + args[2].as_f64().unwrap())
/// });
/// let parser = gen_parser(grammar, "sum", actions, ParseOptions::default()).unwrap();
/// assert_eq!(parser("3 + 4").unwrap(), Value::Float(7.0));
/// ```
pub fn gen_parser<'a, V: Semantic + 'a>(
    grammar: &str,
    description: &str,
    actions: ActionRegistry<'a, V>,
    options: ParseOptions)
    -> Result<impl Fn(&str) -> Result<V, Error> + 'a, CompileError>
{
    let grammar = Arc::new(Grammar::compile(grammar, description)?);
    let parser = Parser::new(grammar, actions, options);
    Ok(move |input: &str| parser.parse(input))
}
