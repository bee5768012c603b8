use crate::error::{Error, Location, ParseError};
use crate::grammar::Grammar;
use crate::items::{Chart, Exhausted, Item, ItemRef, StateSet};
use crate::lexer::Lexer;
use crate::trace::Tracer;
use lexers::LineIndex;
use std::collections::{BTreeMap, HashMap};

/// Structural recognizer. Statesets live at input offsets, the lexer
/// supplies the lexemes expected by each set.
pub struct EarleyParser<'g> {
    grammar: &'g Grammar,
    max_items: Option<usize>,
}

/// Chart of a successful recognition plus the completed start items.
#[derive(Debug)]
pub struct ParseTrees<'g, 'i> {
    pub(crate) grammar: &'g Grammar,
    pub(crate) input: &'i str,
    sets: BTreeMap<usize, StateSet>,
    roots: Vec<ItemRef>,
    skips: HashMap<usize, usize>,
}

impl<'g, 'i> ParseTrees<'g, 'i> {
    pub fn roots(&self) -> &[ItemRef] {
        &self.roots
    }

    pub fn item(&self, at: ItemRef) -> &Item {
        self.sets[&at.set].item(at.index)
    }

    pub fn input(&self) -> &'i str {
        self.input
    }

    /// Number of Earley items in the chart.
    pub fn num_items(&self) -> usize {
        self.sets.values().map(StateSet::len).sum()
    }

    /// Where the first lexeme after `offset` starts, past any discards.
    pub fn skip(&self, offset: usize) -> usize {
        self.skips.get(&offset).copied().unwrap_or(offset)
    }
}

fn exhausted(e: Exhausted) -> Error {
    Error::ResourceExhausted{limit: e.limit, offset: e.offset}
}

impl<'g> EarleyParser<'g> {
    pub fn new(grammar: &'g Grammar, max_items: Option<usize>) -> Self {
        EarleyParser{grammar, max_items}
    }

    pub fn recognize<'i>(&self, input: &'i str) -> Result<ParseTrees<'g, 'i>, Error> {
        self.parse(input, None)
    }

    pub fn parse<'i>(&self, input: &'i str, tracer: Option<&dyn Tracer>)
            -> Result<ParseTrees<'g, 'i>, Error> {
        let grammar = self.grammar;
        let start = grammar.start();
        let mut chart = Chart::new(grammar.g1(), true, self.max_items);
        let mut lexer = Lexer::new(grammar, input, tracer);
        let mut roots = Vec::new();

        chart.predict(0, start).map_err(exhausted)?;
        let mut offset = 0;
        loop {
            chart.close(offset).map_err(exhausted)?;
            let from = lexer.skip(offset);
            if from >= input.len() {
                roots.extend(chart.completed(offset, start, 0));
            } else {
                let expected = chart.expected_terminals(offset);
                for (lexeme, end) in lexer.lexemes(from, &expected) {
                    chart.scan(offset, lexeme, from, end).map_err(exhausted)?;
                }
            }
            match chart.next_offset(offset) {
                Some(next) => offset = next,
                None => break,
            }
        }

        log::debug!("{}: recognized {} bytes with {} items, {} parses",
                    grammar.description(), input.len(), chart.num_items(), roots.len());
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", chart.dump(|s| grammar.name(s).to_string()));
        }

        if roots.is_empty() {
            // offset holds the furthest stateset, nothing could extend it
            let at = lexer.skip(offset);
            if at >= input.len() {
                return Err(ParseError::IncompleteParse.into());
            }
            let (line, column) = LineIndex::new(input).line_col(at);
            let expected = chart.expected_terminals(offset).into_iter()
                .map(|s| grammar.name(s).to_string())
                .collect();
            return Err(ParseError::NoLexemeMatch{offset: at, location: Location{line, column}, expected}.into());
        }

        Ok(ParseTrees{
            grammar,
            input,
            sets: chart.into_sets(),
            roots,
            skips: lexer.into_skips(),
        })
    }
}
