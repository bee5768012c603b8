use crate::grammar::{Grammar, SymbolId};
use crate::items::Chart;
use crate::trace::{TerminalEvent, TerminalKind, Tracer};
use std::collections::HashMap;

/// Grammar driven scanner. Lexemes are recognized on demand with a char
/// level Earley chart over the lexical rules, seeded only with the lexemes
/// the structural parser expects at that point.
pub struct Lexer<'g, 'i> {
    grammar: &'g Grammar,
    input: &'i str,
    tracer: Option<&'g dyn Tracer>,
    skips: HashMap<usize, usize>,
    matches: HashMap<(usize, Vec<SymbolId>), Vec<(SymbolId, usize)>>,
}

impl<'g, 'i> Lexer<'g, 'i> {
    pub fn new(grammar: &'g Grammar, input: &'i str, tracer: Option<&'g dyn Tracer>) -> Self {
        Lexer{grammar, input, tracer, skips: HashMap::new(), matches: HashMap::new()}
    }

    /// Offset after skipping discards starting at `offset`. Each discard
    /// takes its longest match, until none matches.
    pub fn skip(&mut self, offset: usize) -> usize {
        if let Some(end) = self.skips.get(&offset) {
            return *end;
        }
        let mut pos = offset;
        if !self.grammar.discards().is_empty() {
            loop {
                let discards = self.grammar.discards().to_vec();
                let longest = self.recognize(pos, &discards).into_iter()
                    .max_by_key(|(_, end)| *end);
                match longest {
                    Some((symbol, end)) if end > pos => {
                        self.trace(TerminalKind::Discarded, symbol, pos, end);
                        pos = end;
                    }
                    _ => break,
                }
            }
        }
        self.skips.insert(offset, pos);
        pos
    }

    /// Every `(lexeme, end)` candidate among `expected` starting at `offset`.
    /// With longest acceptable token match only the longest ones survive.
    pub fn lexemes(&mut self, offset: usize, expected: &[SymbolId]) -> Vec<(SymbolId, usize)> {
        let mut key = expected.to_vec();
        key.sort_unstable();
        key.dedup();
        let key = (offset, key);
        if let Some(found) = self.matches.get(&key) {
            return found.clone();
        }
        let mut found = self.recognize(offset, &key.1);
        if self.grammar.latm() {
            let longest = found.iter().map(|(_, end)| *end).max().unwrap_or(offset);
            for (symbol, end) in found.iter().filter(|(_, end)| *end < longest) {
                self.trace(TerminalKind::Rejected, *symbol, offset, *end);
            }
            found.retain(|(_, end)| *end == longest);
        }
        for (symbol, end) in &found {
            self.trace(TerminalKind::Accepted, *symbol, offset, *end);
        }
        self.matches.insert(key, found.clone());
        found
    }

    pub(crate) fn into_skips(self) -> HashMap<usize, usize> {
        self.skips
    }

    fn trace(&self, kind: TerminalKind, symbol: SymbolId, start: usize, end: usize) {
        if let Some(tracer) = self.tracer {
            tracer.terminal(&TerminalEvent{
                kind,
                lexeme: self.grammar.name(symbol),
                start,
                end,
                text: &self.input[start..end],
            });
        }
    }

    // run the lexical chart from offset, collecting non-empty completions
    // of the targets, ordered by end then target order
    fn recognize(&self, offset: usize, targets: &[SymbolId]) -> Vec<(SymbolId, usize)> {
        let l0 = self.grammar.l0();
        let mut chart = Chart::new(l0, false, None);
        let mut found = Vec::new();
        for target in targets {
            // lexical charts never have a limit
            let _ = chart.predict(offset, *target);
        }
        let mut pos = offset;
        loop {
            let _ = chart.close(pos);
            if pos > offset {
                for target in targets {
                    if !chart.completed(pos, *target, offset).is_empty() {
                        found.push((*target, pos));
                    }
                }
            }
            if let Some(c) = self.input[pos..].chars().next() {
                let next = pos + c.len_utf8();
                for symbol in chart.expected_terminals(pos) {
                    if self.grammar.char_class(symbol).is_some_and(|class| class.matches(c)) {
                        let _ = chart.scan(pos, symbol, pos, next);
                    }
                }
            }
            match chart.next_offset(pos) {
                Some(next) => pos = next,
                None => break,
            }
        }
        found
    }
}
