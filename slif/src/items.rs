use crate::grammar::{RuleId, RuleTable, SymbolId};
use indexmap::IndexSet;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Address of an Item: the stateset (input offset) it lives in and its
/// position within that set. Items are never removed, so refs stay valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemRef {
    pub set: usize,
    pub index: usize,
}

/// How an Item came to be (besides prediction).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackPointer {
    /// `source` advanced over the completed `trigger`.
    Complete { source: ItemRef, trigger: ItemRef },
    /// `source` advanced over a lexeme that starts at `start`.
    Scan { source: ItemRef, start: usize },
}

impl BackPointer {
    pub fn source(&self) -> ItemRef {
        match self {
            BackPointer::Complete{source, ..} | BackPointer::Scan{source, ..} => *source,
        }
    }
}

/// An Item is a partially matched Rule, `dot` shows the match progress.
/// Its end is the offset of the stateset holding it.
#[derive(Clone)]
pub struct Item {
    pub rule: RuleId,
    pub dot: usize,
    pub origin: usize,
    // merged from every derivation of the same (rule, dot, origin)
    sources: IndexSet<BackPointer>,
}

impl Item {
    pub fn sources(&self) -> &IndexSet<BackPointer> {
        &self.sources
    }

    pub fn next_symbol(&self, rules: &RuleTable) -> Option<SymbolId> {
        rules.rule(self.rule).rhs.get(self.dot).copied()
    }

    pub fn complete(&self, rules: &RuleTable) -> bool {
        self.dot >= rules.rule(self.rule).rhs.len()
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Item(rule {} dot {} from {}) #bp: {}",
               self.rule, self.dot, self.origin, self.sources.len())
    }
}

#[derive(Clone, Debug, Default)]
pub struct StateSet {
    items: Vec<Item>,
    dedup: HashMap<(RuleId, usize, usize), usize>,
    // items whose next symbol is the key
    waiting: HashMap<SymbolId, Vec<usize>>,
    // completed items that started in this same set (nullable derivations)
    nulled: HashMap<SymbolId, Vec<usize>>,
}

impl StateSet {
    pub fn item(&self, index: usize) -> &Item {
        &self.items[index]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    fn waiting_for(&self, symbol: SymbolId) -> &[usize] {
        self.waiting.get(&symbol).map_or(&[], |w| w.as_slice())
    }
}

/// Raised when the chart grows past its item limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exhausted {
    pub limit: usize,
    pub offset: usize,
}

/// Earley statesets keyed by input offset. Sets for offsets no lexeme
/// reaches are never created.
pub struct Chart<'g> {
    rules: &'g RuleTable,
    sets: BTreeMap<usize, StateSet>,
    // keep back-pointers, the lexical charts only need recognition
    track_sources: bool,
    total: usize,
    limit: Option<usize>,
}

impl<'g> Chart<'g> {
    pub fn new(rules: &'g RuleTable, track_sources: bool, limit: Option<usize>) -> Self {
        Chart{rules, sets: BTreeMap::new(), track_sources, total: 0, limit}
    }

    /// Offset of the first stateset after `offset`.
    pub fn next_offset(&self, offset: usize) -> Option<usize> {
        use std::ops::Bound::{Excluded, Unbounded};
        self.sets.range((Excluded(offset), Unbounded)).next().map(|(k, _)| *k)
    }

    pub fn num_items(&self) -> usize {
        self.total
    }

    pub(crate) fn into_sets(self) -> BTreeMap<usize, StateSet> {
        self.sets
    }

    /// Add an item to the set at `offset` or merge `bp` into the existing one.
    /// Returns whether the item is new.
    pub fn add(&mut self, offset: usize, rule: RuleId, dot: usize, origin: usize,
               bp: Option<BackPointer>) -> Result<bool, Exhausted> {
        let track = self.track_sources;
        let set = self.sets.entry(offset).or_default();
        if let Some(existing) = set.dedup.get(&(rule, dot, origin)) {
            if let (Some(bp), true) = (bp, track) {
                set.items[*existing].sources.insert(bp);
            }
            return Ok(false);
        }
        if let Some(limit) = self.limit {
            if self.total >= limit {
                return Err(Exhausted{limit, offset});
            }
        }
        let mut sources = IndexSet::new();
        if let (Some(bp), true) = (bp, track) {
            sources.insert(bp);
        }
        set.dedup.insert((rule, dot, origin), set.items.len());
        set.items.push(Item{rule, dot, origin, sources});
        self.total += 1;
        Ok(true)
    }

    /// Seed predictions of `symbol` at `offset`.
    pub fn predict(&mut self, offset: usize, symbol: SymbolId) -> Result<(), Exhausted> {
        for rule in self.rules.rules_for(symbol) {
            self.add(offset, *rule, 0, offset, None)?;
        }
        Ok(())
    }

    /// Predict and complete until the set at `offset` stops growing.
    pub fn close(&mut self, offset: usize) -> Result<(), Exhausted> {
        let mut next = 0;
        while next < self.sets.get(&offset).map_or(0, StateSet::len) {
            let index = next;
            next += 1;
            let (rule, dot, origin) = {
                let item = &self.sets[&offset].items[index];
                (item.rule, item.dot, item.origin)
            };
            let here = ItemRef{set: offset, index};
            match self.rules.rule(rule).rhs.get(dot).copied() {
                Some(symbol) if self.rules.has_rules(symbol) => {
                    self.await_symbol(offset, index, symbol);
                    self.predict(offset, symbol)?;
                    // symbol may have been completed empty before we got here
                    let nulled = self.sets[&offset].nulled.get(&symbol).cloned().unwrap_or_default();
                    for trigger in nulled {
                        let bp = BackPointer::Complete{
                            source: here, trigger: ItemRef{set: offset, index: trigger}};
                        self.add(offset, rule, dot + 1, origin, Some(bp))?;
                    }
                }
                Some(_) => (),
                None => self.complete(offset, here, rule, origin)?,
            }
        }
        Ok(())
    }

    fn await_symbol(&mut self, offset: usize, index: usize, symbol: SymbolId) {
        if let Some(set) = self.sets.get_mut(&offset) {
            set.waiting.entry(symbol).or_default().push(index);
        }
    }

    fn complete(&mut self, offset: usize, trigger: ItemRef, rule: RuleId, from: usize) -> Result<(), Exhausted> {
        let lhs = self.rules.rule(rule).lhs;
        if from == offset {
            if let Some(set) = self.sets.get_mut(&offset) {
                set.nulled.entry(lhs).or_default().push(trigger.index);
            }
        }
        let advanced: Vec<_> = match self.sets.get(&from) {
            Some(origin) => origin.waiting_for(lhs).iter()
                .map(|w| (origin.items[*w].rule, origin.items[*w].dot, origin.items[*w].origin, *w))
                .collect(),
            None => Vec::new(),
        };
        for (rule, dot, origin, index) in advanced {
            let bp = BackPointer::Complete{source: ItemRef{set: from, index}, trigger};
            self.add(offset, rule, dot + 1, origin, Some(bp))?;
        }
        Ok(())
    }

    /// Advance every item of the set at `from` waiting on `symbol` into the
    /// set at `to`.
    pub fn scan(&mut self, from: usize, symbol: SymbolId, start: usize, to: usize) -> Result<(), Exhausted> {
        let advanced: Vec<_> = match self.sets.get(&from) {
            Some(set) => set.items.iter().enumerate()
                .filter(|(_, it)| it.next_symbol(self.rules) == Some(symbol))
                .map(|(index, it)| (it.rule, it.dot, it.origin, index))
                .collect(),
            None => Vec::new(),
        };
        for (rule, dot, origin, index) in advanced {
            let bp = BackPointer::Scan{source: ItemRef{set: from, index}, start};
            self.add(to, rule, dot + 1, origin, Some(bp))?;
        }
        Ok(())
    }

    /// Terminal symbols awaited by the set at `offset`, in first-seen order.
    pub fn expected_terminals(&self, offset: usize) -> Vec<SymbolId> {
        let mut expected = IndexSet::new();
        if let Some(set) = self.sets.get(&offset) {
            for item in &set.items {
                match item.next_symbol(self.rules) {
                    Some(symbol) if !self.rules.has_rules(symbol) => {
                        expected.insert(symbol);
                    }
                    _ => (),
                }
            }
        }
        expected.into_iter().collect()
    }

    /// Completed items for `symbol` spanning `origin..offset`.
    pub fn completed(&self, offset: usize, symbol: SymbolId, origin: usize) -> Vec<ItemRef> {
        match self.sets.get(&offset) {
            Some(set) => set.items.iter().enumerate()
                .filter(|(_, it)| it.origin == origin && it.complete(self.rules)
                                  && self.rules.rule(it.rule).lhs == symbol)
                .map(|(index, _)| ItemRef{set: offset, index})
                .collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn dump(&self, names: impl Fn(SymbolId) -> String) -> String {
        let mut out = String::new();
        for (offset, set) in &self.sets {
            out.push_str(&format!("=== StateSet {} ===\n", offset));
            for item in &set.items {
                let rule = self.rules.rule(item.rule);
                let pre: Vec<_> = rule.rhs[..item.dot].iter().map(|s| names(*s)).collect();
                let post: Vec<_> = rule.rhs[item.dot..].iter().map(|s| names(*s)).collect();
                out.push_str(&format!("({} - {}) {} -> {} \u{00b7} {} #bp: {}\n",
                                      item.origin, offset, names(rule.lhs),
                                      pre.join(" "), post.join(" "), item.sources.len()));
            }
        }
        out
    }
}
