use crate::charclass::CharClass;
use crate::error::CompileError;
use std::fmt;

pub type SymbolId = usize;
pub type RuleId = usize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// Has structural (`::=`) rules.
    Nonterminal,
    /// Lexical symbol the structural grammar sees as a token (or a discard).
    Lexeme,
    /// Lexical helper only referenced from other lexical rules.
    Lexical,
    /// Terminal of the lexical grammar, matches one char.
    Char(CharClass),
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Named(String),
    /// `::first`, value of the first kept child
    First,
    /// `::undef`
    Undef,
    /// `::array`, children collected into a list
    Array,
}

impl Action {
    pub fn parse(name: &str) -> Action {
        match name {
            "::first" => Action::First,
            "::undef" => Action::Undef,
            "::array" => Action::Array,
            other => Action::Named(other.to_string()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Named(name) => write!(f, "{}", name),
            Action::First => write!(f, "::first"),
            Action::Undef => write!(f, "::undef"),
            Action::Array => write!(f, "::array"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Semantics {
    /// Evaluate kept children then apply the action (None is the default).
    Apply(Option<Action>),
    /// Rule made up while rewriting: its kept children are handed to the
    /// rule that used it, as if written there.
    Splice,
}

#[derive(Clone, Debug)]
pub struct Rule {
    pub lhs: SymbolId,
    pub rhs: Vec<SymbolId>,
    /// Name of the symbol as the grammar author wrote it. Precedence tiers
    /// and sequence helpers report the name of the rule they came from.
    pub name: String,
    pub semantics: Semantics,
    /// RHS positions whose values reach the action.
    pub mask: Vec<bool>,
    pub rank: i32,
    pub(crate) display: String,
}

impl Rule {
    pub fn is_splice(&self) -> bool {
        self.semantics == Semantics::Splice
    }

    pub fn keeps(&self, pos: usize) -> bool {
        self.mask.get(pos).copied().unwrap_or(false)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

/// Rules of one grammar level, indexed by LHS. A symbol is a nonterminal
/// of the table iff it has rules in it.
#[derive(Clone, Debug, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
    by_lhs: Vec<Vec<RuleId>>,
    nullable: Vec<bool>,
}

impl RuleTable {
    pub(crate) fn new(rules: Vec<Rule>, num_symbols: usize) -> RuleTable {
        let mut by_lhs = vec![Vec::new(); num_symbols];
        for (id, rule) in rules.iter().enumerate() {
            by_lhs[rule.lhs].push(id);
        }
        let nullable = nullable_symbols(&rules, num_symbols);
        RuleTable{rules, by_lhs, nullable}
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rules_for(&self, symbol: SymbolId) -> &[RuleId] {
        self.by_lhs.get(symbol).map_or(&[], |r| r.as_slice())
    }

    pub fn has_rules(&self, symbol: SymbolId) -> bool {
        !self.rules_for(symbol).is_empty()
    }

    pub fn is_nullable(&self, symbol: SymbolId) -> bool {
        self.nullable.get(symbol).copied().unwrap_or(false)
    }
}

// fixpoint: a symbol is nullable if some rule's RHS is all nullable
fn nullable_symbols(rules: &[Rule], num_symbols: usize) -> Vec<bool> {
    let mut nullable = vec![false; num_symbols];
    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules {
            if !nullable[rule.lhs] && rule.rhs.iter().all(|s| nullable[*s]) {
                nullable[rule.lhs] = true;
                changed = true;
            }
        }
    }
    nullable
}

/// A compiled two-level grammar. Immutable and free of closures, it can be
/// shared across threads (eg: behind an `Arc`) by any number of parsers.
#[derive(Clone, Debug)]
pub struct Grammar {
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) g1: RuleTable,
    pub(crate) l0: RuleTable,
    pub(crate) start: SymbolId,
    pub(crate) discards: Vec<SymbolId>,
    pub(crate) latm: bool,
    pub(crate) default_action: Option<Action>,
    pub(crate) description: String,
}

impl Grammar {
    /// Compile SLIF grammar text. `description` tells where the text came
    /// from and prefixes error messages.
    pub fn compile(text: &str, description: &str) -> Result<Grammar, CompileError> {
        crate::meta::compile(text, description)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.symbols[id].name
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn find_symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbols.iter()
            .position(|s| s.name == name && !matches!(s.kind, SymbolKind::Char(_)))
    }

    pub fn start(&self) -> SymbolId {
        self.start
    }

    /// Structural rules.
    pub fn g1(&self) -> &RuleTable {
        &self.g1
    }

    /// Lexical rules.
    pub fn l0(&self) -> &RuleTable {
        &self.l0
    }

    pub fn discards(&self) -> &[SymbolId] {
        &self.discards
    }

    pub fn is_lexeme(&self, id: SymbolId) -> bool {
        self.symbols[id].kind == SymbolKind::Lexeme
    }

    /// Longest acceptable tokens match, `lexeme default = latm => 1`.
    pub fn latm(&self) -> bool {
        self.latm
    }

    pub fn default_action(&self) -> Option<&Action> {
        self.default_action.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn char_class(&self, id: SymbolId) -> Option<&CharClass> {
        match &self.symbols[id].kind {
            SymbolKind::Char(class) => Some(class),
            _ => None,
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, ":start ::= {}", self.name(self.start))?;
        for rule in self.g1.rules() {
            writeln!(f, "{}", rule)?;
        }
        for rule in self.l0.rules() {
            writeln!(f, "{}", rule)?;
        }
        for discard in &self.discards {
            writeln!(f, ":discard ~ {}", self.name(*discard))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(lhs: SymbolId, rhs: &[SymbolId]) -> Rule {
        Rule{
            lhs,
            rhs: rhs.to_vec(),
            name: lhs.to_string(),
            semantics: Semantics::Apply(None),
            mask: vec![true; rhs.len()],
            rank: 0,
            display: String::new(),
        }
    }

    #[test]
    fn nullable_fixpoint() {
        // 0 -> 1 2 ; 1 -> ; 2 -> 1 ; 3 -> 4
        let table = RuleTable::new(
            vec![rule(0, &[1, 2]), rule(1, &[]), rule(2, &[1]), rule(3, &[4])], 5);
        assert!(table.is_nullable(0) && table.is_nullable(1) && table.is_nullable(2));
        assert!(!table.is_nullable(3) && !table.is_nullable(4));
        assert_eq!(table.rules_for(2), &[2]);
        assert!(!table.has_rules(4));
        assert!(!table.has_rules(99));
    }

    #[test]
    fn builtin_actions() {
        assert_eq!(Action::parse("::first"), Action::First);
        assert_eq!(Action::parse("::array"), Action::Array);
        assert_eq!(Action::parse("::undef"), Action::Undef);
        assert_eq!(Action::parse("do_add"), Action::Named("do_add".to_string()));
        assert_eq!(Action::parse("do_add").to_string(), "do_add");
    }
}
