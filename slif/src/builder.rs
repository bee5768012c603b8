use crate::charclass::CharClass;
use crate::error::{CompileError, CompileErrorKind, Location};
use crate::grammar::{Action, Grammar, Rule, RuleTable, Semantics, Symbol, SymbolId, SymbolKind};
use crate::syntax::{Adverb, Alternative, Quantifier, RhsItem, Statement};
use indexmap::{IndexMap, IndexSet};
use lexers::{unescape, LineIndex};
use std::collections::{HashMap, HashSet};

/// Builds a Grammar from statements while validating symbols and rules.
///
/// Text grammars are parsed into statements first (see `Grammar::compile`),
/// programmatic grammars push them directly:
///
/// ```
/// use slif::GrammarBuilder;
/// let grammar = GrammarBuilder::default()
///     .rule_action("sum", &["sum", "'+'", "num"], "do_add")
///     .rule("sum", &["num"])
///     .lexeme("num", &["[0-9]+"])
///     .lexeme("ws", &["[\\s]+"])
///     .discard("ws")
///     .into_grammar()
///     .unwrap();
/// assert_eq!(grammar.name(grammar.start()), "sum");
/// ```
#[derive(Clone, Debug, Default)]
pub struct GrammarBuilder {
    statements: Vec<Statement>,
    source: Option<String>,
    description: Option<String>,
}

impl GrammarBuilder {
    pub(crate) fn from_source(statements: Vec<Statement>, source: &str, description: &str) -> Self {
        GrammarBuilder{
            statements,
            source: Some(source.to_string()),
            description: Some(description.to_string()),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Non chaining version, convenient to add statements in loops.
    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn alternative(self, lhs: &str, alternative: Alternative) -> Self {
        self.statement(Statement::Structural{
            lhs: lhs.to_string(), tiers: vec![vec![alternative]], offset: 0})
    }

    pub fn rule<S: AsRef<str>>(self, lhs: &str, rhs: &[S]) -> Self {
        self.alternative(lhs, Alternative::new(rhs))
    }

    pub fn rule_action<S: AsRef<str>>(self, lhs: &str, rhs: &[S], action: &str) -> Self {
        self.alternative(lhs, Alternative::new(rhs).adverb("action", action))
    }

    /// Tiers are listed tightest first, as with `||` in grammar text.
    pub fn prioritized(self, lhs: &str, tiers: Vec<Vec<Alternative>>) -> Self {
        self.statement(Statement::Structural{lhs: lhs.to_string(), tiers, offset: 0})
    }

    pub fn lexeme<S: AsRef<str>>(self, name: &str, rhs: &[S]) -> Self {
        self.statement(Statement::Lexical{
            lhs: name.to_string(), alternatives: vec![Alternative::new(rhs)], offset: 0})
    }

    pub fn discard(self, element: &str) -> Self {
        self.statement(Statement::Discard{element: element.to_string(), offset: 0})
    }

    pub fn start(self, symbol: &str) -> Self {
        self.statement(Statement::Start{symbol: symbol.to_string(), offset: 0})
    }

    pub fn default_action(self, action: &str) -> Self {
        self.statement(Statement::Default{adverbs: vec![Adverb::new("action", action)], offset: 0})
    }

    pub fn latm(self, latm: bool) -> Self {
        let value = if latm { "1" } else { "0" };
        self.statement(Statement::LexemeDefault{adverbs: vec![Adverb::new("latm", value)], offset: 0})
    }

    pub fn into_grammar(self) -> Result<Grammar> {
        let description = self.description.unwrap_or_else(|| "grammar".to_string());
        let lowering = Lowering::new(self.source.as_deref());
        lowering.lower(&self.statements, &description)
            .map_err(|mut err| {
                err.description = description.clone();
                err
            })
    }
}

type Result<T> = std::result::Result<T, CompileError>;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Element {
    Name(String),
    Literal(String),
    Class(CharClass),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
    Group,
}

#[derive(Debug)]
struct RuleAdverbs {
    action: Option<Action>,
    assoc: Assoc,
    rank: i32,
    separator: Option<(String, usize)>,
    proper: bool,
    keep: bool,
}

// Rewrites statements into the two rule tables of a Grammar
struct Lowering<'a> {
    index: Option<LineIndex<'a>>,
    symbols: Vec<Symbol>,
    // offset of the statement that introduced each symbol
    offsets: Vec<usize>,
    named: HashMap<String, SymbolId>,
    anonymous: HashMap<String, SymbolId>,
    chars: HashMap<String, SymbolId>,
    g1_defs: IndexMap<String, usize>,
    l0_defs: IndexMap<String, usize>,
    g1_rules: Vec<Rule>,
    l0_rules: Vec<Rule>,
    declared: HashSet<(bool, SymbolId, Vec<SymbolId>)>,
    g1_lexemes: IndexSet<SymbolId>,
    discards: IndexSet<SymbolId>,
    // named lexical symbol -> named lexical symbols it references
    l0_refs: Vec<(SymbolId, SymbolId)>,
}

impl<'a> Lowering<'a> {
    fn new(source: Option<&'a str>) -> Self {
        Lowering{
            index: source.map(LineIndex::new),
            symbols: Vec::new(),
            offsets: Vec::new(),
            named: HashMap::new(),
            anonymous: HashMap::new(),
            chars: HashMap::new(),
            g1_defs: IndexMap::new(),
            l0_defs: IndexMap::new(),
            g1_rules: Vec::new(),
            l0_rules: Vec::new(),
            declared: HashSet::new(),
            g1_lexemes: IndexSet::new(),
            discards: IndexSet::new(),
            l0_refs: Vec::new(),
        }
    }

    fn fail(&self, kind: CompileErrorKind, message: String, offset: usize) -> CompileError {
        let mut err = CompileError::new(kind, message);
        if let Some(index) = &self.index {
            let (line, column) = index.line_col(offset);
            err = err.at(Some(Location{line, column}));
            err.line_text = index.line_text(line).map(str::to_string);
        }
        err
    }

    fn malformed(&self, message: String, offset: usize) -> CompileError {
        self.fail(CompileErrorKind::MalformedRule, message, offset)
    }

    fn lower(mut self, statements: &[Statement], description: &str) -> Result<Grammar> {
        let mut start = None;
        let mut default_action = None;
        let mut latm = None;
        let mut prioritized = HashSet::new();
        for statement in statements {
            match statement {
                Statement::Structural{lhs, tiers, offset} => {
                    let name = self.symbol_name(lhs, *offset)?;
                    if tiers.is_empty() || tiers.iter().any(|t| t.is_empty()) {
                        return Err(self.malformed(
                            format!("Rule for '{}' has an empty alternative list", name), *offset));
                    }
                    let is_prioritized = tiers.len() > 1 || prioritized.contains(&name);
                    if is_prioritized && self.g1_defs.contains_key(&name) {
                        return Err(self.malformed(
                            format!("Prioritized symbol '{}' must be defined by a single rule", name),
                            *offset));
                    }
                    if tiers.len() > 1 {
                        prioritized.insert(name.clone());
                    }
                    self.g1_defs.entry(name).or_insert(*offset);
                }
                Statement::Lexical{lhs, alternatives, offset} => {
                    let name = self.symbol_name(lhs, *offset)?;
                    if alternatives.is_empty() {
                        return Err(self.malformed(
                            format!("Rule for '{}' has an empty alternative list", name), *offset));
                    }
                    self.l0_defs.entry(name).or_insert(*offset);
                }
                Statement::Start{symbol, offset} => {
                    if start.is_some() {
                        return Err(self.malformed("Duplicate :start declaration".to_string(), *offset));
                    }
                    start = Some((symbol.clone(), *offset));
                }
                Statement::Default{adverbs, offset} => {
                    if default_action.is_some() {
                        return Err(self.malformed("Duplicate :default declaration".to_string(), *offset));
                    }
                    default_action = Some(self.default_adverbs(adverbs, *offset)?);
                }
                Statement::LexemeDefault{adverbs, offset} => {
                    if latm.is_some() {
                        return Err(self.malformed(
                            "Duplicate lexeme default declaration".to_string(), *offset));
                    }
                    latm = Some(self.lexeme_adverbs(adverbs, *offset)?);
                }
                Statement::Discard{..} => (),
            }
        }
        for (name, offset) in &self.l0_defs {
            if self.g1_defs.contains_key(name) {
                return Err(self.malformed(
                    format!("Symbol '{}' has both structural and lexical rules", name), *offset));
            }
        }

        let g1_defs: Vec<_> = self.g1_defs.iter().map(|(n, o)| (n.clone(), *o)).collect();
        for (name, offset) in g1_defs {
            let id = self.add_symbol(name.clone(), SymbolKind::Nonterminal, offset);
            self.named.insert(name, id);
        }
        let l0_defs: Vec<_> = self.l0_defs.iter().map(|(n, o)| (n.clone(), *o)).collect();
        for (name, offset) in l0_defs {
            let id = self.add_symbol(name.clone(), SymbolKind::Lexical, offset);
            self.named.insert(name, id);
        }

        for statement in statements {
            if let Statement::Discard{element, offset} = statement {
                let id = self.discard_symbol(element, *offset)?;
                self.discards.insert(id);
            }
        }
        for statement in statements {
            if let Statement::Structural{lhs, tiers, offset} = statement {
                self.structural(lhs, tiers, *offset)?;
            }
        }
        for statement in statements {
            if let Statement::Lexical{lhs, alternatives, offset} = statement {
                self.lexical(lhs, alternatives, *offset)?;
            }
        }
        if let Some(id) = self.discards.iter().find(|d| self.g1_lexemes.contains(*d)) {
            return Err(self.malformed(
                format!("Symbol '{}' is both a lexeme and discarded", self.symbols[*id].name),
                self.offsets[*id]));
        }

        let start = self.start_symbol(start)?;
        let num_symbols = self.symbols.len();
        let g1 = RuleTable::new(std::mem::take(&mut self.g1_rules), num_symbols);
        let l0 = RuleTable::new(std::mem::take(&mut self.l0_rules), num_symbols);
        self.check_lexical_cycles()?;
        self.check_empty_lexemes(&l0)?;
        self.check_structural_cycles(&g1)?;

        let grammar = Grammar{
            symbols: self.symbols,
            g1,
            l0,
            start,
            discards: self.discards.into_iter().collect(),
            latm: latm.unwrap_or(false),
            default_action,
            description: description.to_string(),
        };
        log::debug!("{}: compiled {} symbols, {} structural and {} lexical rules",
                    grammar.description, grammar.symbols.len(),
                    grammar.g1.rules().len(), grammar.l0.rules().len());
        Ok(grammar)
    }

    /* Symbols and elements */

    fn add_symbol(&mut self, name: String, kind: SymbolKind, offset: usize) -> SymbolId {
        self.symbols.push(Symbol{name, kind});
        self.offsets.push(offset);
        self.symbols.len() - 1
    }

    fn symbol_name(&self, raw: &str, offset: usize) -> Result<String> {
        match self.decode(raw, offset)? {
            Element::Name(name) => Ok(name),
            _ => Err(self.malformed(format!("Expected a symbol name, found {}", raw), offset)),
        }
    }

    fn decode(&self, raw: &str, offset: usize) -> Result<Element> {
        let raw = raw.trim();
        let quoted = |open: char, close: char| {
            raw.len() >= 2 && raw.starts_with(open) && raw.ends_with(close)
        };
        let inner = raw.get(1..raw.len().saturating_sub(1)).unwrap_or("");
        if quoted('[', ']') {
            CharClass::parse(inner)
                .map(Element::Class)
                .map_err(|e| self.malformed(format!("Bad char class {}: {}", raw, e), offset))
        } else if quoted('\'', '\'') || quoted('"', '"') {
            match unescape(inner) {
                Ok(text) if text.is_empty() =>
                    Err(self.malformed(format!("Empty literal {}", raw), offset)),
                Ok(text) => Ok(Element::Literal(text)),
                Err(e) => Err(self.malformed(format!("Bad literal {}: {}", raw, e), offset)),
            }
        } else if quoted('<', '>') {
            let name = inner.split_whitespace().collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return Err(self.malformed("Empty bracketed name".to_string(), offset));
            }
            Ok(Element::Name(name))
        } else if !raw.is_empty() && raw.chars().all(|c| c.is_alphanumeric() || c == '_') {
            Ok(Element::Name(raw.to_string()))
        } else {
            Err(self.malformed(format!("Bad symbol {}", raw), offset))
        }
    }

    fn char_symbol(&mut self, class: CharClass, offset: usize) -> SymbolId {
        let key = class.to_string();
        if let Some(id) = self.chars.get(&key) {
            return *id;
        }
        let id = self.add_symbol(key.clone(), SymbolKind::Char(class), offset);
        self.chars.insert(key, id);
        id
    }

    fn chars_of(&mut self, element: Element, offset: usize) -> Vec<SymbolId> {
        match element {
            Element::Literal(text) => text.chars()
                .map(|c| self.char_symbol(CharClass::single(c), offset))
                .collect(),
            Element::Class(class) => vec![self.char_symbol(class, offset)],
            Element::Name(_) => Vec::new(),
        }
    }

    // literals and classes written in structural rules become lexemes
    fn anonymous_lexeme(&mut self, element: Element, offset: usize) -> SymbolId {
        let name = match &element {
            Element::Literal(text) => format!("'{}'", text.escape_default()),
            Element::Class(class) => class.to_string(),
            Element::Name(name) => name.clone(),
        };
        if let Some(id) = self.anonymous.get(&name) {
            return *id;
        }
        let id = self.add_symbol(name.clone(), SymbolKind::Lexeme, offset);
        self.anonymous.insert(name.clone(), id);
        let rhs = self.chars_of(element, offset);
        self.push_rule(false, id, rhs, &name, Semantics::Apply(None), None, 0);
        id
    }

    fn named_lexeme(&mut self, name: &str, offset: usize) -> Result<SymbolId> {
        if self.l0_defs.contains_key(name) {
            let id = self.named[name];
            self.symbols[id].kind = SymbolKind::Lexeme;
            Ok(id)
        } else {
            Err(self.fail(CompileErrorKind::UndefinedSymbol, format!("Missing Symbol: {}", name), offset))
        }
    }

    fn g1_symbol(&mut self, raw: &str, offset: usize) -> Result<SymbolId> {
        let id = match self.decode(raw, offset)? {
            Element::Name(name) if self.g1_defs.contains_key(&name) => return Ok(self.named[&name]),
            Element::Name(name) => self.named_lexeme(&name, offset)?,
            element => self.anonymous_lexeme(element, offset),
        };
        self.g1_lexemes.insert(id);
        Ok(id)
    }

    fn discard_symbol(&mut self, raw: &str, offset: usize) -> Result<SymbolId> {
        match self.decode(raw, offset)? {
            Element::Name(name) if self.g1_defs.contains_key(&name) => Err(self.malformed(
                format!("Structural symbol '{}' cannot be discarded", name), offset)),
            Element::Name(name) => self.named_lexeme(&name, offset),
            element => Ok(self.anonymous_lexeme(element, offset)),
        }
    }

    /* Adverbs */

    fn adverb_flag(&self, adverb: &Adverb) -> Result<bool> {
        match adverb.value.as_str() {
            "0" => Ok(false),
            "1" => Ok(true),
            v => Err(self.malformed(
                format!("Adverb '{}' expects 0 or 1, found {}", adverb.name, v), adverb.offset)),
        }
    }

    fn check_unique(&self, adverbs: &[Adverb]) -> Result<()> {
        let mut seen = HashSet::new();
        match adverbs.iter().find(|a| !seen.insert(a.name.as_str())) {
            Some(dup) => Err(self.malformed(format!("Duplicate adverb '{}'", dup.name), dup.offset)),
            None => Ok(()),
        }
    }

    fn rule_adverbs(&self, adverbs: &[Adverb], sequence: bool) -> Result<RuleAdverbs> {
        self.check_unique(adverbs)?;
        let mut out = RuleAdverbs{
            action: None, assoc: Assoc::Left, rank: 0, separator: None, proper: false, keep: false};
        for adverb in adverbs {
            let value = adverb.value.as_str();
            if !sequence && ["separator", "proper", "keep"].contains(&adverb.name.as_str()) {
                return Err(self.malformed(
                    format!("Adverb '{}' only applies to sequence rules", adverb.name), adverb.offset));
            }
            match adverb.name.as_str() {
                "action" => out.action = Some(Action::parse(value)),
                "assoc" => out.assoc = match value {
                    "left" => Assoc::Left,
                    "right" => Assoc::Right,
                    "group" => Assoc::Group,
                    v => return Err(self.malformed(format!("Unknown assoc '{}'", v), adverb.offset)),
                },
                "rank" => out.rank = value.parse().map_err(|_| self.malformed(
                    format!("Rank must be an integer, found {}", value), adverb.offset))?,
                "separator" => out.separator = Some((value.to_string(), adverb.offset)),
                "proper" => out.proper = self.adverb_flag(adverb)?,
                "keep" => out.keep = self.adverb_flag(adverb)?,
                other => return Err(self.malformed(format!("Unknown adverb '{}'", other), adverb.offset)),
            }
        }
        Ok(out)
    }

    fn default_adverbs(&self, adverbs: &[Adverb], offset: usize) -> Result<Action> {
        self.check_unique(adverbs)?;
        match adverbs {
            [a] if a.name == "action" => Ok(Action::parse(&a.value)),
            _ => Err(self.malformed(":default takes a single action adverb".to_string(), offset)),
        }
    }

    fn lexeme_adverbs(&self, adverbs: &[Adverb], offset: usize) -> Result<bool> {
        self.check_unique(adverbs)?;
        match adverbs {
            [a] if a.name == "latm" => self.adverb_flag(a),
            _ => Err(self.malformed("lexeme default takes a single latm adverb".to_string(), offset)),
        }
    }

    /* Rules */

    #[allow(clippy::too_many_arguments)]
    fn push_rule(&mut self, structural: bool, lhs: SymbolId, rhs: Vec<SymbolId>, name: &str,
                 semantics: Semantics, mask: Option<Vec<bool>>, rank: i32) {
        let display = format!("{} -> {}", self.symbols[lhs].name,
                              rhs.iter().map(|s| self.symbols[*s].name.as_str())
                                 .collect::<Vec<_>>().join(" "));
        let mask = mask.unwrap_or_else(|| vec![true; rhs.len()]);
        let rule = Rule{lhs, rhs, name: name.to_string(), semantics, mask, rank, display};
        if structural {
            self.g1_rules.push(rule);
        } else {
            self.l0_rules.push(rule);
        }
    }

    // rules the author wrote must not repeat
    #[allow(clippy::too_many_arguments)]
    fn push_declared(&mut self, structural: bool, lhs: SymbolId, rhs: Vec<SymbolId>, name: &str,
                     semantics: Semantics, rank: i32, offset: usize) -> Result<()> {
        if !self.declared.insert((structural, lhs, rhs.clone())) {
            let names: Vec<_> = rhs.iter().map(|s| self.symbols[*s].name.as_str()).collect();
            return Err(self.malformed(format!("Duplicate Rule: {} -> {}",
                                              self.symbols[lhs].name, names.join(" ")), offset));
        }
        self.push_rule(structural, lhs, rhs, name, semantics, None, rank);
        Ok(())
    }

    fn structural(&mut self, lhs: &str, tiers: &[Vec<Alternative>], offset: usize) -> Result<()> {
        let name = self.symbol_name(lhs, offset)?;
        let lhs = self.named[&name];
        if tiers.len() > 1 {
            return self.precedence(lhs, &name, tiers);
        }
        let alternatives = &tiers[0];
        for alt in alternatives {
            let quantified = alt.rhs.iter().find(|item| item.quantifier != Quantifier::One);
            match (quantified, alt.rhs.len()) {
                (None, _) => {
                    let adverbs = self.rule_adverbs(&alt.adverbs, false)?;
                    let rhs = self.g1_rhs(&alt.rhs)?;
                    self.push_declared(true, lhs, rhs, &name, Semantics::Apply(adverbs.action),
                                       adverbs.rank, alt.offset)?;
                }
                (Some(item), 1) if item.quantifier != Quantifier::Optional
                                   && alternatives.len() == 1 => {
                    self.sequence(lhs, &name, alt)?;
                }
                (Some(item), _) => return Err(self.malformed(
                    "Structural quantifiers (* +) are only allowed in a single-symbol sequence rule"
                        .to_string(), item.offset)),
            }
        }
        Ok(())
    }

    fn g1_rhs(&mut self, items: &[RhsItem]) -> Result<Vec<SymbolId>> {
        items.iter().map(|item| self.g1_symbol(&item.element, item.offset)).collect()
    }

    // lhs ::= item* separator => sep
    //   lhs ::= Seq | Seq sep (not proper) | (empty, for *)
    //   Seq ::= item | Seq sep item
    fn sequence(&mut self, lhs: SymbolId, name: &str, alt: &Alternative) -> Result<()> {
        let item = &alt.rhs[0];
        let adverbs = self.rule_adverbs(&alt.adverbs, true)?;
        let element = self.g1_symbol(&item.element, item.offset)?;
        let separator = match &adverbs.separator {
            Some((raw, offset)) => Some(self.g1_symbol(raw, *offset)?),
            None => None,
        };
        let seq = self.add_symbol(format!("{}[Seq]", name), SymbolKind::Nonterminal, alt.offset);
        let apply = Semantics::Apply(adverbs.action.clone());
        let keep = adverbs.keep;
        self.push_rule(true, seq, vec![element], name, Semantics::Splice, None, 0);
        match separator {
            None => self.push_rule(true, seq, vec![seq, element], name, Semantics::Splice, None, 0),
            Some(sep) => self.push_rule(true, seq, vec![seq, sep, element], name,
                                        Semantics::Splice, Some(vec![true, keep, true]), 0),
        }
        self.push_rule(true, lhs, vec![seq], name, apply.clone(), None, adverbs.rank);
        if let (Some(sep), false) = (separator, adverbs.proper) {
            self.push_rule(true, lhs, vec![seq, sep], name, apply.clone(),
                           Some(vec![true, keep]), adverbs.rank);
        }
        if item.quantifier == Quantifier::Star {
            self.push_rule(true, lhs, Vec::new(), name, apply, None, adverbs.rank);
        }
        Ok(())
    }

    // E ::= a || E op E || ...  becomes tiered symbols E[0] (tightest) .. E[n-1]
    //   E ::= E[n-1],  E[p] ::= E[p-1],  E[p] ::= alternatives of tier p
    fn precedence(&mut self, lhs: SymbolId, name: &str, tiers: &[Vec<Alternative>]) -> Result<()> {
        let offset = self.offsets[lhs];
        let levels: Vec<SymbolId> = (0..tiers.len())
            .map(|p| self.add_symbol(format!("{}[{}]", name, p), SymbolKind::Nonterminal, offset))
            .collect();
        let loosest = levels[levels.len() - 1];
        self.push_rule(true, lhs, vec![loosest], name, Semantics::Splice, None, 0);
        for p in 1..levels.len() {
            self.push_rule(true, levels[p], vec![levels[p - 1]], name, Semantics::Splice, None, 0);
        }
        for (p, alternatives) in tiers.iter().enumerate() {
            let current = levels[p];
            let tighter = levels[p.saturating_sub(1)];
            for alt in alternatives {
                if let Some(item) = alt.rhs.iter().find(|i| i.quantifier != Quantifier::One) {
                    return Err(self.malformed(
                        "Quantifiers are not allowed in prioritized rules".to_string(), item.offset));
                }
                let adverbs = self.rule_adverbs(&alt.adverbs, false)?;
                let mut operands = Vec::new();
                for (i, item) in alt.rhs.iter().enumerate() {
                    if self.decode(&item.element, item.offset)? == Element::Name(name.to_string()) {
                        operands.push(i);
                    }
                }
                let mut rhs = self.g1_rhs(&alt.rhs)?;
                let (first, last) = (operands.first().copied(), operands.last().copied());
                for i in operands {
                    rhs[i] = match adverbs.assoc {
                        Assoc::Left if Some(i) == first => current,
                        Assoc::Right if Some(i) == last => current,
                        Assoc::Group => lhs,
                        _ => tighter,
                    };
                }
                self.push_declared(true, current, rhs, name, Semantics::Apply(adverbs.action),
                                   adverbs.rank, alt.offset)?;
            }
        }
        Ok(())
    }

    fn lexical(&mut self, lhs: &str, alternatives: &[Alternative], offset: usize) -> Result<()> {
        let name = self.symbol_name(lhs, offset)?;
        let lhs = self.named[&name];
        for alt in alternatives {
            if let Some(adverb) = alt.adverbs.first() {
                return Err(self.malformed(
                    format!("Adverb '{}' is not allowed in lexical rules", adverb.name), adverb.offset));
            }
            let mut rhs = Vec::new();
            for item in &alt.rhs {
                let body = match self.decode(&item.element, item.offset)? {
                    Element::Name(n) if self.g1_defs.contains_key(&n) => return Err(self.malformed(
                        format!("Structural symbol '{}' used in lexical rule", n), item.offset)),
                    Element::Name(n) => match self.named.get(&n).copied() {
                        Some(id) if self.l0_defs.contains_key(&n) => {
                            self.l0_refs.push((lhs, id));
                            vec![id]
                        }
                        _ => return Err(self.fail(CompileErrorKind::UndefinedSymbol,
                                                  format!("Missing Symbol: {}", n), item.offset)),
                    },
                    element => self.chars_of(element, item.offset),
                };
                match item.quantifier {
                    Quantifier::One => rhs.extend(body),
                    q => rhs.push(self.quantified(&name, body, q, item.offset)),
                }
            }
            self.push_declared(false, lhs, rhs, &name, Semantics::Apply(None), 0, alt.offset)?;
        }
        Ok(())
    }

    fn quantified(&mut self, name: &str, body: Vec<SymbolId>, q: Quantifier, offset: usize) -> SymbolId {
        let aux_name = format!("{}[{}]", name, self.symbols.len());
        let aux = self.add_symbol(aux_name.clone(), SymbolKind::Lexical, offset);
        let mut repeat = vec![aux];
        repeat.extend(body.iter().copied());
        let apply = || Semantics::Apply(None);
        match q {
            Quantifier::Optional => {
                self.push_rule(false, aux, body, &aux_name, apply(), None, 0);
                self.push_rule(false, aux, Vec::new(), &aux_name, apply(), None, 0);
            }
            Quantifier::Star => {
                self.push_rule(false, aux, Vec::new(), &aux_name, apply(), None, 0);
                self.push_rule(false, aux, repeat, &aux_name, apply(), None, 0);
            }
            Quantifier::Plus | Quantifier::One => {
                self.push_rule(false, aux, body, &aux_name, apply(), None, 0);
                self.push_rule(false, aux, repeat, &aux_name, apply(), None, 0);
            }
        }
        aux
    }

    fn start_symbol(&self, declared: Option<(String, usize)>) -> Result<SymbolId> {
        match declared {
            Some((raw, offset)) => {
                let name = self.symbol_name(&raw, offset)?;
                if self.g1_defs.contains_key(&name) {
                    Ok(self.named[&name])
                } else {
                    Err(self.fail(CompileErrorKind::NoStartRule,
                                  format!("Start symbol '{}' has no structural rules", name), offset))
                }
            }
            None => match self.g1_defs.keys().next() {
                Some(first) => Ok(self.named[first]),
                None => Err(self.fail(CompileErrorKind::NoStartRule,
                                      "Grammar has no structural rules".to_string(), 0)),
            },
        }
    }

    /* Validation */

    fn cycle_message(&self, what: &str, cycle: &[SymbolId]) -> CompileError {
        let path: Vec<_> = cycle.iter().map(|s| self.symbols[*s].name.as_str()).collect();
        self.malformed(format!("{}: {}", what, path.join(" -> ")), self.offsets[cycle[0]])
    }

    fn check_lexical_cycles(&self) -> Result<()> {
        let mut edges = vec![Vec::new(); self.symbols.len()];
        for (from, to) in &self.l0_refs {
            edges[*from].push(*to);
        }
        match find_cycle(&edges) {
            Some(cycle) => Err(self.cycle_message("Lexical rules reference themselves", &cycle)),
            None => Ok(()),
        }
    }

    fn check_empty_lexemes(&self, l0: &RuleTable) -> Result<()> {
        match self.g1_lexemes.iter().chain(&self.discards).find(|id| l0.is_nullable(**id)) {
            Some(id) => Err(self.malformed(
                format!("Lexeme '{}' can match empty input", self.symbols[*id].name),
                self.offsets[*id])),
            None => Ok(()),
        }
    }

    // A =>+ A through rules whose other RHS symbols can all be empty
    fn check_structural_cycles(&self, g1: &RuleTable) -> Result<()> {
        let mut edges = vec![Vec::new(); self.symbols.len()];
        for rule in g1.rules() {
            for (i, sym) in rule.rhs.iter().enumerate() {
                let others_null = rule.rhs.iter().enumerate()
                    .all(|(j, o)| j == i || g1.is_nullable(*o));
                if g1.has_rules(*sym) && others_null {
                    edges[rule.lhs].push(*sym);
                }
            }
        }
        match find_cycle(&edges) {
            Some(cycle) => Err(self.cycle_message("Rule cycle", &cycle)),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    New,
    Active,
    Done,
}

fn find_cycle(edges: &[Vec<SymbolId>]) -> Option<Vec<SymbolId>> {
    fn visit(node: SymbolId, edges: &[Vec<SymbolId>], marks: &mut [Mark],
             path: &mut Vec<SymbolId>) -> Option<Vec<SymbolId>> {
        marks[node] = Mark::Active;
        path.push(node);
        for next in &edges[node] {
            match marks[*next] {
                Mark::Active => {
                    let from = path.iter().position(|p| p == next)?;
                    let mut cycle = path[from..].to_vec();
                    cycle.push(*next);
                    return Some(cycle);
                }
                Mark::New => {
                    if let Some(cycle) = visit(*next, edges, marks, path) {
                        return Some(cycle);
                    }
                }
                Mark::Done => (),
            }
        }
        path.pop();
        marks[node] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::New; edges.len()];
    let mut path = Vec::new();
    for node in 0..edges.len() {
        if marks[node] == Mark::New {
            if let Some(cycle) = visit(node, edges, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}
