//! Grammar statements as written, before lowering into rule tables.
//!
//! RHS elements and adverb values keep their source spelling (`name`,
//! `<long name>`, `'lit'`, `"lit"`, `[class]`); `GrammarBuilder` decodes
//! and validates them so both the text compiler and programmatic users go
//! through the same checks. Offsets are byte offsets into the grammar text.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantifier {
    One,
    Optional,
    Star,
    Plus,
}

impl Quantifier {
    pub fn from_char(c: char) -> Option<Quantifier> {
        match c {
            '?' => Some(Quantifier::Optional),
            '*' => Some(Quantifier::Star),
            '+' => Some(Quantifier::Plus),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RhsItem {
    pub element: String,
    pub quantifier: Quantifier,
    pub offset: usize,
}

impl RhsItem {
    /// Split an optional trailing quantifier off an item like `[0-9]+`.
    /// Quoted literals keep a trailing `+` that is part of the quotes.
    pub fn parse(item: &str) -> RhsItem {
        let item = item.trim();
        let mut chars = item.chars();
        let last = chars.next_back();
        let body = chars.as_str();
        let closed = body.ends_with(|c: char| c == ']' || c == '\'' || c == '"' || c == '>'
                                    || c.is_alphanumeric() || c == '_');
        match last.and_then(Quantifier::from_char) {
            Some(quantifier) if closed && !is_open_literal(body) =>
                RhsItem{element: body.to_string(), quantifier, offset: 0},
            _ => RhsItem{element: item.to_string(), quantifier: Quantifier::One, offset: 0},
        }
    }
}

// `'+'` ends in a quote, `'a+` would be an unterminated literal
fn is_open_literal(item: &str) -> bool {
    match item.chars().next() {
        Some(q @ ('\'' | '"')) => !(item.len() > 1 && item.ends_with(q)),
        _ => false,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adverb {
    pub name: String,
    pub value: String,
    pub offset: usize,
}

impl Adverb {
    pub fn new(name: &str, value: &str) -> Adverb {
        Adverb{name: name.to_string(), value: value.to_string(), offset: 0}
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alternative {
    pub rhs: Vec<RhsItem>,
    pub adverbs: Vec<Adverb>,
    pub offset: usize,
}

impl Alternative {
    pub fn new<S: AsRef<str>>(rhs: &[S]) -> Alternative {
        Alternative{
            rhs: rhs.iter().map(|s| RhsItem::parse(s.as_ref())).collect(),
            adverbs: Vec::new(),
            offset: 0,
        }
    }

    pub fn adverb(mut self, name: &str, value: &str) -> Alternative {
        self.adverbs.push(Adverb::new(name, value));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// `:start ::= symbol`
    Start { symbol: String, offset: usize },
    /// `:default ::= action => name`
    Default { adverbs: Vec<Adverb>, offset: usize },
    /// `:discard ~ element`
    Discard { element: String, offset: usize },
    /// `lexeme default = latm => 1`
    LexemeDefault { adverbs: Vec<Adverb>, offset: usize },
    /// `lhs ::= alt | alt || alt`, tiers listed tightest first
    Structural { lhs: String, tiers: Vec<Vec<Alternative>>, offset: usize },
    /// `lhs ~ alt | alt`
    Lexical { lhs: String, alternatives: Vec<Alternative>, offset: usize },
}

impl Statement {
    pub fn offset(&self) -> usize {
        match self {
            Statement::Start{offset, ..}
            | Statement::Default{offset, ..}
            | Statement::Discard{offset, ..}
            | Statement::LexemeDefault{offset, ..}
            | Statement::Structural{offset, ..}
            | Statement::Lexical{offset, ..} => *offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rhs_item_quantifiers() {
        let cases = vec![
            ("[0-9]+", "[0-9]", Quantifier::Plus),
            ("digit*", "digit", Quantifier::Star),
            ("<long name>?", "<long name>", Quantifier::Optional),
            ("'+'", "'+'", Quantifier::One),
            ("'+'+", "'+'", Quantifier::Plus),
            ("'a+", "'a+", Quantifier::One),
            ("expr", "expr", Quantifier::One),
            ("+", "+", Quantifier::One),
        ];
        for (text, element, quantifier) in cases {
            let item = RhsItem::parse(text);
            assert_eq!(item.element, element, "text {}", text);
            assert_eq!(item.quantifier, quantifier, "text {}", text);
        }
    }
}
