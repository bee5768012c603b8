use lexers::{scan_escape, Escaped, EscapeError, Scanner};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum ClassItem {
    Char(char),
    Range(char, char),
    // \s \d \w and their negations (uppercase)
    Shorthand(char),
}

impl ClassItem {
    fn matches(&self, c: char) -> bool {
        match *self {
            ClassItem::Char(x) => x == c,
            ClassItem::Range(lo, hi) => lo <= c && c <= hi,
            ClassItem::Shorthand(s) => {
                let hit = match s.to_ascii_lowercase() {
                    's' => c.is_whitespace(),
                    'd' => c.is_ascii_digit(),
                    _ => c.is_alphanumeric() || c == '_',
                };
                hit == s.is_ascii_lowercase()
            }
        }
    }
}

/// A set of chars, the only kind of terminal the lexical grammar knows.
/// Literal strings are lowered into sequences of single-char classes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CharClass {
    negated: bool,
    items: Vec<ClassItem>,
    // text as written in the grammar, eg: "[a-z_]" or "'+'"
    repr: String,
}

impl CharClass {
    pub fn single(c: char) -> CharClass {
        CharClass{negated: false, items: vec![ClassItem::Char(c)], repr: format!("{:?}", c)}
    }

    /// Parse the body of a bracketed class, ie: without the outer `[` `]`.
    pub fn parse(body: &str) -> Result<CharClass, EscapeError> {
        let mut s = Scanner::from_str(body);
        let negated = s.accept_char('^');
        let mut items = Vec::new();
        while let Some(c) = s.next() {
            let lo = match c {
                '\\' => match scan_escape(&mut s)? {
                    Escaped::Shorthand(x) => {
                        items.push(ClassItem::Shorthand(x));
                        continue;
                    }
                    Escaped::Char(x) => x,
                },
                c => c,
            };
            // a '-' closing the class is a literal dash
            let backtrack = s.offset();
            let upper = if s.accept_char('-') { s.next() } else { None };
            let hi = match upper {
                None => {
                    s.set_pos(backtrack);
                    items.push(ClassItem::Char(lo));
                    continue;
                }
                Some('\\') => match scan_escape(&mut s)? {
                    Escaped::Char(x) => x,
                    Escaped::Shorthand(x) => return Err(EscapeError{
                        offset: s.offset(),
                        message: format!("Class shorthand \\{} as range bound", x)}),
                },
                Some(x) => x,
            };
            if hi < lo {
                return Err(EscapeError{
                    offset: s.offset(),
                    message: format!("Inverted range {:?}-{:?}", lo, hi)});
            }
            items.push(ClassItem::Range(lo, hi));
        }
        if items.is_empty() {
            return Err(EscapeError{offset: 0, message: "Empty char class".to_string()});
        }
        Ok(CharClass{negated, items, repr: format!("[{}]", body)})
    }

    pub fn matches(&self, c: char) -> bool {
        self.items.iter().any(|item| item.matches(c)) != self.negated
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.repr)
    }
}

impl fmt::Debug for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CharClass({})", self.repr)
    }
}

#[cfg(test)]
mod tests {
    use super::CharClass;

    #[test]
    fn ranges_and_chars() {
        let cc = CharClass::parse("a-cx_").unwrap();
        assert!(cc.matches('a') && cc.matches('b') && cc.matches('c'));
        assert!(cc.matches('x') && cc.matches('_'));
        assert!(!cc.matches('d'));
        assert_eq!(cc.to_string(), "[a-cx_]");
    }

    #[test]
    fn negation_and_dashes() {
        let cc = CharClass::parse("^-+").unwrap();
        assert!(!cc.matches('-') && !cc.matches('+'));
        assert!(cc.matches('a'));
        let cc = CharClass::parse("+-").unwrap();
        assert!(cc.matches('-') && cc.matches('+') && !cc.matches(','));
    }

    #[test]
    fn shorthands() {
        let ws = CharClass::parse(r"\s").unwrap();
        assert!(ws.matches(' ') && ws.matches('\n') && !ws.matches('a'));
        let not_ws = CharClass::parse(r"\S").unwrap();
        assert!(!not_ws.matches(' ') && not_ws.matches('a'));
        let word = CharClass::parse(r"\w\-").unwrap();
        assert!(word.matches('_') && word.matches('9') && word.matches('-'));
        assert!(!word.matches(' '));
        let digits = CharClass::parse(r"\d.").unwrap();
        assert!(digits.matches('7') && digits.matches('.') && !digits.matches('a'));
    }

    #[test]
    fn escaped_brackets() {
        let cc = CharClass::parse(r"\]\[\\").unwrap();
        assert!(cc.matches(']') && cc.matches('[') && cc.matches('\\'));
    }

    #[test]
    fn bad_classes() {
        assert!(CharClass::parse("").is_err());
        assert!(CharClass::parse("z-a").is_err());
        assert!(CharClass::parse(r"a-\d").is_err());
        assert!(CharClass::parse(r"\q").is_err());
    }
}
