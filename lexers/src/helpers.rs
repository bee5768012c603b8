#![deny(warnings)]

use crate::scanner::Scanner;
use std::fmt;

/// Result of decoding one backslash escape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Escaped {
    /// A literal character, eg: `\n`, `\]`, `\\`
    Char(char),
    /// A class shorthand letter, one of `s d w S D W`
    Shorthand(char),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscapeError {
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for EscapeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for EscapeError {}

/*
 * Callers position the scanner right after the backslash.
 */

pub fn scan_escape<I: Iterator<Item=char>>(scanner: &mut Scanner<I>) -> Result<Escaped, EscapeError> {
    let offset = scanner.offset();
    match scanner.next() {
        Some('n') => Ok(Escaped::Char('\n')),
        Some('r') => Ok(Escaped::Char('\r')),
        Some('t') => Ok(Escaped::Char('\t')),
        Some('0') => Ok(Escaped::Char('\0')),
        Some(c) if "sdwSDW".contains(c) => Ok(Escaped::Shorthand(c)),
        Some('u') => scan_unicode(scanner, offset),
        Some(c) if !c.is_alphanumeric() => Ok(Escaped::Char(c)),
        Some(c) => Err(EscapeError{offset, message: format!("Unknown escape \\{}", c)}),
        None => Err(EscapeError{offset, message: "Dangling escape".to_string()}),
    }
}

// \u{1F600}
fn scan_unicode<I: Iterator<Item=char>>(scanner: &mut Scanner<I>, offset: usize) -> Result<Escaped, EscapeError> {
    let bad = |message: &str| EscapeError{offset, message: message.to_string()};
    if !scanner.accept_char('{') {
        return Err(bad("Expected '{' after \\u"));
    }
    let mut hex = String::new();
    while let Some(c) = scanner.accept_if(|c| c.is_ascii_hexdigit()) {
        hex.push(c);
    }
    if !scanner.accept_char('}') || hex.is_empty() || hex.len() > 6 {
        return Err(bad("Malformed \\u{...} escape"));
    }
    u32::from_str_radix(&hex, 16).ok()
        .and_then(char::from_u32)
        .map(Escaped::Char)
        .ok_or_else(|| bad("Escape is not a unicode scalar value"))
}

/// Decode the body of a quoted literal (quotes already stripped).
/// Class shorthands are meaningless in a literal and rejected.
pub fn unescape(body: &str) -> Result<String, EscapeError> {
    let mut scanner = Scanner::from_str(body);
    let mut out = String::new();
    while let Some(c) = scanner.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let offset = scanner.offset();
        match scan_escape(&mut scanner)? {
            Escaped::Char(e) => out.push(e),
            Escaped::Shorthand(s) => return Err(EscapeError{
                offset, message: format!("Class shorthand \\{} in literal", s)}),
        }
    }
    Ok(out)
}
