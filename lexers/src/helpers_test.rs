use crate::helpers::{scan_escape, unescape, Escaped};
use crate::scanner::Scanner;

#[test]
fn escapes() {
    let tests = vec![
        ("n", Escaped::Char('\n')),
        ("t", Escaped::Char('\t')),
        ("\\", Escaped::Char('\\')),
        ("]", Escaped::Char(']')),
        ("'", Escaped::Char('\'')),
        ("s", Escaped::Shorthand('s')),
        ("W", Escaped::Shorthand('W')),
        ("u{3bb}", Escaped::Char('λ')),
    ];
    for (input, expected) in tests {
        let mut s = Scanner::from_str(input);
        assert_eq!(scan_escape(&mut s), Ok(expected), "escape {:?}", input);
        assert!(s.at_end());
    }
}

#[test]
fn bad_escapes() {
    for input in ["q", "", "u{}", "u{110000}", "u3bb"] {
        let mut s = Scanner::from_str(input);
        assert!(scan_escape(&mut s).is_err(), "escape {:?}", input);
    }
}

#[test]
fn unescape_literals() {
    assert_eq!(unescape(r"plain").unwrap(), "plain");
    assert_eq!(unescape(r"it\'s").unwrap(), "it's");
    assert_eq!(unescape(r"a\nb\\").unwrap(), "a\nb\\");
    let err = unescape(r"ab\d").unwrap_err();
    assert_eq!(err.offset, 3);
}
