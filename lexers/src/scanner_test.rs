use crate::scanner::Scanner;

#[test]
fn offsets_count_chars() {
    let mut s = Scanner::from_str("añb");
    assert_eq!(s.offset(), 0);
    assert_eq!(s.next(), Some('a'));
    assert_eq!(s.peek(), Some('ñ'));
    assert_eq!(s.offset(), 1);
    assert_eq!(s.next(), Some('ñ'));
    assert_eq!(s.next(), Some('b'));
    assert_eq!(s.offset(), 3);
    assert!(s.at_end());
    assert_eq!(s.next(), None);
    assert_eq!(s.offset(), 3);
}

#[test]
fn rewind_within_seen_input() {
    let mut s = Scanner::from_str("\\u{41}");
    assert!(s.accept_char('\\'));
    let mark = s.offset();
    assert!(s.accept_char('u'));
    assert!(!s.accept_char('['));
    assert!(s.set_pos(mark));
    assert_eq!(s.peek(), Some('u'));
    // nothing past the cursor has been buffered yet
    assert!(!s.set_pos(4));
}

#[test]
fn accept_by_predicate() {
    let mut s = Scanner::from_str("09af}");
    let mut hex = String::new();
    while let Some(c) = s.accept_if(|c| c.is_ascii_hexdigit()) {
        hex.push(c);
    }
    assert_eq!(hex, "09af");
    assert_eq!(s.accept_if(|c| c.is_ascii_digit()), None);
    assert!(s.accept_char('}'));
    assert!(s.at_end());
}
