mod scanner;
mod helpers;
mod position;

pub use scanner::Scanner;
pub use helpers::{scan_escape, unescape, Escaped, EscapeError};
pub use position::LineIndex;

#[cfg(test)]
mod scanner_test;
#[cfg(test)]
mod helpers_test;
