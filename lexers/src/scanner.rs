#![deny(warnings)]

/// Buffered cursor over any iterator.
///
/// Elements pulled from the source stay in `buf`, the cursor can be
/// rewound to any position already seen with `set_pos`.
pub struct Scanner<I: Iterator> where I::Item: Clone {
    src: I,
    buf: Vec<I::Item>,
    pos: usize,
}

impl<I> Iterator for Scanner<I> where I: Iterator, I::Item: Clone {
    type Item = I::Item;
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.peek();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }
}

impl<I> Scanner<I> where I: Iterator, I::Item: Clone {
    pub fn new(source: I) -> Scanner<I> {
        Scanner{src: source, buf: Vec::new(), pos: 0}
    }

    /// Number of elements consumed since the scanner was created.
    pub fn offset(&self) -> usize { self.pos }

    pub fn set_pos(&mut self, pos: usize) -> bool {
        if pos > self.buf.len() {
            return false;
        }
        self.pos = pos;
        true
    }

    pub fn peek(&mut self) -> Option<I::Item> {
        while self.buf.len() <= self.pos {
            self.buf.push(self.src.next()?);
        }
        self.buf.get(self.pos).cloned()
    }

    pub fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Consume the next element only if `pred` holds for it.
    pub fn accept_if(&mut self, pred: impl Fn(&I::Item) -> bool) -> Option<I::Item> {
        let next = self.peek()?;
        if pred(&next) {
            self.pos += 1;
            return Some(next);
        }
        None
    }
}

impl<I: Iterator<Item=char>> Scanner<I> {
    pub fn accept_char(&mut self, c: char) -> bool {
        self.accept_if(|next| *next == c).is_some()
    }
}

impl<'a> Scanner<std::str::Chars<'a>> {
    pub fn from_str(source: &'a str) -> Self {
        Scanner::new(source.chars())
    }
}
