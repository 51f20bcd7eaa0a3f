// scanner.rs - Line scanner with one-token lookahead

/// Cuts one input line into space-separated lexemes.
///
/// The scanner exposes a single pending token shared by every consumer.
/// `get_token` only advances once the pending token has been claimed with
/// `mark_handled`; until then repeated calls return the same lexeme, which
/// is what lets the name resolver try one classification after another over
/// the same text.  The only separator is the ASCII space.
pub struct Scanner<'a> {
    line: &'a str,
    pos: usize,
    token_start: usize,
    token_end: usize,
    handled: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(line: &'a str) -> Scanner<'a> {
        Scanner {
            line,
            pos: 0,
            token_start: 0,
            token_end: 0,
            handled: true,
        }
    }

    /// Return the pending token, scanning a fresh one only if the previous
    /// token was handled.  An empty return means the line is exhausted.
    pub fn get_token(&mut self) -> &'a str {
        if !self.handled && self.token_end > self.token_start {
            return &self.line[self.token_start..self.token_end];
        }

        let bytes = self.line.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos] == b' ' {
            self.pos += 1;
        }
        self.token_start = self.pos;
        while self.pos < bytes.len() && bytes[self.pos] != b' ' {
            self.pos += 1;
        }
        self.token_end = self.pos;
        self.handled = false;

        &self.line[self.token_start..self.token_end]
    }

    /// Claim the pending token; the next `get_token` will scan forward.
    pub fn mark_handled(&mut self) {
        self.handled = true;
    }

    /// Text of the most recently scanned token (empty at end of line).
    pub fn token_text(&self) -> &'a str {
        &self.line[self.token_start..self.token_end]
    }

    /// Byte offset of the most recently scanned token within the line.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    pub fn line(&self) -> &'a str {
        self.line
    }
}
