//! Position tracking over the in-memory source.
//!
//! The reader owns the whole input as characters, so lookahead is plain
//! indexing. Every consumed character goes through [`Position::advance`],
//! which keeps the line and column of the next unread character current.

/// Location of the next unread character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Character offset from the start of the input.
    pub offset: usize,
    /// 1-based line.
    pub line: usize,
    /// 0-based column.
    pub column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 0,
        }
    }
}

impl Position {
    /// Account for one consumed character.
    pub fn advance(&mut self, ch: char) {
        self.offset += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }
}

/// Character buffer with lookahead and a position tracker.
#[derive(Debug, Clone)]
pub struct Reader {
    chars: Vec<char>,
    position: Position,
}

impl Reader {
    pub fn new(input: &str) -> Self {
        Self {
            // Windows line endings are scanned as plain line feeds.
            chars: input.replace("\r\n", "\n").chars().collect(),
            position: Position::default(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }

    pub fn offset(&self) -> usize {
        self.position.offset
    }

    /// The next unread character, `None` at the end of input.
    pub fn peek(&self) -> Option<char> {
        self.peek_nth(0)
    }

    /// The character `n` places after the next unread one.
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.get(self.position.offset + n).copied()
    }

    /// Consume `n` characters (fewer if the input ends first).
    pub fn advance(&mut self, n: usize) {
        for _ in 0..n {
            match self.peek() {
                Some(ch) => self.position.advance(ch),
                None => break,
            }
        }
    }

    /// Position of the first tab in the blanks that lead up to the next
    /// unread character, if only blanks precede it on its line.
    pub fn leading_tab(&self) -> Option<Position> {
        let offset = self.position.offset;
        let mut start = offset;
        while start > 0 && matches!(self.chars[start - 1], ' ' | '\t') {
            start -= 1;
        }
        if start > 0 && self.chars[start - 1] != '\n' {
            return None;
        }
        let column = self.chars[start..offset].iter().position(|&ch| ch == '\t')?;
        Some(Position {
            offset: start + column,
            line: self.position.line,
            column,
        })
    }

    /// Whether the character at `n` is a space, a tab, a line break, or
    /// past the end of input.
    pub fn is_blank_or_break_at(&self, n: usize) -> bool {
        matches!(self.peek_nth(n), None | Some(' ' | '\t' | '\n'))
    }
}
