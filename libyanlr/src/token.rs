//! Tokens produced by the scanner.

use std::fmt;

/// Token type in the scanner output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    StreamStart,
    StreamEnd,
    Eof,
    PlainScalar,
    SingleQuotedScalar,
    DoubleQuotedScalar,
    Comment,
    /// Marks the scalar that follows as a mapping key.
    Key,
    /// The `:` value indicator.
    Value,
    MappingStart,
    SequenceStart,
    /// Closes one level of block collection.
    BlockEnd,
    /// The `-` sequence entry indicator.
    Element,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::StreamStart => "STREAM_START",
            TokenKind::StreamEnd => "STREAM_END",
            TokenKind::Eof => "EOF",
            TokenKind::PlainScalar => "PLAIN_SCALAR",
            TokenKind::SingleQuotedScalar => "SINGLE_QUOTED_SCALAR",
            TokenKind::DoubleQuotedScalar => "DOUBLE_QUOTED_SCALAR",
            TokenKind::Comment => "COMMENT",
            TokenKind::Key => "KEY",
            TokenKind::Value => "VALUE",
            TokenKind::MappingStart => "MAPPING_START",
            TokenKind::SequenceStart => "SEQUENCE_START",
            TokenKind::BlockEnd => "BLOCK_END",
            TokenKind::Element => "ELEMENT",
        }
    }

    /// Returns `true` for the three scalar kinds.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            TokenKind::PlainScalar | TokenKind::SingleQuotedScalar | TokenKind::DoubleQuotedScalar
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single token in the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Character offset of the first character.
    pub start: usize,
    /// Character offset one past the last character.
    pub stop: usize,
    /// 1-based line of the first character.
    pub line: usize,
    /// 0-based column of the first character.
    pub column: usize,
    /// Resolved text: scalar content, comment text, or the indicator.
    pub text: String,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        start: usize,
        stop: usize,
        line: usize,
        column: usize,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            start,
            stop,
            line,
            column,
            text: text.into(),
        }
    }

    /// A zero-width token with no text.
    pub fn marker(kind: TokenKind, offset: usize, line: usize, column: usize) -> Self {
        Self::new(kind, offset, offset, line, column, "")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{},'{}',<{}>,{}:{}]",
            self.start,
            self.stop,
            self.text.escape_debug(),
            self.kind,
            self.line,
            self.column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let token = Token::new(TokenKind::PlainScalar, 3, 8, 1, 3, "hello");
        assert_eq!(token.to_string(), "[3:8,'hello',<PLAIN_SCALAR>,1:3]");
        let marker = Token::marker(TokenKind::BlockEnd, 9, 2, 0);
        assert_eq!(marker.to_string(), "[9:9,'',<BLOCK_END>,2:0]");
    }

    #[test]
    fn test_is_scalar() {
        assert!(TokenKind::PlainScalar.is_scalar());
        assert!(TokenKind::DoubleQuotedScalar.is_scalar());
        assert!(!TokenKind::Key.is_scalar());
        assert!(!TokenKind::Comment.is_scalar());
    }
}
