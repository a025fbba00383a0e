//! Phase 2: Grammar Parser
//!
//! A recursive-descent parser for the block subset of YAML the scanner
//! produces. It pulls one token at a time and skips comments:
//!
//! ```text
//! document : STREAM_START child? STREAM_END EOF
//! child    : value | mapping | sequence
//! mapping  : MAPPING_START pair+ BLOCK_END
//! pair     : KEY scalar VALUE child?
//! sequence : SEQUENCE_START element+ BLOCK_END
//! element  : ELEMENT child
//! ```

use crate::error::{ParseContext, ParseError, Result};
use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};
use crate::tree::{Node, NodeKind};

pub struct Parser {
    scanner: Scanner,
    ctx: ParseContext,
    lookahead: Option<Token>,
}

impl Parser {
    pub fn new(scanner: Scanner) -> Self {
        let ctx = scanner.context().clone();
        Self {
            scanner,
            ctx,
            lookahead: None,
        }
    }

    /// Parse a whole document.
    pub fn parse_document(&mut self) -> Result<Node> {
        self.expect(TokenKind::StreamStart, "start of stream")?;

        let mut children = Vec::new();
        if self.peek()?.kind != TokenKind::StreamEnd {
            children.push(self.parse_child()?);
        }

        self.expect(TokenKind::StreamEnd, "end of document")?;
        self.expect(TokenKind::Eof, "end of input")?;
        Ok(Node::new(NodeKind::Document, children))
    }

    // ========================================================================
    // Token access
    // ========================================================================

    /// Next token from the scanner, skipping comments.
    fn next_significant(&mut self) -> Result<Token> {
        loop {
            let token = self.scanner.next_token()?;
            if token.kind != TokenKind::Comment {
                return Ok(token);
            }
        }
    }

    fn peek(&mut self) -> Result<&Token> {
        let token = match self.lookahead.take() {
            Some(token) => token,
            None => self.next_significant()?,
        };
        Ok(self.lookahead.insert(token))
    }

    fn bump(&mut self) -> Result<Token> {
        match self.lookahead.take() {
            Some(token) => Ok(token),
            None => self.next_significant(),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        let token = self.bump()?;
        if token.kind != kind {
            return Err(self.syntax_error(expected, &token));
        }
        Ok(token)
    }

    fn syntax_error(&self, expected: &str, found: &Token) -> ParseError {
        let found_desc = if found.kind.is_scalar() {
            format!("{} \"{}\"", found.kind, found.text)
        } else {
            found.kind.to_string()
        };
        ParseError::Syntax {
            expected: expected.to_string(),
            found: found_desc,
            location: self.ctx.location(found.line, found.column),
        }
    }

    // ========================================================================
    // Rules
    // ========================================================================

    fn parse_child(&mut self) -> Result<Node> {
        let kind = self.peek()?.kind;
        match kind {
            TokenKind::MappingStart => self.parse_mapping(),
            TokenKind::SequenceStart => self.parse_sequence(),
            k if k.is_scalar() => {
                let token = self.bump()?;
                Ok(Node::scalar(NodeKind::Value, token))
            }
            _ => {
                let token = self.bump()?;
                Err(self.syntax_error("a scalar, mapping or sequence", &token))
            }
        }
    }

    fn parse_mapping(&mut self) -> Result<Node> {
        self.expect(TokenKind::MappingStart, "start of mapping")?;
        let mut pairs = vec![self.parse_pair()?];
        while self.peek()?.kind != TokenKind::BlockEnd {
            pairs.push(self.parse_pair()?);
        }
        self.expect(TokenKind::BlockEnd, "end of mapping")?;
        Ok(Node::new(NodeKind::Mapping, pairs))
    }

    fn parse_pair(&mut self) -> Result<Node> {
        self.expect(TokenKind::Key, "mapping key")?;
        let key = self.bump()?;
        if !key.kind.is_scalar() {
            return Err(self.syntax_error("scalar key", &key));
        }
        self.expect(TokenKind::Value, "\":\"")?;

        let mut children = vec![Node::scalar(NodeKind::Key, key)];
        let next = self.peek()?.kind;
        if next.is_scalar() || next == TokenKind::MappingStart || next == TokenKind::SequenceStart {
            children.push(self.parse_child()?);
        }
        Ok(Node::new(NodeKind::Pair, children))
    }

    fn parse_sequence(&mut self) -> Result<Node> {
        self.expect(TokenKind::SequenceStart, "start of sequence")?;
        let mut elements = vec![self.parse_element()?];
        while self.peek()?.kind != TokenKind::BlockEnd {
            elements.push(self.parse_element()?);
        }
        self.expect(TokenKind::BlockEnd, "end of sequence")?;
        Ok(Node::new(NodeKind::Sequence, elements))
    }

    fn parse_element(&mut self) -> Result<Node> {
        self.expect(TokenKind::Element, "\"-\"")?;
        let child = self.parse_child()?;
        Ok(Node::new(NodeKind::Element, vec![child]))
    }
}
