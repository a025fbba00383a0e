//! Phase 1: Scanner
//!
//! The scanner converts raw source text into the token stream the grammar
//! parser consumes. YAML block syntax is not context-free at the character
//! level, so the scanner does the context-sensitive work up front:
//! - Tracking open block collections on an indentation stack and emitting
//!   `MAPPING_START`/`SEQUENCE_START`/`BLOCK_END` markers
//! - Detecting simple keys (keys without a `?` indicator): a scalar that may
//!   start a key is remembered as a candidate, and when a `:` follows on the
//!   same line a `KEY` token is backpatched in front of it
//! - Scanning plain, single-quoted and double-quoted scalars and comments
//!
//! This is the approach of the `libyaml` scanner, restricted to block
//! context.

use tracing::{debug, trace};

use crate::error::{ParseContext, ParseError, Result, ScanErrorKind};
use crate::position::{Position, Reader};
use crate::stream::TokenQueue;
use crate::token::{Token, TokenKind};

/// A candidate further away than this from the current position can no
/// longer become a key.
const MAX_SIMPLE_KEY_LENGTH: usize = 1024;

/// Level of the indentation stack that stands for "no open block".
const BASE_INDENT: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AtStreamStart,
    Scanning,
    /// `STREAM_END` and `EOF` are queued.
    AtStreamEnd,
    /// `EOF` was handed out, or scanning failed.
    Done,
}

/// A scalar that might turn out to be a mapping key.
#[derive(Debug, Clone, Copy)]
struct SimpleKey {
    /// Absolute number of the scalar token in the stream.
    token_number: usize,
    position: Position,
}

/// Pull-based YAML scanner.
pub struct Scanner {
    reader: Reader,
    ctx: ParseContext,
    tokens: TokenQueue,
    /// Open block collections, stored as column + 1 of their entries.
    indents: Vec<usize>,
    simple_key: Option<SimpleKey>,
    /// Whether a scalar at the current position may start a simple key.
    simple_key_allowed: bool,
    state: State,
    error: Option<ParseError>,
    eof: Option<Token>,
}

impl Scanner {
    /// Create a scanner over `input`. The `STREAM_START` token is queued
    /// right away.
    pub fn new(input: &str, ctx: &ParseContext) -> Self {
        let mut scanner = Self {
            reader: Reader::new(input),
            ctx: ctx.clone(),
            tokens: TokenQueue::new(),
            indents: vec![BASE_INDENT],
            simple_key: None,
            simple_key_allowed: true,
            state: State::AtStreamStart,
            error: None,
            eof: None,
        };
        scanner.scan_start();
        scanner
    }

    /// Retrieve the next token. After `EOF` every call returns `EOF` again;
    /// after a scan error every call returns that error.
    pub fn next_token(&mut self) -> Result<Token> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        if let Err(err) = self.fetch_more_tokens() {
            debug!(error = %err, "scanning failed");
            self.state = State::Done;
            self.error = Some(err.clone());
            return Err(err);
        }

        match self.tokens.pop() {
            Some(token) => {
                trace!(token = %token, "emit");
                if token.kind == TokenKind::Eof {
                    self.state = State::Done;
                    self.eof = Some(token.clone());
                }
                Ok(token)
            }
            None => Ok(self.eof.clone().unwrap_or_else(|| {
                let pos = self.reader.position();
                Token::marker(TokenKind::Eof, pos.offset, pos.line, pos.column)
            })),
        }
    }

    /// Line of the next unread character.
    pub fn line(&self) -> usize {
        self.reader.line()
    }

    /// Column of the next unread character.
    pub fn column(&self) -> usize {
        self.reader.column()
    }

    pub fn source_name(&self) -> &str {
        self.ctx.source_name()
    }

    pub fn context(&self) -> &ParseContext {
        &self.ctx
    }

    // ========================================================================
    // Fetch cycle
    // ========================================================================

    /// Fetch until the head of the queue can be handed out. The head is held
    /// back while it is a pending simple key, since a `KEY` (and maybe a
    /// `MAPPING_START`) could still be inserted in front of it.
    fn fetch_more_tokens(&mut self) -> Result<()> {
        while self.needs_more_tokens() {
            self.fetch_next_token()?;
        }
        Ok(())
    }

    fn needs_more_tokens(&self) -> bool {
        if self.state != State::Scanning {
            return false;
        }
        self.tokens.is_empty()
            || self
                .simple_key
                .is_some_and(|key| key.token_number == self.tokens.emitted())
    }

    fn fetch_next_token(&mut self) -> Result<()> {
        self.scan_to_next_token();
        self.remove_stale_simple_key();

        let Some(ch) = self.reader.peek() else {
            return self.scan_end();
        };

        // Comments never open or close blocks.
        if ch == '#' {
            return self.fetch_comment();
        }

        if let Some(tab) = self.reader.leading_tab() {
            return Err(self.error_at(ScanErrorKind::TabNotAllowed, tab));
        }

        let column = self.reader.column();
        let popped = self.unroll_indent(column)?;
        if popped > 0 {
            self.check_dedent(column)?;
        }

        match ch {
            '"' => self.fetch_double_quoted_scalar(),
            '\'' => self.fetch_single_quoted_scalar(),
            ':' if self.reader.is_blank_or_break_at(1) => self.fetch_value(),
            '-' if self.reader.is_blank_or_break_at(1) => self.fetch_element(),
            _ => self.fetch_plain_scalar(),
        }
    }

    /// Skip blanks and line breaks. A line break makes the start of the next
    /// line a place where a simple key may begin.
    fn scan_to_next_token(&mut self) {
        while let Some(ch) = self.reader.peek() {
            match ch {
                ' ' | '\t' => self.reader.advance(1),
                '\n' => {
                    self.reader.advance(1);
                    self.simple_key_allowed = true;
                }
                _ => break,
            }
        }
    }

    fn scan_start(&mut self) {
        let pos = self.reader.position();
        self.push(Token::marker(
            TokenKind::StreamStart,
            pos.offset,
            pos.line,
            pos.column,
        ));
        self.state = State::Scanning;
    }

    /// Close every open block, then queue `STREAM_END` and `EOF`.
    fn scan_end(&mut self) -> Result<()> {
        self.simple_key = None;
        while self.indents.len() > 1 {
            self.pop_indent()?;
        }
        let pos = self.reader.position();
        self.push(Token::marker(
            TokenKind::StreamEnd,
            pos.offset,
            pos.line,
            pos.column,
        ));
        self.push(Token::marker(TokenKind::Eof, pos.offset, pos.line, pos.column));
        self.state = State::AtStreamEnd;
        Ok(())
    }

    fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn error_at(&self, kind: ScanErrorKind, pos: Position) -> ParseError {
        ParseError::scan(kind, &self.ctx, pos.line, pos.column)
    }

    // ========================================================================
    // Indentation
    // ========================================================================

    fn top_indent(&self) -> usize {
        self.indents.last().copied().unwrap_or(BASE_INDENT)
    }

    /// Open a block whose entries start at `column` if it is deeper than the
    /// current one. The start marker goes to the tail of the queue, or to
    /// `number` when it has to precede an already scanned token.
    fn roll_indent(&mut self, column: usize, number: Option<usize>, kind: TokenKind, pos: Position) {
        let level = column + 1;
        if level <= self.top_indent() {
            return;
        }
        debug!(column, kind = %kind, "open block");
        self.indents.push(level);
        let marker = Token::marker(kind, pos.offset, pos.line, pos.column);
        match number {
            Some(number) => self.backpatch(number, marker),
            None => self.push(marker),
        }
    }

    /// Close every block deeper than `column`. Returns how many were closed.
    fn unroll_indent(&mut self, column: usize) -> Result<usize> {
        let level = column + 1;
        let mut popped = 0;
        while self.top_indent() > level {
            self.pop_indent()?;
            popped += 1;
        }
        Ok(popped)
    }

    fn pop_indent(&mut self) -> Result<()> {
        if self.indents.len() <= 1 {
            return Err(self.error_at(ScanErrorKind::IndentationUnderflow, self.reader.position()));
        }
        let level = self.indents.pop().unwrap_or(BASE_INDENT);
        debug!(column = level - 1, "close block");
        let pos = self.reader.position();
        self.push(Token::marker(
            TokenKind::BlockEnd,
            pos.offset,
            pos.line,
            pos.column,
        ));
        Ok(())
    }

    /// After closing blocks, the line has to continue one that is still open
    /// (or start over at the top level).
    fn check_dedent(&self, column: usize) -> Result<()> {
        let top = self.top_indent();
        if top == BASE_INDENT || top == column + 1 {
            return Ok(());
        }
        Err(self.error_at(
            ScanErrorKind::InvalidDedent(column),
            self.reader.position(),
        ))
    }

    // ========================================================================
    // Simple keys
    // ========================================================================

    /// Remember the scalar about to be scanned as a key candidate.
    fn save_simple_key(&mut self) -> Result<()> {
        if self.simple_key.is_some() {
            return Err(self.error_at(ScanErrorKind::DuplicateSimpleKey, self.reader.position()));
        }
        if self.simple_key_allowed {
            let key = SimpleKey {
                token_number: self.tokens.next_number(),
                position: self.reader.position(),
            };
            trace!(line = key.position.line, column = key.position.column, "simple key candidate");
            self.simple_key = Some(key);
        }
        Ok(())
    }

    /// Drop a candidate that can no longer be followed by its `:`.
    fn remove_stale_simple_key(&mut self) {
        if let Some(key) = self.simple_key {
            if key.position.line != self.reader.line()
                || self.reader.offset() > key.position.offset + MAX_SIMPLE_KEY_LENGTH
            {
                debug!(
                    line = key.position.line,
                    column = key.position.column,
                    "dropping simple key candidate"
                );
                self.simple_key = None;
            }
        }
    }

    fn backpatch(&mut self, number: usize, token: Token) {
        // The pending candidate is never handed out, so its number is still
        // in the buffered part of the queue.
        let inserted = self.tokens.insert(number, token);
        debug_assert!(inserted, "backpatch into emitted part of the token stream");
    }

    // ========================================================================
    // Indicators and comments
    // ========================================================================

    fn fetch_value(&mut self) -> Result<()> {
        if let Some(key) = self.simple_key.take() {
            debug!(
                line = key.position.line,
                column = key.position.column,
                "confirmed simple key"
            );
            let pos = key.position;
            self.backpatch(
                key.token_number,
                Token::marker(TokenKind::Key, pos.offset, pos.line, pos.column),
            );
            self.roll_indent(
                pos.column,
                Some(key.token_number),
                TokenKind::MappingStart,
                pos,
            );
            // The rest of the line is the value of this key.
            self.simple_key_allowed = false;
        } else if !self.simple_key_allowed {
            return Err(self.error_at(
                ScanErrorKind::MappingValueNotAllowed,
                self.reader.position(),
            ));
        }
        self.fetch_indicator(TokenKind::Value);
        Ok(())
    }

    fn fetch_element(&mut self) -> Result<()> {
        let pos = self.reader.position();
        if !self.simple_key_allowed {
            return Err(self.error_at(ScanErrorKind::SequenceEntryNotAllowed, pos));
        }
        self.roll_indent(pos.column, None, TokenKind::SequenceStart, pos);
        self.simple_key = None;
        self.simple_key_allowed = true;
        self.fetch_indicator(TokenKind::Element);
        Ok(())
    }

    fn fetch_indicator(&mut self, kind: TokenKind) {
        let pos = self.reader.position();
        let text = self.reader.peek().map(String::from).unwrap_or_default();
        self.reader.advance(1);
        self.push(Token::new(
            kind,
            pos.offset,
            self.reader.offset(),
            pos.line,
            pos.column,
            text,
        ));
    }

    fn fetch_comment(&mut self) -> Result<()> {
        let pos = self.reader.position();
        let mut text = String::new();
        while let Some(ch) = self.reader.peek() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
            self.reader.advance(1);
        }
        let text = text.trim_end().to_string();
        self.push(Token::new(
            TokenKind::Comment,
            pos.offset,
            pos.offset + text.chars().count(),
            pos.line,
            pos.column,
            text,
        ));
        Ok(())
    }

    // ========================================================================
    // Scalars
    // ========================================================================

    fn fetch_plain_scalar(&mut self) -> Result<()> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_plain_scalar();
        self.push(token);
        Ok(())
    }

    fn fetch_single_quoted_scalar(&mut self) -> Result<()> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_single_quoted_scalar()?;
        self.push(token);
        Ok(())
    }

    fn fetch_double_quoted_scalar(&mut self) -> Result<()> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_double_quoted_scalar()?;
        self.push(token);
        Ok(())
    }

    /// Scan a plain scalar starting at a non-blank character.
    ///
    /// Runs of non-blank characters are joined by the blanks between them.
    /// The scalar continues on the next line only if that line is indented
    /// deeper than the enclosing block; each line fold becomes one space.
    fn scan_plain_scalar(&mut self) -> Token {
        let start = self.reader.position();
        let continuation_column = self.top_indent();
        let mut text = String::new();
        let mut end = start;
        let mut blanks = String::new();
        let mut folded = false;

        loop {
            match self.reader.peek() {
                None => break,
                Some(':') if self.reader.is_blank_or_break_at(1) => break,
                // Only reached after blanks, so this starts a comment.
                Some('#') if !text.is_empty() => break,
                _ => {}
            }

            if folded {
                text.push(' ');
            } else {
                text.push_str(&blanks);
            }
            folded = false;
            blanks.clear();

            while let Some(ch) = self.reader.peek() {
                if matches!(ch, ' ' | '\t' | '\n')
                    || (ch == ':' && self.reader.is_blank_or_break_at(1))
                {
                    break;
                }
                text.push(ch);
                self.reader.advance(1);
            }
            end = self.reader.position();

            while let Some(ch) = self.reader.peek() {
                match ch {
                    ' ' | '\t' => {
                        if !folded {
                            blanks.push(ch);
                        }
                        self.reader.advance(1);
                    }
                    '\n' => {
                        self.reader.advance(1);
                        self.simple_key_allowed = true;
                        folded = true;
                        blanks.clear();
                    }
                    _ => break,
                }
            }

            if folded && self.reader.column() < continuation_column {
                break;
            }
        }

        Token::new(
            TokenKind::PlainScalar,
            start.offset,
            end.offset,
            start.line,
            start.column,
            text,
        )
    }

    fn scan_single_quoted_scalar(&mut self) -> Result<Token> {
        let start = self.reader.position();
        self.reader.advance(1);
        let mut text = String::new();
        let mut blanks = String::new();

        loop {
            match self.reader.peek() {
                None => {
                    return Err(self.error_at(ScanErrorKind::UnterminatedSingleQuoted, start));
                }
                Some('\'') if self.reader.peek_nth(1) == Some('\'') => {
                    text.push_str(&blanks);
                    blanks.clear();
                    text.push('\'');
                    self.reader.advance(2);
                }
                Some('\'') => {
                    text.push_str(&blanks);
                    self.reader.advance(1);
                    break;
                }
                Some(ch @ (' ' | '\t')) => {
                    blanks.push(ch);
                    self.reader.advance(1);
                }
                Some('\n') => {
                    blanks.clear();
                    self.fold_quoted_line_break(&mut text);
                }
                Some(ch) => {
                    text.push_str(&blanks);
                    blanks.clear();
                    text.push(ch);
                    self.reader.advance(1);
                }
            }
        }

        Ok(Token::new(
            TokenKind::SingleQuotedScalar,
            start.offset,
            self.reader.offset(),
            start.line,
            start.column,
            text,
        ))
    }

    fn scan_double_quoted_scalar(&mut self) -> Result<Token> {
        let start = self.reader.position();
        self.reader.advance(1);
        let mut text = String::new();
        let mut blanks = String::new();

        loop {
            match self.reader.peek() {
                None => {
                    return Err(self.error_at(ScanErrorKind::UnterminatedDoubleQuoted, start));
                }
                Some('"') => {
                    text.push_str(&blanks);
                    self.reader.advance(1);
                    break;
                }
                Some('\\') if self.reader.peek_nth(1) == Some('\n') => {
                    // Escaped line break: join the lines without a space.
                    text.push_str(&blanks);
                    blanks.clear();
                    self.reader.advance(2);
                    self.skip_blanks();
                }
                Some('\\') => {
                    text.push_str(&blanks);
                    blanks.clear();
                    let escaped = self.scan_escape(start)?;
                    text.push(escaped);
                }
                Some(ch @ (' ' | '\t')) => {
                    blanks.push(ch);
                    self.reader.advance(1);
                }
                Some('\n') => {
                    blanks.clear();
                    self.fold_quoted_line_break(&mut text);
                }
                Some(ch) => {
                    text.push_str(&blanks);
                    blanks.clear();
                    text.push(ch);
                    self.reader.advance(1);
                }
            }
        }

        Ok(Token::new(
            TokenKind::DoubleQuotedScalar,
            start.offset,
            self.reader.offset(),
            start.line,
            start.column,
            text,
        ))
    }

    /// Resolve the escape sequence at the current `\`.
    fn scan_escape(&mut self, quote: Position) -> Result<char> {
        let escape = self.reader.position();
        let Some(code) = self.reader.peek_nth(1) else {
            return Err(self.error_at(ScanErrorKind::UnterminatedDoubleQuoted, quote));
        };
        self.reader.advance(2);
        let ch = match code {
            '0' => '\0',
            'a' => '\u{07}',
            'b' => '\u{08}',
            't' | '\t' => '\t',
            'n' => '\n',
            'v' => '\u{0B}',
            'f' => '\u{0C}',
            'r' => '\r',
            'e' => '\u{1B}',
            ' ' => ' ',
            '"' => '"',
            '/' => '/',
            '\\' => '\\',
            'N' => '\u{85}',
            '_' => '\u{A0}',
            'L' => '\u{2028}',
            'P' => '\u{2029}',
            'x' => self.scan_hex_escape(2, escape)?,
            'u' => self.scan_hex_escape(4, escape)?,
            'U' => self.scan_hex_escape(8, escape)?,
            other => return Err(self.error_at(ScanErrorKind::InvalidEscape(other), escape)),
        };
        Ok(ch)
    }

    fn scan_hex_escape(&mut self, digits: usize, escape: Position) -> Result<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .reader
                .peek()
                .and_then(|ch| ch.to_digit(16))
                .ok_or_else(|| self.error_at(ScanErrorKind::InvalidUnicodeEscape, escape))?;
            code = code * 16 + digit;
            self.reader.advance(1);
        }
        char::from_u32(code).ok_or_else(|| self.error_at(ScanErrorKind::InvalidUnicodeEscape, escape))
    }

    /// Consume a line break inside a quoted scalar together with any empty
    /// lines and the indentation of the next line, and fold it into a space.
    fn fold_quoted_line_break(&mut self, text: &mut String) {
        while self.reader.peek() == Some('\n') {
            self.reader.advance(1);
            self.skip_blanks();
        }
        text.push(' ');
    }

    fn skip_blanks(&mut self) {
        while matches!(self.reader.peek(), Some(' ' | '\t')) {
            self.reader.advance(1);
        }
    }
}

impl Iterator for Scanner {
    type Item = Result<Token>;

    /// Yields every token up to and including `EOF`, or up to the first
    /// error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.state == State::Done {
            return None;
        }
        Some(self.next_token())
    }
}
