//! Token queue with backpatching.
//!
//! Tokens are numbered in the order they leave the queue. The scanner may
//! insert a token at any number that has not been handed out yet, which is
//! how a `KEY` ends up in front of a scalar that was scanned before anyone
//! knew it was a key.

use std::collections::VecDeque;

use crate::token::Token;

#[derive(Debug, Default)]
pub struct TokenQueue {
    tokens: VecDeque<Token>,
    emitted: usize,
}

impl TokenQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens already taken from the queue.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Number the next pushed token will have.
    pub fn next_number(&self) -> usize {
        self.emitted + self.tokens.len()
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push_back(token);
    }

    /// Insert `token` so that it gets number `number`, shifting the buffered
    /// tokens from that number on. Returns `false` if `number` was already
    /// emitted or lies past the tail.
    pub fn insert(&mut self, number: usize, token: Token) -> bool {
        if number < self.emitted || number > self.next_number() {
            return false;
        }
        self.tokens.insert(number - self.emitted, token);
        true
    }

    pub fn pop(&mut self) -> Option<Token> {
        let token = self.tokens.pop_front()?;
        self.emitted += 1;
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn token(kind: TokenKind) -> Token {
        Token::marker(kind, 0, 1, 0)
    }

    #[test]
    fn test_insert_before_buffered_token() {
        let mut queue = TokenQueue::new();
        queue.push(token(TokenKind::StreamStart));
        let number = queue.next_number();
        queue.push(token(TokenKind::PlainScalar));
        assert!(queue.insert(number, token(TokenKind::Key)));
        assert!(queue.insert(number, token(TokenKind::MappingStart)));
        let kinds: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StreamStart,
                TokenKind::MappingStart,
                TokenKind::Key,
                TokenKind::PlainScalar
            ]
        );
    }

    #[test]
    fn test_insert_refuses_emitted_number() {
        let mut queue = TokenQueue::new();
        queue.push(token(TokenKind::StreamStart));
        queue.push(token(TokenKind::PlainScalar));
        assert!(queue.pop().is_some());
        assert_eq!(queue.emitted(), 1);
        assert!(!queue.insert(0, token(TokenKind::Key)));
        assert!(!queue.insert(5, token(TokenKind::Key)));
        assert_eq!(queue.next_number(), 2);
    }
}
