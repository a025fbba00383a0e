//! YANLR: YAML documents as hierarchical key sets.
//!
//! Reads a block-style YAML document and flattens it into keys below a root
//! name. Mapping keys become path segments; sequence entries become
//! positional segments `#0`, `#1`, ..., `#_10`, ... and the sequence's own
//! key carries `array` metadata naming its last entry.
//!
//! # Parsing Pipeline
//!
//! The parser operates in three phases:
//!
//! 1. **Scanner**: Converts source text into a token stream. Indentation
//!    opens and closes block collections, and mapping keys are recognized
//!    after the fact by backpatching a `KEY` token when their `:` shows up.
//!
//! 2. **Grammar Parser**: Pulls tokens one at a time and builds a parse
//!    tree of mappings, pairs, sequences, elements and scalar values.
//!
//! 3. **Key Converter**: Walks the tree and writes keys and metadata into a
//!    [`KeyStore`], by default a sorted [`KeySet`].

mod converter;
mod error;
mod keyset;
mod parser;
mod position;
mod scanner;
mod stream;
mod token;
mod tree;

pub use converter::{index_to_array_base_name, KeyConverter};
pub use error::{Location, ParseContext, ParseError, Result, ScanErrorKind};
pub use keyset::{Key, KeyName, KeySet, KeyStore, ARRAY_META};
pub use parser::Parser;
pub use position::Position;
pub use scanner::Scanner;
pub use token::{Token, TokenKind};
pub use tree::{Node, NodeKind};

/// Scan a document into its full token stream, ending with `EOF`.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    tokenize_with_filename(input, None)
}

/// Scan a document with a filename for error messages.
pub fn tokenize_with_filename(input: &str, filename: Option<&str>) -> Result<Vec<Token>> {
    let ctx = ParseContext::new(filename);
    let mut scanner = Scanner::new(input, &ctx);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

/// Parse a document into its parse tree.
pub fn parse_tree(input: &str, filename: Option<&str>) -> Result<Node> {
    let ctx = ParseContext::new(filename);
    Parser::new(Scanner::new(input, &ctx)).parse_document()
}

/// Parse a YAML document into keys below `root`.
///
/// # Example
///
/// ```
/// use libyanlr::parse;
///
/// let keys = parse("list:\n  - x\n  - y\n", "user").unwrap();
/// assert_eq!(keys.value("user/list/#1"), Some("y"));
/// assert_eq!(keys.lookup("user/list").unwrap().meta("array"), Some("#1"));
/// ```
pub fn parse(input: &str, root: &str) -> Result<KeySet> {
    parse_with_filename(input, root, None)
}

/// Parse a YAML document into keys below `root`, with a filename for error
/// messages.
pub fn parse_with_filename(input: &str, root: &str, filename: Option<&str>) -> Result<KeySet> {
    let root = KeyName::new(root)?;

    // Phases 1 and 2: scan and parse into a tree
    let tree = parse_tree(input, filename)?;

    // Phase 3: flatten the tree into keys
    let mut keys = KeySet::new();
    KeyConverter::new(root).convert(&tree, &mut keys)?;
    Ok(keys)
}
