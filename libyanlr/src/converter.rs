//! Phase 3: Key Converter
//!
//! Walks a parse tree depth first and writes one key per scalar into a
//! [`KeyStore`]. Mapping keys become path segments below the root. Sequence
//! entries become positional segments (`#0`, `#1`, ... `#_10`, ...) and the
//! sequence's own key records its last entry in `array` metadata.
//!
//! The walk uses an explicit stack, so deeply nested documents cannot
//! overflow the call stack.

use tracing::debug;

use crate::error::{ParseError, Result};
use crate::keyset::{Key, KeyName, KeyStore, ARRAY_META};
use crate::tree::{Node, NodeKind};

/// Positional base name for the sequence entry `index`.
///
/// One `_` per digit after the first keeps names of equal digit count in
/// numeric order: `3` is `#3`, `12` is `#_12`, `123` is `#__123`.
pub fn index_to_array_base_name(index: u64) -> String {
    let digits = index.to_string();
    format!("#{}{}", "_".repeat(digits.len() - 1), digits)
}

enum Visit<'a> {
    Enter(&'a Node),
    Exit(&'a Node),
}

pub struct KeyConverter {
    root: KeyName,
    parents: Vec<Key>,
    indices: Vec<u64>,
}

impl KeyConverter {
    pub fn new(root: KeyName) -> Self {
        let parents = vec![Key::new(root.clone())];
        Self {
            root,
            parents,
            indices: Vec::new(),
        }
    }

    pub fn root(&self) -> &KeyName {
        &self.root
    }

    /// Drop any state left by an aborted walk.
    pub fn reset(&mut self) {
        self.parents.clear();
        self.parents.push(Key::new(self.root.clone()));
        self.indices.clear();
    }

    /// Write the keys of `tree` into `store`.
    pub fn convert<S: KeyStore>(&mut self, tree: &Node, store: &mut S) -> Result<()> {
        self.reset();
        debug!(root = %self.root, "converting parse tree");

        let mut stack = vec![Visit::Enter(tree)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(node) => {
                    self.enter(node)?;
                    stack.push(Visit::Exit(node));
                    for child in node.children().iter().rev() {
                        if node.kind() == NodeKind::Pair && child.kind() == NodeKind::Key {
                            continue;
                        }
                        stack.push(Visit::Enter(child));
                    }
                }
                Visit::Exit(node) => self.exit(node, store)?,
            }
        }

        if self.parents.len() != 1 || !self.indices.is_empty() {
            return Err(ParseError::Conversion(format!(
                "{} open keys and {} open sequences after walk",
                self.parents.len() - 1,
                self.indices.len()
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Enter
    // ========================================================================

    fn enter(&mut self, node: &Node) -> Result<()> {
        match node.kind() {
            NodeKind::Document => {
                if node.children().len() > 1 {
                    return Err(conversion("document with more than one child"));
                }
                Ok(())
            }
            NodeKind::Mapping => expect_children(node, NodeKind::Pair),
            NodeKind::Pair => self.enter_pair(node),
            NodeKind::Sequence => {
                expect_children(node, NodeKind::Element)?;
                self.enter_sequence();
                Ok(())
            }
            NodeKind::Element => self.enter_element(node),
            NodeKind::Value => Ok(()),
            NodeKind::Key => Err(conversion("key outside of a pair")),
        }
    }

    fn enter_pair(&mut self, pair: &Node) -> Result<()> {
        let key = pair
            .child(0)
            .filter(|c| c.kind() == NodeKind::Key)
            .and_then(Node::text)
            .ok_or_else(|| conversion("pair without key"))?;
        if pair.children().len() > 2 {
            return Err(conversion("pair with more than one value"));
        }
        let name = self.top()?.name().child(key);
        self.parents.push(Key::new(name));
        Ok(())
    }

    fn enter_sequence(&mut self) {
        if let Some(top) = self.parents.last_mut() {
            top.set_meta(ARRAY_META, "");
        }
        self.indices.push(0);
    }

    fn enter_element(&mut self, element: &Node) -> Result<()> {
        if element.children().len() != 1 {
            return Err(conversion("element without value"));
        }
        let index = self
            .indices
            .last_mut()
            .ok_or_else(|| conversion("element outside of a sequence"))?;
        let base = index_to_array_base_name(*index);
        *index = index.saturating_add(1);

        let top = self
            .parents
            .last_mut()
            .ok_or_else(|| conversion("empty parent stack"))?;
        top.set_meta(ARRAY_META, &base);
        let name = top.name().child(&base);
        self.parents.push(Key::new(name));
        Ok(())
    }

    // ========================================================================
    // Exit
    // ========================================================================

    fn exit<S: KeyStore>(&mut self, node: &Node, store: &mut S) -> Result<()> {
        match node.kind() {
            NodeKind::Pair => {
                let top = self.pop()?;
                if node.children().len() == 1 {
                    write(store, top.name(), "");
                }
                Ok(())
            }
            NodeKind::Element => self.pop().map(drop),
            NodeKind::Sequence => self.exit_sequence(store),
            NodeKind::Value => {
                let text = node
                    .text()
                    .ok_or_else(|| conversion("value without token"))?;
                write(store, self.top()?.name(), text);
                Ok(())
            }
            NodeKind::Document | NodeKind::Mapping | NodeKind::Key => Ok(()),
        }
    }

    fn exit_sequence<S: KeyStore>(&mut self, store: &mut S) -> Result<()> {
        self.indices
            .pop()
            .ok_or_else(|| conversion("sequence counter missing"))?;
        let top = self.top()?;
        write(store, top.name(), top.value());
        for (meta, value) in top.metadata() {
            debug!(key = %top.name(), meta, value, "set metadata");
            store.set_metadata(top.name(), meta, value);
        }
        Ok(())
    }

    fn top(&self) -> Result<&Key> {
        self.parents
            .last()
            .ok_or_else(|| conversion("empty parent stack"))
    }

    /// Pop a pair or element frame; the root frame stays.
    fn pop(&mut self) -> Result<Key> {
        if self.parents.len() < 2 {
            return Err(conversion("unbalanced parent stack"));
        }
        self.parents
            .pop()
            .ok_or_else(|| conversion("empty parent stack"))
    }
}

fn write<S: KeyStore>(store: &mut S, name: &KeyName, value: &str) {
    debug!(key = %name, value, "append");
    store.append(name, value);
}

fn expect_children(node: &Node, kind: NodeKind) -> Result<()> {
    match node.children().iter().find(|c| c.kind() != kind) {
        Some(child) => Err(conversion(&format!(
            "{} inside {}",
            child.kind().name(),
            node.kind().name()
        ))),
        None => Ok(()),
    }
}

fn conversion(message: &str) -> ParseError {
    ParseError::Conversion(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseContext;
    use crate::keyset::KeySet;
    use crate::parser::Parser;
    use crate::scanner::Scanner;
    use crate::token::{Token, TokenKind};

    fn tree(input: &str) -> Node {
        let ctx = ParseContext::new(None);
        Parser::new(Scanner::new(input, &ctx))
            .parse_document()
            .unwrap()
    }

    fn convert(input: &str) -> KeySet {
        let mut keys = KeySet::new();
        let mut converter = KeyConverter::new(KeyName::new("user").unwrap());
        converter.convert(&tree(input), &mut keys).unwrap();
        keys
    }

    fn value(text: &str) -> Node {
        Node::scalar(
            NodeKind::Value,
            Token::new(TokenKind::PlainScalar, 0, 0, 1, 0, text),
        )
    }

    #[test]
    fn test_array_base_names() {
        assert_eq!(index_to_array_base_name(0), "#0");
        assert_eq!(index_to_array_base_name(3), "#3");
        assert_eq!(index_to_array_base_name(12), "#_12");
        assert_eq!(index_to_array_base_name(123), "#__123");
        assert_eq!(
            index_to_array_base_name(u64::MAX),
            format!("#{}18446744073709551615", "_".repeat(19))
        );
    }

    #[test]
    fn test_top_level_pairs() {
        let keys = convert("a: 1\nb: 2\n");
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.value("user/a"), Some("1"));
        assert_eq!(keys.value("user/b"), Some("2"));
    }

    #[test]
    fn test_sequence_under_key() {
        let keys = convert("list:\n  - x\n  - y\n");
        assert_eq!(keys.len(), 3);
        let list = keys.lookup("user/list").unwrap();
        assert_eq!(list.value(), "");
        assert_eq!(list.meta(ARRAY_META), Some("#1"));
        assert_eq!(keys.value("user/list/#0"), Some("x"));
        assert_eq!(keys.value("user/list/#1"), Some("y"));
    }

    #[test]
    fn test_long_sequence_uses_fillers() {
        let input: String = (0..12).map(|i| format!("- v{i}\n")).collect();
        let keys = convert(&input);
        assert_eq!(keys.value("user/#9"), Some("v9"));
        assert_eq!(keys.value("user/#_10"), Some("v10"));
        assert_eq!(keys.value("user/#_11"), Some("v11"));
        assert_eq!(keys.lookup("user").unwrap().meta(ARRAY_META), Some("#_11"));
    }

    #[test]
    fn test_nested_structures() {
        let keys = convert("servers:\n  - name: a\n    ports:\n      - 80\n      - - 443\nempty:\n");
        assert_eq!(keys.value("user/servers/#0/name"), Some("a"));
        assert_eq!(keys.value("user/servers/#0/ports/#0"), Some("80"));
        assert_eq!(keys.value("user/servers/#0/ports/#1/#0"), Some("443"));
        assert_eq!(
            keys.lookup("user/servers/#0/ports/#1")
                .unwrap()
                .meta(ARRAY_META),
            Some("#0")
        );
        assert_eq!(
            keys.lookup("user/servers").unwrap().meta(ARRAY_META),
            Some("#0")
        );
        assert_eq!(keys.value("user/empty"), Some(""));
        assert!(keys.lookup("user/servers/#0").is_none());
    }

    #[test]
    fn test_scalar_document_writes_root() {
        let keys = convert("hello");
        assert_eq!(keys.value("user"), Some("hello"));
    }

    #[test]
    fn test_idempotent() {
        let tree = tree("a:\n  - 1\n  - b: 2\n");
        let mut converter = KeyConverter::new(KeyName::new("user/app").unwrap());
        let mut first = KeySet::new();
        let mut second = KeySet::new();
        converter.convert(&tree, &mut first).unwrap();
        converter.convert(&tree, &mut second).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.value("user/app/a/#1/b"), Some("2"));
    }

    #[test]
    fn test_index_saturates() {
        let mut converter = KeyConverter::new(KeyName::new("user").unwrap());
        converter.indices.push(u64::MAX - 1);
        let element = Node::new(NodeKind::Element, vec![value("x")]);
        converter.enter_element(&element).unwrap();
        converter.pop().unwrap();
        converter.enter_element(&element).unwrap();
        converter.pop().unwrap();
        assert_eq!(converter.indices, vec![u64::MAX]);
        assert_eq!(
            converter.top().unwrap().meta(ARRAY_META),
            Some(index_to_array_base_name(u64::MAX).as_str())
        );
    }

    #[test]
    fn test_malformed_trees() {
        let mut converter = KeyConverter::new(KeyName::new("user").unwrap());
        let mut keys = KeySet::new();

        let element = Node::new(NodeKind::Element, Vec::new());
        let sequence = Node::new(NodeKind::Sequence, vec![element]);
        let doc = Node::new(NodeKind::Document, vec![sequence]);
        assert!(converter.convert(&doc, &mut keys).unwrap_err().is_conversion());

        let pair = Node::new(NodeKind::Pair, vec![value("x")]);
        let doc = Node::new(
            NodeKind::Document,
            vec![Node::new(NodeKind::Mapping, vec![pair])],
        );
        assert!(converter.convert(&doc, &mut keys).unwrap_err().is_conversion());

        let key = Node::scalar(
            NodeKind::Key,
            Token::new(TokenKind::PlainScalar, 0, 0, 1, 0, "k"),
        );
        let doc = Node::new(NodeKind::Document, vec![key]);
        assert!(converter.convert(&doc, &mut keys).unwrap_err().is_conversion());

        let doc = Node::new(NodeKind::Document, vec![Node::new(NodeKind::Value, Vec::new())]);
        assert!(converter.convert(&doc, &mut keys).unwrap_err().is_conversion());

        // A failed walk leaves nothing behind for the next one.
        converter.convert(&tree("a: 1\n"), &mut keys).unwrap();
        assert_eq!(keys.value("user/a"), Some("1"));
    }
}
