//! Parse tree produced by the grammar parser.

use std::fmt;

use crate::token::Token;

/// Node type in the parse tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root of the tree; at most one child.
    Document,
    /// Block mapping; children are pairs.
    Mapping,
    /// Key node, optionally followed by the value subtree.
    Pair,
    /// Scalar used as a mapping key.
    Key,
    /// Block sequence; children are elements.
    Sequence,
    /// One sequence entry with its value subtree.
    Element,
    /// Scalar value.
    Value,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Mapping => "mapping",
            NodeKind::Pair => "pair",
            NodeKind::Key => "key",
            NodeKind::Sequence => "sequence",
            NodeKind::Element => "element",
            NodeKind::Value => "value",
        }
    }
}

/// A parse tree node. Scalar nodes (`Key`, `Value`) carry their token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub token: Option<Token>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            token: None,
            children,
        }
    }

    pub fn scalar(kind: NodeKind, token: Token) -> Self {
        Self {
            kind,
            token: Some(token),
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Scalar text of a `Key` or `Value` node.
    pub fn text(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.text.as_str())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    /// First child of the given kind.
    pub fn first(&self, kind: NodeKind) -> Option<&Node> {
        self.children.iter().find(|c| c.kind == kind)
    }
}

impl fmt::Display for Node {
    /// Renders the tree as an s-expression, e.g.
    /// `(document (mapping (pair (key a) (value 1))))`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.kind.name())?;
        if let Some(text) = self.text() {
            write!(f, " {:?}", text)?;
        }
        for child in &self.children {
            write!(f, " {}", child)?;
        }
        write!(f, ")")
    }
}
