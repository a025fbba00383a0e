//! Error types for YAML scanning, parsing and key conversion.

use std::fmt;
use thiserror::Error;

/// Result type for YANLR operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Parse context carrying the source name for error reporting.
#[derive(Clone, Debug, Default)]
pub struct ParseContext {
    pub filename: Option<String>,
}

impl ParseContext {
    /// Create a new parse context.
    pub fn new(filename: Option<&str>) -> Self {
        Self {
            filename: filename.map(String::from),
        }
    }

    /// Name of the scanned source, `<input>` when unnamed.
    pub fn source_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("<input>")
    }

    /// Build a location for a 1-based line and 0-based column.
    pub fn location(&self, line: usize, column: usize) -> Location {
        Location {
            line,
            column,
            source: self.filename.clone(),
        }
    }
}

/// Source position attached to scan and syntax errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// 1-based line.
    pub line: usize,
    /// 0-based column.
    pub column: usize,
    pub source: Option<String>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " at {}:{}", self.line, self.column + 1)?;
        if let Some(name) = &self.source {
            write!(f, " of <{}>", name)?;
        }
        Ok(())
    }
}

/// The ways the scanner can reject its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// Missing closing `'`.
    #[error("Unterminated single-quoted scalar")]
    UnterminatedSingleQuoted,

    /// Missing closing `"`.
    #[error("Unterminated double-quoted scalar")]
    UnterminatedDoubleQuoted,

    /// A scalar that could start a key appeared while another candidate was
    /// still waiting for its `:`.
    #[error("Found a second simple key candidate while another one is still pending")]
    DuplicateSimpleKey,

    /// Attempt to pop the base level of the indentation stack.
    #[error("Indentation stack underflow")]
    IndentationUnderflow,

    /// A line dedented to a column that no open block starts at.
    #[error("Dedent to column {0} does not match any open block")]
    InvalidDedent(usize),

    /// A `:` after a scalar that cannot be a key, such as the second `:` in
    /// `a: b: c`.
    #[error("Mapping values are not allowed here")]
    MappingValueNotAllowed,

    /// A `-` entry on a line that already holds a key or scalar.
    #[error("Sequence entries are not allowed here")]
    SequenceEntryNotAllowed,

    /// Tab character in the indentation of a line.
    #[error("Tab not allowed in indentation (use spaces)")]
    TabNotAllowed,

    /// Unknown escape sequence in a double-quoted scalar.
    #[error("Invalid escape sequence \"\\{0}\"")]
    InvalidEscape(char),

    /// Malformed `\x`, `\u` or `\U` escape.
    #[error("Invalid Unicode escape")]
    InvalidUnicodeEscape,
}

/// Error type for YANLR.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The scanner could not produce a token.
    #[error("{kind}{location}")]
    Scan {
        kind: ScanErrorKind,
        location: Location,
    },

    /// The token stream does not match the grammar.
    #[error("Expected {expected} but found {found}{location}")]
    Syntax {
        expected: String,
        found: String,
        location: Location,
    },

    /// The parse tree handed to the converter has an unexpected shape.
    #[error("Unexpected parse tree: {0}")]
    Conversion(String),

    /// A root path that does not form a key name.
    #[error("Invalid key name \"{0}\"")]
    InvalidKeyName(String),
}

impl ParseError {
    /// Create a scan error at the given position.
    pub fn scan(kind: ScanErrorKind, ctx: &ParseContext, line: usize, column: usize) -> Self {
        ParseError::Scan {
            kind,
            location: ctx.location(line, column),
        }
    }

    /// Position of the error in the source, if it has one.
    pub fn location(&self) -> Option<&Location> {
        match self {
            ParseError::Scan { location, .. } | ParseError::Syntax { location, .. } => {
                Some(location)
            }
            ParseError::Conversion(_) | ParseError::InvalidKeyName(_) => None,
        }
    }

    pub fn is_scan(&self) -> bool {
        matches!(self, ParseError::Scan { .. })
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, ParseError::Syntax { .. })
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, ParseError::Conversion(_))
    }
}
