//! Hierarchical keys and the sorted key set the converter writes into.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, Result};

/// Metadata name that marks a key as an array and holds its last element.
pub const ARRAY_META: &str = "array";

/// A slash-separated key path, stored as unescaped base names.
///
/// Names order segment by segment, so every key sorts directly before the
/// keys below it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyName {
    segments: Vec<String>,
}

impl KeyName {
    /// Parse a textual key name such as `user/tests/yaml`.
    pub fn new(name: &str) -> Result<Self> {
        name.parse()
    }

    /// Name of the key `base` directly below this one.
    pub fn child(&self, base: &str) -> KeyName {
        let mut segments = self.segments.clone();
        segments.push(base.to_string());
        KeyName { segments }
    }

    pub fn base_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this key lies strictly below `other`.
    pub fn is_below(&self, other: &KeyName) -> bool {
        self.segments.len() > other.segments.len() && self.segments.starts_with(&other.segments)
    }
}

impl FromStr for KeyName {
    type Err = ParseError;

    /// Split on unescaped `/`. Empty parts from repeated or trailing slashes
    /// are dropped; `%` stands for an empty base name.
    fn from_str(name: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut escaped = false;
        let mut had_escape = false;

        let mut finish = |current: &mut String, had_escape: &mut bool| {
            if !current.is_empty() || *had_escape {
                let base = std::mem::take(current);
                if base == "%" && !*had_escape {
                    segments.push(String::new());
                } else {
                    segments.push(base);
                }
            }
            *had_escape = false;
        };

        for ch in name.chars() {
            if escaped {
                current.push(ch);
                escaped = false;
                continue;
            }
            match ch {
                '\\' => {
                    escaped = true;
                    had_escape = true;
                }
                '/' => finish(&mut current, &mut had_escape),
                _ => current.push(ch),
            }
        }
        if escaped {
            return Err(ParseError::InvalidKeyName(name.to_string()));
        }
        finish(&mut current, &mut had_escape);

        if segments.is_empty() {
            return Err(ParseError::InvalidKeyName(name.to_string()));
        }
        Ok(KeyName { segments })
    }
}

/// Escape a base name for the textual key name.
fn escape_base_name(base: &str) -> String {
    if base.is_empty() {
        return "%".to_string();
    }
    if base == "%" {
        return "\\%".to_string();
    }
    let mut escaped = String::with_capacity(base.len());
    for ch in base.chars() {
        if ch == '/' || ch == '\\' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(&escape_base_name(segment))?;
        }
        Ok(())
    }
}

/// A key with its string value and metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key {
    name: KeyName,
    value: String,
    meta: BTreeMap<String, String>,
}

impl Key {
    pub fn new(name: KeyName) -> Self {
        Self {
            name,
            value: String::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &KeyName {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
    }

    pub fn meta(&self, name: &str) -> Option<&str> {
        self.meta.get(name).map(String::as_str)
    }

    pub fn set_meta(&mut self, name: &str, value: &str) {
        self.meta.insert(name.to_string(), value.to_string());
    }

    pub fn metadata(&self) -> impl Iterator<Item = (&str, &str)> {
        self.meta.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` if the key carries array metadata.
    pub fn is_array(&self) -> bool {
        self.meta.contains_key(ARRAY_META)
    }
}

/// Write interface of a hierarchical key/value store.
pub trait KeyStore {
    /// Store `value` under `name`, replacing an earlier value.
    fn append(&mut self, name: &KeyName, value: &str);

    /// Attach metadata to `name`, creating the key if needed.
    fn set_metadata(&mut self, name: &KeyName, meta: &str, value: &str);
}

/// Keys sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: BTreeMap<KeyName, Key>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, name: &KeyName) -> Option<&Key> {
        self.keys.get(name)
    }

    /// Look a key up by its textual name.
    pub fn lookup(&self, name: &str) -> Option<&Key> {
        let name = KeyName::new(name).ok()?;
        self.keys.get(&name)
    }

    /// Value of the key with the textual name `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(Key::value)
    }

    pub fn iter(&self) -> btree_map::Values<'_, KeyName, Key> {
        self.keys.values()
    }

    /// Render one `name: value` line per key, followed by
    /// `name meta:<meta> = <value>` lines when `with_meta` is set.
    pub fn format(&self, with_meta: bool) -> String {
        let mut out = String::new();
        for key in self.iter() {
            if key.value().is_empty() {
                out.push_str(&format!("{}:\n", key.name()));
            } else {
                out.push_str(&format!("{}: {}\n", key.name(), key.value()));
            }
            if with_meta {
                for (meta, value) in key.metadata() {
                    if value.is_empty() {
                        out.push_str(&format!("{} meta:{} =\n", key.name(), meta));
                    } else {
                        out.push_str(&format!("{} meta:{} = {}\n", key.name(), meta, value));
                    }
                }
            }
        }
        out
    }
}

impl KeyStore for KeySet {
    fn append(&mut self, name: &KeyName, value: &str) {
        self.keys
            .entry(name.clone())
            .or_insert_with(|| Key::new(name.clone()))
            .set_value(value);
    }

    fn set_metadata(&mut self, name: &KeyName, meta: &str, value: &str) {
        self.keys
            .entry(name.clone())
            .or_insert_with(|| Key::new(name.clone()))
            .set_meta(meta, value);
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a Key;
    type IntoIter = btree_map::Values<'a, KeyName, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
