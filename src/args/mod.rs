//! Structured view of one raw token chunk.
//!
//! A chunk is split into keyless tokens, which keep their raw positions,
//! and named tokens. Named tokens are either flags (`-name`) or value keys
//! (`--name value ...`). Key lookup ignores case and reports the casing
//! that was seen first.
//!
//! # Example
//!
//! ```
//! use cliapi::args::{DefaultTokenizer, Tokenizer};
//!
//! let raw: Vec<String> = ["demo", "echo", "--Message", "hi", "-loud"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//! let args = DefaultTokenizer.tokenize(&raw).unwrap();
//!
//! assert_eq!(args.keyless(), &["demo".to_string(), "echo".to_string()]);
//! assert_eq!(args.existing_key("message"), Some("Message"));
//! assert_eq!(args.values("MESSAGE"), &["hi".to_string()]);
//! assert!(args.is_flag("loud"));
//! ```

mod tokenizer;

pub use tokenizer::{DefaultTokenizer, TokenizeError, Tokenizer};

/// Shape of a named token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedValue {
    /// Boolean key without values
    Flag,
    /// Value key with the values registered under it, in order
    Values(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NamedEntry {
    key: String,
    value: NamedValue,
}

/// Tokenized arguments of one chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArguments {
    raw: Vec<String>,
    keyless: Vec<String>,
    positions: Vec<usize>,
    named: Vec<NamedEntry>,
}

pub(crate) fn same_key(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

impl CliArguments {
    /// The raw tokens this view was built from
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    /// Keyless tokens in argument order
    pub fn keyless(&self) -> &[String] {
        &self.keyless
    }

    /// Keyless token at `index`
    pub fn keyless_at(&self, index: usize) -> Option<&str> {
        self.keyless.get(index).map(String::as_str)
    }

    /// Whether keyless token `index` is preceded by keyless tokens only,
    /// i.e. it sits at raw position `index`.
    pub fn is_leading(&self, index: usize) -> bool {
        self.positions.get(index) == Some(&index)
    }

    fn entry(&self, name: &str) -> Option<&NamedEntry> {
        self.named.iter().find(|e| same_key(&e.key, name))
    }

    /// The key as it was first written, if present in any casing
    pub fn existing_key(&self, name: &str) -> Option<&str> {
        self.entry(name).map(|e| e.key.as_str())
    }

    /// Whether a named key is present
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Whether a named key is present and boolean-shaped
    pub fn is_flag(&self, name: &str) -> bool {
        matches!(self.entry(name), Some(NamedEntry { value: NamedValue::Flag, .. }))
    }

    /// Values registered under a key. Empty for flags and absent keys.
    pub fn values(&self, name: &str) -> &[String] {
        match self.entry(name) {
            Some(NamedEntry {
                value: NamedValue::Values(values),
                ..
            }) => values,
            _ => &[],
        }
    }

    /// Number of values registered under a key
    pub fn value_count(&self, name: &str) -> usize {
        self.values(name).len()
    }

    /// Named keys in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.named.iter().map(|e| e.key.as_str())
    }

    /// Whether there are no tokens at all
    pub fn is_empty(&self) -> bool {
        self.keyless.is_empty() && self.named.is_empty()
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.named.iter().position(|e| same_key(&e.key, name))
    }
}
