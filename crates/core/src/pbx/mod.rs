//! OpenStep-style property list grammar used by `project.pbxproj`.
//!
//! The tree keeps entry order and the `/* comment */` annotations Xcode writes
//! after object identifiers, so a manifest can be parsed, edited, and written
//! back in Xcode's own layout:
//! - `Atom`: a bare or quoted string plus its optional trailing comment.
//! - `Value`: an atom, an array, or a dictionary.
//! - `Dict`: ordered `key = value;` entries.

mod parser;
mod writer;

pub use parser::{parse, ParseError, ParseErrorKind};
pub use writer::{needs_quotes, write};

/// A scalar string together with the comment that trailed it in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub text: String,
    pub comment: Option<String>,
}

impl Atom {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), comment: None }
    }

    /// Atom annotated with a comment, e.g. `97C146F01CF9000F007C117D /* Runner */`.
    pub fn with_comment(text: impl Into<String>, comment: impl Into<String>) -> Self {
        Self { text: text.into(), comment: Some(comment.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Atom(Atom),
    Array(Vec<Value>),
    Dict(Dict),
}

impl Value {
    pub fn string(text: impl Into<String>) -> Self {
        Value::Atom(Atom::new(text))
    }

    pub fn reference(id: impl Into<String>, comment: impl Into<String>) -> Self {
        Value::Atom(Atom::with_comment(id, comment))
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Value::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_atom().map(|atom| atom.text.as_str())
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

/// One `key = value;` pair of a dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Atom,
    pub value: Value,
}

/// Dictionary with insertion-ordered entries.
///
/// Lookups are linear; manifests hold at most a few thousand objects and the
/// order must survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict {
    entries: Vec<Entry>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|entry| entry.key.text == key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|entry| entry.key.text == key).map(|entry| &entry.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.iter_mut().find(|entry| entry.key.text == key).map(|entry| &mut entry.value)
    }

    /// Convenience accessor for atom-valued keys.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Replace the value of an existing key (keeping its position and comment)
    /// or append a new entry.
    pub fn insert(&mut self, key: Atom, value: Value) {
        match self.entries.iter_mut().find(|entry| entry.key.text == key.text) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Entry { key, value }),
        }
    }

    /// Builder-style variant of [`Dict::insert`] with a plain key.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.insert(Atom::new(key), value);
        self
    }
}
