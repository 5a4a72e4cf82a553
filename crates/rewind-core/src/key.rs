#![forbid(unsafe_code)]

//! Keys addressing one slot of a container.
//!
//! A [`Key`] is either a numeric index or a property name. Arrays and records
//! are addressed identically once a path has been reduced to a single
//! container plus key; the container's kind decides how the key is read.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{EntryKey, Value};

/// Sentinel key meaning "after the last element" on arrays.
pub const APPEND_KEY: &str = "-";

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Index(usize),
    Name(String),
}

/// Where a key lands in an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySlot {
    At(usize),
    Append,
}

impl ArraySlot {
    /// Concrete index for an array of length `len`.
    #[must_use]
    pub const fn resolve(self, len: usize) -> usize {
        match self {
            Self::At(index) => index,
            Self::Append => len,
        }
    }
}

impl Key {
    /// Parse a path segment: all-digit segments become indices.
    #[must_use]
    pub fn parse_segment(segment: &str) -> Self {
        if is_digits(segment) {
            if let Ok(index) = segment.parse() {
                return Self::Index(index);
            }
        }
        Self::Name(segment.to_owned())
    }

    /// Whether this is the append sentinel.
    #[must_use]
    pub fn is_append(&self) -> bool {
        matches!(self, Self::Name(name) if name == APPEND_KEY)
    }

    /// Array interpretation of the key, or `None` for non-numeric names.
    #[must_use]
    pub fn array_slot(&self) -> Option<ArraySlot> {
        match self {
            Self::Index(index) => Some(ArraySlot::At(*index)),
            Self::Name(name) if name == APPEND_KEY => Some(ArraySlot::Append),
            Self::Name(name) if is_digits(name) => name.parse().ok().map(ArraySlot::At),
            Self::Name(_) => None,
        }
    }

    /// Key as it appears on a record.
    #[must_use]
    pub fn property_name(&self) -> String {
        self.to_string()
    }

    /// Key as a map entry key: indices become numbers, names strings.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Index(index) => Value::from(*index),
            Self::Name(name) => Value::from(name.as_str()),
        }
    }

    #[must_use]
    pub fn to_entry_key(&self) -> EntryKey {
        EntryKey(self.to_value())
    }
}

fn is_digits(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl Value {
    /// Clone of the value stored under `key`.
    ///
    /// The append sentinel never names an existing array slot.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<Value> {
        match self {
            Self::Array(items) => match key.array_slot()? {
                ArraySlot::At(index) => items.get(index),
                ArraySlot::Append => None,
            },
            Self::Record(record) => record.borrow().get(key.property_name().as_str()).cloned(),
            Self::Map(map) => map.borrow().get(&key.to_entry_key()).cloned(),
            _ => None,
        }
    }

    /// Whether `key` names an existing slot.
    #[must_use]
    pub fn has(&self, key: &Key) -> bool {
        match self {
            Self::Array(items) => matches!(
                key.array_slot(),
                Some(ArraySlot::At(index)) if index < items.len()
            ),
            Self::Record(record) => record.borrow().contains_key(key.property_name().as_str()),
            Self::Map(map) => map.borrow().contains_key(&key.to_entry_key()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_segment() {
        assert_eq!(Key::parse_segment("12"), Key::Index(12));
        assert_eq!(Key::parse_segment("a1"), Key::Name("a1".into()));
        assert_eq!(Key::parse_segment(""), Key::Name(String::new()));
        assert_eq!(Key::parse_segment("-"), Key::Name("-".into()));
    }

    #[test]
    fn test_array_slot() {
        assert_eq!(Key::Index(3).array_slot(), Some(ArraySlot::At(3)));
        assert_eq!(Key::from("-").array_slot(), Some(ArraySlot::Append));
        assert_eq!(Key::from("7").array_slot(), Some(ArraySlot::At(7)));
        assert_eq!(Key::from("name").array_slot(), None);
    }

    #[test]
    fn test_get_reads_each_kind() {
        let record = Value::from(json!({"items": ["a", "b"], "0": "zero"}));
        assert_eq!(record.get(&Key::Index(0)), Some(Value::from("zero")));

        let items = record.get(&Key::from("items")).unwrap();
        assert_eq!(items.get(&Key::Index(1)), Some(Value::from("b")));
        assert_eq!(items.get(&Key::from("-")), None);
        assert_eq!(items.get(&Key::from("x")), None);

        let map = Value::map([(Value::from(1), Value::from("one"))]);
        assert_eq!(map.get(&Key::Index(1)), Some(Value::from("one")));
        assert!(!map.has(&Key::from("1")));
    }

    #[test]
    fn test_key_serde_untagged() {
        let keys: Vec<Key> = serde_json::from_value(json!(["items", 0])).unwrap();
        assert_eq!(keys, vec![Key::from("items"), Key::Index(0)]);
    }
}
