#![forbid(unsafe_code)]

//! Deep addressing: resolving a key path to one container slot.
//!
//! A path is an ordered list of [`Key`]s. Reduction walks every step but the
//! last and yields a [`PropertyRef`] naming the final container and key.
//!
//! # Populate mode
//!
//! When writing, a missing intermediate (absent or `Null`) can be
//! synthesized. The request then targets the *first* missing step and its
//! value is the remaining chain built around the written value, so undoing
//! the write removes the whole chain in one step:
//!
//! ```text
//! {a: {}}  set a.b.c.0 = 1  ->  request {container: a, key: b, value: {c: [1]}}
//! ```
//!
//! A non-container, non-null intermediate fails reduction either way, as
//! does a synthesized array index farther out than arrays may pad.

use serde::{Deserialize, Serialize};

use crate::container::array::within_reach;
use crate::key::{ArraySlot, Key};
use crate::value::Value;

/// Path string syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSyntax {
    /// Separator between steps.
    pub separator: String,
}

impl Default for PathSyntax {
    fn default() -> Self {
        Self {
            separator: ".".to_owned(),
        }
    }
}

impl PathSyntax {
    #[must_use]
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Split `path` into keys. The empty string is the empty path.
    #[must_use]
    pub fn parse(&self, path: &str) -> Vec<Key> {
        if path.is_empty() {
            return Vec::new();
        }
        if self.separator.is_empty() {
            return vec![Key::parse_segment(path)];
        }
        path.split(self.separator.as_str())
            .map(Key::parse_segment)
            .collect()
    }

    #[must_use]
    pub fn format(&self, path: &[Key]) -> String {
        path.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

/// Parse a `.`-separated path.
#[must_use]
pub fn parse_path(path: &str) -> Vec<Key> {
    PathSyntax::default().parse(path)
}

/// Parse a path using a custom separator.
#[must_use]
pub fn parse_path_with(path: &str, separator: &str) -> Vec<Key> {
    PathSyntax::new(separator).parse(path)
}

/// Format a path with the default `.` separator.
#[must_use]
pub fn format_path(path: &[Key]) -> String {
    PathSyntax::default().format(path)
}

/// One slot of one container.
#[derive(Debug, Clone)]
pub struct PropertyRef {
    pub container: Value,
    pub key: Key,
}

impl PropertyRef {
    #[must_use]
    pub fn new(container: Value, key: impl Into<Key>) -> Self {
        Self {
            container,
            key: key.into(),
        }
    }

    /// Value stored in the slot.
    #[must_use]
    pub fn get(&self) -> Option<Value> {
        self.container.get(&self.key)
    }

    /// Value the slot reads as a transfer source: on arrays the append key
    /// names the last element.
    #[must_use]
    pub fn read(&self) -> Option<Value> {
        match (&self.container, self.key.array_slot()) {
            (Value::Array(items), Some(ArraySlot::Append)) => items.borrow().last().cloned(),
            _ => self.get(),
        }
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.container.has(&self.key)
    }
}

/// A write of `value` into `target`.
#[derive(Debug, Clone)]
pub struct SetRequest {
    pub target: PropertyRef,
    pub value: Value,
}

/// Follow `key` from `current`, returning the next container.
///
/// `Ok(None)` means the step is missing (absent or `Null`); `Err(())` means
/// it holds a scalar and the walk cannot continue.
fn step(current: &Value, key: &Key) -> Result<Option<Value>, ()> {
    match current.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(next) if next.is_container() => Ok(Some(next)),
        Some(_) => Err(()),
    }
}

/// Reduce `path` to the container holding its last step.
///
/// Returns `None` for the empty path, a non-container root, or any missing or
/// scalar intermediate.
#[must_use]
pub fn reduce_property_path(container: &Value, path: &[Key]) -> Option<PropertyRef> {
    let (last, walk) = path.split_last()?;
    if !container.is_container() {
        return None;
    }
    let mut current = container.clone();
    for key in walk {
        current = step(&current, key).ok().flatten()?;
    }
    Some(PropertyRef {
        container: current,
        key: last.clone(),
    })
}

/// Wrap `value` in the containers the `keys` chain implies.
fn synthesize(keys: &[Key], value: Value) -> Option<Value> {
    keys.iter().rev().try_fold(value, |inner, key| match key.array_slot() {
        Some(ArraySlot::Append) => Some(Value::array([inner])),
        Some(ArraySlot::At(index)) if within_reach(index, 0) => {
            let mut items = vec![Value::Null; index];
            items.push(inner);
            Some(Value::from(items))
        }
        Some(ArraySlot::At(_)) => None,
        None => Some(Value::record([(key.property_name(), inner)])),
    })
}

/// Build the write of `value` at `path`.
///
/// Without `populate` this is [`reduce_property_path`] plus the value. With
/// `populate`, the first missing intermediate becomes the target and the rest
/// of the path is synthesized around `value`.
#[must_use]
pub fn create_set_nested_value_request(
    container: &Value,
    path: &[Key],
    value: Value,
    populate: bool,
) -> Option<SetRequest> {
    let (last, walk) = path.split_last()?;
    if !container.is_container() {
        return None;
    }
    let mut current = container.clone();
    for (index, key) in walk.iter().enumerate() {
        match step(&current, key).ok()? {
            Some(next) => current = next,
            None if populate => {
                return Some(SetRequest {
                    target: PropertyRef {
                        container: current,
                        key: key.clone(),
                    },
                    value: synthesize(&path[index + 1..], value)?,
                });
            }
            None => return None,
        }
    }
    Some(SetRequest {
        target: PropertyRef {
            container: current,
            key: last.clone(),
        },
        value,
    })
}

/// Read the value at `path`. The empty path reads the container itself.
#[must_use]
pub fn get_nested_value(container: &Value, path: &[Key]) -> Option<Value> {
    path.iter()
        .try_fold(container.clone(), |current, key| current.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_format() {
        let path = parse_path("items.0.name");
        assert_eq!(
            path,
            vec![Key::from("items"), Key::Index(0), Key::from("name")]
        );
        assert_eq!(format_path(&path), "items.0.name");
        assert!(parse_path("").is_empty());
        assert_eq!(parse_path_with("a/1", "/"), vec![Key::from("a"), Key::Index(1)]);
    }

    #[test]
    fn test_reduce_walks_intermediates() {
        let doc = Value::from(json!({"a": {"b": [10, 20]}}));
        let target = reduce_property_path(&doc, &parse_path("a.b.1")).unwrap();
        assert_eq!(target.key, Key::Index(1));
        assert_eq!(target.get(), Some(Value::from(20)));
        assert!(target.container.ptr_eq(&get_nested_value(&doc, &parse_path("a.b")).unwrap()));
    }

    #[test]
    fn test_reduce_fails_on_missing_or_scalar() {
        let doc = Value::from(json!({"a": 1, "n": null}));
        assert!(reduce_property_path(&doc, &[]).is_none());
        assert!(reduce_property_path(&doc, &parse_path("a.b")).is_none());
        assert!(reduce_property_path(&doc, &parse_path("x.y")).is_none());
        assert!(reduce_property_path(&doc, &parse_path("n.y")).is_none());
        assert!(reduce_property_path(&Value::from(3), &parse_path("a")).is_none());
    }

    #[test]
    fn test_populate_targets_first_missing_step() {
        let doc = Value::from(json!({"a": {}}));
        let request =
            create_set_nested_value_request(&doc, &parse_path("a.b.c.0"), Value::from(1), true)
                .unwrap();
        assert_eq!(request.target.key, Key::from("b"));
        assert_eq!(request.value.to_json(), json!({"c": [1]}));
        assert!(request
            .target
            .container
            .ptr_eq(&get_nested_value(&doc, &parse_path("a")).unwrap()));
    }

    #[test]
    fn test_populate_replaces_null_and_pads_indices() {
        let doc = Value::from(json!({"n": null}));
        let request =
            create_set_nested_value_request(&doc, &parse_path("n.2.-"), Value::from("x"), true)
                .unwrap();
        assert_eq!(request.target.key, Key::from("n"));
        assert_eq!(request.value.to_json(), json!([null, null, ["x"]]));
    }

    #[test]
    fn test_populate_refuses_far_indices() {
        let doc = Value::from(json!({"n": null}));
        let path = parse_path("n.99999999999999999.x");
        assert!(create_set_nested_value_request(&doc, &path, Value::from(1), true).is_none());
    }

    #[test]
    fn test_no_populate_without_flag() {
        let doc = Value::from(json!({}));
        assert!(
            create_set_nested_value_request(&doc, &parse_path("a.b"), Value::Null, false)
                .is_none()
        );
        let request =
            create_set_nested_value_request(&doc, &parse_path("a"), Value::Null, false).unwrap();
        assert_eq!(request.target.key, Key::from("a"));
    }

    #[test]
    fn test_populate_still_fails_on_scalar() {
        let doc = Value::from(json!({"a": "text"}));
        assert!(
            create_set_nested_value_request(&doc, &parse_path("a.b"), Value::Null, true)
                .is_none()
        );
    }

    #[test]
    fn test_read_append_means_last() {
        let doc = Value::from(json!({"items": [1, 2, 3]}));
        let target = reduce_property_path(&doc, &parse_path("items.-")).unwrap();
        assert_eq!(target.get(), None);
        assert_eq!(target.read(), Some(Value::from(3)));
        assert!(!target.exists());
    }

    #[test]
    fn test_path_syntax_serde_default() {
        let syntax: PathSyntax = serde_json::from_value(json!({})).unwrap();
        assert_eq!(syntax, PathSyntax::default());
    }
}
