#![forbid(unsafe_code)]

//! Reversible record property operations.
//!
//! Records keep insertion order, so every undo puts a key back at the
//! position it had before the mutation, not at the end.

use crate::action::{Action, Operation};
use crate::error::ActionResult;
use crate::value::{RecordRef, Value};

/// Prior state of one property.
#[derive(Debug, Clone, PartialEq)]
struct Slot {
    index: usize,
    value: Value,
}

fn capture(target: &RecordRef, key: &str) -> Option<Slot> {
    target
        .borrow()
        .get_full(key)
        .map(|(index, _, value)| Slot {
            index,
            value: value.clone(),
        })
}

/// Put `key` back the way `slot` describes, or remove it when it was absent.
fn restore(target: &RecordRef, key: &str, slot: Option<&Slot>) {
    let mut entries = target.borrow_mut();
    match slot {
        Some(slot) => {
            entries.shift_remove(key);
            let index = slot.index.min(entries.len());
            entries.shift_insert(index, key.to_owned(), slot.value.clone());
        }
        None => {
            entries.shift_remove(key);
        }
    }
}

/// A mutating record request.
#[derive(Debug, Clone)]
pub enum RecordMutation {
    Set { key: String, value: Value },
    Delete(String),
    Rename { from: String, to: String },
}

impl RecordMutation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Delete(_) => "delete",
            Self::Rename { .. } => "rename",
        }
    }

    #[must_use]
    pub fn into_action(self, target: &RecordRef) -> Box<dyn Action> {
        match self {
            Self::Set { key, value } => Box::new(SetProperty::new(target, key, value).into_action()),
            Self::Delete(key) => Box::new(DeleteProperty::new(target, key).into_action()),
            Self::Rename { from, to } => {
                Box::new(RenameProperty::new(target, from, to).into_action())
            }
        }
    }
}

/// Assign a property, creating it when absent. Returns the assigned value.
#[derive(Debug)]
pub struct SetProperty {
    target: RecordRef,
    key: String,
    value: Value,
    previous: Option<Slot>,
}

impl SetProperty {
    #[must_use]
    pub fn new(target: &RecordRef, key: impl Into<String>, value: Value) -> Self {
        Self {
            target: target.clone(),
            key: key.into(),
            value,
            previous: None,
        }
    }
}

impl Operation for SetProperty {
    fn describe(&self) -> String {
        format!("Set {}", self.key)
    }

    fn initialize(&mut self) {
        self.previous = capture(&self.target, &self.key);
    }

    fn perform(&mut self) -> ActionResult<Value> {
        self.target
            .borrow_mut()
            .insert(self.key.clone(), self.value.clone());
        Ok(self.value.clone())
    }

    fn revert(&mut self) -> ActionResult {
        restore(&self.target, &self.key, self.previous.as_ref());
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "SetProperty"
    }
}

/// Remove a property. Returns whether it existed.
#[derive(Debug)]
pub struct DeleteProperty {
    target: RecordRef,
    key: String,
    previous: Option<Slot>,
}

impl DeleteProperty {
    #[must_use]
    pub fn new(target: &RecordRef, key: impl Into<String>) -> Self {
        Self {
            target: target.clone(),
            key: key.into(),
            previous: None,
        }
    }
}

impl Operation for DeleteProperty {
    fn describe(&self) -> String {
        format!("Delete {}", self.key)
    }

    fn initialize(&mut self) {
        self.previous = capture(&self.target, &self.key);
    }

    fn perform(&mut self) -> ActionResult<Value> {
        let removed = self.target.borrow_mut().shift_remove(&self.key);
        Ok(Value::Bool(removed.is_some()))
    }

    fn revert(&mut self) -> ActionResult {
        if self.previous.is_some() {
            restore(&self.target, &self.key, self.previous.as_ref());
        }
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "DeleteProperty"
    }
}

/// Move the value under `from` to `to`, overwriting `to` when present.
///
/// Renaming a missing key does nothing. Returns the moved value, or `Null`.
#[derive(Debug)]
pub struct RenameProperty {
    target: RecordRef,
    from: String,
    to: String,
    previous_from: Option<Slot>,
    previous_to: Option<Slot>,
}

impl RenameProperty {
    #[must_use]
    pub fn new(target: &RecordRef, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            target: target.clone(),
            from: from.into(),
            to: to.into(),
            previous_from: None,
            previous_to: None,
        }
    }
}

impl Operation for RenameProperty {
    fn describe(&self) -> String {
        format!("Rename {} to {}", self.from, self.to)
    }

    fn initialize(&mut self) {
        self.previous_from = capture(&self.target, &self.from);
        self.previous_to = capture(&self.target, &self.to);
    }

    fn perform(&mut self) -> ActionResult<Value> {
        if self.from == self.to {
            return Ok(self.target.borrow().get(&self.from).cloned().unwrap_or_default());
        }
        let mut entries = self.target.borrow_mut();
        let Some(value) = entries.shift_remove(&self.from) else {
            return Ok(Value::Null);
        };
        entries.insert(self.to.clone(), value.clone());
        Ok(value)
    }

    fn revert(&mut self) -> ActionResult {
        if self.from == self.to || self.previous_from.is_none() {
            return Ok(());
        }
        let mut entries = self.target.borrow_mut();
        entries.shift_remove(&self.to);
        entries.shift_remove(&self.from);
        // Lower slot first, so the higher one lands against the full prefix.
        let mut slots: Vec<(&String, &Slot)> = [
            (&self.from, self.previous_from.as_ref()),
            (&self.to, self.previous_to.as_ref()),
        ]
        .into_iter()
        .filter_map(|(key, slot)| slot.map(|slot| (key, slot)))
        .collect();
        slots.sort_by_key(|(_, slot)| slot.index);
        for (key, slot) in slots {
            let index = slot.index.min(entries.len());
            entries.shift_insert(index, key.clone(), slot.value.clone());
        }
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "RenameProperty"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(json: serde_json::Value) -> RecordRef {
        match Value::from(json) {
            Value::Record(record) => record,
            other => panic!("not a record: {other:?}"),
        }
    }

    fn keys(target: &RecordRef) -> Vec<String> {
        target.borrow().keys().cloned().collect()
    }

    #[test]
    fn test_set_new_property_then_undo_removes_it() {
        let target = record(json!({"a": 1}));
        let mut action = SetProperty::new(&target, "b", Value::from(2)).into_action();
        assert_eq!(action.apply().unwrap(), Value::from(2));
        assert_eq!(keys(&target), ["a", "b"]);
        action.undo().unwrap();
        assert_eq!(keys(&target), ["a"]);
    }

    #[test]
    fn test_set_existing_property_restores_value() {
        let target = record(json!({"a": 1, "b": 2}));
        let mut action = SetProperty::new(&target, "a", Value::from("x")).into_action();
        action.apply().unwrap();
        action.undo().unwrap();
        assert_eq!(Value::Record(target.clone()).to_json(), json!({"a": 1, "b": 2}));
        assert_eq!(keys(&target), ["a", "b"]);
    }

    #[test]
    fn test_delete_restores_position() {
        let target = record(json!({"a": 1, "b": 2, "c": 3}));
        let mut action = DeleteProperty::new(&target, "b").into_action();
        assert_eq!(action.apply().unwrap(), Value::Bool(true));
        assert_eq!(keys(&target), ["a", "c"]);
        action.undo().unwrap();
        assert_eq!(keys(&target), ["a", "b", "c"]);
        action.redo().unwrap();
        assert_eq!(keys(&target), ["a", "c"]);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let target = record(json!({"a": 1}));
        let mut action = DeleteProperty::new(&target, "z").into_action();
        assert_eq!(action.apply().unwrap(), Value::Bool(false));
        action.undo().unwrap();
        assert_eq!(keys(&target), ["a"]);
    }

    #[test]
    fn test_rename_over_existing_key() {
        let target = record(json!({"a": 1, "b": 2, "c": 3}));
        let mut action = RenameProperty::new(&target, "a", "c").into_action();
        action.apply().unwrap();
        assert_eq!(Value::Record(target.clone()).to_json(), json!({"b": 2, "c": 1}));
        action.undo().unwrap();
        assert_eq!(keys(&target), ["a", "b", "c"]);
        assert_eq!(
            Value::Record(target.clone()).to_json(),
            json!({"a": 1, "b": 2, "c": 3})
        );
    }

    #[test]
    fn test_rename_forward_over_later_key_restores_order() {
        let target = record(json!({"a": 1, "c": 2, "z": 3}));
        let mut action = RenameProperty::new(&target, "a", "c").into_action();
        action.apply().unwrap();
        assert_eq!(keys(&target), ["c", "z"]);
        action.undo().unwrap();
        assert_eq!(keys(&target), ["a", "c", "z"]);
        assert_eq!(
            Value::Record(target.clone()).to_json(),
            json!({"a": 1, "c": 2, "z": 3})
        );
    }

    #[test]
    fn test_rename_backward_over_earlier_key_restores_order() {
        let target = record(json!({"a": 1, "m": 2, "z": 3}));
        let mut action = RenameProperty::new(&target, "z", "a").into_action();
        action.apply().unwrap();
        assert_eq!(Value::Record(target.clone()).to_json(), json!({"a": 3, "m": 2}));
        action.undo().unwrap();
        assert_eq!(keys(&target), ["a", "m", "z"]);
        action.redo().unwrap();
        action.undo().unwrap();
        assert_eq!(
            Value::Record(target.clone()).to_json(),
            json!({"a": 1, "m": 2, "z": 3})
        );
    }

    #[test]
    fn test_rename_to_fresh_key() {
        let target = record(json!({"a": 1, "b": 2}));
        let mut action = RecordMutation::Rename {
            from: "a".into(),
            to: "z".into(),
        }
        .into_action(&target);
        action.apply().unwrap();
        assert_eq!(keys(&target), ["b", "z"]);
        action.undo().unwrap();
        assert_eq!(keys(&target), ["a", "b"]);
    }
}
