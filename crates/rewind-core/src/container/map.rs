#![forbid(unsafe_code)]

//! Reversible map operations.

use indexmap::IndexMap;

use crate::action::{Action, Operation};
use crate::error::ActionResult;
use crate::value::{EntryKey, MapRef, Value};

/// A mutating map request.
#[derive(Debug, Clone)]
pub enum MapMutation {
    Set { key: Value, value: Value },
    Delete(Value),
    Clear,
}

impl MapMutation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Delete(_) => "delete",
            Self::Clear => "clear",
        }
    }

    #[must_use]
    pub fn into_action(self, target: &MapRef) -> Box<dyn Action> {
        match self {
            Self::Set { key, value } => Box::new(MapSet::new(target, key, value).into_action()),
            Self::Delete(key) => Box::new(MapDelete::new(target, key).into_action()),
            Self::Clear => Box::new(MapClear::new(target).into_action()),
        }
    }
}

fn capture(target: &MapRef, key: &EntryKey) -> Option<(usize, Value)> {
    target
        .borrow()
        .get_full(key)
        .map(|(index, _, value)| (index, value.clone()))
}

fn restore(target: &MapRef, key: &EntryKey, previous: Option<&(usize, Value)>) {
    let mut entries = target.borrow_mut();
    entries.shift_remove(key);
    if let Some((index, value)) = previous {
        let index = (*index).min(entries.len());
        entries.shift_insert(index, key.clone(), value.clone());
    }
}

/// Insert or overwrite one entry. Returns the map.
#[derive(Debug)]
pub struct MapSet {
    target: MapRef,
    key: EntryKey,
    value: Value,
    previous: Option<(usize, Value)>,
}

impl MapSet {
    #[must_use]
    pub fn new(target: &MapRef, key: Value, value: Value) -> Self {
        Self {
            target: target.clone(),
            key: EntryKey(key),
            value,
            previous: None,
        }
    }
}

impl Operation for MapSet {
    fn describe(&self) -> String {
        format!("Set entry {:?}", self.key)
    }

    fn initialize(&mut self) {
        self.previous = capture(&self.target, &self.key);
    }

    fn perform(&mut self) -> ActionResult<Value> {
        self.target
            .borrow_mut()
            .insert(self.key.clone(), self.value.clone());
        Ok(Value::Map(self.target.clone()))
    }

    fn revert(&mut self) -> ActionResult {
        restore(&self.target, &self.key, self.previous.as_ref());
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "MapSet"
    }
}

/// Remove one entry. Returns whether it existed.
#[derive(Debug)]
pub struct MapDelete {
    target: MapRef,
    key: EntryKey,
    previous: Option<(usize, Value)>,
}

impl MapDelete {
    #[must_use]
    pub fn new(target: &MapRef, key: Value) -> Self {
        Self {
            target: target.clone(),
            key: EntryKey(key),
            previous: None,
        }
    }
}

impl Operation for MapDelete {
    fn describe(&self) -> String {
        format!("Delete entry {:?}", self.key)
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
        "MapDelete"
    }
}

/// Remove every entry, keeping a shallow copy for undo.
#[derive(Debug)]
pub struct MapClear {
    target: MapRef,
    snapshot: IndexMap<EntryKey, Value>,
}

impl MapClear {
    #[must_use]
    pub fn new(target: &MapRef) -> Self {
        Self {
            target: target.clone(),
            snapshot: IndexMap::new(),
        }
    }
}

impl Operation for MapClear {
    fn describe(&self) -> String {
        "Clear map".to_owned()
    }

    fn initialize(&mut self) {
        self.snapshot = self.target.borrow().clone();
    }

    fn perform(&mut self) -> ActionResult<Value> {
        self.target.borrow_mut().clear();
        Ok(Value::Null)
    }

    fn revert(&mut self) -> ActionResult {
        self.target.borrow_mut().clone_from(&self.snapshot);
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "MapClear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MapRef {
        match Value::map([
            (Value::from("a"), Value::from(1)),
            (Value::from(2), Value::from("two")),
            (Value::from("c"), Value::from(3)),
        ]) {
            Value::Map(map) => map,
            _ => unreachable!(),
        }
    }

    fn keys(map: &MapRef) -> Vec<Value> {
        map.borrow().keys().map(|k| k.value().clone()).collect()
    }

    #[test]
    fn test_set_new_and_existing() {
        let map = sample();
        let original = keys(&map);

        let mut add = MapSet::new(&map, Value::from("d"), Value::from(4)).into_action();
        add.apply().unwrap();
        assert_eq!(map.borrow().len(), 4);
        add.undo().unwrap();
        assert_eq!(keys(&map), original);

        let mut overwrite = MapSet::new(&map, Value::from(2), Value::Null).into_action();
        overwrite.apply().unwrap();
        overwrite.undo().unwrap();
        assert_eq!(
            map.borrow().get(&EntryKey(Value::from(2))),
            Some(&Value::from("two"))
        );
        assert_eq!(keys(&map), original);
    }

    #[test]
    fn test_delete_restores_position() {
        let map = sample();
        let original = keys(&map);
        let mut action = MapDelete::new(&map, Value::from(2)).into_action();
        assert_eq!(action.apply().unwrap(), Value::Bool(true));
        action.undo().unwrap();
        assert_eq!(keys(&map), original);
    }

    #[test]
    fn test_clear_restores_every_entry() {
        let map = sample();
        let before = Value::Map(map.clone()).deep_clone();
        let mut action = MapMutation::Clear.into_action(&map);
        action.apply().unwrap();
        assert!(map.borrow().is_empty());
        action.undo().unwrap();
        assert_eq!(Value::Map(map.clone()), before);
        assert_eq!(keys(&map), keys(before.as_map().unwrap()));
    }

    #[test]
    fn test_container_keys_use_identity() {
        let key = Value::array([]);
        let map = MapRef::default();
        let mut action = MapSet::new(&map, key.clone(), Value::from(1)).into_action();
        action.apply().unwrap();
        assert!(map.borrow().contains_key(&EntryKey(key)));
        assert!(!map.borrow().contains_key(&EntryKey(Value::array([]))));
    }
}
