#![forbid(unsafe_code)]

//! Shape-polymorphic actions.
//!
//! A [`DelegatingAction`] forwards `apply`/`redo`/`undo` to a concrete
//! sub-action chosen from the runtime shape of its target. The sub-action is
//! created at most once, at first use, and cached; when none can be created
//! (the key is not addressable on the target) the delegate is a no-op.
//!
//! | Delegate | Array `At(i)` | Array `-` | Record | Map |
//! |----------|---------------|-----------|--------|-----|
//! | set      | set index     | push      | set property | set entry |
//! | insert   | splice in     | push      | set property | set entry |
//! | delete   | splice out    | pop       | delete property | delete entry |
//!
//! Single-slot delegates inspect the target when constructed; the nested
//! forms reduce their path at first use, so in a sequence each step sees the
//! effects of the steps before it.

use std::fmt;

use crate::action::{Action, ActionSequence, Operation};
use crate::container::array::{MoveElement, Pop, Push, SetIndex, Splice, within_reach};
use crate::container::map::{MapDelete, MapSet};
use crate::container::record::{DeleteProperty, SetProperty};
use crate::error::ActionResult;
use crate::key::{ArraySlot, Key};
use crate::path::{PropertyRef, create_set_nested_value_request, format_path, reduce_property_path};
use crate::value::{ArrayRef, EntryKey, MapRef, RecordRef, Value};

type Factory = Box<dyn FnOnce() -> Option<Box<dyn Action>>>;

/// What a [`DelegatingAction`] does once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateKind {
    Set,
    Insert,
    Delete,
    Transfer,
    Copy,
    /// Built from a caller-supplied factory.
    Custom,
}

impl DelegateKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Set => "SetValue",
            Self::Insert => "InsertValue",
            Self::Delete => "DeleteValue",
            Self::Transfer => "TransferValue",
            Self::Copy => "CopyValue",
            Self::Custom => "DelegatingAction",
        }
    }
}

// ============================================================================
// Slot planning
// ============================================================================

/// A target slot classified by container kind.
#[derive(Debug, Clone)]
enum Slot {
    Array(ArrayRef, ArraySlot),
    Record(RecordRef, String),
    Map(MapRef, Value),
    Unaddressable,
}

impl Slot {
    fn of(target: &PropertyRef) -> Self {
        match &target.container {
            Value::Array(items) => match target.key.array_slot() {
                Some(ArraySlot::At(index)) if !within_reach(index, items.len()) => {
                    Self::Unaddressable
                }
                Some(slot) => Self::Array(items.clone(), slot),
                None => Self::Unaddressable,
            },
            Value::Record(record) => Self::Record(record.clone(), target.key.property_name()),
            Value::Map(map) => Self::Map(map.clone(), target.key.to_value()),
            _ => Self::Unaddressable,
        }
    }

    fn read(&self) -> Option<Value> {
        match self {
            Self::Array(items, ArraySlot::At(index)) => items.get(*index),
            Self::Array(items, ArraySlot::Append) => items.borrow().last().cloned(),
            Self::Record(record, key) => record.borrow().get(key).cloned(),
            Self::Map(map, key) => map.borrow().get(&EntryKey(key.clone())).cloned(),
            Self::Unaddressable => None,
        }
    }

    fn set(self, value: Value) -> Option<Box<dyn Action>> {
        let action: Box<dyn Action> = match self {
            Self::Array(items, ArraySlot::At(index)) => {
                Box::new(SetIndex::new(&items, index, value).into_action())
            }
            Self::Array(items, ArraySlot::Append) => {
                Box::new(Push::new(&items, vec![value]).into_action())
            }
            Self::Record(record, key) => Box::new(SetProperty::new(&record, key, value).into_action()),
            Self::Map(map, key) => Box::new(MapSet::new(&map, key, value).into_action()),
            Self::Unaddressable => return None,
        };
        Some(action)
    }

    fn insert(self, value: Value) -> Option<Box<dyn Action>> {
        match self {
            Self::Array(items, ArraySlot::At(index)) => {
                let start = isize::try_from(index).ok()?;
                Some(Box::new(
                    Splice::new(&items, start, Some(0), vec![value]).into_action(),
                ))
            }
            other => other.set(value),
        }
    }

    fn delete(self) -> Option<Box<dyn Action>> {
        let action: Box<dyn Action> = match self {
            Self::Array(items, ArraySlot::At(index)) => {
                let start = isize::try_from(index).ok()?;
                Box::new(Splice::new(&items, start, Some(1), Vec::new()).into_action())
            }
            Self::Array(items, ArraySlot::Append) => Box::new(Pop::new(&items).into_action()),
            Self::Record(record, key) => Box::new(DeleteProperty::new(&record, key).into_action()),
            Self::Map(map, key) => Box::new(MapDelete::new(&map, key).into_action()),
            Self::Unaddressable => return None,
        };
        Some(action)
    }
}

/// Move between two slots: the element-move primitive for array pairs,
/// otherwise delete-then-insert of the value read now.
fn transfer(from: Slot, to: Slot, description: &str) -> Option<Box<dyn Action>> {
    if let (Slot::Array(source, from_slot), Slot::Array(dest, to_slot)) = (&from, &to) {
        let index = match from_slot {
            ArraySlot::At(index) => *index,
            ArraySlot::Append => source.len().checked_sub(1)?,
        };
        return Some(Box::new(
            MoveElement::new(source, index, dest, *to_slot).into_action(),
        ));
    }
    let value = from.read()?;
    let mut sequence = ActionSequence::new(description);
    sequence.push_boxed(from.delete()?);
    sequence.push_boxed(to.insert(value)?);
    Some(Box::new(sequence))
}

fn copy(from: &Slot, to: Slot) -> Option<Box<dyn Action>> {
    to.insert(from.read()?.deep_clone())
}

// ============================================================================
// DelegatingAction
// ============================================================================

/// Action forwarding to a lazily created, cached sub-action.
pub struct DelegatingAction {
    kind: DelegateKind,
    description: String,
    factory: Option<Factory>,
    delegate: Option<Box<dyn Action>>,
}

impl DelegatingAction {
    /// Custom delegate whose sub-action comes from `factory`.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        factory: impl FnOnce() -> Option<Box<dyn Action>> + 'static,
    ) -> Self {
        Self::with_kind(DelegateKind::Custom, description.into(), factory)
    }

    fn with_kind(
        kind: DelegateKind,
        description: String,
        factory: impl FnOnce() -> Option<Box<dyn Action>> + 'static,
    ) -> Self {
        Self {
            kind,
            description,
            factory: Some(Box::new(factory)),
            delegate: None,
        }
    }

    /// Assign `value` to `target`.
    #[must_use]
    pub fn set_value(target: &PropertyRef, value: Value) -> Self {
        let slot = Slot::of(target);
        Self::with_kind(
            DelegateKind::Set,
            format!("Set {}", target.key),
            move || slot.set(value),
        )
    }

    /// Insert `value` at `target`, shifting array elements.
    #[must_use]
    pub fn insert_value(target: &PropertyRef, value: Value) -> Self {
        let slot = Slot::of(target);
        Self::with_kind(
            DelegateKind::Insert,
            format!("Insert {}", target.key),
            move || slot.insert(value),
        )
    }

    /// Remove the slot `target` names.
    #[must_use]
    pub fn delete_value(target: &PropertyRef) -> Self {
        let slot = Slot::of(target);
        Self::with_kind(
            DelegateKind::Delete,
            format!("Delete {}", target.key),
            move || slot.delete(),
        )
    }

    /// Move the value at `from` to `to`.
    ///
    /// There is no rollback: if the insert half fails, the delete half stays
    /// applied and the error surfaces from the composite.
    #[must_use]
    pub fn transfer_value(from: &PropertyRef, to: &PropertyRef) -> Self {
        let (source, dest) = (Slot::of(from), Slot::of(to));
        let description = format!("Move {} to {}", from.key, to.key);
        let steps = description.clone();
        Self::with_kind(DelegateKind::Transfer, description, move || {
            transfer(source, dest, &steps)
        })
    }

    /// Insert a structural clone of the value at `from` into `to`.
    #[must_use]
    pub fn copy_value(from: &PropertyRef, to: &PropertyRef) -> Self {
        let (source, dest) = (Slot::of(from), Slot::of(to));
        Self::with_kind(
            DelegateKind::Copy,
            format!("Copy {} to {}", from.key, to.key),
            move || copy(&source, dest),
        )
    }

    /// Set the value at `path`, synthesizing missing containers with
    /// `populate`.
    #[must_use]
    pub fn set_nested_value(container: &Value, path: Vec<Key>, value: Value, populate: bool) -> Self {
        let container = container.clone();
        Self::with_kind(
            DelegateKind::Set,
            format!("Set {}", format_path(&path)),
            move || {
                let request = create_set_nested_value_request(&container, &path, value, populate)?;
                Slot::of(&request.target).set(request.value)
            },
        )
    }

    #[must_use]
    pub fn insert_nested_value(container: &Value, path: Vec<Key>, value: Value) -> Self {
        let container = container.clone();
        Self::with_kind(
            DelegateKind::Insert,
            format!("Insert {}", format_path(&path)),
            move || Slot::of(&reduce_property_path(&container, &path)?).insert(value),
        )
    }

    #[must_use]
    pub fn delete_nested_value(container: &Value, path: Vec<Key>) -> Self {
        let container = container.clone();
        Self::with_kind(
            DelegateKind::Delete,
            format!("Delete {}", format_path(&path)),
            move || Slot::of(&reduce_property_path(&container, &path)?).delete(),
        )
    }

    #[must_use]
    pub fn transfer_nested_value(container: &Value, from: Vec<Key>, to: Vec<Key>) -> Self {
        let container = container.clone();
        let description = format!("Move {} to {}", format_path(&from), format_path(&to));
        let steps = description.clone();
        Self::with_kind(DelegateKind::Transfer, description, move || {
            let source = Slot::of(&reduce_property_path(&container, &from)?);
            let dest = Slot::of(&reduce_property_path(&container, &to)?);
            transfer(source, dest, &steps)
        })
    }

    #[must_use]
    pub fn copy_nested_value(container: &Value, from: Vec<Key>, to: Vec<Key>) -> Self {
        let container = container.clone();
        Self::with_kind(
            DelegateKind::Copy,
            format!("Copy {} to {}", format_path(&from), format_path(&to)),
            move || {
                let source = Slot::of(&reduce_property_path(&container, &from)?);
                let dest = Slot::of(&reduce_property_path(&container, &to)?);
                copy(&source, dest)
            },
        )
    }

    #[must_use]
    pub fn kind(&self) -> DelegateKind {
        self.kind
    }

    /// Whether the sub-action has been looked up (successfully or not).
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.factory.is_none()
    }

    /// Debug name of the resolved sub-action.
    #[must_use]
    pub fn delegate_name(&self) -> Option<&'static str> {
        self.delegate.as_ref().map(|d| d.debug_name())
    }

    fn delegate(&mut self) -> Option<&mut Box<dyn Action>> {
        if let Some(factory) = self.factory.take() {
            self.delegate = factory();
            if self.delegate.is_none() {
                tracing::debug!(
                    action = %self.description,
                    kind = self.kind.name(),
                    "target not addressable, skipping"
                );
            }
        }
        self.delegate.as_mut()
    }
}

impl Action for DelegatingAction {
    fn apply(&mut self) -> ActionResult<Value> {
        match self.delegate() {
            Some(delegate) => delegate.apply(),
            None => Ok(Value::Null),
        }
    }

    fn redo(&mut self) -> ActionResult {
        match self.delegate() {
            Some(delegate) => delegate.redo(),
            None => Ok(()),
        }
    }

    fn undo(&mut self) -> ActionResult {
        // Never resolved means never applied.
        match self.delegate.as_mut() {
            Some(delegate) => delegate.undo(),
            None => Ok(()),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn debug_name(&self) -> &'static str {
        self.kind.name()
    }
}

impl fmt::Debug for DelegatingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatingAction")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("delegate", &self.delegate)
            .finish_non_exhaustive()
    }
}
