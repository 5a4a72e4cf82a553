#![forbid(unsafe_code)]

//! Reversible set operations.

use indexmap::IndexSet;

use crate::action::{Action, Operation};
use crate::error::ActionResult;
use crate::value::{EntryKey, SetRef, Value};

/// A mutating set request.
#[derive(Debug, Clone)]
pub enum SetMutation {
    Add(Value),
    Delete(Value),
    Clear,
}

impl SetMutation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Delete(_) => "delete",
            Self::Clear => "clear",
        }
    }

    #[must_use]
    pub fn into_action(self, target: &SetRef) -> Box<dyn Action> {
        match self {
            Self::Add(member) => Box::new(SetAdd::new(target, member).into_action()),
            Self::Delete(member) => Box::new(SetDelete::new(target, member).into_action()),
            Self::Clear => Box::new(SetClear::new(target).into_action()),
        }
    }
}

/// Add a member. Returns the set.
#[derive(Debug)]
pub struct SetAdd {
    target: SetRef,
    member: EntryKey,
    was_present: bool,
}

impl SetAdd {
    #[must_use]
    pub fn new(target: &SetRef, member: Value) -> Self {
        Self {
            target: target.clone(),
            member: EntryKey(member),
            was_present: false,
        }
    }
}

impl Operation for SetAdd {
    fn describe(&self) -> String {
        format!("Add {:?}", self.member)
    }

    fn initialize(&mut self) {
        self.was_present = self.target.borrow().contains(&self.member);
    }

    fn perform(&mut self) -> ActionResult<Value> {
        self.target.borrow_mut().insert(self.member.clone());
        Ok(Value::Set(self.target.clone()))
    }

    fn revert(&mut self) -> ActionResult {
        if !self.was_present {
            self.target.borrow_mut().shift_remove(&self.member);
        }
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "SetAdd"
    }
}

/// Remove a member. Returns whether it was present.
#[derive(Debug)]
pub struct SetDelete {
    target: SetRef,
    member: EntryKey,
    position: Option<usize>,
}

impl SetDelete {
    #[must_use]
    pub fn new(target: &SetRef, member: Value) -> Self {
        Self {
            target: target.clone(),
            member: EntryKey(member),
            position: None,
        }
    }
}

impl Operation for SetDelete {
    fn describe(&self) -> String {
        format!("Delete {:?}", self.member)
    }

    fn initialize(&mut self) {
        self.position = self.target.borrow().get_index_of(&self.member);
    }

    fn perform(&mut self) -> ActionResult<Value> {
        Ok(Value::Bool(self.target.borrow_mut().shift_remove(&self.member)))
    }

    fn revert(&mut self) -> ActionResult {
        if let Some(position) = self.position {
            let mut members = self.target.borrow_mut();
            let index = position.min(members.len());
            members.shift_insert(index, self.member.clone());
        }
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "SetDelete"
    }
}

/// Remove every member, keeping a shallow copy for undo.
#[derive(Debug)]
pub struct SetClear {
    target: SetRef,
    snapshot: IndexSet<EntryKey>,
}

impl SetClear {
    #[must_use]
    pub fn new(target: &SetRef) -> Self {
        Self {
            target: target.clone(),
            snapshot: IndexSet::new(),
        }
    }
}

impl Operation for SetClear {
    fn describe(&self) -> String {
        "Clear set".to_owned()
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
        "SetClear"
    }
}
