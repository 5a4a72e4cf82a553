#![forbid(unsafe_code)]

//! Callback-wrapping action base.
//!
//! [`CallbackAction`] binds an [`Operation`] (target, operation and argument
//! values) and drives it through the action protocol. The operation's
//! [`initialize`](Operation::initialize) hook runs exactly once, right before
//! the first mutation, and is where the operation snapshots whatever the
//! mutation will destroy.
//!
//! ```text
//!            apply / redo                 undo
//! Pending ─────────────────► Applied ─────────────► Undone
//!    │   initialize() once      ▲                      │
//!    │                          └──────── redo ────────┘
//! ```

use std::fmt;

use crate::action::Action;
use crate::error::ActionResult;
use crate::value::Value;

/// Lifecycle state of a [`CallbackAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    /// Constructed, never performed.
    #[default]
    Pending,
    /// Performed and not reversed since.
    Applied,
    /// Reversed by `undo`.
    Undone,
}

/// A single reversible operation on one target.
pub trait Operation {
    /// Human-readable description.
    fn describe(&self) -> String;

    /// Snapshot the state the operation is about to destroy.
    ///
    /// Called exactly once, before the first [`perform`](Self::perform).
    fn initialize(&mut self) {}

    /// Mutate the target and return the operation's inherent result.
    fn perform(&mut self) -> ActionResult<Value>;

    /// Reverse the mutation using the captured state.
    fn revert(&mut self) -> ActionResult;

    fn debug_name(&self) -> &'static str {
        "CallbackAction"
    }

    /// Wrap the operation in a [`CallbackAction`].
    fn into_action(self) -> CallbackAction<Self>
    where
        Self: Sized,
    {
        CallbackAction::new(self)
    }
}

/// Action driving an [`Operation`] with lazy, one-shot initialization.
pub struct CallbackAction<O> {
    operation: O,
    description: String,
    initialized: bool,
    state: ActionState,
}

impl<O: Operation> CallbackAction<O> {
    #[must_use]
    pub fn new(operation: O) -> Self {
        Self {
            description: operation.describe(),
            operation,
            initialized: false,
            state: ActionState::Pending,
        }
    }

    #[must_use]
    pub fn operation(&self) -> &O {
        &self.operation
    }

    #[must_use]
    pub fn state(&self) -> ActionState {
        self.state
    }

    /// Whether pre-state has been captured.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn initialize_once(&mut self) {
        if !self.initialized {
            self.operation.initialize();
            self.initialized = true;
        }
    }
}

impl<O: Operation> Action for CallbackAction<O> {
    fn apply(&mut self) -> ActionResult<Value> {
        self.initialize_once();
        tracing::trace!(action = %self.description, "apply");
        let result = self.operation.perform()?;
        self.state = ActionState::Applied;
        Ok(result)
    }

    fn redo(&mut self) -> ActionResult {
        if self.state == ActionState::Applied {
            return Ok(());
        }
        self.apply().map(drop)
    }

    fn undo(&mut self) -> ActionResult {
        if self.state != ActionState::Applied {
            return Ok(());
        }
        tracing::trace!(action = %self.description, "undo");
        self.operation.revert()?;
        self.state = ActionState::Undone;
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn debug_name(&self) -> &'static str {
        self.operation.debug_name()
    }
}

impl<O: fmt::Debug> fmt::Debug for CallbackAction<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackAction")
            .field("description", &self.description)
            .field("state", &self.state)
            .field("operation", &self.operation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counter {
        cell: Rc<Cell<i64>>,
        step: i64,
        initialized: Rc<Cell<usize>>,
    }

    impl Operation for Counter {
        fn describe(&self) -> String {
            format!("Add {}", self.step)
        }

        fn initialize(&mut self) {
            self.initialized.set(self.initialized.get() + 1);
        }

        fn perform(&mut self) -> ActionResult<Value> {
            self.cell.set(self.cell.get() + self.step);
            Ok(Value::from(self.cell.get()))
        }

        fn revert(&mut self) -> ActionResult {
            self.cell.set(self.cell.get() - self.step);
            Ok(())
        }
    }

    fn counter(step: i64) -> (Rc<Cell<i64>>, Rc<Cell<usize>>, CallbackAction<Counter>) {
        let cell = Rc::new(Cell::new(0));
        let initialized = Rc::new(Cell::new(0));
        let action = Counter {
            cell: cell.clone(),
            step,
            initialized: initialized.clone(),
        }
        .into_action();
        (cell, initialized, action)
    }

    #[test]
    fn test_initialize_runs_once() {
        let (cell, initialized, mut action) = counter(2);
        assert!(!action.is_initialized());
        assert_eq!(action.apply().unwrap(), Value::from(2));
        action.undo().unwrap();
        action.redo().unwrap();
        action.undo().unwrap();
        assert_eq!(initialized.get(), 1);
        assert_eq!(cell.get(), 0);
    }

    #[test]
    fn test_undo_before_apply_is_noop() {
        let (cell, initialized, mut action) = counter(5);
        action.undo().unwrap();
        assert_eq!(cell.get(), 0);
        assert_eq!(initialized.get(), 0);
        assert_eq!(action.state(), ActionState::Pending);
    }

    #[test]
    fn test_state_guards_double_undo_and_redo() {
        let (cell, _, mut action) = counter(1);
        action.redo().unwrap();
        action.redo().unwrap();
        assert_eq!(cell.get(), 1);
        action.undo().unwrap();
        action.undo().unwrap();
        assert_eq!(cell.get(), 0);
        assert_eq!(action.state(), ActionState::Undone);
    }

    #[test]
    fn test_description_from_operation() {
        let (_, _, action) = counter(3);
        assert_eq!(action.description(), "Add 3");
        assert_eq!(action.debug_name(), "CallbackAction");
    }
}
