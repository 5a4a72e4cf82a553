#![forbid(unsafe_code)]

//! Reversible action protocol.
//!
//! Every mutation the framework knows how to reverse is expressed as an
//! [`Action`]: a self-contained unit that can be applied, undone and redone.
//!
//! # Design Principles
//!
//! 1. **Lazy capture**: an action snapshots the slice of target state it will
//!    destroy at most once, right before it first mutates.
//! 2. **Opaque replay**: once captured, `undo`/`redo` need nothing but the
//!    action itself.
//! 3. **Composable**: actions nest inside [`ActionSequence`]s and delegates,
//!    so patch formats reuse the same primitives.
//!
//! # Invariants
//!
//! - `apply()` followed by `undo()` restores the prior state exactly
//! - alternating `undo()`/`redo()` converges on the same two states
//! - `undo()` on an action that was never applied is a no-op
//!
//! # Failure Modes
//!
//! - **State drift**: mutating the target out of band between `apply` and
//!   `undo` invalidates the captured state. Actions clamp indices so drift
//!   never panics, but the restored state is then unspecified.
//! - **Re-entrancy**: an action whose target is borrowed elsewhere panics
//!   under `RefCell` rules.

pub mod callback;
pub mod sequence;
pub mod setter;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use callback::{ActionState, CallbackAction, Operation};
pub use sequence::ActionSequence;
pub use setter::SetViaFunction;

use crate::error::ActionResult;
use crate::value::Value;

/// A reversible mutation.
pub trait Action {
    /// Perform the mutation for the first time, capturing reversal state if
    /// needed, and return its inherent result (new length, removed value...).
    fn apply(&mut self) -> ActionResult<Value>;

    /// Perform the mutation again after an undo.
    fn redo(&mut self) -> ActionResult {
        self.apply().map(drop)
    }

    /// Reverse the mutation using captured state.
    fn undo(&mut self) -> ActionResult;

    /// Human-readable description for UI display.
    fn description(&self) -> &str;

    /// Debug description of the action.
    fn debug_name(&self) -> &'static str {
        "Action"
    }
}

impl fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.debug_name())
            .field("description", &self.description())
            .finish()
    }
}

struct SharedInner {
    description: String,
    action: RefCell<Box<dyn Action>>,
}

/// Reference-counted handle to an action.
///
/// The interception layer hands the same action to every listener and then
/// applies it; a history track keeps it for later undo. Cloning the handle
/// shares the action.
#[derive(Clone)]
pub struct SharedAction(Rc<SharedInner>);

impl SharedAction {
    #[must_use]
    pub fn new(action: impl Action + 'static) -> Self {
        Self::from_boxed(Box::new(action))
    }

    #[must_use]
    pub fn from_boxed(action: Box<dyn Action>) -> Self {
        Self(Rc::new(SharedInner {
            description: action.description().to_owned(),
            action: RefCell::new(action),
        }))
    }

    pub fn apply(&self) -> ActionResult<Value> {
        self.0.action.borrow_mut().apply()
    }

    pub fn redo(&self) -> ActionResult {
        self.0.action.borrow_mut().redo()
    }

    pub fn undo(&self) -> ActionResult {
        self.0.action.borrow_mut().undo()
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.0.description
    }

    #[must_use]
    pub fn debug_name(&self) -> &'static str {
        self.0.action.borrow().debug_name()
    }

    /// Whether both handles share one action.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Run `f` against the underlying action.
    pub fn with<R>(&self, f: impl FnOnce(&dyn Action) -> R) -> R {
        f(self.0.action.borrow().as_ref())
    }
}

impl Action for SharedAction {
    fn apply(&mut self) -> ActionResult<Value> {
        SharedAction::apply(self)
    }

    fn redo(&mut self) -> ActionResult {
        SharedAction::redo(self)
    }

    fn undo(&mut self) -> ActionResult {
        SharedAction::undo(self)
    }

    fn description(&self) -> &str {
        SharedAction::description(self)
    }

    fn debug_name(&self) -> &'static str {
        SharedAction::debug_name(self)
    }
}

impl fmt::Debug for SharedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedAction")
            .field("description", &self.description())
            .field("refs", &Rc::strong_count(&self.0))
            .finish()
    }
}
