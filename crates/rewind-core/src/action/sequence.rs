#![forbid(unsafe_code)]

//! Ordered composite actions.
//!
//! An [`ActionSequence`] applies its steps in order and undoes them in
//! strict reverse order, since later steps may depend on the effects of
//! earlier ones.
//!
//! # Failure Modes
//!
//! - **Partial failure**: if a step fails, the error propagates and the
//!   steps before it stay applied. There is no rollback; `undo` on the
//!   sequence reverses exactly the completed prefix.

use std::fmt;

use crate::action::Action;
use crate::error::{ActionError, ActionResult};
use crate::value::Value;

/// A sequence of actions that apply and undo together.
pub struct ActionSequence {
    /// Actions in application order.
    actions: Vec<Box<dyn Action>>,
    description: String,
    /// Number of leading actions currently applied.
    applied_to: usize,
}

impl fmt::Debug for ActionSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSequence")
            .field("description", &self.description)
            .field("actions", &self.actions)
            .field("applied_to", &self.applied_to)
            .finish()
    }
}

impl ActionSequence {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self::from_actions(description, Vec::new())
    }

    #[must_use]
    pub fn from_actions(description: impl Into<String>, actions: Vec<Box<dyn Action>>) -> Self {
        Self {
            actions,
            description: description.into(),
            applied_to: 0,
        }
    }

    /// Append a step.
    pub fn push(&mut self, action: impl Action + 'static) {
        self.actions.push(Box::new(action));
    }

    pub fn push_boxed(&mut self, action: Box<dyn Action>) {
        self.actions.push(action);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of leading steps currently applied.
    #[must_use]
    pub fn applied_steps(&self) -> usize {
        self.applied_to
    }

    fn step_error(&self, index: usize, source: ActionError) -> ActionError {
        ActionError::Step {
            index,
            description: self.description.clone(),
            source: Box::new(source),
        }
    }
}

impl Action for ActionSequence {
    fn apply(&mut self) -> ActionResult<Value> {
        let mut results = Vec::with_capacity(self.actions.len());
        for index in 0..self.actions.len() {
            match self.actions[index].apply() {
                Ok(result) => results.push(result),
                Err(e) => return Err(self.step_error(index, e)),
            }
            self.applied_to = index + 1;
        }
        Ok(Value::array(results))
    }

    fn redo(&mut self) -> ActionResult {
        for index in 0..self.actions.len() {
            if let Err(e) = self.actions[index].redo() {
                return Err(self.step_error(index, e));
            }
            self.applied_to = index + 1;
        }
        Ok(())
    }

    fn undo(&mut self) -> ActionResult {
        // Undo in reverse order
        for index in (0..self.applied_to).rev() {
            if let Err(e) = self.actions[index].undo() {
                return Err(self.step_error(index, e));
            }
            self.applied_to = index;
        }
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn debug_name(&self) -> &'static str {
        "ActionSequence"
    }
}
