#![forbid(unsafe_code)]

//! Linear undo/redo track over shared actions.
//!
//! [`HistoryTrack`] keeps two queues: `applied` (newest at the back) and
//! `undone` (next redo at the front). Recording a new action starts a new
//! branch and forgets everything that was undone.
//!
//! ```text
//! add(a4)
//!   applied: [a1, a2, a3, a4]   undone: []
//!
//! undo() x2
//!   applied: [a1, a2]           undone: [a3, a4]
//!
//! add(a5)  <-- new branch, clears undone
//!   applied: [a1, a2, a5]       undone: []
//! ```
//!
//! # Invariants
//!
//! 1. `undo_depth() <= config.capacity` after any operation (unless unlimited).
//! 2. `undone` is empty right after `add`.
//! 3. A failed `undo`/`redo` leaves both queues as they were.
//!
//! # Failure Modes
//!
//! - **Foreign mutation**: an action whose container was changed behind the
//!   track's back still restores its captured values; the result is whatever
//!   those values mean against the new state.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use rewind_core::{ActionResult, SharedAction, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::intercept::{Interceptor, Subscription};

/// Configuration for a [`HistoryTrack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Maximum number of applied actions kept (0 = unlimited).
    pub capacity: usize,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl TrackConfig {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// No eviction.
    #[must_use]
    pub fn unlimited() -> Self {
        Self { capacity: 0 }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Undo/redo history of shared actions.
pub struct HistoryTrack {
    applied: VecDeque<SharedAction>,
    undone: VecDeque<SharedAction>,
    config: TrackConfig,
}

impl fmt::Debug for HistoryTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryTrack")
            .field("undo_depth", &self.applied.len())
            .field("redo_depth", &self.undone.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for HistoryTrack {
    fn default() -> Self {
        Self::new(TrackConfig::default())
    }
}

impl HistoryTrack {
    #[must_use]
    pub fn new(config: TrackConfig) -> Self {
        Self {
            applied: VecDeque::new(),
            undone: VecDeque::new(),
            config,
        }
    }

    /// Record an action that has already been applied.
    pub fn add(&mut self, action: SharedAction) {
        if !self.undone.is_empty() {
            debug!(dropped = self.undone.len(), "redo branch discarded");
            self.undone.clear();
        }
        debug!(action = action.description(), "action recorded");
        self.applied.push_back(action);
        self.enforce_capacity();
    }

    /// Apply `action` and record it on success.
    pub fn execute(&mut self, action: SharedAction) -> ActionResult<Value> {
        let result = action.apply()?;
        self.add(action);
        Ok(result)
    }

    /// Undo the newest applied action.
    ///
    /// Returns the description of the undone action, `None` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> Option<ActionResult<String>> {
        let action = self.applied.pop_back()?;
        let description = action.description().to_owned();
        if let Err(err) = action.undo() {
            self.applied.push_back(action);
            return Some(Err(err));
        }
        debug!(action = %description, "undo");
        self.undone.push_front(action);
        Some(Ok(description))
    }

    /// Redo the most recently undone action.
    pub fn redo(&mut self) -> Option<ActionResult<String>> {
        let action = self.undone.pop_front()?;
        let description = action.description().to_owned();
        if let Err(err) = action.redo() {
            self.undone.push_front(action);
            return Some(Err(err));
        }
        debug!(action = %description, "redo");
        self.applied.push_back(action);
        Some(Ok(description))
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.applied.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.applied.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }

    /// Descriptions of the next `limit` undoable actions, newest first.
    #[must_use]
    pub fn undo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.applied
            .iter()
            .rev()
            .take(limit)
            .map(SharedAction::description)
            .collect()
    }

    /// Descriptions of the next `limit` redoable actions, next first.
    #[must_use]
    pub fn redo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.undone
            .iter()
            .take(limit)
            .map(SharedAction::description)
            .collect()
    }

    #[must_use]
    pub fn next_undo_description(&self) -> Option<&str> {
        self.applied.back().map(SharedAction::description)
    }

    #[must_use]
    pub fn next_redo_description(&self) -> Option<&str> {
        self.undone.front().map(SharedAction::description)
    }

    #[must_use]
    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    /// Forget everything. Containers are left as they are.
    pub fn clear(&mut self) {
        self.applied.clear();
        self.undone.clear();
    }

    /// Record every action intercepted by `interceptor` on `track`.
    ///
    /// The listener holds the track weakly; once the track is dropped the
    /// listener does nothing. Dropping the guard stops recording.
    pub fn attach(track: &Rc<RefCell<Self>>, interceptor: &Interceptor) -> Subscription {
        let weak: Weak<RefCell<Self>> = Rc::downgrade(track);
        interceptor.subscribe(move |action| {
            if let Some(track) = weak.upgrade() {
                track.borrow_mut().add(action.clone());
            }
        })
    }

    fn enforce_capacity(&mut self) {
        if self.config.capacity == 0 {
            return;
        }
        while self.applied.len() > self.config.capacity {
            if let Some(evicted) = self.applied.pop_front() {
                debug!(action = evicted.description(), "evicted oldest action");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_core::container::array::Push;
    use rewind_core::{ActionError, ArrayRef, Operation, SetViaFunction};

    fn push(array: &ArrayRef, n: i32) -> SharedAction {
        SharedAction::new(Push::new(array, vec![Value::from(n)]).into_action())
    }

    fn contents(array: &ArrayRef) -> serde_json::Value {
        Value::Array(array.clone()).to_json()
    }

    #[test]
    fn test_execute_undo_redo() {
        let array = ArrayRef::default();
        let mut track = HistoryTrack::default();
        track.execute(push(&array, 1)).unwrap();
        track.execute(push(&array, 2)).unwrap();
        assert_eq!(contents(&array), serde_json::json!([1, 2]));

        assert_eq!(track.undo().unwrap().unwrap(), "Push 1 item");
        assert_eq!(contents(&array), serde_json::json!([1]));
        assert!(track.can_redo());

        track.redo().unwrap().unwrap();
        assert_eq!(contents(&array), serde_json::json!([1, 2]));
        assert!(!track.can_redo());
    }

    #[test]
    fn test_empty_track() {
        let mut track = HistoryTrack::default();
        assert!(track.undo().is_none());
        assert!(track.redo().is_none());
        assert!(!track.can_undo());
    }

    #[test]
    fn test_add_clears_redo_branch() {
        let array = ArrayRef::default();
        let mut track = HistoryTrack::default();
        track.execute(push(&array, 1)).unwrap();
        track.undo();
        assert_eq!(track.redo_depth(), 1);
        track.execute(push(&array, 2)).unwrap();
        assert_eq!(track.redo_depth(), 0);
        assert_eq!(contents(&array), serde_json::json!([2]));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let array = ArrayRef::default();
        let mut track = HistoryTrack::new(TrackConfig::new(2));
        for n in 0..3 {
            track.execute(push(&array, n)).unwrap();
        }
        assert_eq!(track.undo_depth(), 2);
        while track.undo().is_some() {}
        // The first push fell off the track and stays applied.
        assert_eq!(contents(&array), serde_json::json!([0]));
    }

    #[test]
    fn test_unlimited_never_evicts() {
        let array = ArrayRef::default();
        let mut track = HistoryTrack::new(TrackConfig::unlimited());
        for n in 0..250 {
            track.execute(push(&array, n)).unwrap();
        }
        assert_eq!(track.undo_depth(), 250);
    }

    #[test]
    fn test_descriptions_order() {
        let array = ArrayRef::default();
        let mut track = HistoryTrack::default();
        track.execute(push(&array, 1)).unwrap();
        let pair = Push::new(&array, vec![Value::from(1), Value::from(2)]);
        track.execute(SharedAction::new(pair.into_action())).unwrap();
        assert_eq!(track.undo_descriptions(5), vec!["Push 2 items", "Push 1 item"]);
        assert_eq!(track.next_undo_description(), Some("Push 2 items"));
        track.undo();
        assert_eq!(track.redo_descriptions(5), vec!["Push 2 items"]);
        assert_eq!(track.next_redo_description(), Some("Push 2 items"));
    }

    #[test]
    fn test_failed_undo_keeps_action() {
        let fail = Rc::new(std::cell::Cell::new(false));
        let flag = fail.clone();
        let action = SetViaFunction::new(
            "Flaky",
            || 0,
            || Ok(Value::Null),
            move |_: &i32| {
                if flag.get() {
                    Err(ActionError::Other("restore failed".into()))
                } else {
                    Ok(())
                }
            },
        );
        let mut track = HistoryTrack::default();
        track.execute(SharedAction::new(action.into_action())).unwrap();
        fail.set(true);
        assert!(track.undo().unwrap().is_err());
        assert_eq!(track.undo_depth(), 1);
        assert_eq!(track.redo_depth(), 0);
    }

    #[test]
    fn test_attach_records_intercepted_actions() {
        let interceptor = Interceptor::default();
        let track = Rc::new(RefCell::new(HistoryTrack::default()));
        let _sub = HistoryTrack::attach(&track, &interceptor);

        let doc = Value::record([("name", Value::from("a"))]);
        let proxied = interceptor.wrap(&doc);
        proxied.as_record().unwrap().set("name", "b").unwrap();
        assert_eq!(track.borrow().undo_depth(), 1);

        track.borrow_mut().undo().unwrap().unwrap();
        assert_eq!(doc.to_json(), serde_json::json!({"name": "a"}));
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: TrackConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TrackConfig::default());
        let config: TrackConfig = serde_json::from_str(r#"{"capacity": 7}"#).unwrap();
        assert_eq!(config.capacity, 7);
        assert_eq!(TrackConfig::default().with_capacity(3).capacity, 3);
    }
}
