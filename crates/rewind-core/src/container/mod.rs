#![forbid(unsafe_code)]

//! Per-kind libraries of reversible container operations.
//!
//! Every container kind has a request enum naming its mutating methods and a
//! set of [`Operation`](crate::action::Operation)s implementing them. The
//! [`Mutation`] enum unifies the request enums so the interception layer can
//! route any request to the action that reverses it.

pub mod array;
pub mod date;
pub mod map;
pub mod record;
pub mod set;

pub use array::ArrayMutation;
pub use date::DateMutation;
pub use map::MapMutation;
pub use record::RecordMutation;
pub use set::SetMutation;

use crate::action::Action;
use crate::error::{ActionError, ActionResult};
use crate::value::{ContainerKind, Value};

/// A mutating request against some container.
#[derive(Debug, Clone)]
pub enum Mutation {
    Array(ArrayMutation),
    Record(RecordMutation),
    Map(MapMutation),
    Set(SetMutation),
    Date(DateMutation),
}

impl Mutation {
    /// Kind of container the request applies to.
    #[must_use]
    pub const fn kind(&self) -> ContainerKind {
        match self {
            Self::Array(_) => ContainerKind::Array,
            Self::Record(_) => ContainerKind::Record,
            Self::Map(_) => ContainerKind::Map,
            Self::Set(_) => ContainerKind::Set,
            Self::Date(_) => ContainerKind::Date,
        }
    }

    /// Method name of the request.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Array(m) => m.name(),
            Self::Record(m) => m.name(),
            Self::Map(m) => m.name(),
            Self::Set(m) => m.name(),
            Self::Date(m) => m.name(),
        }
    }

    /// Reversible action performing this request on `target`.
    ///
    /// Returns `None` when the target is not of the request's kind.
    #[must_use]
    pub fn into_action(self, target: &Value) -> Option<Box<dyn Action>> {
        match (self, target) {
            (Self::Array(m), Value::Array(t)) => Some(m.into_action(t)),
            (Self::Record(m), Value::Record(t)) => Some(m.into_action(t)),
            (Self::Map(m), Value::Map(t)) => Some(m.into_action(t)),
            (Self::Set(m), Value::Set(t)) => Some(m.into_action(t)),
            (Self::Date(m), Value::Date(t)) => Some(m.into_action(t)),
            _ => None,
        }
    }

    /// Perform the request without recording anything.
    ///
    /// Used when no handler intercepts it.
    pub fn perform_direct(self, target: &Value) -> ActionResult<Value> {
        let found = target.kind_name();
        let expected = self.kind().name();
        match self.into_action(target) {
            Some(mut action) => action.apply(),
            None => Err(ActionError::KindMismatch { expected, found }),
        }
    }
}

impl From<ArrayMutation> for Mutation {
    fn from(m: ArrayMutation) -> Self {
        Self::Array(m)
    }
}

impl From<RecordMutation> for Mutation {
    fn from(m: RecordMutation) -> Self {
        Self::Record(m)
    }
}

impl From<MapMutation> for Mutation {
    fn from(m: MapMutation) -> Self {
        Self::Map(m)
    }
}

impl From<SetMutation> for Mutation {
    fn from(m: SetMutation) -> Self {
        Self::Set(m)
    }
}

impl From<DateMutation> for Mutation {
    fn from(m: DateMutation) -> Self {
        Self::Date(m)
    }
}
