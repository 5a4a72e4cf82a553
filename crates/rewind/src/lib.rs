#![forbid(unsafe_code)]

//! Rewind public facade crate.
//!
//! Re-exports the common types of the rewind crates and offers a prelude for
//! day-to-day use. The interception layer and the patch formats sit behind
//! the default `runtime` and `patch` features.

// --- Core re-exports -------------------------------------------------------

pub use rewind_core::{
    Action, ActionError, ActionResult, ActionSequence, ArrayRef, ArraySlot, CallbackAction,
    ContainerKind, DateRef, DelegateKind, DelegatingAction, Key, MapRef, Mutation, Operation,
    PathSyntax, PropertyRef, RecordRef, SetRef, SetViaFunction, SharedAction, Value,
    get_nested_value, parse_path,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use rewind_runtime::{
    Facade, Handler, HandlerRegistry, HistoryTrack, Interceptor, Proxied, Subscription,
    TrackConfig,
};

// --- Patch re-exports ------------------------------------------------------

#[cfg(feature = "patch")]
pub use rewind_patch::{PatchError, PatchOperation, TextPatchStep, apply_patch, apply_text_patch};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for rewind applications.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[cfg(feature = "patch")]
    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Standard result type for rewind APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience prelude.
pub mod prelude {
    pub use crate::{
        Action, ActionSequence, DelegatingAction, Error, Key, PropertyRef, Result, SharedAction,
        Value,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{Facade, HistoryTrack, Interceptor, Proxied};

    #[cfg(feature = "patch")]
    pub use crate::{PatchOperation, TextPatchStep};

    pub use crate::core;
    #[cfg(feature = "patch")]
    pub use crate::patch;
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use rewind_core as core;
#[cfg(feature = "patch")]
pub use rewind_patch as patch;
#[cfg(feature = "runtime")]
pub use rewind_runtime as runtime;
