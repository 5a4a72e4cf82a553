#![forbid(unsafe_code)]

//! Rewind Core
//!
//! Reversible mutations on shared, interior-mutable containers.
//!
//! # Key Components
//!
//! - [`Value`] - Dynamic value model with shared container handles
//! - [`Action`] - The apply/redo/undo protocol every mutation implements
//! - [`CallbackAction`] - Lazy, one-shot state capture around an [`Operation`]
//! - [`ActionSequence`] - Ordered composite with reverse-order undo
//! - [`container`] - Reversible array, record, map, set and date operations
//! - [`DelegatingAction`] - Actions that pick their primitive from the target's shape
//! - [`path`] - Deep addressing through key paths
//!
//! # Role in Rewind
//! `rewind-core` owns the data model and every reversible primitive. The
//! interception layer and history track live in `rewind-runtime`; JSON and
//! text patch formats in `rewind-patch` are built from the delegates here.

pub mod action;
pub mod container;
pub mod delegate;
pub mod error;
pub mod key;
pub mod path;
pub mod value;

pub use action::{
    Action, ActionSequence, ActionState, CallbackAction, Operation, SetViaFunction, SharedAction,
};
pub use container::{
    ArrayMutation, DateMutation, MapMutation, Mutation, RecordMutation, SetMutation,
};
pub use delegate::{DelegateKind, DelegatingAction};
pub use error::{ActionError, ActionResult};
pub use key::{APPEND_KEY, ArraySlot, Key};
pub use path::{
    PathSyntax, PropertyRef, SetRequest, create_set_nested_value_request, format_path,
    get_nested_value, parse_path, parse_path_with, reduce_property_path,
};
pub use value::{ArrayRef, ContainerKind, DateRef, EntryKey, MapRef, RecordRef, SetRef, Value};
