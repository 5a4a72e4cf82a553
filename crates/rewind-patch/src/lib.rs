#![forbid(unsafe_code)]

//! Rewind Patch
//!
//! Patch formats expressed as reversible rewind actions.
//!
//! # Key Components
//!
//! - [`json_patch`] - JSON Patch documents mapped onto nested delegates
//! - [`text_patch`] - Copy/replace text patches and segment views
//! - [`diff`] - Encoding `(opcode, text)` diff tuples as text patches
//!
//! # Role in Rewind
//! `rewind-patch` builds nothing of its own to capture state. Every edit it
//! makes is a `rewind-core` delegate, so patched documents undo exactly like
//! any other mutation.

pub mod diff;
pub mod error;
pub mod json_patch;
pub mod text_patch;

pub use diff::{
    DiffOpcodes, create_text_patch_from_diff_tuples, create_text_patch_from_diff_tuples_with,
    get_diff_side,
};
pub use error::{PatchError, PatchResult};
pub use json_patch::{
    PatchOperation, apply_patch, create_patch_action, format_pointer, parse_patch, parse_pointer,
};
pub use text_patch::{
    TextPatchStep, TextSegment, TextSides, apply_text_patch, get_text_patch_segments,
    get_text_patch_sides, text_patch_action,
};
