#![forbid(unsafe_code)]

//! JSON Patch documents as reversible actions.
//!
//! Each operation maps onto a nested delegate from `rewind-core`:
//!
//! | op        | delegate                 |
//! |-----------|--------------------------|
//! | `add`     | insert (append on `-`)   |
//! | `remove`  | delete                   |
//! | `replace` | set, without populate    |
//! | `move`    | transfer                 |
//! | `copy`    | copy (deep clone)        |
//! | `test`    | rejected                 |
//!
//! A whole document becomes one [`ActionSequence`], so a single `undo`
//! reverts every operation in reverse order.
//!
//! # Failure Modes
//!
//! - A malformed pointer or a `test` operation fails the whole document
//!   before any action is built.
//! - A pointer into a missing or scalar location, or to an array index far
//!   past the end, makes its operation a no-op, as with every delegate.
//! - No rollback: a failing step leaves earlier steps applied.

use rewind_core::{Action, ActionSequence, DelegatingAction, Key, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{PatchError, PatchResult};

/// One operation of a JSON Patch document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: JsonValue },
    Remove { path: String },
    Replace { path: String, value: JsonValue },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: JsonValue },
}

impl PatchOperation {
    /// The `op` tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::Replace { .. } => "replace",
            Self::Move { .. } => "move",
            Self::Copy { .. } => "copy",
            Self::Test { .. } => "test",
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. }
            | Self::Remove { path }
            | Self::Replace { path, .. }
            | Self::Move { path, .. }
            | Self::Copy { path, .. }
            | Self::Test { path, .. } => path,
        }
    }

    /// Build the delegate for this operation against `target`.
    pub fn to_action(&self, target: &Value) -> PatchResult<DelegatingAction> {
        let action = match self {
            Self::Add { path, value } => DelegatingAction::insert_nested_value(
                target,
                parse_pointer(path)?,
                Value::from(value.clone()),
            ),
            Self::Remove { path } => {
                DelegatingAction::delete_nested_value(target, parse_pointer(path)?)
            }
            Self::Replace { path, value } => DelegatingAction::set_nested_value(
                target,
                parse_pointer(path)?,
                Value::from(value.clone()),
                false,
            ),
            Self::Move { from, path } => DelegatingAction::transfer_nested_value(
                target,
                parse_pointer(from)?,
                parse_pointer(path)?,
            ),
            Self::Copy { from, path } => DelegatingAction::copy_nested_value(
                target,
                parse_pointer(from)?,
                parse_pointer(path)?,
            ),
            Self::Test { .. } => {
                return Err(PatchError::UnsupportedOperation { op: self.name() });
            }
        };
        Ok(action)
    }
}

// ============================================================================
// Pointers
// ============================================================================

/// Parse an RFC 6901 pointer into path keys.
///
/// The leading empty segment is stripped, `~1` and `~0` are unescaped and
/// all-digit segments become indices. The root pointer `""` is rejected
/// since an action needs a parent container to act on.
pub fn parse_pointer(pointer: &str) -> PatchResult<Vec<Key>> {
    let Some(rest) = pointer.strip_prefix('/') else {
        let reason = if pointer.is_empty() {
            "the document root cannot be targeted"
        } else {
            "must start with '/'"
        };
        return Err(PatchError::InvalidPointer {
            pointer: pointer.to_owned(),
            reason,
        });
    };
    rest.split('/')
        .map(|segment| {
            if has_bad_escape(segment) {
                return Err(PatchError::InvalidPointer {
                    pointer: pointer.to_owned(),
                    reason: "'~' must be followed by '0' or '1'",
                });
            }
            Ok(Key::parse_segment(&segment.replace("~1", "/").replace("~0", "~")))
        })
        .collect()
}

fn has_bad_escape(segment: &str) -> bool {
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0' | '1')) {
            return true;
        }
    }
    false
}

/// Format path keys as an RFC 6901 pointer.
#[must_use]
pub fn format_pointer(path: &[Key]) -> String {
    path.iter()
        .map(|key| format!("/{}", key.property_name().replace('~', "~0").replace('/', "~1")))
        .collect()
}

// ============================================================================
// Documents
// ============================================================================

/// Parse a JSON Patch document.
pub fn parse_patch(text: &str) -> PatchResult<Vec<PatchOperation>> {
    Ok(serde_json::from_str(text)?)
}

/// Build one reversible action for a whole patch document.
///
/// Nothing is applied; every step resolves its target when the sequence
/// first reaches it, so later steps see the effects of earlier ones.
pub fn create_patch_action(target: &Value, ops: &[PatchOperation]) -> PatchResult<ActionSequence> {
    let mut sequence = ActionSequence::new(format!(
        "Apply JSON patch ({} operation{})",
        ops.len(),
        if ops.len() == 1 { "" } else { "s" }
    ));
    for op in ops {
        sequence.push(op.to_action(target)?);
    }
    debug!(operations = ops.len(), "patch action built");
    Ok(sequence)
}

/// Build and apply a patch document, returning the action for undo.
pub fn apply_patch(target: &Value, ops: &[PatchOperation]) -> PatchResult<ActionSequence> {
    let mut action = create_patch_action(target, ops)?;
    action.apply()?;
    Ok(action)
}
