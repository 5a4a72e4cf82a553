#![forbid(unsafe_code)]

//! Compact text patches.
//!
//! A patch is a list of steps walked left to right over the original text:
//! a bare count copies that many characters, a `[count, text]` pair replaces
//! that many characters with `text`. Whatever follows the last step is
//! copied unchanged, so trailing copies are never written.
//!
//! ```text
//! "can of red paint"  +  [7, [3, "blue"]]
//!  ^^^^^^^                 copy 7     -> "can of "
//!         ^^^              replace 3  -> "blue"
//!            ^^^^^^        remainder  -> " paint"
//! ```
//!
//! Counts are Unicode scalar values, not bytes. Counts running past the end
//! of the text consume whatever is left.

use rewind_core::{Action, DelegatingAction, Key, PropertyRef, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One step of a text patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextPatchStep {
    /// Copy this many characters.
    Copy(usize),
    /// Replace this many characters with the text.
    Replace(usize, String),
}

/// A run of the patched text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextSegment {
    Unchanged { text: String },
    Changed { original: String, patched: String },
}

impl TextSegment {
    #[must_use]
    pub fn original(&self) -> &str {
        match self {
            Self::Unchanged { text } => text,
            Self::Changed { original, .. } => original,
        }
    }

    #[must_use]
    pub fn patched(&self) -> &str {
        match self {
            Self::Unchanged { text } => text,
            Self::Changed { patched, .. } => patched,
        }
    }
}

/// Both texts a patch relates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSides {
    pub original: String,
    pub patched: String,
}

/// Take up to `count` characters off the front of `rest`.
fn take_chars<'a>(rest: &mut &'a str, count: usize) -> &'a str {
    let text: &'a str = *rest;
    let end = text
        .char_indices()
        .nth(count)
        .map_or(text.len(), |(offset, _)| offset);
    let (head, tail) = text.split_at(end);
    *rest = tail;
    head
}

fn push_unchanged(segments: &mut Vec<TextSegment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(TextSegment::Unchanged { text: last }) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(TextSegment::Unchanged {
            text: text.to_owned(),
        });
    }
}

/// Split `original` into the segments `patch` keeps and changes.
#[must_use]
pub fn get_text_patch_segments(original: &str, patch: &[TextPatchStep]) -> Vec<TextSegment> {
    let mut rest = original;
    let mut segments = Vec::with_capacity(patch.len() + 1);
    for step in patch {
        match step {
            TextPatchStep::Copy(count) => {
                let text = take_chars(&mut rest, *count);
                push_unchanged(&mut segments, text);
            }
            TextPatchStep::Replace(count, patched) => {
                let removed = take_chars(&mut rest, *count);
                if removed.is_empty() && patched.is_empty() {
                    continue;
                }
                segments.push(TextSegment::Changed {
                    original: removed.to_owned(),
                    patched: patched.clone(),
                });
            }
        }
    }
    push_unchanged(&mut segments, rest);
    segments
}

/// Reassemble both texts from a segment list.
#[must_use]
pub fn get_text_patch_sides(segments: &[TextSegment]) -> TextSides {
    segments.iter().fold(TextSides::default(), |mut sides, segment| {
        sides.original.push_str(segment.original());
        sides.patched.push_str(segment.patched());
        sides
    })
}

/// Apply `patch` to `original`.
#[must_use]
pub fn apply_text_patch(original: &str, patch: &[TextPatchStep]) -> String {
    get_text_patch_segments(original, patch)
        .iter()
        .map(TextSegment::patched)
        .collect()
}

/// Patch the string stored at `key` of `container`.
///
/// The field is read when the action first applies and replaced as a whole,
/// so undo restores the exact previous string. A missing or non-string field
/// makes the action a no-op.
#[must_use]
pub fn text_patch_action(
    container: &Value,
    key: impl Into<Key>,
    patch: Vec<TextPatchStep>,
) -> DelegatingAction {
    let target = PropertyRef::new(container.clone(), key);
    let description = format!("Patch text {}", target.key);
    DelegatingAction::new(description, move || {
        let Some(current) = target.get() else {
            debug!(key = %target.key, "text patch target missing");
            return None;
        };
        let Some(text) = current.as_str() else {
            debug!(
                key = %target.key,
                found = current.kind_name(),
                "text patch target is not a string"
            );
            return None;
        };
        let patched = apply_text_patch(text, &patch);
        let set = DelegatingAction::set_value(&target, Value::from(patched));
        let action: Box<dyn Action> = Box::new(set);
        Some(action)
    })
}
