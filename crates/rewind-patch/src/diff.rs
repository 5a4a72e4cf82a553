#![forbid(unsafe_code)]

//! Diff tuples to text patches.
//!
//! A diff is a list of `(opcode, text)` tuples in document order, where the
//! opcode says whether `text` was removed, kept or added. Consecutive kept
//! runs become one copy step; consecutive removed and added runs become one
//! replace step. A trailing copy is dropped since patches copy the remainder
//! implicitly.

use serde::{Deserialize, Serialize};

use crate::error::{PatchError, PatchResult};
use crate::text_patch::TextPatchStep;

/// Opcodes identifying each side of a diff tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOpcodes {
    pub removed: i64,
    pub unchanged: i64,
    pub added: i64,
}

impl Default for DiffOpcodes {
    fn default() -> Self {
        Self {
            removed: -1,
            unchanged: 0,
            added: 1,
        }
    }
}

impl DiffOpcodes {
    #[must_use]
    pub fn new(removed: i64, unchanged: i64, added: i64) -> Self {
        Self {
            removed,
            unchanged,
            added,
        }
    }
}

#[derive(Default)]
struct Encoder {
    steps: Vec<TextPatchStep>,
    copied: usize,
    removed: usize,
    added: String,
}

impl Encoder {
    fn flush_copy(&mut self) {
        if self.copied > 0 {
            self.steps.push(TextPatchStep::Copy(self.copied));
            self.copied = 0;
        }
    }

    fn flush_replace(&mut self) {
        if self.removed > 0 || !self.added.is_empty() {
            let added = std::mem::take(&mut self.added);
            self.steps.push(TextPatchStep::Replace(self.removed, added));
            self.removed = 0;
        }
    }
}

/// Encode a diff with the default `-1`/`0`/`1` opcodes.
pub fn create_text_patch_from_diff_tuples<S: AsRef<str>>(
    diff: &[(i64, S)],
) -> PatchResult<Vec<TextPatchStep>> {
    create_text_patch_from_diff_tuples_with(diff, DiffOpcodes::default())
}

/// Encode a diff whose tuples use `opcodes`.
pub fn create_text_patch_from_diff_tuples_with<S: AsRef<str>>(
    diff: &[(i64, S)],
    opcodes: DiffOpcodes,
) -> PatchResult<Vec<TextPatchStep>> {
    let mut encoder = Encoder::default();
    for (opcode, text) in diff {
        let text = text.as_ref();
        if *opcode == opcodes.unchanged {
            encoder.flush_replace();
            encoder.copied += text.chars().count();
        } else if *opcode == opcodes.removed {
            encoder.flush_copy();
            encoder.removed += text.chars().count();
        } else if *opcode == opcodes.added {
            encoder.flush_copy();
            encoder.added.push_str(text);
        } else {
            return Err(PatchError::UnknownOpcode(*opcode));
        }
    }
    encoder.flush_replace();
    Ok(encoder.steps)
}

/// Concatenate the text of every tuple whose opcode is not `excluded`.
///
/// Excluding the added opcode yields the original text, excluding the
/// removed opcode yields the new one.
#[must_use]
pub fn get_diff_side<S: AsRef<str>>(diff: &[(i64, S)], excluded: i64) -> String {
    diff.iter()
        .filter(|(opcode, _)| *opcode != excluded)
        .map(|(_, text)| text.as_ref())
        .collect()
}
