//! Property-based invariant tests for patch encodings.
//!
//! 1. Encoding a diff and applying it to the old side yields the new side.
//! 2. Segment sides reproduce the original text and the patched text.
//! 3. Applying a JSON Patch and undoing it restores the document.

use proptest::prelude::*;
use rewind_core::{Action, Value};
use rewind_patch::{
    PatchOperation, apply_patch, apply_text_patch, create_text_patch_from_diff_tuples,
    get_diff_side, get_text_patch_segments, get_text_patch_sides,
};
use serde_json::json;

// ── Strategies ────────────────────────────────────────────────────────────

fn diff_strategy() -> impl Strategy<Value = Vec<(i64, String)>> {
    proptest::collection::vec((-1i64..=1, "[a-cé ]{0,4}"), 0..10)
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Text patches
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn encoded_diff_reproduces_new_side(diff in diff_strategy()) {
        let patch = create_text_patch_from_diff_tuples(&diff).unwrap();
        let old = get_diff_side(&diff, 1);
        let new = get_diff_side(&diff, -1);
        prop_assert_eq!(apply_text_patch(&old, &patch), new);
    }

    #[test]
    fn segment_sides_match(diff in diff_strategy()) {
        let patch = create_text_patch_from_diff_tuples(&diff).unwrap();
        let old = get_diff_side(&diff, 1);
        let sides = get_text_patch_sides(&get_text_patch_segments(&old, &patch));
        prop_assert_eq!(sides.original, old.clone());
        prop_assert_eq!(sides.patched, apply_text_patch(&old, &patch));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. JSON Patch round trips
// ═════════════════════════════════════════════════════════════════════════

fn op_strategy() -> impl Strategy<Value = PatchOperation> {
    let pointer = prop_oneof![
        Just("/list/0".to_owned()),
        Just("/list/-".to_owned()),
        Just("/list/9".to_owned()),
        Just("/obj/k".to_owned()),
        Just("/obj/list".to_owned()),
        Just("/name".to_owned()),
        Just("/missing/deep".to_owned()),
    ];
    prop_oneof![
        (pointer.clone(), -5i32..5)
            .prop_map(|(path, v)| PatchOperation::Add { path, value: json!(v) }),
        pointer.clone().prop_map(|path| PatchOperation::Remove { path }),
        (pointer.clone(), -5i32..5)
            .prop_map(|(path, v)| PatchOperation::Replace { path, value: json!(v) }),
        (pointer.clone(), pointer.clone()).prop_map(|(from, path)| PatchOperation::Move { from, path }),
        (pointer.clone(), pointer).prop_map(|(from, path)| PatchOperation::Copy { from, path }),
    ]
}

proptest! {
    #[test]
    fn json_patch_undo_restores(ops in proptest::collection::vec(op_strategy(), 0..8)) {
        let start = json!({"list": [1, 2, 3], "obj": {"k": "v"}, "name": "n"});
        let doc = Value::from(start.clone());
        let mut action = apply_patch(&doc, &ops).unwrap();
        action.undo().unwrap();
        prop_assert_eq!(doc.to_json(), start);
    }
}
