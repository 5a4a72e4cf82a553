//! Facade smoke test: the prelude is enough to record, patch and undo.

use std::cell::RefCell;
use std::rc::Rc;

use rewind::prelude::*;
use serde_json::json;

#[test]
fn prelude_drives_edits_patches_and_undo() -> Result<()> {
    let interceptor = Interceptor::default();
    let track = Rc::new(RefCell::new(HistoryTrack::default()));
    let _recording = HistoryTrack::attach(&track, &interceptor);

    let doc = Value::from(json!({"title": "can of red paint", "tags": []}));
    let root = interceptor.wrap(&doc);
    let root = root.as_record().expect("record");
    root.get("tags")
        .and_then(|tags| tags.as_array().cloned())
        .expect("tags")
        .push([Value::from("draft")])?;

    let patch = vec![PatchOperation::Replace {
        path: "/title".into(),
        value: json!("can of blue paint"),
    }];
    let patched = SharedAction::new(rewind::patch::create_patch_action(&doc, &patch)?);
    interceptor.submit(patched)?;

    assert_eq!(
        doc.to_json(),
        json!({"title": "can of blue paint", "tags": ["draft"]})
    );
    assert_eq!(track.borrow().undo_depth(), 2);

    while let Some(step) = track.borrow_mut().undo() {
        step?;
    }
    assert_eq!(doc.to_json(), json!({"title": "can of red paint", "tags": []}));
    Ok(())
}
