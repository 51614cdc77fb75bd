#[path = "common/mod.rs"]
mod common;

use common::*;
use serde_json::json;
use sluice::{classify, Classified, MalformedReason};

#[test]
fn numeric_id_is_content() {
    match classify(&content_payload(42)) {
        Classified::Content { id } => assert_eq!(id, "42"),
        other => panic!("expected content, got {other:?}"),
    }
}

#[test]
fn string_id_is_content() {
    let payload = json!({"id": "abc-123", "text": "hi"}).to_string();
    match classify(&payload) {
        Classified::Content { id } => assert_eq!(id, "abc-123"),
        other => panic!("expected content, got {other:?}"),
    }
}

#[test]
fn delete_marker_is_control() {
    assert_eq!(classify(&delete_payload(7)), Classified::Control);
}

/// An id wins over a control marker: a record carrying both is content.
#[test]
fn id_beats_control_marker() {
    let payload = json!({"id": 1, "delete": {"x": 1}}).to_string();
    assert!(matches!(classify(&payload), Classified::Content { .. }));
}

/// An explicit null id has nothing to shard on; the control marker decides.
#[test]
fn null_id_falls_through_to_control() {
    let payload = json!({"id": null, "delete": {"x": 1}}).to_string();
    assert_eq!(classify(&payload), Classified::Control);
}

#[test]
fn junk_is_malformed_parse() {
    match classify("not-json") {
        Classified::Malformed { reason, .. } => assert_eq!(reason, MalformedReason::Parse),
        other => panic!("expected malformed, got {other:?}"),
    }
}

#[test]
fn empty_payload_is_malformed_parse() {
    assert!(matches!(
        classify(""),
        Classified::Malformed { reason: MalformedReason::Parse, .. }
    ));
}

#[test]
fn shapeless_object_is_malformed() {
    let payload = json!({"foo": 1, "bar": [1, 2]}).to_string();
    match classify(&payload) {
        Classified::Malformed { reason, .. } => {
            assert_eq!(reason, MalformedReason::UnrecognizedShape)
        }
        other => panic!("expected malformed, got {other:?}"),
    }
}

/// A JSON array parses but has no fields at all.
#[test]
fn non_object_is_malformed() {
    assert!(matches!(classify("[1, 2, 3]"), Classified::Malformed { .. }));
}
