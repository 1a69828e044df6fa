use archiver_core::{Page, PageAccumulator, PageCursor, WorkspaceSnapshot};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn init_logging() {
    archiver_logging::initialize_for_tests();
}

fn cursor(token: &str) -> Option<PageCursor> {
    PageCursor::from_next(Some(token.to_string()))
}

#[test]
fn pages_concatenate_in_arrival_order() {
    init_logging();
    let mut acc = PageAccumulator::new();

    let next = acc.push(Page::new(vec!["c", "a"], cursor("p2")));
    assert_eq!(next, cursor("p2"));
    let next = acc.push(Page::new(vec!["b", "a"], cursor("p3")));
    assert_eq!(next, cursor("p3"));
    let next = acc.push(Page::last(vec!["d"]));
    assert_eq!(next, None);

    assert!(acc.is_done());
    assert_eq!(acc.page_count(), 3);
    // No sorting, no deduplication.
    assert_eq!(acc.into_items(), vec!["c", "a", "b", "a", "d"]);
}

#[test]
fn snapshot_keys_follow_insertion_order() {
    init_logging();
    let m1 = json!({ "text": "one", "ts": "1" });
    let m2 = json!({ "text": "two", "ts": "2" });
    let m3 = json!({ "text": "three", "ts": "3" });

    let mut snapshot = WorkspaceSnapshot::new();
    snapshot.insert("general", vec![m1.clone(), m2.clone()]);
    snapshot.insert("random", vec![m3.clone()]);

    let text = snapshot.to_pretty_json().unwrap();
    let general_at = text.find("\"general\"").unwrap();
    let random_at = text.find("\"random\"").unwrap();
    assert!(general_at < random_at);

    let parsed: Value = serde_json::from_str(&text).unwrap();
    let object = parsed.as_object().unwrap();
    let mut keys: Vec<_> = object.keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["general".to_string(), "random".to_string()]);
    assert_eq!(parsed["general"], json!([m1, m2]));
    assert_eq!(parsed["random"], json!([m3]));
}

#[test]
fn reinserting_a_channel_replaces_messages_in_place() {
    init_logging();
    let mut snapshot = WorkspaceSnapshot::new();
    snapshot.insert("general", vec![json!({ "text": "old" })]);
    snapshot.insert("random", vec![]);
    snapshot.insert("general", vec![json!({ "text": "new" })]);

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.channel_names().collect::<Vec<_>>(), vec!["general", "random"]);
    assert_eq!(snapshot.get("general").unwrap(), &[json!({ "text": "new" })]);
    assert_eq!(snapshot.message_count(), 1);
}

#[test]
fn snapshot_round_trips_through_json_preserving_order() {
    init_logging();
    let text = r#"{ "zeta": [{"ts": "1"}], "alpha": [] }"#;
    let snapshot: WorkspaceSnapshot = serde_json::from_str(text).unwrap();
    assert_eq!(snapshot.channel_names().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
}

#[test]
fn empty_snapshot_serializes_as_empty_object() {
    init_logging();
    let snapshot = WorkspaceSnapshot::new();
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.to_pretty_json().unwrap(), "{}");
}

#[test]
fn snapshot_rejects_channels_without_message_arrays() {
    init_logging();
    let err = serde_json::from_str::<WorkspaceSnapshot>(r#"{ "general": {"ts": "1"} }"#)
        .unwrap_err();
    assert!(err.to_string().contains("general"), "{err}");
}

#[test]
fn message_fields_keep_their_order_in_output() {
    init_logging();
    let message: Value =
        serde_json::from_str(r#"{ "type": "message", "user": "U1", "text": "hi", "ts": "1.0" }"#)
            .unwrap();
    let mut snapshot = WorkspaceSnapshot::new();
    snapshot.insert("general", vec![message]);

    let text = serde_json::to_string(&snapshot).unwrap();
    assert_eq!(
        text,
        r#"{"general":[{"type":"message","user":"U1","text":"hi","ts":"1.0"}]}"#
    );
}
