use std::collections::HashMap;

use epicenter_core::field::Value;
use epicenter_core::table::RowStatus;
use epicenter_core::workspace::Workspace;

use crate::helpers::notes_schema;

fn row(id: &str, title: &str) -> HashMap<String, Value> {
    let mut row = HashMap::new();
    row.insert("id".to_string(), Value::Id(id.to_string()));
    row.insert("title".to_string(), Value::Text(title.to_string()));
    row
}

/// Scenario S1: insert, read, update, delete round trip through the Table API, with
/// defaults filled in on insert.
#[tokio::test]
async fn insert_applies_defaults_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", dir.path(), notes_schema()).build();
    let table = workspace.table("notes");

    table.insert(row("n1", "Hello")).await.unwrap();

    match table.get("n1") {
        RowStatus::Valid(fields) => {
            assert_eq!(fields.get("title"), Some(&Value::Text("Hello".to_string())));
            assert_eq!(fields.get("views"), Some(&Value::Integer(0)));
            assert_eq!(fields.get("done"), Some(&Value::Boolean(false)));
        }
        other => panic!("expected a valid row, got {other:?}"),
    }

    table
        .update("n1", HashMap::from([("views".to_string(), Value::Integer(3))]))
        .await
        .unwrap();
    match table.get("n1") {
        RowStatus::Valid(fields) => assert_eq!(fields.get("views"), Some(&Value::Integer(3))),
        other => panic!("expected a valid row, got {other:?}"),
    }

    table.delete("n1").await.unwrap();
    assert!(matches!(table.get("n1"), RowStatus::Absent));

    // Deleting an already-absent row is not an error (§4.4).
    table.delete("n1").await.unwrap();
}

#[tokio::test]
async fn insert_rejects_duplicate_id() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", dir.path(), notes_schema()).build();
    let table = workspace.table("notes");

    table.insert(row("n1", "First")).await.unwrap();
    let err = table.insert(row("n1", "Second")).await.unwrap_err();
    assert_eq!(err.code(), "id-conflict");

    // The original row is untouched.
    match table.get("n1") {
        RowStatus::Valid(fields) => assert_eq!(fields.get("title"), Some(&Value::Text("First".to_string()))),
        other => panic!("expected a valid row, got {other:?}"),
    }
}

#[tokio::test]
async fn insert_rejects_missing_required_field() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", dir.path(), notes_schema()).build();
    let table = workspace.table("notes");

    let mut incomplete = HashMap::new();
    incomplete.insert("id".to_string(), Value::Id("n1".to_string()));
    let err = table.insert(incomplete).await.unwrap_err();
    assert_eq!(err.code(), "validation-failed");
}

#[tokio::test]
async fn upsert_replaces_unconditionally() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", dir.path(), notes_schema()).build();
    let table = workspace.table("notes");

    table.upsert(row("n1", "First")).await.unwrap();
    table.upsert(row("n1", "Replaced")).await.unwrap();

    match table.get("n1") {
        RowStatus::Valid(fields) => assert_eq!(fields.get("title"), Some(&Value::Text("Replaced".to_string()))),
        other => panic!("expected a valid row, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_many_removes_every_id() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", dir.path(), notes_schema()).build();
    let table = workspace.table("notes");

    table.insert(row("n1", "One")).await.unwrap();
    table.insert(row("n2", "Two")).await.unwrap();
    table.insert(row("n3", "Three")).await.unwrap();

    table
        .delete_many(&["n1".to_string(), "n3".to_string()])
        .await
        .unwrap();

    assert!(matches!(table.get("n1"), RowStatus::Absent));
    assert!(matches!(table.get("n3"), RowStatus::Absent));
    assert!(matches!(table.get("n2"), RowStatus::Valid(_)));
    assert_eq!(table.get_all_valid().len(), 1);
}

#[tokio::test]
async fn update_rejects_a_patch_that_touches_id() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", dir.path(), notes_schema()).build();
    let table = workspace.table("notes");

    table.insert(row("n1", "Hello")).await.unwrap();

    let err = table
        .update(
            "n1",
            HashMap::from([("id".to_string(), Value::Id("n2".to_string()))]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "validation-failed");

    // The row is untouched and still keyed by its original id.
    match table.get("n1") {
        RowStatus::Valid(fields) => assert_eq!(fields.get("id"), Some(&Value::Id("n1".to_string()))),
        other => panic!("expected a valid row, got {other:?}"),
    }
    assert!(matches!(table.get("n2"), RowStatus::Absent));
}

#[tokio::test]
async fn filter_matches_predicate_against_valid_rows() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", dir.path(), notes_schema()).build();
    let table = workspace.table("notes");

    table.insert(row("n1", "Alpha")).await.unwrap();
    table.insert(row("n2", "Beta")).await.unwrap();

    let matches = table.filter(|r| r.get("title") == Some(&Value::Text("Beta".to_string())));
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].get("id"), Some(&Value::Id("n2".to_string())));
}
