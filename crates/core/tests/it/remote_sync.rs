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

/// Scenario S6 (simulated locally): two replicas exchange CRDT update bytes through
/// `apply_remote_update`, the same path the WebSocket sync surface uses, and converge.
#[tokio::test]
async fn two_replicas_converge_after_exchanging_snapshots() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let replica_a = Workspace::builder("notes", dir_a.path(), notes_schema()).build();
    let replica_b = Workspace::builder("notes", dir_b.path(), notes_schema()).build();

    replica_a.table("notes").insert(row("n1", "From A")).await.unwrap();
    replica_b.table("notes").insert(row("n2", "From B")).await.unwrap();

    // Exchange full snapshots both ways.
    let snapshot_a = replica_a.snapshot();
    let snapshot_b = replica_b.snapshot();
    replica_b.apply_remote_update(&snapshot_a).await.unwrap();
    replica_a.apply_remote_update(&snapshot_b).await.unwrap();

    for replica in [&replica_a, &replica_b] {
        let table = replica.table("notes");
        assert!(matches!(table.get("n1"), RowStatus::Valid(_)));
        assert!(matches!(table.get("n2"), RowStatus::Valid(_)));
        assert_eq!(table.get_all_valid().len(), 2);
    }
}

/// Concurrent edits to *different* fields of the same row, made independently on two
/// replicas, merge structurally (§4.4): both changes survive, neither replica's write
/// clobbers the other's field.
#[tokio::test]
async fn concurrent_field_edits_on_same_row_merge_structurally() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let replica_a = Workspace::builder("notes", dir_a.path(), notes_schema()).build();
    let replica_b = Workspace::builder("notes", dir_b.path(), notes_schema()).build();

    replica_a.table("notes").insert(row("n1", "v0")).await.unwrap();
    replica_b.apply_remote_update(&replica_a.snapshot()).await.unwrap();

    // Diverge: A changes the title, B changes the view count, neither having seen the
    // other's change yet.
    replica_a
        .table("notes")
        .update("n1", HashMap::from([("title".to_string(), Value::Text("from A".to_string()))]))
        .await
        .unwrap();
    replica_b
        .table("notes")
        .update("n1", HashMap::from([("views".to_string(), Value::Integer(9))]))
        .await
        .unwrap();

    let snapshot_a = replica_a.snapshot();
    let snapshot_b = replica_b.snapshot();
    replica_b.apply_remote_update(&snapshot_a).await.unwrap();
    replica_a.apply_remote_update(&snapshot_b).await.unwrap();

    for replica in [&replica_a, &replica_b] {
        match replica.table("notes").get("n1") {
            RowStatus::Valid(fields) => {
                assert_eq!(fields.get("title"), Some(&Value::Text("from A".to_string())));
                assert_eq!(fields.get("views"), Some(&Value::Integer(9)));
            }
            other => panic!("expected n1 to merge both fields, got {other:?}"),
        }
    }
}
