use std::collections::HashMap;

use epicenter_core::field::Value;
use epicenter_core::workspace::Workspace;
use epicenter_markdown::{MarkdownMaterializer, TableMarkdownConfig};

use crate::helpers::notes_schema;

fn row(id: &str, title: &str, body: &str) -> HashMap<String, Value> {
    let mut row = HashMap::new();
    row.insert("id".to_string(), Value::Id(id.to_string()));
    row.insert("title".to_string(), Value::Text(title.to_string()));
    row.insert(
        "tags".to_string(),
        Value::Tags(vec!["demo".to_string(), "demo".to_string()]),
    );
    row.insert("body".to_string(), Value::RichText(body.to_string()));
    row
}

/// §8 scenario S2: inserting a row materializes a markdown file with YAML front
/// matter (in declaration order) and the designated body field as the file body.
#[tokio::test]
async fn insert_writes_a_markdown_file_with_frontmatter_and_body() {
    let root = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", root.path(), notes_schema())
        .materializer(MarkdownMaterializer::factory([]))
        .build();

    workspace
        .table("notes")
        .insert(row("n1", "Hello", "Body text."))
        .await
        .unwrap();

    let path = root.path().join("notes").join("notes").join("n1.md");
    let content = tokio::fs::read_to_string(&path).await.unwrap();

    assert!(content.starts_with("---\n"));
    let id_pos = content.find("id: n1").unwrap();
    let title_pos = content.find("title: Hello").unwrap();
    assert!(id_pos < title_pos, "frontmatter keys should appear in declaration order");
    assert!(content.contains("tags:"));
    assert!(content.trim_end().ends_with("Body text."));

    // Tags are deduplicated by the permissive-policy pass applied on insert.
    assert_eq!(content.matches("demo").count(), 1);
}

/// A row deletion removes its file; an update rewrites it in place.
#[tokio::test]
async fn update_rewrites_and_delete_removes_the_file() {
    let root = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", root.path(), notes_schema())
        .materializer(MarkdownMaterializer::factory([]))
        .build();
    let table = workspace.table("notes");

    table.insert(row("n1", "Hello", "Body text.")).await.unwrap();
    let path = root.path().join("notes").join("notes").join("n1.md");
    assert!(tokio::fs::try_exists(&path).await.unwrap());

    table
        .update("n1", HashMap::from([("title".to_string(), Value::Text("Updated".to_string()))]))
        .await
        .unwrap();
    let content = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(content.contains("title: Updated"));

    table.delete("n1").await.unwrap();
    assert!(!tokio::fs::try_exists(&path).await.unwrap());
}

/// §4.8's `<title>-<id>.md`-style custom filename: updating the field the filename is
/// derived from must remove the file under the old stem, not leave it alongside the
/// freshly written one.
#[tokio::test]
async fn update_with_custom_filename_removes_the_stale_file() {
    let root = tempfile::tempdir().unwrap();
    let config = TableMarkdownConfig::new("notes").filename(|row| {
        let title = row.get("title").and_then(Value::as_str).unwrap_or("untitled");
        let id = row.get("id").and_then(Value::as_str).unwrap_or("");
        format!("{title}-{id}.md")
    });
    let workspace = Workspace::builder("notes", root.path(), notes_schema())
        .materializer(MarkdownMaterializer::factory([config]))
        .build();
    let table = workspace.table("notes");

    table.insert(row("n1", "Hello", "Body text.")).await.unwrap();
    let table_dir = root.path().join("notes").join("notes");
    let old_path = table_dir.join("Hello-n1.md");
    assert!(tokio::fs::try_exists(&old_path).await.unwrap());

    table
        .update("n1", HashMap::from([("title".to_string(), Value::Text("Renamed".to_string()))]))
        .await
        .unwrap();

    let new_path = table_dir.join("Renamed-n1.md");
    assert!(tokio::fs::try_exists(&new_path).await.unwrap());
    assert!(
        !tokio::fs::try_exists(&old_path).await.unwrap(),
        "stale file under the old filename should have been removed"
    );
}

/// A `pull` writes every valid row's file and removes any file that no longer
/// corresponds to a managed id (§8 properties 2 and 3).
#[tokio::test]
async fn pull_converges_the_directory_on_current_valid_rows() {
    let root = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", root.path(), notes_schema())
        .materializer(MarkdownMaterializer::factory([]))
        .build();

    let table_dir = root.path().join("notes").join("notes");
    tokio::fs::create_dir_all(&table_dir).await.unwrap();
    tokio::fs::write(table_dir.join("orphan.md"), "---\nid: orphan\n---\nstray file\n")
        .await
        .unwrap();

    workspace.table("notes").insert(row("n1", "Kept", "Body.")).await.unwrap();
    workspace.start().await.unwrap();

    assert!(!tokio::fs::try_exists(table_dir.join("orphan.md")).await.unwrap());
    assert!(tokio::fs::try_exists(table_dir.join("n1.md")).await.unwrap());

    workspace.shutdown().await;
}
