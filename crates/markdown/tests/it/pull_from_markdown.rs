use epicenter_core::materializer::MaterializerContext;
use epicenter_core::table::RowStatus;
use epicenter_core::workspace::Workspace;
use epicenter_markdown::MarkdownMaterializer;

use crate::helpers::notes_schema;

/// Building a [`MaterializerContext`] by hand and driving `push` directly, the way a
/// host would when wiring a file-watcher provider on top of the markdown materializer
/// instead of relying on `Workspace::start`'s initial pull (§4.6, §4.10).
fn context_for(workspace: &std::sync::Arc<Workspace>) -> MaterializerContext {
    MaterializerContext {
        workspace_id: workspace.id().to_string(),
        schema: workspace.schema_arc(),
        root: workspace.root().to_path_buf(),
        workspace: std::sync::Arc::clone(workspace),
    }
}

/// §8 scenario S5: a directory holding one well-formed file and one malformed file
/// (broken frontmatter delimiter). The default `MarkdownPullPolicy::Skip` admits the
/// well-formed row and leaves the malformed file exactly as it was, untouched and
/// without a row in the CRDT.
#[tokio::test]
async fn malformed_file_is_skipped_by_default_policy() {
    let root = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", root.path(), notes_schema()).build();
    let table_dir = root.path().join("notes").join("notes");
    tokio::fs::create_dir_all(&table_dir).await.unwrap();

    tokio::fs::write(
        table_dir.join("good.md"),
        "---\nid: good\ntitle: Good Note\ntags: []\n---\nBody for the good note.\n",
    )
    .await
    .unwrap();
    let malformed_content = "this file has no frontmatter delimiters at all\n";
    tokio::fs::write(table_dir.join("bad.md"), malformed_content)
        .await
        .unwrap();

    let materializer = MarkdownMaterializer::factory([])(context_for(&workspace));
    materializer.push().await.unwrap();

    match workspace.table("notes").get("good") {
        RowStatus::Valid(fields) => {
            assert_eq!(
                fields.get("title"),
                Some(&epicenter_core::field::Value::Text("Good Note".to_string()))
            );
        }
        other => panic!("expected 'good' to be admitted, got {other:?}"),
    }
    assert!(matches!(workspace.table("notes").get("bad"), RowStatus::Absent));

    // The default policy is "warn and leave": the malformed file is untouched.
    let remaining = tokio::fs::read_to_string(table_dir.join("bad.md")).await.unwrap();
    assert_eq!(remaining, malformed_content);
}

/// A malformed file's frontmatter that parses as YAML but has the wrong shape for a
/// declared field (e.g. a non-boolean where a boolean is expected) is rejected the same
/// way as a missing delimiter.
#[tokio::test]
async fn malformed_field_kind_is_rejected_but_other_rows_still_pass() {
    let root = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("notes", root.path(), notes_schema()).build();
    let table_dir = root.path().join("notes").join("notes");
    tokio::fs::create_dir_all(&table_dir).await.unwrap();

    tokio::fs::write(
        table_dir.join("ok.md"),
        "---\nid: ok\ntitle: Fine\ntags: []\n---\nFine body.\n",
    )
    .await
    .unwrap();
    tokio::fs::write(
        table_dir.join("wrong-kind.md"),
        "---\nid: wrong-kind\ntitle: [not, a, string]\ntags: []\n---\nBody.\n",
    )
    .await
    .unwrap();

    let materializer = MarkdownMaterializer::factory([])(context_for(&workspace));
    materializer.push().await.unwrap();

    assert!(matches!(workspace.table("notes").get("ok"), RowStatus::Valid(_)));
    assert!(matches!(workspace.table("notes").get("wrong-kind"), RowStatus::Absent));
}
