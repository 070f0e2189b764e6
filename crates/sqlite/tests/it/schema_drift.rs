use epicenter_core::workspace::Workspace;
use epicenter_sqlite::SqliteMaterializer;
use sqlx::Row;

use crate::helpers::{notes_schema_v1, notes_schema_v2};

async fn column_names(db_path: &std::path::Path) -> Vec<String> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(db_path)
                .create_if_missing(false),
        )
        .await
        .unwrap();
    let rows = sqlx::query("PRAGMA table_info(notes)").fetch_all(&pool).await.unwrap();
    let names = rows.iter().map(|r| r.get::<String, _>("name")).collect();
    pool.close().await;
    names
}

async fn stored_fingerprint(db_path: &std::path::Path) -> String {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(db_path)
                .create_if_missing(false),
        )
        .await
        .unwrap();
    let row = sqlx::query("SELECT fingerprint FROM __epicenter_meta WHERE table_name = 'notes'")
        .fetch_one(&pool)
        .await
        .unwrap();
    let fp = row.get::<String, _>("fingerprint");
    pool.close().await;
    fp
}

/// §8 scenario S4: a later process run declares a table with a different column set.
/// The materializer detects the fingerprint mismatch on its first use and rebuilds the
/// SQL table instead of silently keeping a stale schema.
#[tokio::test]
async fn declared_schema_change_rebuilds_the_table() {
    let root = tempfile::tempdir().unwrap();
    let db_relative = "data.sqlite";

    let workspace_v1 = Workspace::builder("notes", root.path(), notes_schema_v1())
        .materializer(SqliteMaterializer::factory(db_relative, ["notes"]))
        .build();
    workspace_v1.start().await.unwrap();
    workspace_v1.shutdown().await;

    let db_path = root.path().join("notes").join(db_relative);
    let columns_v1 = column_names(&db_path).await;
    assert_eq!(columns_v1, vec!["id".to_string(), "title".to_string()]);
    let fingerprint_v1 = stored_fingerprint(&db_path).await;

    let workspace_v2 = Workspace::builder("notes", root.path(), notes_schema_v2())
        .materializer(SqliteMaterializer::factory(db_relative, ["notes"]))
        .build();
    workspace_v2.start().await.unwrap();
    workspace_v2.shutdown().await;

    let columns_v2 = column_names(&db_path).await;
    assert_eq!(columns_v2, vec!["id".to_string(), "title".to_string(), "priority".to_string()]);

    let fingerprint_v2 = stored_fingerprint(&db_path).await;
    assert_ne!(fingerprint_v1, fingerprint_v2);
}
