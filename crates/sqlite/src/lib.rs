//! A SQLite materializer (§4.7): mirrors a workspace's CRDT tables into a `.sqlite`
//! file with one real SQL table per declared table, rebuilding on schema drift.
//!
//! Construction is synchronous (the materializer factory a [`Workspace`] builder takes
//! is `FnOnce`, not `async`), so the pool is opened with [`sqlx::sqlite::SqlitePoolOptions::connect_lazy_with`]:
//! no connection is made until the first query actually runs, which happens inside
//! `ensure_schema` on first use.

mod errors;
mod schema;

pub use errors::Error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::OnceCell;

use epicenter_core::date::DateTimeTz;
use epicenter_core::field::{FieldKind, Value};
use epicenter_core::materializer::{Materializer, MaterializerContext, MaterializerError};
use epicenter_core::schema::{TableSchema, WorkspaceSchema};
use epicenter_core::table::serialize_row;
use epicenter_core::workspace::Workspace;

use schema::{create_table_sql, fingerprint};

/// Mirrors a subset of a workspace's tables into a SQLite database file (§4.7).
pub struct SqliteMaterializer {
    name: String,
    tables: Vec<String>,
    schema: Arc<WorkspaceSchema>,
    workspace: Arc<Workspace>,
    pool: SqlitePool,
    ready: OnceCell<()>,
}

impl SqliteMaterializer {
    /// Build the materializer factory a [`epicenter_core::workspace::WorkspaceBuilder::materializer`]
    /// call expects, mirroring `tables` into `db_path` (relative paths are resolved
    /// against the workspace's root, absolute paths are used as-is).
    pub fn factory(
        db_path: impl AsRef<Path>,
        tables: impl IntoIterator<Item = impl Into<String>>,
    ) -> impl FnOnce(MaterializerContext) -> Arc<dyn Materializer> {
        let db_path = db_path.as_ref().to_path_buf();
        let tables: Vec<String> = tables.into_iter().map(Into::into).collect();
        move |ctx: MaterializerContext| -> Arc<dyn Materializer> {
            let path = if db_path.is_absolute() {
                db_path
            } else {
                ctx.root.join(&ctx.workspace_id).join(db_path)
            };
            Arc::new(Self::new(path, tables, ctx.schema, ctx.workspace))
        }
    }

    fn new(db_path: PathBuf, tables: Vec<String>, schema: Arc<WorkspaceSchema>, workspace: Arc<Workspace>) -> Self {
        let options = sqlx::sqlite::SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_lazy_with(options);
        Self {
            name: "sqlite".to_string(),
            tables,
            schema,
            workspace,
            pool,
            ready: OnceCell::new(),
        }
    }

    fn write_err(&self, table: &str, id: &str, source: sqlx::Error) -> MaterializerError {
        MaterializerError::WriteFailed {
            materializer: self.name.clone(),
            table: table.to_string(),
            id: id.to_string(),
            reason: source.to_string(),
        }
    }

    fn read_err(&self, source: sqlx::Error) -> MaterializerError {
        MaterializerError::ReadFailed {
            materializer: self.name.clone(),
            reason: source.to_string(),
        }
    }

    /// Create each table's backing SQL table on first use, recreating it if the
    /// declared schema has drifted since the last run (§4.7, §7 `schema-drift`).
    async fn ensure_schema(&self) -> Result<(), MaterializerError> {
        self.ready
            .get_or_try_init(|| async {
                let mut conn = self.pool.acquire().await.map_err(|e| self.read_err(e))?;
                sqlx::query(
                    "CREATE TABLE IF NOT EXISTS __epicenter_meta (\
                        table_name TEXT PRIMARY KEY, \
                        fingerprint TEXT NOT NULL\
                    )",
                )
                .execute(&mut *conn)
                .await
                .map_err(|e| self.read_err(e))?;

                for table_name in &self.tables {
                    let table_schema = self.schema.table(table_name).ok_or_else(|| MaterializerError::SchemaDrift {
                        materializer: self.name.clone(),
                        reason: format!("table '{table_name}' is not declared in the workspace schema"),
                    })?;
                    self.ensure_table(&mut conn, table_schema).await?;
                }
                Ok(())
            })
            .await
            .map(|_| ())
    }

    async fn ensure_table(&self, conn: &mut SqliteConnection, table_schema: &TableSchema) -> Result<(), MaterializerError> {
        let create_sql = create_table_sql(table_schema);
        let expected = fingerprint(&create_sql);

        let stored: Option<(String,)> = sqlx::query_as("SELECT fingerprint FROM __epicenter_meta WHERE table_name = ?")
            .bind(table_schema.name())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| self.read_err(e))?;

        match stored {
            Some((fp,)) if fp == expected => Ok(()),
            Some(_) => {
                tracing::warn!(
                    materializer = %self.name,
                    table = %table_schema.name(),
                    "schema drift detected, recreating table"
                );
                sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", table_schema.name()))
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| self.write_err(table_schema.name(), "*", e))?;
                sqlx::query(&create_sql)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| self.write_err(table_schema.name(), "*", e))?;
                sqlx::query("INSERT OR REPLACE INTO __epicenter_meta (table_name, fingerprint) VALUES (?, ?)")
                    .bind(table_schema.name())
                    .bind(&expected)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| self.write_err(table_schema.name(), "*", e))?;
                Ok(())
            }
            None => {
                sqlx::query(&create_sql)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| self.write_err(table_schema.name(), "*", e))?;
                sqlx::query("INSERT INTO __epicenter_meta (table_name, fingerprint) VALUES (?, ?)")
                    .bind(table_schema.name())
                    .bind(&expected)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| self.write_err(table_schema.name(), "*", e))?;
                Ok(())
            }
        }
    }

    async fn upsert_row(&self, table_schema: &TableSchema, id: &str, row: &HashMap<String, Value>) -> Result<(), MaterializerError> {
        let columns: Vec<&str> = table_schema.fields().iter().map(|(name, _)| name.as_str()).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let quoted_columns: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();
        let sql = format!(
            "INSERT OR REPLACE INTO \"{}\" ({}) VALUES ({placeholders})",
            table_schema.name(),
            quoted_columns.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for (name, _) in table_schema.fields() {
            query = match row.get(name) {
                None => query.bind(Option::<String>::None),
                Some(Value::Id(s)) | Some(Value::Text(s)) | Some(Value::Select(s)) | Some(Value::RichText(s)) => {
                    query.bind(s.clone())
                }
                Some(Value::Integer(i)) => query.bind(*i),
                Some(Value::Boolean(b)) => query.bind(if *b { 1i64 } else { 0i64 }),
                Some(Value::Date(d)) => query.bind(d.to_canonical_string()),
                Some(Value::Tags(tags)) => query.bind(serde_json::to_string(tags).unwrap_or_default()),
                Some(Value::Json(json)) => query.bind(json.to_string()),
            };
        }
        query.execute(&self.pool).await.map_err(|e| self.write_err(table_schema.name(), id, e))?;
        Ok(())
    }

    fn table_schema(&self, table: &str) -> Result<&TableSchema, MaterializerError> {
        self.schema.table(table).ok_or_else(|| MaterializerError::SchemaDrift {
            materializer: self.name.clone(),
            reason: format!("table '{table}' is not declared in the workspace schema"),
        })
    }
}

#[async_trait]
impl Materializer for SqliteMaterializer {
    fn name(&self) -> &str {
        &self.name
    }

    fn tables(&self) -> Vec<String> {
        self.tables.clone()
    }

    async fn on_add(&self, table: &str, id: &str, row: &HashMap<String, Value>) -> Result<(), MaterializerError> {
        self.ensure_schema().await?;
        let table_schema = self.table_schema(table)?;
        self.upsert_row(table_schema, id, row).await
    }

    async fn on_update(&self, table: &str, id: &str, row: &HashMap<String, Value>) -> Result<(), MaterializerError> {
        self.ensure_schema().await?;
        let table_schema = self.table_schema(table)?;
        self.upsert_row(table_schema, id, row).await
    }

    async fn on_delete(&self, table: &str, id: &str) -> Result<(), MaterializerError> {
        self.ensure_schema().await?;
        sqlx::query(&format!("DELETE FROM \"{table}\" WHERE \"id\" = ?"))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| self.write_err(table, id, e))?;
        Ok(())
    }

    /// Replace the table's full contents with the CRDT's current valid rows, so a pull
    /// is idempotent regardless of what the file previously held (§4.7, §8 property 3).
    async fn pull(&self) -> Result<(), MaterializerError> {
        self.ensure_schema().await?;
        for table_name in &self.tables {
            let table_schema = self.table_schema(table_name)?.clone();
            sqlx::query(&format!("DELETE FROM \"{table_name}\""))
                .execute(&self.pool)
                .await
                .map_err(|e| self.read_err(e))?;

            let table = self.workspace.table(table_name);
            for validated in table.get_all_valid() {
                let row = serialize_row(&validated);
                let Some(Value::Id(id)) = row.get("id") else {
                    continue;
                };
                self.upsert_row(&table_schema, id, &row).await?;
            }
        }
        Ok(())
    }

    /// Read the file back and upsert every row through the Table API (§4.7 `push_from_sqlite`).
    async fn push(&self) -> Result<(), MaterializerError> {
        self.ensure_schema().await?;
        for table_name in &self.tables {
            let table_schema = self.table_schema(table_name)?.clone();
            let columns: Vec<String> = table_schema.fields().iter().map(|(name, _)| format!("\"{name}\"")).collect();
            let select_sql = format!("SELECT {} FROM \"{}\"", columns.join(", "), table_name);
            let rows = sqlx::query(&select_sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| self.read_err(e))?;

            let table = self.workspace.table(table_name);
            for sql_row in rows {
                let mut row = HashMap::new();
                for (name, descriptor) in table_schema.fields() {
                    if let Some(value) = column_to_value(&sql_row, name, descriptor.kind()) {
                        row.insert(name.clone(), value);
                    }
                }
                if let Err(err) = table.upsert(row).await {
                    tracing::warn!(
                        materializer = %self.name,
                        table = %table_name,
                        error = %err,
                        "push: row rejected by validation, left out of the CRDT"
                    );
                }
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), MaterializerError> {
        self.pool.close().await;
        Ok(())
    }
}

fn column_to_value(row: &sqlx::sqlite::SqliteRow, name: &str, kind: &FieldKind) -> Option<Value> {
    match kind {
        FieldKind::Id => row.try_get::<Option<String>, _>(name).ok().flatten().map(Value::Id),
        FieldKind::Text => row.try_get::<Option<String>, _>(name).ok().flatten().map(Value::Text),
        FieldKind::RichText => row.try_get::<Option<String>, _>(name).ok().flatten().map(Value::RichText),
        FieldKind::Select { .. } => row.try_get::<Option<String>, _>(name).ok().flatten().map(Value::Select),
        FieldKind::Integer { .. } => row.try_get::<Option<i64>, _>(name).ok().flatten().map(Value::Integer),
        FieldKind::Boolean => row
            .try_get::<Option<i64>, _>(name)
            .ok()
            .flatten()
            .map(|i| Value::Boolean(i != 0)),
        FieldKind::Date => row
            .try_get::<Option<String>, _>(name)
            .ok()
            .flatten()
            .and_then(|s| DateTimeTz::parse_canonical(&s).ok())
            .map(Value::Date),
        FieldKind::Tags { .. } => row
            .try_get::<Option<String>, _>(name)
            .ok()
            .flatten()
            .and_then(|s| serde_json::from_str::<Vec<String>>(&s).ok())
            .map(Value::Tags),
        FieldKind::Json { .. } => row
            .try_get::<Option<String>, _>(name)
            .ok()
            .flatten()
            .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).ok())
            .map(Value::Json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epicenter_core::field;
    use epicenter_core::schema::TableSchema;

    fn sample_table() -> TableSchema {
        TableSchema::builder("notes")
            .field("id", field::id())
            .field("title", field::text())
            .field("count", field::integer())
            .field("done", field::boolean())
            .build()
            .unwrap()
    }

    #[test]
    fn create_table_sql_includes_every_field() {
        let sql = create_table_sql(&sample_table());
        assert!(sql.contains("\"id\" TEXT PRIMARY KEY"));
        assert!(sql.contains("\"title\" TEXT"));
        assert!(sql.contains("\"count\" INTEGER"));
        assert!(sql.contains("\"done\" INTEGER"));
    }

    #[test]
    fn fingerprint_changes_when_sql_changes() {
        let a = fingerprint("CREATE TABLE x (id TEXT)");
        let b = fingerprint("CREATE TABLE x (id TEXT, title TEXT)");
        assert_ne!(a, b);
        assert_eq!(a, fingerprint("CREATE TABLE x (id TEXT)"));
    }
}
