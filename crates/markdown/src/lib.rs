//! The markdown materializer (§4.8): one file per row under
//! `<root>/<workspace-id>/<table-name>/`, YAML front matter followed by a body, written
//! with the tmp-then-rename atomic discipline every other materializer in this runtime
//! uses (§4.9, §5, §8 property 5).

mod errors;
mod serializer;

pub use errors::Error;
pub use serializer::{MarkdownPullPolicy, TableMarkdownConfig};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use epicenter_core::field::Value;
use epicenter_core::materializer::{Materializer, MaterializerContext, MaterializerError};
use epicenter_core::schema::{TableSchema, WorkspaceSchema};
use epicenter_core::table::serialize_row;
use epicenter_core::workspace::Workspace;

use serializer::{parse_row_for_schema, render_markdown_file};

/// Mirrors a subset of a workspace's tables to a markdown file tree (§4.8).
pub struct MarkdownMaterializer {
    name: String,
    root: PathBuf,
    workspace_id: String,
    schema: Arc<WorkspaceSchema>,
    workspace: Arc<Workspace>,
    configs: HashMap<String, TableMarkdownConfig>,
}

impl MarkdownMaterializer {
    /// Build the materializer factory a [`epicenter_core::workspace::WorkspaceBuilder::materializer`]
    /// call expects. Tables with no entry in `configs` get the default `<id>.md`
    /// filename and the schema's frontmatter/body projection.
    pub fn factory(
        configs: impl IntoIterator<Item = TableMarkdownConfig>,
    ) -> impl FnOnce(MaterializerContext) -> Arc<dyn Materializer> {
        let configs: HashMap<String, TableMarkdownConfig> =
            configs.into_iter().map(|c| (c.table.clone(), c)).collect();
        move |ctx: MaterializerContext| -> Arc<dyn Materializer> {
            Arc::new(MarkdownMaterializer {
                name: "markdown".to_string(),
                root: ctx.root,
                workspace_id: ctx.workspace_id,
                schema: ctx.schema,
                workspace: ctx.workspace,
                configs,
            })
        }
    }

    fn table_dir(&self, table: &str) -> PathBuf {
        self.root.join(&self.workspace_id).join(table)
    }

    fn config_for(&self, table: &str) -> TableMarkdownConfig {
        self.configs
            .get(table)
            .cloned()
            .unwrap_or_else(|| TableMarkdownConfig::new(table))
    }

    fn table_schema(&self, table: &str) -> Result<&TableSchema, MaterializerError> {
        self.schema.table(table).ok_or_else(|| MaterializerError::SchemaDrift {
            materializer: self.name.clone(),
            reason: format!("table '{table}' is not declared in the workspace schema"),
        })
    }

    fn io_err(&self, table: &str, id: &str, source: std::io::Error) -> MaterializerError {
        MaterializerError::WriteFailed {
            materializer: self.name.clone(),
            table: table.to_string(),
            id: id.to_string(),
            reason: source.to_string(),
        }
    }

    /// Write `row`'s file atomically under `table`'s directory (§4.9).
    async fn write_row(&self, table: &str, id: &str, row: &HashMap<String, Value>) -> Result<(), MaterializerError> {
        let table_schema = self.table_schema(table)?;
        let config = self.config_for(table);
        let dir = self.table_dir(table);
        fs::create_dir_all(&dir).await.map_err(|e| self.io_err(table, id, e))?;

        let filename = config.build_filename(row);
        let content = render_markdown_file(table_schema, &config, row);
        let target = dir.join(&filename);
        let tmp = dir.join(format!("{filename}.tmp"));

        let mut file = fs::File::create(&tmp).await.map_err(|e| self.io_err(table, id, e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| self.io_err(table, id, e))?;
        file.flush().await.map_err(|e| self.io_err(table, id, e))?;
        drop(file);
        fs::rename(&tmp, &target).await.map_err(|e| self.io_err(table, id, e))?;
        Ok(())
    }

    /// Remove `id`'s file and any side-file sharing its stem (§4.8: "a row deletion
    /// removes its file (and any side-files, such as an audio file with a matching id
    /// stem)"). Matches both the default `<id>.md` stem and a custom `<prefix>-<id>.ext`
    /// stem, since a custom filename function is expected to end with `-<id>` (§4.8).
    async fn remove_row(&self, table: &str, id: &str) -> Result<(), MaterializerError> {
        let dir = self.table_dir(table);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(self.io_err(table, id, e)),
        };
        let suffix = format!("-{id}");
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.io_err(table, id, e))?
        {
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem == id || stem.ends_with(&suffix) {
                match fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(self.io_err(table, id, e)),
                }
            }
        }
        Ok(())
    }

    async fn markdown_files(&self, table: &str) -> Result<Vec<PathBuf>, MaterializerError> {
        let dir = self.table_dir(table);
        let mut out = Vec::new();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(MaterializerError::ReadFailed {
                materializer: self.name.clone(),
                reason: e.to_string(),
            }),
        };
        while let Some(entry) = entries.next_entry().await.map_err(|e| MaterializerError::ReadFailed {
            materializer: self.name.clone(),
            reason: e.to_string(),
        })? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("md") {
                out.push(path);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl Materializer for MarkdownMaterializer {
    fn name(&self) -> &str {
        &self.name
    }

    fn tables(&self) -> Vec<String> {
        self.schema.table_names().map(str::to_string).collect()
    }

    async fn on_add(&self, table: &str, id: &str, row: &HashMap<String, Value>) -> Result<(), MaterializerError> {
        self.write_row(table, id, row).await
    }

    /// A custom filename function may be derived from a field the update just changed
    /// (e.g. `<title>-<id>.md`), so the row's old file is removed first — otherwise the
    /// stale file lingers under its old stem alongside the freshly written one until the
    /// next full `pull()` happens to reconcile it.
    async fn on_update(&self, table: &str, id: &str, row: &HashMap<String, Value>) -> Result<(), MaterializerError> {
        if self.config_for(table).has_custom_filename() {
            self.remove_row(table, id).await?;
        }
        self.write_row(table, id, row).await
    }

    async fn on_delete(&self, table: &str, id: &str) -> Result<(), MaterializerError> {
        self.remove_row(table, id).await
    }

    /// Write every valid row's file, then remove any file whose id is no longer present,
    /// so a pull is idempotent and converges exactly on the CRDT's current valid rows
    /// (§4.8 `pull_to_markdown`, §8 properties 2 and 3).
    async fn pull(&self) -> Result<(), MaterializerError> {
        for table_name in self.tables() {
            self.table_schema(&table_name)?;
            let table = self.workspace.table(&table_name);

            let mut managed_ids = std::collections::HashSet::new();
            for validated in table.get_all_valid() {
                let row = serialize_row(&validated);
                let Some(Value::Id(id)) = row.get("id") else { continue };
                managed_ids.insert(id.clone());
                self.write_row(&table_name, id, &row).await?;
            }

            let dir = self.table_dir(&table_name);
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(MaterializerError::ReadFailed {
                        materializer: self.name.clone(),
                        reason: e.to_string(),
                    })
                }
            };
            let mut to_remove = Vec::new();
            while let Some(entry) = entries.next_entry().await.map_err(|e| MaterializerError::ReadFailed {
                materializer: self.name.clone(),
                reason: e.to_string(),
            })? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
                let owning_id = managed_ids
                    .iter()
                    .find(|id| stem == id.as_str() || stem.ends_with(&format!("-{id}")));
                if owning_id.is_none() {
                    to_remove.push(path);
                }
            }
            for path in to_remove {
                let _ = fs::remove_file(&path).await;
            }
        }
        Ok(())
    }

    /// Parse every `.md` file under each table's directory and upsert the valid ones
    /// through the Table API; malformed files are handled per the table's
    /// [`MarkdownPullPolicy`] (default: left in place, warning logged) (§4.8
    /// `push_from_markdown`, §9 Open Question 1).
    async fn push(&self) -> Result<(), MaterializerError> {
        for table_name in self.tables() {
            let table_schema = self.table_schema(&table_name)?.clone();
            let config = self.config_for(&table_name);
            let table = self.workspace.table(&table_name);
            let entries = self.markdown_files(&table_name).await?;

            let mut seen_ids = std::collections::HashSet::new();
            for path in entries {
                let content = match fs::read_to_string(&path).await {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "markdown push: failed to read file");
                        continue;
                    }
                };

                let parsed = if config.has_custom_deserializer() {
                    config.deserialize(&content)
                } else {
                    parse_row_for_schema(&table_schema, &content).map_err(|e| e.to_string())
                };

                match parsed {
                    Ok(row) => {
                        if let Some(Value::Id(id)) = row.get("id").cloned().or_else(|| {
                            path.file_stem()
                                .and_then(|s| s.to_str())
                                .map(|s| Value::Id(s.to_string()))
                        }) {
                            seen_ids.insert(id);
                        }
                        if let Err(err) = table.upsert(row).await {
                            tracing::warn!(
                                path = %path.display(),
                                error = %err,
                                "markdown push: row rejected by validation, left out of the CRDT"
                            );
                        }
                    }
                    Err(reason) => {
                        tracing::warn!(path = %path.display(), reason = %reason, "markdown push: malformed frontmatter");
                        apply_pull_policy(&path, config.policy()).await;
                    }
                }
            }

            if config.deletes_missing() {
                for (id, status) in table.get_all() {
                    if matches!(status, epicenter_core::table::RowStatus::Absent) {
                        continue;
                    }
                    if !seen_ids.contains(&id) {
                        let _ = table.delete(&id).await;
                    }
                }
            }
        }
        Ok(())
    }
}

async fn apply_pull_policy(path: &Path, policy: &MarkdownPullPolicy) {
    match policy {
        MarkdownPullPolicy::Skip => {}
        MarkdownPullPolicy::Delete => {
            let _ = fs::remove_file(path).await;
        }
        MarkdownPullPolicy::MoveAside(dir) => {
            if fs::create_dir_all(dir).await.is_ok() {
                if let Some(name) = path.file_name() {
                    let _ = fs::rename(path, dir.join(name)).await;
                }
            }
        }
    }
}
