//! The per-table binary attachment store (§4.9): `<root>/<workspace-id>/blobs/<table>/<name>`
//! on the local filesystem, with atomic tmp-then-rename writes (§5, §6). Not
//! event-driven; invoked directly by actions when attaching binaries.

mod errors;

pub use errors::BlobError;

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

/// A per-table blob namespace rooted at `<root>/<workspace-id>/blobs/<table>/` (§6).
#[derive(Debug, Clone)]
pub struct BlobStore {
    table_dir: PathBuf,
    table: String,
}

impl BlobStore {
    pub fn new(root: impl AsRef<Path>, workspace_id: &str, table: &str) -> Self {
        Self {
            table_dir: root.as_ref().join(workspace_id).join("blobs").join(table),
            table: table.to_string(),
        }
    }

    fn err(&self, name: &str, source: std::io::Error) -> BlobError {
        BlobError::Io {
            table: self.table.clone(),
            name: name.to_string(),
            source,
        }
    }

    /// Write `bytes` under `name`, atomically (tmp-then-rename, §4.9). Collisions replace.
    pub async fn put(&self, name: &str, bytes: &[u8]) -> Result<(), BlobError> {
        fs::create_dir_all(&self.table_dir)
            .await
            .map_err(|e| self.err(name, e))?;
        let target = self.table_dir.join(name);
        let tmp = self.table_dir.join(format!("{name}.tmp"));
        let mut file = fs::File::create(&tmp).await.map_err(|e| self.err(name, e))?;
        file.write_all(bytes).await.map_err(|e| self.err(name, e))?;
        file.flush().await.map_err(|e| self.err(name, e))?;
        drop(file);
        fs::rename(&tmp, &target).await.map_err(|e| self.err(name, e))?;
        Ok(())
    }

    /// Read `name`'s bytes, or `None` if it does not exist.
    pub async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, BlobError> {
        match fs::read(self.table_dir.join(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.err(name, e)),
        }
    }

    /// Remove `name`; not an error if it is already absent.
    pub async fn delete(&self, name: &str) -> Result<(), BlobError> {
        match fs::remove_file(self.table_dir.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.err(name, e)),
        }
    }

    /// List every blob name currently stored for this table.
    pub async fn list(&self) -> Result<Vec<String>, BlobError> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&self.table_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(self.err("<dir>", e)),
        };
        while let Some(entry) = entries.next_entry().await.map_err(|e| self.err("<dir>", e))? {
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(".tmp") {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}
