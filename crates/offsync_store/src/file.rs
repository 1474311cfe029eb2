//! File-backed key-value store.

use crate::error::{StoreError, StoreResult};
use crate::store::KeyValueStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A persistent key-value store backed by a single JSON file.
///
/// The whole map is loaded at [`FileStore::open`] and rewritten on
/// every mutation. Writes go through a temporary file in the same
/// directory and are renamed into place, so a crash mid-write leaves
/// the previous file intact.
///
/// This store targets small client-side datasets (a cached collection
/// plus an offline queue); it is not a general-purpose database.
pub struct FileStore {
    path: PathBuf,
    data: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Opens a file store at `path`, loading existing entries.
    ///
    /// A missing file is treated as an empty store; it is created on
    /// the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or
    /// parsed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrites the backing file from the in-memory map.
    fn flush(&self) -> StoreResult<()> {
        let text = {
            let data = self.data.read();
            serde_json::to_string(&*data)?
        };

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        self.data.write().insert(key.to_string(), value);
        self.flush()
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let removed = self.data.write().remove(key).is_some();
        if removed {
            self.flush()?;
        }
        Ok(())
    }
}
