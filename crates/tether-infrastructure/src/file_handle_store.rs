//! File-backed persistent handle store.

use crate::paths::TetherPaths;
use crate::storage::KeyValueFile;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tether_core::{HandleStore, Result, TetherError};

/// Key holding the session handle.
pub const HANDLE_KEY: &str = "session_handle";
/// Companion key written and read back by `probe`.
pub const PROBE_KEY: &str = "__tether_probe__";

/// Handle store persisting the session handle in a key-value TOML file.
///
/// Blocking file I/O runs on the blocking pool so the store can be called
/// from async contexts.
#[derive(Clone)]
pub struct FileHandleStore {
    file: Arc<KeyValueFile>,
}

impl FileHandleStore {
    /// Creates a store using `handle.toml` inside `state_dir`.
    pub fn new(state_dir: &Path) -> Self {
        Self::with_path(TetherPaths::handle_file(state_dir))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: Arc::new(KeyValueFile::new(path)),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&KeyValueFile) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || f(&file))
            .await
            .map_err(|e| TetherError::internal(format!("Failed to join task: {}", e)))?
            .map_err(into_storage)
    }
}

/// Writes `token` under the probe key, reads it back through `read` and
/// removes the key again on every path.
fn probe_round_trip<R>(file: &KeyValueFile, token: &str, read: R) -> Result<()>
where
    R: FnOnce(&KeyValueFile) -> Result<Option<String>>,
{
    file.set(PROBE_KEY, token)?;
    let read_back = read(file);
    let removed = file.remove(PROBE_KEY);

    if read_back?.as_deref() != Some(token) {
        removed?;
        return Err(TetherError::storage("probe key read-back mismatch"));
    }
    removed
}

fn into_storage(err: TetherError) -> TetherError {
    if err.is_storage() {
        err
    } else {
        TetherError::storage(err.to_string())
    }
}

#[async_trait]
impl HandleStore for FileHandleStore {
    async fn probe(&self) -> Result<()> {
        let token = uuid::Uuid::new_v4().to_string();
        let result = self
            .blocking(move |file| probe_round_trip(file, &token, |file| file.get(PROBE_KEY)))
            .await;

        if let Err(e) = &result {
            tracing::warn!("[FileHandleStore] Probe failed at {:?}: {}", self.path(), e);
        }
        result
    }

    async fn load(&self) -> Result<Option<String>> {
        let handle = self.blocking(|file| file.get(HANDLE_KEY)).await?;
        Ok(handle.filter(|h| !h.is_empty()))
    }

    async fn save(&self, handle: &str) -> Result<()> {
        let handle = handle.to_string();
        tracing::debug!("[FileHandleStore] Saving handle {}", handle);
        self.blocking(move |file| file.set(HANDLE_KEY, &handle)).await
    }

    async fn clear(&self) -> Result<()> {
        self.blocking(|file| file.remove(HANDLE_KEY)).await
    }
}
