//! Durable string key-value file with atomic writes.
//!
//! Stands in for the browser's durable key-value storage: a flat TOML table of
//! string keys to string values.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use tether_core::{Result, TetherError};

type Entries = BTreeMap<String, String>;

/// A handle to a key-value TOML file.
///
/// - Updates go through a temporary file, fsync and atomic rename
/// - Read-modify-write cycles hold an exclusive `fs2` lock
pub struct KeyValueFile {
    path: PathBuf,
}

impl KeyValueFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a single key. A missing or empty file reads as no keys.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    /// Sets `key` to `value` under the file lock.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    /// Removes `key` under the file lock; removing a missing key is a no-op.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn load(&self) -> Result<Entries> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        Ok(toml::from_str(&content)?)
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Entries),
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut entries = self.load()?;
        f(&mut entries);
        self.save(&entries)
    }

    fn save(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string(entries)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(content.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| TetherError::storage("Path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| TetherError::storage("Path has no file name"))?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Exclusive lock on a sibling `.lock` file, released on drop.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| TetherError::storage(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
