//! In-process handle store.

use async_trait::async_trait;
use parking_lot::Mutex;
use tether_core::{HandleStore, Result, TetherError};

/// Handle store kept in memory for the lifetime of the process.
///
/// Used for ephemeral runs and tests. A store built with
/// [`MemoryHandleStore::unavailable`] fails every call with a storage error,
/// the way a disabled browser storage would.
#[derive(Default)]
pub struct MemoryHandleStore {
    slot: Mutex<Option<String>>,
    unavailable: bool,
}

impl MemoryHandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `handle`.
    pub fn with_handle(handle: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(handle.into())),
            unavailable: false,
        }
    }

    /// Creates a store whose every operation fails.
    pub fn unavailable() -> Self {
        Self {
            slot: Mutex::new(None),
            unavailable: true,
        }
    }

    /// Current slot content, bypassing the trait.
    pub fn current(&self) -> Option<String> {
        self.slot.lock().clone()
    }

    fn check(&self) -> Result<()> {
        if self.unavailable {
            Err(TetherError::storage("handle store is unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl HandleStore for MemoryHandleStore {
    async fn probe(&self) -> Result<()> {
        self.check()
    }

    async fn load(&self) -> Result<Option<String>> {
        self.check()?;
        Ok(self.slot.lock().clone().filter(|h| !h.is_empty()))
    }

    async fn save(&self, handle: &str) -> Result<()> {
        self.check()?;
        *self.slot.lock() = Some(handle.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check()?;
        *self.slot.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip() {
        let store = MemoryHandleStore::with_handle("s0");
        store.probe().await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("s0"));

        store.save("s1").await.unwrap();
        assert_eq!(store.current().as_deref(), Some("s1"));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryHandleStore::unavailable();
        assert!(store.probe().await.unwrap_err().is_storage());
        assert!(store.save("s1").await.unwrap_err().is_storage());
    }
}
