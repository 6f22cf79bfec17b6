//! Persistent handle store trait.

use crate::error::Result;
use async_trait::async_trait;

/// Durable single-slot storage for the session handle.
///
/// There is one slot per origin. Concurrent writers (other tabs, other
/// processes) race on it with last-write-wins.
#[async_trait]
pub trait HandleStore: Send + Sync {
    /// Writes a transient probe key, reads it back and removes it.
    ///
    /// Returns `TetherError::Storage` if the store is unusable, in which case
    /// callers skip loading and go straight to session creation.
    async fn probe(&self) -> Result<()>;

    /// Loads the stored handle, if any.
    async fn load(&self) -> Result<Option<String>>;

    /// Stores `handle`, replacing any previous one.
    async fn save(&self, handle: &str) -> Result<()>;

    /// Removes the stored handle.
    async fn clear(&self) -> Result<()>;
}
