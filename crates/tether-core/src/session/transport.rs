//! Remote session API trait.

use super::model::SessionRecord;
use super::patch::WindowStatePatch;
use super::thread::Thread;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Response body shared by every session endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEnvelope {
    pub session: SessionRecord,
    /// Present on creation and on history clear
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}

impl SessionEnvelope {
    pub fn new(session: SessionRecord) -> Self {
        Self {
            session,
            thread: None,
        }
    }

    pub fn with_thread(mut self, thread: Thread) -> Self {
        self.thread = Some(thread);
        self
    }
}

/// Request/response calls to the remote session store.
///
/// Implementations report an expired or unknown handle as
/// `TetherError::NotFound`, network faults and non-2xx responses as
/// `TetherError::Transport`, and exceeded deadlines as `TetherError::Timeout`.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Short label used in logs ("primary", "fallback", ...).
    fn name(&self) -> &str;

    /// Fetches the record behind `handle`.
    async fn get(&self, handle: &str) -> Result<SessionEnvelope>;

    /// Creates a new session for the owning site.
    async fn create(&self, owner_id: &str) -> Result<SessionEnvelope>;

    /// Persists a partial window state; returns the full updated record.
    async fn patch(&self, handle: &str, patch: &WindowStatePatch) -> Result<SessionEnvelope>;

    /// Resets thread history and assigns a new current thread.
    async fn clear(&self, handle: &str) -> Result<SessionEnvelope>;
}
