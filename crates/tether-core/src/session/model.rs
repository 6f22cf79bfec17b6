//! Session record domain model.

use super::patch::WindowStatePatch;
use super::thread::Thread;
use serde::{Deserialize, Serialize};

/// Boolean flags describing which chat surface is open and in what visual mode.
///
/// The flags are independently settable. By convention at most one of
/// `text_open` / `voice_open` is true; nothing here enforces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WindowState {
    pub core_open: bool,
    pub text_open: bool,
    /// Text panel maximized (true) or minimized (false)
    pub text_open_window_up: bool,
    pub text_welcome: bool,
    pub voice_open: bool,
    /// Voice panel maximized (true) or minimized (false)
    pub voice_open_window_up: bool,
    /// Start the microphone as soon as the voice panel is restored
    pub auto_mic: bool,
}

impl WindowState {
    /// Returns true if the record says a chat surface is open.
    pub fn any_surface_open(&self) -> bool {
        self.text_open || self.voice_open
    }
}

/// The session record, mirrored locally from the remote store.
///
/// A record without an `id` only exists in memory; it becomes eligible for
/// persistence calls once the remote store has assigned one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Opaque handle assigned by the remote store on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owning site / tenant
    #[serde(default)]
    pub owner_id: String,
    /// Conversation threads in server order
    #[serde(default)]
    pub threads: Vec<Thread>,
    #[serde(flatten)]
    pub window: WindowState,
}

impl SessionRecord {
    /// Creates an in-memory record that has not been created remotely yet.
    pub fn transient(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            ..Self::default()
        }
    }

    /// Returns the handle if the record is eligible for persistence calls.
    ///
    /// An empty id is treated the same as a missing one.
    pub fn persisted_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted_id().is_some()
    }

    /// Merges a partial window-state update into this record.
    pub fn apply(&mut self, patch: &WindowStatePatch) {
        patch.apply_to(&mut self.window);
    }

    pub fn thread(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.thread_id == thread_id)
    }

    /// The most recently created thread (threads are kept in server order).
    pub fn latest_thread(&self) -> Option<&Thread> {
        self.threads.last()
    }

    /// Adds a thread unless one with the same id is already present.
    pub fn insert_thread(&mut self, thread: Thread) {
        if self.thread(&thread.thread_id).is_none() {
            self.threads.push(thread);
        }
    }
}
