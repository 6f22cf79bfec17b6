//! Pending operation queue.

use std::collections::VecDeque;
use tether_core::WindowStatePatch;

/// Ordered buffer of window-state patches issued before a session handle
/// exists.
///
/// No deduplication or coalescing: two patches for the same field are both
/// kept and replayed, the later one winning.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<WindowStatePatch>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the tail.
    pub fn enqueue(&mut self, patch: WindowStatePatch) {
        self.entries.push_back(patch);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hands every queued patch to `replay` in FIFO order and leaves the
    /// queue empty. Returns the number of patches replayed.
    pub fn drain_into<F>(&mut self, mut replay: F) -> usize
    where
        F: FnMut(WindowStatePatch),
    {
        let entries = std::mem::take(&mut self.entries);
        let count = entries.len();
        for patch in entries {
            replay(patch);
        }
        count
    }
}
