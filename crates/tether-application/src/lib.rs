//! Application layer for Tether.
//!
//! The session lifecycle and window-state synchronization engine:
//!
//! - [`SessionManager`]: handle acquisition, optimistic patches, queue draining
//! - [`PendingQueue`]: patches issued before a session handle exists
//! - [`VisibilityController`]: debounced launcher visibility
//! - [`InterfaceRestorer`]: one-shot re-opening of the last chat surface
//! - [`StatusPoller`]: polling loop with a hard ceiling
//!
//! The engine is page-scoped: build one `SessionManager`, hand clones of the
//! `Arc` to whoever needs it, and call `initialize()` once. There is no
//! teardown beyond dropping it.

pub mod poller;
pub mod restorer;
pub mod session;
pub mod visibility;

pub use poller::{PollOutcome, PollerSettings, StatusPoller};
pub use restorer::{InterfaceRestorer, RestoreOutcome, RestoreTimings};
pub use session::{
    Collaborators, ListenerId, ManagerPhase, ManagerSettings, PendingQueue, SessionManager,
};
pub use visibility::{LauncherState, VisibilityController, VisibilitySettings};
