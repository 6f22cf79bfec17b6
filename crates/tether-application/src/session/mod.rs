//! Session lifecycle services.
//!
//! - `manager`: handle acquisition, optimistic patches and remote persistence
//! - `pending`: patches queued until a session handle exists

mod manager;
mod pending;

pub use manager::{Collaborators, ListenerId, ManagerPhase, ManagerSettings, SessionManager};
pub use pending::PendingQueue;
