//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: The server-authoritative record (`SessionRecord`, `WindowState`)
//! - `patch`: Partial window-state updates (`WindowStatePatch`)
//! - `thread`: Conversation threads and messages
//! - `transport`: Trait for the remote session API

mod model;
mod patch;
mod thread;
mod transport;

pub use model::{SessionRecord, WindowState};
pub use patch::WindowStatePatch;
pub use thread::{Message, MessageRole, Thread};
pub use transport::{SessionEnvelope, SessionTransport};
