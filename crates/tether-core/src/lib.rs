//! Domain layer for Tether.
//!
//! Holds the session record model, the error taxonomy and the traits that the
//! engine talks through: the remote session transport, the durable handle
//! store and the presentation collaborators.

pub mod error;
pub mod handle_store;
pub mod session;
pub mod surface;

pub use error::{Result, TetherError};
pub use handle_store::HandleStore;
pub use session::{
    Message, MessageRole, SessionEnvelope, SessionRecord, SessionTransport, Thread, WindowState,
    WindowStatePatch,
};
pub use surface::{LauncherView, SurfaceController};
