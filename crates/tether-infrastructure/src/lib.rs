//! Infrastructure adapters for Tether.
//!
//! Concrete implementations of the core traits: the HTTP session transport,
//! the file-backed and in-memory handle stores, plus configuration loading.

pub mod config;
pub mod file_handle_store;
pub mod http_transport;
pub mod memory_handle_store;
pub mod paths;
pub mod storage;

pub use crate::config::TetherConfig;
pub use crate::file_handle_store::FileHandleStore;
pub use crate::http_transport::HttpSessionTransport;
pub use crate::memory_handle_store::MemoryHandleStore;
pub use crate::paths::TetherPaths;
