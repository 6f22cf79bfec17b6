//! Storage layer for atomic file operations.

mod key_value_file;

pub use key_value_file::KeyValueFile;
