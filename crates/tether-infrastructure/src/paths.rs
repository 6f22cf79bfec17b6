//! Unified path management for tether configuration and state files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/tether/            # Config directory
//! └── config.toml              # Engine configuration
//!
//! ~/.local/share/tether/       # Default state directory
//! └── handle.toml              # Persistent session handle slot
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for tether_core::TetherError {
    fn from(err: PathError) -> Self {
        tether_core::TetherError::config(err.to_string())
    }
}

const APP_DIR: &str = "tether";

/// Unified path management for tether.
pub struct TetherPaths;

impl TetherPaths {
    /// Returns the tether configuration directory (e.g., `~/.config/tether/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the default state directory (e.g., `~/.local/share/tether/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the handle file inside `state_dir`.
    pub fn handle_file(state_dir: &std::path::Path) -> PathBuf {
        state_dir.join("handle.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_is_under_config_dir() {
        if let (Ok(config_dir), Ok(config_file)) =
            (TetherPaths::config_dir(), TetherPaths::config_file())
        {
            assert!(config_dir.ends_with("tether"));
            assert!(config_file.ends_with("config.toml"));
            assert!(config_file.starts_with(&config_dir));
        }
    }

    #[test]
    fn test_handle_file() {
        let dir = PathBuf::from("/tmp/tether-state");
        assert_eq!(
            TetherPaths::handle_file(&dir),
            PathBuf::from("/tmp/tether-state/handle.toml")
        );
    }
}
