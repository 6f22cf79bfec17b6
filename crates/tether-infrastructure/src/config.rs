//! Configuration file management for Tether.
//!
//! Reads `~/.config/tether/config.toml` (or an explicit path). Every field has
//! a default, so a missing file is a valid configuration as long as the owner
//! id and API URL come from the environment.
//!
//! Environment variables override the file:
//! `TETHER_OWNER_ID`, `TETHER_API_URL`, `TETHER_FALLBACK_URL`, `TETHER_STATE_DIR`.

use crate::paths::TetherPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tether_core::{Result, TetherError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Same-origin proxy URL for the session API
    pub base_url: String,
    /// Alternate URL used when creation fails on the primary path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
    pub request_timeout_ms: u64,
    /// Deadline for each creation attempt (primary and fallback)
    pub create_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            fallback_url: None,
            request_timeout_ms: 15_000,
            create_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    pub debounce_ms: u64,
    /// Staggered re-hides after a voice-open patch
    pub voice_hide_delays_ms: Vec<u64>,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            voice_hide_delays_ms: vec![50, 150, 300],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    pub hide_delays_ms: Vec<u64>,
    pub minimize_delay_ms: u64,
    pub microphone_delay_ms: u64,
    pub restoring_window_ms: u64,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            hide_delays_ms: vec![300, 800, 1500, 3000],
            minimize_delay_ms: 150,
            microphone_delay_ms: 600,
            restoring_window_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_ms: u64,
    /// Hard stop for any polling loop
    pub ceiling_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            ceiling_secs: 600,
        }
    }
}

/// Root configuration structure for config.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    /// Owning site / tenant; required to create or fetch a session
    pub owner_id: String,
    /// Directory holding the handle store (defaults to the data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
    pub transport: TransportConfig,
    pub visibility: VisibilityConfig,
    pub restore: RestoreConfig,
    pub poller: PollerConfig,
}

impl TetherConfig {
    /// Loads the config from the default location, applying env overrides.
    pub fn load_default() -> Result<Self> {
        let path = TetherPaths::config_file()?;
        Self::load(&path)
    }

    /// Loads the config from `path` (missing file means defaults), applying
    /// env overrides, then validates.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`TetherConfig::load`] but leaves validation to the caller, for
    /// callers that layer further overrides on top.
    pub fn load_unvalidated(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("[Config] No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            TetherError::config(format!(
                "Failed to read configuration file at {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            TetherError::config(format!(
                "Failed to parse configuration file at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies overrides from a variable lookup (the environment in production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(owner_id) = lookup("TETHER_OWNER_ID") {
            self.owner_id = owner_id;
        }
        if let Some(url) = lookup("TETHER_API_URL") {
            self.transport.base_url = url;
        }
        if let Some(url) = lookup("TETHER_FALLBACK_URL") {
            self.transport.fallback_url = Some(url);
        }
        if let Some(dir) = lookup("TETHER_STATE_DIR") {
            self.state_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.owner_id.trim().is_empty() {
            return Err(TetherError::config(
                "owner_id is required (set it in config.toml or TETHER_OWNER_ID)",
            ));
        }

        let urls = std::iter::once(&self.transport.base_url).chain(&self.transport.fallback_url);
        for url in urls {
            url::Url::parse(url)
                .map_err(|e| TetherError::config(format!("Invalid URL '{}': {}", url, e)))?;
        }

        if self.poller.interval_ms == 0 {
            return Err(TetherError::config("poller.interval_ms must be greater than 0"));
        }
        if self.poller.ceiling_secs == 0 {
            return Err(TetherError::config("poller.ceiling_secs must be greater than 0"));
        }

        Ok(())
    }

    /// Resolves the handle-store directory.
    pub fn resolved_state_dir(&self) -> Result<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(TetherPaths::data_dir()?),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.transport.request_timeout_ms)
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.transport.create_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = TetherConfig::from_file(&temp_dir.path().join("config.toml")).unwrap();

        assert_eq!(config, TetherConfig::default());
        assert_eq!(config.visibility.debounce_ms, 200);
        assert_eq!(config.restore.hide_delays_ms, vec![300, 800, 1500, 3000]);
        assert_eq!(config.restore.restoring_window_ms, 2000);
        assert_eq!(config.poller.ceiling_secs, 600);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
owner_id = "site-42"

[transport]
base_url = "https://example.com/wp-json/assistant"
fallback_url = "https://api.example.com/v1"

[visibility]
debounce_ms = 250
"#,
        )
        .unwrap();

        let config = TetherConfig::from_file(&path).unwrap();
        assert_eq!(config.owner_id, "site-42");
        assert_eq!(
            config.transport.fallback_url.as_deref(),
            Some("https://api.example.com/v1")
        );
        assert_eq!(config.transport.create_timeout_ms, 10_000);
        assert_eq!(config.visibility.debounce_ms, 250);
        assert_eq!(config.visibility.voice_hide_delays_ms, vec![50, 150, 300]);
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TETHER_OWNER_ID", "from-env"),
            ("TETHER_API_URL", "https://proxy.example.com"),
            ("TETHER_STATE_DIR", "/var/lib/tether"),
        ]
        .into_iter()
        .collect();

        let mut config = TetherConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.owner_id, "from-env");
        assert_eq!(config.transport.base_url, "https://proxy.example.com");
        assert!(config.transport.fallback_url.is_none());
        assert_eq!(
            config.resolved_state_dir().unwrap(),
            PathBuf::from("/var/lib/tether")
        );
    }

    #[test]
    fn test_validate_rejects_missing_owner_and_bad_url() {
        let config = TetherConfig::default();
        assert!(matches!(config.validate(), Err(TetherError::Config(_))));

        let config = TetherConfig {
            owner_id: "site".to_string(),
            transport: TransportConfig {
                fallback_url: Some("::nope".to_string()),
                ..TransportConfig::default()
            },
            ..TetherConfig::default()
        };
        assert!(matches!(config.validate(), Err(TetherError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
owner_id = "site"

[poller]
interval_ms = 0
"#,
        )
        .unwrap();

        let err = TetherConfig::load(&path).unwrap_err();
        assert!(matches!(err, TetherError::Config(ref msg) if msg.contains("interval_ms")));

        let config = TetherConfig {
            owner_id: "site".to_string(),
            poller: PollerConfig {
                ceiling_secs: 0,
                ..PollerConfig::default()
            },
            ..TetherConfig::default()
        };
        assert!(matches!(config.validate(), Err(TetherError::Config(_))));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "owner_id = [").unwrap();

        assert!(matches!(
            TetherConfig::from_file(&path),
            Err(TetherError::Config(_))
        ));
    }
}
