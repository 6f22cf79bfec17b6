use crate::headless::HeadlessSurface;
use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tether_application::{
    Collaborators, ManagerSettings, PollerSettings, RestoreTimings, SessionManager,
    VisibilitySettings,
};
use tether_core::{HandleStore, SessionTransport};
use tether_infrastructure::{
    FileHandleStore, HttpSessionTransport, MemoryHandleStore, TetherConfig, TetherPaths,
};

/// Values given on the command line; they win over config and environment.
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub ephemeral: bool,
    pub owner_id: Option<String>,
    pub api_url: Option<String>,
}

/// Everything a command needs: the loaded config, the manager and the
/// headless presentation layer it drives.
pub struct Context {
    pub config: TetherConfig,
    pub manager: Arc<SessionManager>,
    pub surface: Arc<HeadlessSurface>,
}

impl Context {
    pub fn build(overrides: Overrides) -> Result<Self> {
        let config = load_config(&overrides)?;

        let handle_store: Arc<dyn HandleStore> = if overrides.ephemeral {
            Arc::new(MemoryHandleStore::new())
        } else {
            let state_dir = config.resolved_state_dir()?;
            tracing::debug!("[Context] Handle store under {:?}", state_dir);
            Arc::new(FileHandleStore::new(&state_dir))
        };

        let transport: Arc<dyn SessionTransport> = Arc::new(HttpSessionTransport::primary(
            &config.transport.base_url,
            config.request_timeout(),
        )?);
        let fallback_transport = match &config.transport.fallback_url {
            Some(url) => Some(Arc::new(HttpSessionTransport::fallback(
                url,
                config.request_timeout(),
            )?) as Arc<dyn SessionTransport>),
            None => None,
        };

        let surface = Arc::new(HeadlessSurface::new());
        let manager = SessionManager::new(
            config.owner_id.clone(),
            Collaborators {
                handle_store,
                transport,
                fallback_transport,
                surfaces: surface.clone(),
                launcher: surface.clone(),
            },
            manager_settings(&config),
        );

        let synced = Arc::clone(&surface);
        let visibility = Arc::clone(manager.visibility());
        manager.on_record_changed(move |record| {
            if synced.sync_with(&record.window) {
                visibility.evaluate();
            }
        });

        Ok(Self {
            config,
            manager,
            surface,
        })
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: Duration::from_millis(self.config.poller.interval_ms),
            ceiling: Duration::from_secs(self.config.poller.ceiling_secs),
        }
    }
}

fn load_config(overrides: &Overrides) -> Result<TetherConfig> {
    let path = match &overrides.config {
        Some(path) => path.clone(),
        None => TetherPaths::config_file()?,
    };

    let mut config = TetherConfig::load_unvalidated(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    if let Some(owner_id) = &overrides.owner_id {
        config.owner_id = owner_id.clone();
    }
    if let Some(url) = &overrides.api_url {
        config.transport.base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn millis(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_millis).collect()
}

fn manager_settings(config: &TetherConfig) -> ManagerSettings {
    ManagerSettings {
        create_timeout: config.create_timeout(),
        visibility: VisibilitySettings {
            debounce: Duration::from_millis(config.visibility.debounce_ms),
            voice_hide_delays: millis(&config.visibility.voice_hide_delays_ms),
        },
        restore: RestoreTimings {
            hide_delays: millis(&config.restore.hide_delays_ms),
            minimize_delay: Duration::from_millis(config.restore.minimize_delay_ms),
            microphone_delay: Duration::from_millis(config.restore.microphone_delay_ms),
            restoring_window: Duration::from_millis(config.restore.restoring_window_ms),
        },
    }
}
