//! Interface restorer.
//!
//! Once a session record is available, re-opens whichever chat surface the
//! session says was open, in the recorded maximized/minimized state. Runs at
//! most once per successful acquisition.

use crate::visibility::VisibilityController;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{SurfaceController, WindowState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreTimings {
    /// Staggered re-hides of the launcher after opening a surface
    pub hide_delays: Vec<Duration>,
    /// Delay before minimizing, so the open animation is not raced
    pub minimize_delay: Duration,
    /// Delay before starting the microphone, after open/minimize settle
    pub microphone_delay: Duration,
    /// How long rule evaluation stays suspended after a restore
    pub restoring_window: Duration,
}

impl Default for RestoreTimings {
    fn default() -> Self {
        Self {
            hide_delays: [300, 800, 1500, 3000].map(Duration::from_millis).to_vec(),
            minimize_delay: Duration::from_millis(150),
            microphone_delay: Duration::from_millis(600),
            restoring_window: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// This acquisition was already restored
    AlreadyRestored,
    /// No surface was open; the launcher was shown
    NothingOpen,
    Text { minimized: bool },
    Voice { minimized: bool, microphone: bool },
}

pub struct InterfaceRestorer {
    surfaces: Arc<dyn SurfaceController>,
    visibility: Arc<VisibilityController>,
    timings: RestoreTimings,
    last_acquisition: Mutex<Option<u64>>,
}

impl InterfaceRestorer {
    pub fn new(
        surfaces: Arc<dyn SurfaceController>,
        visibility: Arc<VisibilityController>,
        timings: RestoreTimings,
    ) -> Self {
        Self {
            surfaces,
            visibility,
            timings,
            last_acquisition: Mutex::new(None),
        }
    }

    /// Restores the interface for acquisition number `acquisition`.
    ///
    /// A second call for the same (or an older) acquisition does nothing.
    pub fn restore(&self, acquisition: u64, window: &WindowState) -> RestoreOutcome {
        {
            let mut last = self.last_acquisition.lock();
            if last.is_some_and(|done| done >= acquisition) {
                tracing::debug!(
                    "[Restorer] Acquisition {} already restored, skipping",
                    acquisition
                );
                return RestoreOutcome::AlreadyRestored;
            }
            *last = Some(acquisition);
        }

        if !window.any_surface_open() {
            self.visibility.show();
            return RestoreOutcome::NothingOpen;
        }

        self.visibility.set_restoring(true);
        self.visibility.hide();

        let outcome = if window.text_open {
            tracing::info!(
                "[Restorer] Re-opening text surface (maximized: {})",
                window.text_open_window_up
            );
            self.surfaces.open_text_surface();
            let minimized = !window.text_open_window_up;
            if minimized {
                self.after(self.timings.minimize_delay, |surfaces| {
                    surfaces.minimize_text_surface()
                });
            }
            RestoreOutcome::Text { minimized }
        } else {
            tracing::info!(
                "[Restorer] Re-opening voice surface (maximized: {}, auto mic: {})",
                window.voice_open_window_up,
                window.auto_mic
            );
            self.surfaces.open_voice_surface();
            let minimized = !window.voice_open_window_up;
            if minimized {
                self.after(self.timings.minimize_delay, |surfaces| {
                    surfaces.minimize_voice_surface()
                });
            }
            if window.auto_mic {
                self.after(self.timings.microphone_delay, |surfaces| {
                    surfaces.activate_microphone()
                });
            }
            RestoreOutcome::Voice {
                minimized,
                microphone: window.auto_mic,
            }
        };

        self.visibility.reinforce_hidden(&self.timings.hide_delays);

        let visibility = Arc::clone(&self.visibility);
        let window_end = self.timings.restoring_window;
        tokio::spawn(async move {
            tokio::time::sleep(window_end).await;
            visibility.set_restoring(false);
            visibility.evaluate();
        });

        outcome
    }

    fn after<F>(&self, delay: Duration, call: F)
    where
        F: FnOnce(&dyn SurfaceController) + Send + 'static,
    {
        let surfaces = Arc::clone(&self.surfaces);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            call(surfaces.as_ref());
        });
    }
}
