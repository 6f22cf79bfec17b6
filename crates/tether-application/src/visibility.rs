//! Launcher visibility controller.
//!
//! Decides whether the launcher (and its chooser) should be visible and
//! applies that decision through the [`LauncherView`] without flicker:
//! repeated calls are no-ops, and transitions closer together than the
//! debounce interval are rejected. A rejected transition schedules one
//! reconciliation pass for the moment the debounce interval ends.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{LauncherView, SurfaceController, WindowState};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherState {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilitySettings {
    /// Minimum time between two transitions
    pub debounce: Duration,
    /// Staggered re-hides issued after a voice-open patch
    pub voice_hide_delays: Vec<Duration>,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            voice_hide_delays: [50, 150, 300].map(Duration::from_millis).to_vec(),
        }
    }
}

struct VisibilityInner {
    state: LauncherState,
    last_transition: Option<Instant>,
    /// Short-circuits `hide()` until released
    pinned: bool,
    /// Suspends rule evaluation while an interface restore settles
    restoring: bool,
    /// Last observed record says a chat surface is open
    record_wants_hidden: bool,
    /// A reconciliation pass is waiting for the debounce interval to end
    reconcile_scheduled: bool,
    /// Parent of every reinforcement and reconciliation task
    scheduled: CancellationToken,
}

/// Debounced two-state launcher controller.
///
/// Starts `Hidden` with no previous transition, so the first transition is
/// never debounced. The view is called while the internal lock is held;
/// implementations of [`LauncherView`] must not call back into the controller.
pub struct VisibilityController {
    launcher: Arc<dyn LauncherView>,
    surfaces: Arc<dyn SurfaceController>,
    settings: VisibilitySettings,
    inner: Mutex<VisibilityInner>,
}

impl VisibilityController {
    pub fn new(
        launcher: Arc<dyn LauncherView>,
        surfaces: Arc<dyn SurfaceController>,
        settings: VisibilitySettings,
    ) -> Self {
        Self {
            launcher,
            surfaces,
            settings,
            inner: Mutex::new(VisibilityInner {
                state: LauncherState::Hidden,
                last_transition: None,
                pinned: false,
                restoring: false,
                record_wants_hidden: false,
                reconcile_scheduled: false,
                scheduled: CancellationToken::new(),
            }),
        }
    }

    pub fn settings(&self) -> &VisibilitySettings {
        &self.settings
    }

    pub fn state(&self) -> LauncherState {
        self.inner.lock().state
    }

    pub fn is_visible(&self) -> bool {
        self.state() == LauncherState::Visible
    }

    /// Shows the launcher. Returns true if a transition happened.
    pub fn show(self: &Arc<Self>) -> bool {
        self.transition(LauncherState::Visible)
    }

    /// Hides the launcher unless it is pinned. Returns true if a transition happened.
    pub fn hide(self: &Arc<Self>) -> bool {
        if self.inner.lock().pinned {
            tracing::debug!("[Visibility] hide() ignored, launcher is pinned visible");
            return false;
        }
        self.transition(LauncherState::Hidden)
    }

    fn transition(self: &Arc<Self>, target: LauncherState) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == target {
            return false;
        }

        let now = Instant::now();
        if let Some(last) = inner.last_transition
            && now.duration_since(last) < self.settings.debounce
        {
            tracing::debug!(
                "[Visibility] {:?} rejected, {:?} since last transition",
                target,
                now.duration_since(last)
            );
            if !inner.reconcile_scheduled {
                inner.reconcile_scheduled = true;
                let token = inner.scheduled.child_token();
                self.schedule_reconcile(token, last + self.settings.debounce);
            }
            return false;
        }

        inner.state = target;
        inner.last_transition = Some(now);
        self.launcher
            .set_launcher_visible(target == LauncherState::Visible);
        tracing::debug!("[Visibility] Launcher is now {:?}", target);
        true
    }

    /// Re-applies the decision rule at `at`, once.
    fn schedule_reconcile(self: &Arc<Self>, token: CancellationToken, at: Instant) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep_until(at) => {}
            }
            this.inner.lock().reconcile_scheduled = false;
            tracing::debug!("[Visibility] Reconciling after debounce");
            this.evaluate();
        });
    }

    /// Pins the launcher visible and shows it.
    pub fn pin_visible(self: &Arc<Self>) {
        self.inner.lock().pinned = true;
        self.show();
    }

    /// Releases the pin; the next evaluation reconciles the state.
    pub fn release_pin(&self) {
        self.inner.lock().pinned = false;
    }

    pub fn set_restoring(&self, restoring: bool) {
        self.inner.lock().restoring = restoring;
    }

    pub fn is_restoring(&self) -> bool {
        self.inner.lock().restoring
    }

    /// The state the decision rule asks for right now.
    ///
    /// Hidden if the last observed record has a chat surface open or the
    /// presentation layer reports a displayed text/voice panel.
    pub fn desired_state(&self) -> LauncherState {
        let record_wants_hidden = self.inner.lock().record_wants_hidden;
        if record_wants_hidden
            || self.surfaces.text_surface_displayed()
            || self.surfaces.voice_surface_displayed()
        {
            LauncherState::Hidden
        } else {
            LauncherState::Visible
        }
    }

    /// Records the latest window state and re-evaluates.
    pub fn observe(self: &Arc<Self>, window: &WindowState) {
        self.inner.lock().record_wants_hidden = window.any_surface_open();
        self.evaluate();
    }

    /// Applies the decision rule unless a restore is settling.
    ///
    /// Safe to call at any frequency.
    pub fn evaluate(self: &Arc<Self>) -> LauncherState {
        if self.is_restoring() {
            return self.state();
        }
        match self.desired_state() {
            LauncherState::Hidden => self.hide(),
            LauncherState::Visible => self.show(),
        };
        self.state()
    }

    /// Re-asserts `hide()` at each of `delays` (measured from now).
    ///
    /// The task re-checks the decision rule before every attempt and stops
    /// once the launcher is no longer supposed to be hidden, or when the
    /// returned token (or [`Self::cancel_scheduled`]) cancels it.
    pub fn reinforce_hidden(self: &Arc<Self>, delays: &[Duration]) -> CancellationToken {
        let token = self.inner.lock().scheduled.child_token();
        let this = Arc::clone(self);
        let cancelled = token.clone();
        let delays = delays.to_vec();
        let start = Instant::now();

        tokio::spawn(async move {
            for delay in delays {
                tokio::select! {
                    _ = cancelled.cancelled() => return,
                    _ = tokio::time::sleep_until(start + delay) => {}
                }
                if this.desired_state() != LauncherState::Hidden {
                    tracing::debug!("[Visibility] Hide reinforcement no longer needed, stopping");
                    return;
                }
                this.hide();
            }
        });

        token
    }

    /// Cancels every running hide reinforcement and any pending
    /// reconciliation pass.
    pub fn cancel_scheduled(&self) {
        let mut inner = self.inner.lock();
        inner.scheduled.cancel();
        inner.scheduled = CancellationToken::new();
        inner.reconcile_scheduled = false;
    }
}
