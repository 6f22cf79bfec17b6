//! Presentation layer for terminal use: no rendering, just state and logs.
//!
//! Nothing closes a headless panel by hand, so the surface follows the
//! session record instead: a panel the record reports closed stops counting
//! as displayed.

use parking_lot::Mutex;
use serde_json::{Value, json};
use tether_core::{LauncherView, SurfaceController, WindowState};

#[derive(Debug, Default)]
struct SurfaceState {
    text_displayed: bool,
    text_minimized: bool,
    voice_displayed: bool,
    voice_minimized: bool,
    microphone: bool,
    launcher_visible: bool,
}

/// Records what a browser presentation layer would be showing.
#[derive(Default)]
pub struct HeadlessSurface {
    state: Mutex<SurfaceState>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launcher_visible(&self) -> bool {
        self.state.lock().launcher_visible
    }

    /// Closes panels that `window` reports closed. Returns true if anything
    /// changed.
    pub fn sync_with(&self, window: &WindowState) -> bool {
        let mut state = self.state.lock();
        let mut changed = false;
        if state.text_displayed && !window.text_open {
            tracing::info!("[HeadlessSurface] Text surface closed");
            state.text_displayed = false;
            state.text_minimized = false;
            changed = true;
        }
        if state.voice_displayed && !window.voice_open {
            tracing::info!("[HeadlessSurface] Voice surface closed");
            state.voice_displayed = false;
            state.voice_minimized = false;
            state.microphone = false;
            changed = true;
        }
        changed
    }

    pub fn snapshot(&self) -> Value {
        let state = self.state.lock();
        json!({
            "launcherVisible": state.launcher_visible,
            "text": { "displayed": state.text_displayed, "minimized": state.text_minimized },
            "voice": {
                "displayed": state.voice_displayed,
                "minimized": state.voice_minimized,
                "microphone": state.microphone,
            },
        })
    }
}

impl SurfaceController for HeadlessSurface {
    fn open_text_surface(&self) {
        tracing::info!("[HeadlessSurface] Text surface opened");
        let mut state = self.state.lock();
        state.text_displayed = true;
        state.text_minimized = false;
    }

    fn minimize_text_surface(&self) {
        tracing::info!("[HeadlessSurface] Text surface minimized");
        self.state.lock().text_minimized = true;
    }

    fn open_voice_surface(&self) {
        tracing::info!("[HeadlessSurface] Voice surface opened");
        let mut state = self.state.lock();
        state.voice_displayed = true;
        state.voice_minimized = false;
    }

    fn minimize_voice_surface(&self) {
        tracing::info!("[HeadlessSurface] Voice surface minimized");
        self.state.lock().voice_minimized = true;
    }

    fn activate_microphone(&self) {
        tracing::info!("[HeadlessSurface] Microphone activated");
        self.state.lock().microphone = true;
    }

    fn text_surface_displayed(&self) -> bool {
        self.state.lock().text_displayed
    }

    fn voice_surface_displayed(&self) -> bool {
        self.state.lock().voice_displayed
    }
}

impl LauncherView for HeadlessSurface {
    fn set_launcher_visible(&self, visible: bool) {
        tracing::info!(
            "[HeadlessSurface] Launcher {}",
            if visible { "shown" } else { "hidden" }
        );
        self.state.lock().launcher_visible = visible;
    }
}
