//! Partial window-state updates.

use super::model::WindowState;
use serde::{Deserialize, Serialize};

/// A partial window-state object; unset fields are left untouched on merge.
///
/// Serialized with only the fields that are set, so a patch sent to the
/// remote store carries exactly the flags the caller asked to change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_open_window_up: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_welcome: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_open_window_up: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_mic: Option<bool>,
}

impl WindowStatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn core_open(mut self, value: bool) -> Self {
        self.core_open = Some(value);
        self
    }

    pub fn text_open(mut self, value: bool) -> Self {
        self.text_open = Some(value);
        self
    }

    pub fn text_open_window_up(mut self, value: bool) -> Self {
        self.text_open_window_up = Some(value);
        self
    }

    pub fn text_welcome(mut self, value: bool) -> Self {
        self.text_welcome = Some(value);
        self
    }

    pub fn voice_open(mut self, value: bool) -> Self {
        self.voice_open = Some(value);
        self
    }

    pub fn voice_open_window_up(mut self, value: bool) -> Self {
        self.voice_open_window_up = Some(value);
        self
    }

    pub fn auto_mic(mut self, value: bool) -> Self {
        self.auto_mic = Some(value);
        self
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns true if this patch opens the voice surface.
    pub fn opens_voice(&self) -> bool {
        self.voice_open == Some(true)
    }

    /// Writes every set field into `state`.
    pub fn apply_to(&self, state: &mut WindowState) {
        let fields = [
            (self.core_open, &mut state.core_open),
            (self.text_open, &mut state.text_open),
            (self.text_open_window_up, &mut state.text_open_window_up),
            (self.text_welcome, &mut state.text_welcome),
            (self.voice_open, &mut state.voice_open),
            (self.voice_open_window_up, &mut state.voice_open_window_up),
            (self.auto_mic, &mut state.auto_mic),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}
