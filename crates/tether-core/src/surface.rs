//! Presentation collaborators.
//!
//! Rendering belongs to the presentation layer. The engine only issues
//! fire-and-forget calls through these traits and asks which panels are
//! currently displayed.

/// Chat surfaces (text and voice panels).
pub trait SurfaceController: Send + Sync {
    /// Opens the text panel (always maximized first).
    fn open_text_surface(&self);

    fn minimize_text_surface(&self);

    /// Opens the voice panel (always maximized first).
    fn open_voice_surface(&self);

    fn minimize_voice_surface(&self);

    fn activate_microphone(&self);

    /// Whether the text panel is rendered and visibly displayed.
    fn text_surface_displayed(&self) -> bool;

    /// Whether the voice panel is rendered and visibly displayed.
    fn voice_surface_displayed(&self) -> bool;
}

/// The launcher button and its secondary chooser.
pub trait LauncherView: Send + Sync {
    fn set_launcher_visible(&self, visible: bool);
}
