//! Contract between the navigation logic and the embedded web view.
//!
//! The controller never talks to Servo directly. It drives a `BrowserView`
//! and reacts to `ViewEvent`s; `servo_glue::ServoView` is the production
//! implementation and tests use a recording fake.

use url::Url;

/// View-wide capability settings toggled by Privacy Mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// JavaScript execution.
    pub scripting: bool,
    /// Persistent local storage.
    pub local_storage: bool,
}

/// Operations the embedded view must expose.
pub trait BrowserView {
    fn load(&self, url: Url);
    fn go_back(&self);
    fn go_forward(&self);
    fn reload(&self);
    /// Replaces the displayed content with raw markup.
    fn load_html(&self, markup: &str);
    fn set_capabilities(&self, capabilities: Capabilities);
}

/// Lifecycle notifications coming back from the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    LocationChanged(Url),
    LoadFinished { success: bool },
}
