//! Collaborator interfaces
//!
//! The client never renders UI or touches a browser. It talks to the outside
//! through these narrow traits and falls back to the built-in
//! implementations when a collaborator is not supplied:
//!
//! | Concern | Trait | Default | Recorder |
//! |---------|-------|---------|----------|
//! | cookie storage | [`CookieReader`] | [`CookieString`] | - |
//! | interaction lock | [`UiBlocker`] | [`TracingUiBlocker`] | [`CountingUiBlocker`] |
//! | error rendering | [`ErrorRenderer`] | [`TracingRenderer`] | [`RecordingRenderer`] |
//! | top-level navigation | [`Navigator`] | [`TracingNavigator`] | [`RecordingNavigator`] |
//!
//! The recorders keep what they were asked to do so callers can assert side
//! effects.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

/// Reads a named cookie
pub trait CookieReader: Send + Sync {
    fn get_cookie(&self, name: &str) -> Option<String>;
}

/// Raw `name=value; other=value` cookie storage.
///
/// Later entries win when a name repeats.
#[derive(Debug, Clone, Default)]
pub struct CookieString(String);

impl CookieString {
    pub fn new(cookies: impl Into<String>) -> Self {
        Self(cookies.into())
    }
}

impl CookieReader for CookieString {
    fn get_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.0
            .split(';')
            .map(str::trim_start)
            .rev()
            .find_map(|pair| pair.strip_prefix(prefix.as_str()))
            .map(str::to_string)
    }
}

/// Interaction lock shown while a call is in flight.
///
/// Calls are always paired: every `block` is followed by one `block_undo`.
pub trait UiBlocker: Send + Sync {
    fn block(&self);
    fn block_undo(&self);
}

/// Default blocker: no UI, trace events only
#[derive(Debug, Default)]
pub struct TracingUiBlocker;

impl UiBlocker for TracingUiBlocker {
    fn block(&self) {
        tracing::trace!("UI blocked");
    }

    fn block_undo(&self) {
        tracing::trace!("UI unblocked");
    }
}

/// Blocker that counts calls and tracks nesting depth
#[derive(Debug, Default)]
pub struct CountingUiBlocker {
    blocks: AtomicUsize,
    unblocks: AtomicUsize,
}

impl CountingUiBlocker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> usize {
        self.blocks.load(Ordering::SeqCst)
    }

    pub fn unblocks(&self) -> usize {
        self.unblocks.load(Ordering::SeqCst)
    }

    /// Blocks not yet undone
    pub fn depth(&self) -> usize {
        self.blocks().saturating_sub(self.unblocks())
    }
}

impl UiBlocker for CountingUiBlocker {
    fn block(&self) {
        self.blocks.fetch_add(1, Ordering::SeqCst);
    }

    fn block_undo(&self) {
        self.unblocks.fetch_add(1, Ordering::SeqCst);
    }
}

/// Options for notification rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOptions {
    /// Whether the renderer must escape the message. `false` means the
    /// message is already HTML.
    pub escape_html: bool,
    pub timeout: Option<Duration>,
}

impl Default for NotifyOptions {
    fn default() -> Self {
        Self {
            escape_html: true,
            timeout: None,
        }
    }
}

/// Renders errors to the user
pub trait ErrorRenderer: Send + Sync {
    fn notify_error(&self, message: &str, title: Option<&str>, options: &NotifyOptions);
    fn alert_dialog(&self, message: &str);
    /// Show `html` as a full document inside a contained frame
    fn iframe_dialog(&self, html: &str);
}

/// Default renderer: logs what would have been shown
#[derive(Debug, Default)]
pub struct TracingRenderer;

impl ErrorRenderer for TracingRenderer {
    fn notify_error(&self, message: &str, title: Option<&str>, _options: &NotifyOptions) {
        tracing::warn!(title = title.unwrap_or_default(), "{}", message);
    }

    fn alert_dialog(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn iframe_dialog(&self, html: &str) {
        tracing::warn!(len = html.len(), "Server error page received");
    }
}

/// One rendered error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presented {
    Notification {
        message: String,
        title: Option<String>,
        options: NotifyOptions,
    },
    Alert(String),
    Frame(String),
}

/// Renderer that keeps everything it was asked to show
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    shown: Mutex<Vec<Presented>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<Presented> {
        self.shown.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.lock().is_empty()
    }
}

impl ErrorRenderer for RecordingRenderer {
    fn notify_error(&self, message: &str, title: Option<&str>, options: &NotifyOptions) {
        self.shown.lock().push(Presented::Notification {
            message: message.to_string(),
            title: title.map(str::to_string),
            options: options.clone(),
        });
    }

    fn alert_dialog(&self, message: &str) {
        self.shown.lock().push(Presented::Alert(message.to_string()));
    }

    fn iframe_dialog(&self, html: &str) {
        self.shown.lock().push(Presented::Frame(html.to_string()));
    }
}

/// Moves the top-level browsing context somewhere else
pub trait Navigator: Send + Sync {
    fn navigate(&self, location: &str);
}

/// Default navigator: logs the target
#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, location: &str) {
        tracing::info!(location, "Redirect requested");
    }
}

/// Navigator that remembers the last location
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    location: Mutex<Option<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(&self) -> Option<String> {
        self.location.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, location: &str) {
        *self.location.lock() = Some(location.to_string());
    }
}
