//! Error presentation policy
//!
//! Decides what, if anything, the user sees for a failed call.
//!
//! [`ErrorPresenter::handle_error`] evaluation order:
//! 1. Not-logged-in handler, for `Error.Code == "NotLoggedIn"`
//! 2. The caller's `on_error` hook
//! 3. Structured error -> [`ErrorPresenter::show_service_error`]
//! 4. Nothing structured and nobody handled it -> no-op
//!
//! Status-only failures are presented by the dispatcher after step 4 comes
//! back [`Handling::Unpresented`].

use std::sync::Arc;
use std::time::Duration;

use invoke_core::{RequestErrorInfo, ServiceError, ServiceResponse, ServiceTarget};
use reqwest::Method;
use url::Url;

use crate::error::{RejectionKind, ServiceCallError};
use crate::hooks::{ErrorRenderer, NotifyOptions};
use crate::options::OnError;

/// Error code that triggers the not-logged-in handler
pub const NOT_LOGGED_IN_CODE: &str = "NotLoggedIn";

/// Shown for structured errors without message or code
pub const UNKNOWN_ERROR_TEXT: &str = "??ERROR??";

const CONNECTION_ERROR_TEXT: &str =
    "An unknown AJAX connection error occurred! Check browser console for details.";
const CONNECTION_REFUSED_TEXT: &str =
    "HTTP 500: Connection refused! Check browser console for details.";
const RUNTIME_ERROR_TITLE: &str = "SCRIPT ERROR! See browser console (F12) for details.";
const RUNTIME_ERROR_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Handler for `NotLoggedIn` errors; returns `true` when it took care of it
pub type NotLoggedInHandler = Arc<dyn Fn(&CallInfo, &ServiceResponse) -> bool + Send + Sync>;

/// How errors are shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorMode {
    #[default]
    Alert,
    Notification,
}

/// What a call was, for handlers that want to know
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub target: ServiceTarget,
    pub method: Method,
    pub url: Url,
}

/// Per-call inputs to error handling
pub struct ErrorContext<'a> {
    pub call: CallInfo,
    pub on_error: Option<&'a OnError>,
    pub allow_redirect: bool,
    pub error_mode: ErrorMode,
}

/// Result of [`ErrorPresenter::handle_error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    /// A handler claimed the failure
    Suppressed,
    /// A structured error was shown
    Presented,
    /// Nothing was shown
    Unpresented,
}

/// What to do with a rejection nobody awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionDisposition {
    /// Produced by a service call; already dealt with
    Swallowed,
    /// Not ours; let it surface
    Propagate,
}

pub struct ErrorPresenter {
    renderer: Arc<dyn ErrorRenderer>,
    not_logged_in: Option<NotLoggedInHandler>,
    development_mode: bool,
}

impl ErrorPresenter {
    pub fn new(renderer: Arc<dyn ErrorRenderer>) -> Self {
        Self {
            renderer,
            not_logged_in: None,
            development_mode: false,
        }
    }

    pub fn with_not_logged_in(mut self, handler: Option<NotLoggedInHandler>) -> Self {
        self.not_logged_in = handler;
        self
    }

    pub fn with_development_mode(mut self, development_mode: bool) -> Self {
        self.development_mode = development_mode;
        self
    }

    pub fn is_development_mode(&self) -> bool {
        self.development_mode
    }

    /// Route a failure through the handlers, showing a structured error if
    /// none of them claims it.
    pub fn handle_error(
        &self,
        response: Option<&ServiceResponse>,
        info: &RequestErrorInfo,
        ctx: &ErrorContext<'_>,
    ) -> Handling {
        if let (Some(handler), Some(response)) = (&self.not_logged_in, response) {
            let not_logged_in = response
                .error()
                .is_some_and(|e| e.is_code(NOT_LOGGED_IN_CODE));
            if not_logged_in && handler(&ctx.call, response) {
                tracing::debug!(url = %ctx.call.url, "NotLoggedIn handled by override");
                return Handling::Suppressed;
            }
        }

        if let Some(on_error) = ctx.on_error {
            if on_error(response, info) {
                return Handling::Suppressed;
            }
        }

        match response.and_then(ServiceResponse::error) {
            Some(error) => {
                self.show_service_error(Some(error), Some(info), ctx.error_mode);
                Handling::Presented
            }
            None => Handling::Unpresented,
        }
    }

    /// Show a structured error, or describe a transport failure.
    pub fn show_service_error(
        &self,
        error: Option<&ServiceError>,
        info: Option<&RequestErrorInfo>,
        mode: ErrorMode,
    ) {
        let info = match (error, info) {
            (None, Some(info)) => info,
            (error, _) => {
                let message = error
                    .and_then(|e| e.message.as_deref().or(e.code.as_deref()))
                    .unwrap_or(UNKNOWN_ERROR_TEXT);
                self.show_message(message, mode);
                return;
            }
        };

        match &info.response_text {
            None => match info.status {
                None | Some(0) => {
                    if !info.is_abort() {
                        self.show_message(CONNECTION_ERROR_TEXT, mode);
                    }
                }
                Some(500) => self.show_message(CONNECTION_REFUSED_TEXT, mode),
                Some(status) => self.show_message(
                    &format!("HTTP {status} error! Check browser console for details."),
                    mode,
                ),
            },
            Some(text) => match mode {
                ErrorMode::Notification => {
                    self.renderer.notify_error(text, None, &NotifyOptions::default())
                }
                ErrorMode::Alert => self.renderer.iframe_dialog(text),
            },
        }
    }

    fn show_message(&self, message: &str, mode: ErrorMode) {
        match mode {
            ErrorMode::Notification => {
                self.renderer
                    .notify_error(message, None, &NotifyOptions::default())
            }
            ErrorMode::Alert => self.renderer.alert_dialog(message),
        }
    }

    /// Surface an uncaught runtime error as a notification, in development
    /// mode only.
    pub fn runtime_error_handler(
        &self,
        message: &str,
        filename: Option<&str>,
        line: Option<u32>,
        column: Option<u32>,
        error: Option<&(dyn std::error::Error + 'static)>,
    ) {
        if !self.development_mode {
            return;
        }

        let position = |n: Option<u32>| n.map_or_else(|| "?".to_string(), |n| n.to_string());
        let mut html = format!(
            "<p></p><p>Message: {}</p><p>File: {}, Line: {}, Column: {}",
            html_escape::encode_text(message),
            html_escape::encode_text(filename.unwrap_or_default()),
            position(line),
            position(column),
        );
        if let Some(error) = error {
            html.push_str("</p><p>");
            html.push_str(&html_escape::encode_text(&error_chain(error)));
        }
        html.push_str("</p>");

        self.renderer.notify_error(
            &html,
            Some(RUNTIME_ERROR_TITLE),
            &NotifyOptions {
                escape_html: false,
                timeout: Some(RUNTIME_ERROR_TIMEOUT),
            },
        );
    }
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str("\ncaused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Decide what to do with a rejection that nobody awaited.
///
/// Service call rejections are swallowed since they have already been
/// presented; the ones nobody reported are still logged.
pub fn unhandled_rejection_handler(
    error: &(dyn std::error::Error + 'static),
) -> RejectionDisposition {
    let Some(err) = error.downcast_ref::<ServiceCallError>() else {
        return RejectionDisposition::Propagate;
    };

    if !err.is_silent() && err.kind() == RejectionKind::Exception {
        tracing::error!(origin = err.origin(), error = %err, "Unhandled service call rejection");
    }
    RejectionDisposition::Swallowed
}
