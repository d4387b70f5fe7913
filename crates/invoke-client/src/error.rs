//! Service call error types
//!
//! Every failed call rejects with one of these. The variant says which
//! failure class it was; [`ServiceCallError::kind`] says whether the user has
//! already been shown something for it.

use invoke_core::ServiceError;
use thiserror::Error;

/// Origin marker carried by every rejection produced by this crate
pub const SERVICE_CALL_ORIGIN: &str = "serviceCall";

#[derive(Error, Debug)]
pub enum ServiceCallError {
    /// The request never completed at the network level
    #[error("Network request failed: {0}")]
    TransportUnreachable(#[source] reqwest::Error),

    /// Reached the server, non-success status
    #[error("HTTP {status}: {status_text}!")]
    Http { status: u16, status_text: String },

    /// Reached the server, envelope carried a populated `Error`
    #[error("{}", describe_service_error(.0))]
    Service(ServiceError),

    /// Success status but no parseable body
    #[error("Empty response received!")]
    EmptyResponse,

    /// 403 with a `Location` header; navigation was triggered
    #[error("HTTP 403: redirected to {location}!")]
    RedirectRequired { location: String },

    /// Aborted through the caller's signal
    #[error("Request aborted")]
    Cancelled,

    /// The call could not be built or issued
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] invoke_core::Error),
}

fn describe_service_error(error: &ServiceError) -> String {
    let arguments = match &error.arguments {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    format!(
        "Error: {} {} {}!",
        error.code.as_deref().unwrap_or_default(),
        error.message.as_deref().unwrap_or_default(),
        arguments
    )
}

/// How a rejection relates to what the user has seen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Nobody reported it; worth logging
    Exception,
    /// Already routed through error presentation or navigation
    Handled,
    /// Intentionally invisible, e.g. user cancellation
    Silent,
}

impl ServiceCallError {
    pub fn origin(&self) -> &'static str {
        SERVICE_CALL_ORIGIN
    }

    pub fn kind(&self) -> RejectionKind {
        match self {
            ServiceCallError::Http { .. }
            | ServiceCallError::Service(_)
            | ServiceCallError::RedirectRequired { .. } => RejectionKind::Handled,
            ServiceCallError::Cancelled => RejectionKind::Silent,
            ServiceCallError::TransportUnreachable(_)
            | ServiceCallError::EmptyResponse
            | ServiceCallError::InvalidRequest(_)
            | ServiceCallError::Runtime(_)
            | ServiceCallError::Core(_) => RejectionKind::Exception,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.kind() == RejectionKind::Silent
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceCallError::Http { status, .. } => Some(*status),
            ServiceCallError::RedirectRequired { .. } => Some(403),
            _ => None,
        }
    }

    /// Structured error reported by the server, if any
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            ServiceCallError::Service(error) => Some(error),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceCallError>;
