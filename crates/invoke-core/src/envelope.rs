//! Response envelope
//!
//! Every backend reply is a JSON object. A missing or `null` top-level
//! `Error` key means success; a populated one carries a [`ServiceError`].
//! A body that is empty or does not parse is its own failure class, distinct
//! from a server-reported error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status text reported for calls cancelled through an abort signal
pub const ABORT_STATUS_TEXT: &str = "abort";

/// Structured error reported by the server inside the envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceError {
    /// Stable machine-readable identifier, e.g. `NotLoggedIn`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Free-form detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
            arguments: None,
        }
    }

    /// Read an `Error` value leniently.
    ///
    /// Non-string `Code`/`Message` values are stringified and a bare
    /// non-object error value becomes the message.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self {
                code: map.get("Code").and_then(text_of),
                message: map.get("Message").and_then(text_of),
                arguments: map.get("Arguments").filter(|v| !v.is_null()).cloned(),
            },
            other => Self {
                code: None,
                message: text_of(other),
                arguments: None,
            },
        }
    }

    pub fn is_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// JavaScript-style truthiness, which is what backends written against the
/// envelope rely on for the `Error` key.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A parsed backend reply
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    error: Option<ServiceError>,
    body: Value,
}

impl ServiceResponse {
    /// Build a response from a parsed body, extracting the `Error` field
    pub fn from_value(body: Value) -> Self {
        let error = body
            .get("Error")
            .filter(|v| is_truthy(v))
            .map(ServiceError::from_value);
        Self { error, body }
    }

    /// Build an error-only envelope
    pub fn from_error(error: ServiceError) -> Self {
        let body = serde_json::json!({ "Error": error });
        Self {
            error: Some(error),
            body,
        }
    }

    pub fn error(&self) -> Option<&ServiceError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The full body as received
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    /// Look up a top-level field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Deserialize the body into a typed response
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// Outcome of checking a body against the envelope contract
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeStatus {
    /// Parsed and `Error` absent or null
    Success(ServiceResponse),
    /// Parsed and `Error` populated
    ServiceError(ServiceResponse),
    /// No body, or a body that is not structured data
    Empty,
}

/// Classify a raw response body.
pub fn validate_envelope(body: &str) -> EnvelopeStatus {
    if body.trim().is_empty() {
        return EnvelopeStatus::Empty;
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return EnvelopeStatus::Empty,
    };

    if !is_truthy(&value) {
        return EnvelopeStatus::Empty;
    }

    let response = ServiceResponse::from_value(value);
    if response.is_success() {
        EnvelopeStatus::Success(response)
    } else {
        EnvelopeStatus::ServiceError(response)
    }
}

/// Transport-level failure details, independent of the envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestErrorInfo {
    /// HTTP status; `None` when the request never reached the server
    pub status: Option<u16>,
    pub status_text: String,
    pub response_text: Option<String>,
}

impl RequestErrorInfo {
    pub fn from_status(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            status_text: status_text.into(),
            response_text: None,
        }
    }

    pub fn with_response_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.response_text = if text.is_empty() { None } else { Some(text) };
        self
    }

    /// Request cancelled by the caller
    pub fn aborted() -> Self {
        Self {
            status: None,
            status_text: ABORT_STATUS_TEXT.to_string(),
            response_text: None,
        }
    }

    /// Request never reached the server
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            status: None,
            status_text: reason.into(),
            response_text: None,
        }
    }

    pub fn is_abort(&self) -> bool {
        self.status_text == ABORT_STATUS_TEXT
    }
}
