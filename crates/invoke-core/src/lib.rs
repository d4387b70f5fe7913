//! invoke-core: Wire types and path rules for backend service calls
//!
//! This crate defines the pieces every caller and backend agree on:
//! - Envelope: a JSON object whose top-level `Error` key is absent or `null`
//!   on success, and a `{ Code, Message, Arguments }` record on failure
//! - Virtual paths: `~/` is application-root relative, bare names resolve
//!   under `~/Services/`
//! - Origins: scheme + host + port equality, used to decide whether the
//!   same-origin security token may be attached
//!
//! # Envelope Contract
//!
//! | Body | Classification |
//! |------|----------------|
//! | `{"Error": null, ...}` or no `Error` key | success |
//! | `{"Error": {"Code": "X", ...}}` | structured service error |
//! | empty, `null`, or not JSON | empty response |
//!
//! The invocation layer itself lives in `invoke-client`.

mod config;
mod envelope;
mod error;
mod origin;
mod paths;

pub use config::{is_development_mode, ClientConfig, DEFAULT_CSRF_COOKIE, DEFAULT_CSRF_HEADER};
pub use envelope::{
    validate_envelope, EnvelopeStatus, RequestErrorInfo, ServiceError, ServiceResponse,
    ABORT_STATUS_TEXT,
};
pub use error::Error;
pub use origin::{is_same_origin, is_same_origin_url};
pub use paths::{resolve_service_url, resolve_url, ServiceTarget, SERVICES_PREFIX};

pub type Result<T> = std::result::Result<T, Error>;
