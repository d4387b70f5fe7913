//! invoke-client: Service invocation over HTTP
//!
//! Sends JSON requests to backend services and centralizes what every call
//! needs around the network round-trip:
//! - Same-origin security token from the `CSRF-TOKEN` cookie
//! - In-flight request accounting with batch start/stop events
//! - UI blocking for the duration of a call
//! - Envelope validation (`Error` absent = success)
//! - 403 + `Location` redirects and error presentation
//!
//! Two transports share one contract: [`ServiceClient::call`] suspends,
//! [`ServiceClient::call_blocking`] blocks the calling thread.
//!
//! ```no_run
//! use invoke_client::{ServiceCallOptions, ServiceClient};
//! use invoke_core::ClientConfig;
//!
//! # async fn run() -> invoke_client::Result<()> {
//! let client = ServiceClient::new(ClientConfig::new("https://app.example.com/")?)?;
//! let response = client
//!     .call(ServiceCallOptions::service("Northwind/Order/List").request(serde_json::json!({})))
//!     .await?;
//! println!("{}", response.body());
//! # Ok(())
//! # }
//! ```
//!
//! Failed calls are never retried here.

pub mod abort;
pub mod accounting;
pub mod client;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod hooks;
pub mod options;
pub mod presenter;
pub mod transport;

pub use abort::{AbortController, AbortSignal};
pub use accounting::{ActivityBroadcast, ActivityEvent, RequestAccounting, RequestGuard};
pub use client::{ServiceClient, ServiceClientBuilder};
pub use credentials::CredentialInjector;
pub use dispatch::ErrorDispatcher;
pub use error::{RejectionKind, Result, ServiceCallError, SERVICE_CALL_ORIGIN};
pub use hooks::{
    CookieReader, CookieString, CountingUiBlocker, ErrorRenderer, Navigator, NotifyOptions,
    Presented, RecordingNavigator, RecordingRenderer, TracingNavigator, TracingRenderer,
    TracingUiBlocker, UiBlocker,
};
pub use options::{CacheMode, OnCleanup, OnError, OnSuccess, ServiceCallOptions};
pub use presenter::{
    unhandled_rejection_handler, CallInfo, ErrorContext, ErrorMode, ErrorPresenter, Handling,
    NotLoggedInHandler, RejectionDisposition, NOT_LOGGED_IN_CODE, UNKNOWN_ERROR_TEXT,
};
pub use transport::{BlockingTransport, FetchTransport, PreparedRequest, RawReply, Transport};
