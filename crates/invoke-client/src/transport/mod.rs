//! Transport strategies
//!
//! Two interchangeable ways of moving a prepared request over HTTP:
//!
//! | Strategy | Caller | Success status |
//! |----------|--------|----------------|
//! | [`FetchTransport`] | suspends, thread stays free | any 2xx |
//! | [`BlockingTransport`] | blocks the calling thread | exactly 200 |
//!
//! The success checks differ on purpose and are kept that way.
//!
//! Both race the network exchange against the call's abort signal.

mod blocking;
mod fetch;

pub use blocking::BlockingTransport;
pub use fetch::FetchTransport;

use futures::future::BoxFuture;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::abort::AbortSignal;
use crate::error::{Result, ServiceCallError};
use crate::options::CacheMode;

/// A request ready to go on the wire
#[derive(Debug)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Serialized JSON payload
    pub body: Option<String>,
    pub cache: Option<CacheMode>,
    pub signal: Option<AbortSignal>,
}

/// What came back, before any envelope interpretation
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawReply {
    pub fn status_text(&self) -> String {
        self.status.canonical_reason().unwrap_or_default().to_string()
    }

    /// Header value as text; missing, empty or non-text values are `None`
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }

    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }
}

/// Shared contract of both strategies
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `status` counts as a successful exchange
    fn is_success(&self, status: StatusCode) -> bool;

    /// Strategy-specific request adjustments before sending
    fn prepare(&self, _request: &mut PreparedRequest) {}

    fn send<'a>(&'a self, request: &'a PreparedRequest) -> BoxFuture<'a, Result<RawReply>>;
}

/// Perform the exchange, aborting if the request's signal fires first
pub(crate) async fn exchange(
    http: &reqwest::Client,
    request: &PreparedRequest,
) -> Result<RawReply> {
    let send = async {
        let mut builder = http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(ServiceCallError::TransportUnreachable)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(ServiceCallError::TransportUnreachable)?;

        Ok(RawReply {
            status,
            headers,
            body,
        })
    };

    match &request.signal {
        Some(signal) if signal.is_aborted() => Err(ServiceCallError::Cancelled),
        Some(signal) => {
            tokio::select! {
                reply = send => reply,
                _ = signal.aborted() => {
                    tracing::debug!(url = %request.url, "Request aborted by caller");
                    Err(ServiceCallError::Cancelled)
                }
            }
        }
        None => send.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, CONTENT_TYPE, LOCATION};

    fn reply(headers: &[(reqwest::header::HeaderName, &'static str)]) -> RawReply {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(name.clone(), HeaderValue::from_static(value));
        }
        RawReply {
            status: StatusCode::FORBIDDEN,
            headers: map,
            body: String::new(),
        }
    }

    #[test]
    fn test_status_text() {
        assert_eq!(reply(&[]).status_text(), "Forbidden");
    }

    #[test]
    fn test_header_lookup() {
        let r = reply(&[(LOCATION, "/login")]);
        assert_eq!(r.header("Location"), Some("/login"));
        assert_eq!(reply(&[(LOCATION, "")]).header("location"), None);
    }

    #[test]
    fn test_is_json() {
        assert!(reply(&[(CONTENT_TYPE, "application/json; charset=utf-8")]).is_json());
        assert!(reply(&[(CONTENT_TYPE, "Application/JSON")]).is_json());
        assert!(!reply(&[(CONTENT_TYPE, "text/html")]).is_json());
        assert!(!reply(&[]).is_json());
    }
}
