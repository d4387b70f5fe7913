//! Blocking transport
//!
//! Drives the call to completion on a private current-thread runtime while
//! the caller's thread waits. Nothing else on that thread runs until the
//! round-trip is over. Must not be used from inside an async runtime.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderValue, CACHE_CONTROL};
use reqwest::StatusCode;
use tokio::runtime::Runtime;

use super::{exchange, PreparedRequest, RawReply, Transport};
use crate::error::{Result, ServiceCallError};

pub struct BlockingTransport {
    http: reqwest::Client,
}

impl BlockingTransport {
    /// Each call runs on its own short-lived runtime, so pooled connections
    /// must not outlive it.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ServiceCallError::InvalidRequest(format!("HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Private runtime for one blocking call.
    ///
    /// Refused from inside an async runtime, where blocking would stall it.
    pub fn runtime(&self) -> Result<Runtime> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ServiceCallError::InvalidRequest(
                "blocking call issued from inside an async runtime".to_string(),
            ));
        }

        Ok(tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?)
    }

    /// Block the current thread until `future` completes.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        Ok(self.runtime()?.block_on(future))
    }
}

impl Transport for BlockingTransport {
    fn name(&self) -> &'static str {
        "blocking"
    }

    fn is_success(&self, status: StatusCode) -> bool {
        status == StatusCode::OK
    }

    fn prepare(&self, request: &mut PreparedRequest) {
        if let Some(value) = request.cache.and_then(|c| c.cache_control()) {
            request
                .headers
                .entry(CACHE_CONTROL)
                .or_insert(HeaderValue::from_static(value));
        }
    }

    fn send<'a>(&'a self, request: &'a PreparedRequest) -> BoxFuture<'a, Result<RawReply>> {
        exchange(&self.http, request).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CacheMode;
    use reqwest::header::HeaderMap;
    use reqwest::Method;

    fn request(cache: Option<CacheMode>) -> PreparedRequest {
        PreparedRequest {
            method: Method::POST,
            url: url::Url::parse("http://localhost/Services/A").unwrap(),
            headers: HeaderMap::new(),
            body: None,
            cache,
            signal: None,
        }
    }

    #[test]
    fn test_only_200_is_success() {
        let transport = BlockingTransport::new().unwrap();
        assert!(transport.is_success(StatusCode::OK));
        assert!(!transport.is_success(StatusCode::CREATED));
        assert!(!transport.is_success(StatusCode::NO_CONTENT));
    }

    #[test]
    fn test_cache_headers() {
        let transport = BlockingTransport::new().unwrap();

        let mut req = request(Some(CacheMode::NoStore));
        transport.prepare(&mut req);
        assert_eq!(req.headers[CACHE_CONTROL], "no-cache, no-store, max-age=0");

        let mut req = request(Some(CacheMode::NoCache));
        transport.prepare(&mut req);
        assert_eq!(req.headers[CACHE_CONTROL], "no-cache");

        let mut req = request(Some(CacheMode::Reload));
        transport.prepare(&mut req);
        assert!(req.headers.get(CACHE_CONTROL).is_none());
    }

    #[test]
    fn test_explicit_cache_header_wins() {
        let transport = BlockingTransport::new().unwrap();
        let mut req = request(Some(CacheMode::NoStore));
        req.headers
            .insert(CACHE_CONTROL, HeaderValue::from_static("max-age=5"));
        transport.prepare(&mut req);
        assert_eq!(req.headers[CACHE_CONTROL], "max-age=5");
    }

    #[test]
    fn test_block_on_outside_runtime() {
        let transport = BlockingTransport::new().unwrap();
        assert_eq!(transport.block_on(async { 7 }).unwrap(), 7);
    }

    #[tokio::test]
    async fn test_block_on_inside_runtime_is_refused() {
        let transport = BlockingTransport::new().unwrap();
        assert!(matches!(
            transport.block_on(async { 7 }),
            Err(ServiceCallError::InvalidRequest(_))
        ));
        assert!(transport.runtime().is_err());
    }
}
