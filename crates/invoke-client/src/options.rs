//! Per-call options

use std::str::FromStr;

use invoke_core::{RequestErrorInfo, ServiceResponse, ServiceTarget};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::abort::AbortSignal;
use crate::error::{Result, ServiceCallError};
use crate::presenter::ErrorMode;

/// Called with the response of a successful call
pub type OnSuccess = Box<dyn FnOnce(&ServiceResponse) + Send>;

/// Called on failure; return `true` to suppress default error presentation
pub type OnError = Box<dyn Fn(Option<&ServiceResponse>, &RequestErrorInfo) -> bool + Send + Sync>;

/// Called exactly once when the call settles, whatever the outcome
pub type OnCleanup = Box<dyn FnOnce() + Send>;

/// Cache directive, mirroring the fetch `cache` modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    OnlyIfCached,
}

impl CacheMode {
    /// `Cache-Control` value the blocking transport sends for this mode
    pub fn cache_control(&self) -> Option<&'static str> {
        match self {
            CacheMode::NoStore => Some("no-cache, no-store, max-age=0"),
            CacheMode::NoCache => Some("no-cache"),
            _ => None,
        }
    }
}

impl FromStr for CacheMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "default" => Ok(CacheMode::Default),
            "no-store" => Ok(CacheMode::NoStore),
            "reload" => Ok(CacheMode::Reload),
            "no-cache" => Ok(CacheMode::NoCache),
            "force-cache" => Ok(CacheMode::ForceCache),
            "only-if-cached" => Ok(CacheMode::OnlyIfCached),
            other => Err(format!("unknown cache mode: {other}")),
        }
    }
}

/// Configuration for one invocation.
///
/// Defaults: `POST`, asynchronous, UI blocking on, redirects followed,
/// alert-style error presentation. The options are consumed by the call.
pub struct ServiceCallOptions {
    pub target: ServiceTarget,
    pub request: Option<Value>,
    pub method: Method,
    pub asynchronous: bool,
    pub block_ui: bool,
    pub allow_redirect: bool,
    pub headers: HeaderMap,
    pub cache: Option<CacheMode>,
    pub signal: Option<AbortSignal>,
    pub error_mode: ErrorMode,
    pub on_success: Option<OnSuccess>,
    pub on_error: Option<OnError>,
    pub on_cleanup: Option<OnCleanup>,
}

impl ServiceCallOptions {
    pub fn new(target: ServiceTarget) -> Self {
        Self {
            target,
            request: None,
            method: Method::POST,
            asynchronous: true,
            block_ui: true,
            allow_redirect: true,
            headers: HeaderMap::new(),
            cache: None,
            signal: None,
            error_mode: ErrorMode::Alert,
            on_success: None,
            on_error: None,
            on_cleanup: None,
        }
    }

    /// Call a service by name, e.g. `Northwind/Order/List`
    pub fn service(name: impl Into<String>) -> Self {
        Self::new(ServiceTarget::service(name))
    }

    /// Call a literal URL
    pub fn url(url: impl Into<String>) -> Self {
        Self::new(ServiceTarget::url(url))
    }

    pub fn request(mut self, request: Value) -> Self {
        self.request = Some(request);
        self
    }

    /// Serialize a typed request payload
    pub fn request_json<T: Serialize>(mut self, request: &T) -> Result<Self> {
        let value = serde_json::to_value(request)
            .map_err(|e| ServiceCallError::InvalidRequest(format!("request payload: {e}")))?;
        self.request = Some(value);
        Ok(self)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    /// Shorthand for `asynchronous(false)`
    pub fn blocking(self) -> Self {
        self.asynchronous(false)
    }

    pub fn block_ui(mut self, block_ui: bool) -> Self {
        self.block_ui = block_ui;
        self
    }

    pub fn allow_redirect(mut self, allow_redirect: bool) -> Self {
        self.allow_redirect = allow_redirect;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header from strings, validating both parts
    pub fn try_header(self, name: &str, value: &str) -> Result<Self> {
        let header_name = HeaderName::from_str(name)
            .map_err(|e| ServiceCallError::InvalidRequest(format!("header name {name}: {e}")))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            ServiceCallError::InvalidRequest(format!("header value for {name}: {e}"))
        })?;
        Ok(self.header(header_name, header_value))
    }

    pub fn cache(mut self, cache: CacheMode) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(&ServiceResponse) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(
        mut self,
        f: impl Fn(Option<&ServiceResponse>, &RequestErrorInfo) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_cleanup(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_cleanup = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for ServiceCallOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCallOptions")
            .field("target", &self.target)
            .field("method", &self.method)
            .field("asynchronous", &self.asynchronous)
            .field("block_ui", &self.block_ui)
            .field("allow_redirect", &self.allow_redirect)
            .field("headers", &self.headers)
            .field("cache", &self.cache)
            .field("error_mode", &self.error_mode)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_cleanup", &self.on_cleanup.is_some())
            .finish_non_exhaustive()
    }
}
