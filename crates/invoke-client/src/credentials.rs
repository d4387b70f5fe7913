//! Same-origin security token injection
//!
//! The token is read from a cookie and sent back as a header, but only to
//! the page's own origin. Cross-origin targets never see it.
//!
//! Two entry points share the same token lookup:
//! - [`CredentialInjector::apply`] for calls made through the client
//! - [`CredentialInjector::before_send`], the default-request hook for
//!   requests built elsewhere that are not marked cross-domain

use std::sync::Arc;

use invoke_core::{is_same_origin_url, ClientConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::RequestBuilder;
use url::Url;

use crate::error::{Result, ServiceCallError};
use crate::hooks::{CookieReader, CookieString};

pub struct CredentialInjector {
    reader: Option<Arc<dyn CookieReader>>,
    fallback: CookieString,
    cookie_name: String,
    header_name: HeaderName,
    page_url: Url,
}

impl CredentialInjector {
    /// Build from config. `reader` takes precedence over the config's raw
    /// cookie string when present.
    pub fn new(config: &ClientConfig, reader: Option<Arc<dyn CookieReader>>) -> Result<Self> {
        let header_name = HeaderName::from_bytes(config.csrf_header.as_bytes()).map_err(|e| {
            ServiceCallError::InvalidRequest(format!("token header {}: {e}", config.csrf_header))
        })?;
        Ok(Self {
            reader,
            fallback: CookieString::new(config.cookies.clone()),
            cookie_name: config.csrf_cookie.clone(),
            header_name,
            page_url: config.page_url.clone(),
        })
    }

    pub fn get_cookie(&self, name: &str) -> Option<String> {
        match &self.reader {
            Some(reader) => reader.get_cookie(name),
            None => self.fallback.get_cookie(name),
        }
    }

    /// Current token, if a non-empty one is stored
    pub fn token(&self) -> Option<String> {
        self.get_cookie(&self.cookie_name).filter(|t| !t.is_empty())
    }

    pub fn is_same_origin(&self, target: &Url) -> bool {
        is_same_origin_url(target, &self.page_url)
    }

    /// Attach the token header if `target` is same-origin.
    ///
    /// Returns whether a header was set.
    pub fn apply(&self, target: &Url, headers: &mut HeaderMap) -> bool {
        if !self.is_same_origin(target) {
            return false;
        }
        match self.token_header() {
            Some(value) => {
                headers.insert(self.header_name.clone(), value);
                true
            }
            None => false,
        }
    }

    /// Default-request hook: decorate `builder` unless it is cross-domain
    pub fn before_send(&self, builder: RequestBuilder, cross_domain: bool) -> RequestBuilder {
        if cross_domain {
            return builder;
        }
        match self.token_header() {
            Some(value) => builder.header(self.header_name.clone(), value),
            None => builder,
        }
    }

    fn token_header(&self) -> Option<HeaderValue> {
        let token = self.token()?;
        match HeaderValue::from_str(&token) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "Security token is not a valid header value");
                None
            }
        }
    }
}
