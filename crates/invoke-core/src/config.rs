//! Client configuration

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{paths, Error, Result};

/// Cookie holding the same-origin security token
pub const DEFAULT_CSRF_COOKIE: &str = "CSRF-TOKEN";

/// Header the security token is sent in
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRF-TOKEN";

const DEFAULT_PAGE_URL: &str = "http://localhost/";

/// Settings shared by every call made through one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Application root that `~/` expands to, always ending in `/`
    pub application_path: String,
    /// URL of the "current page": the origin requests are compared against
    /// and the base that relative URLs are joined to
    pub page_url: Url,
    pub csrf_cookie: String,
    pub csrf_header: String,
    /// Raw `name=value; name2=value2` cookie string for the built-in reader
    pub cookies: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            application_path: "/".to_string(),
            page_url: Url::parse(DEFAULT_PAGE_URL).expect("static URL is valid"),
            csrf_cookie: DEFAULT_CSRF_COOKIE.to_string(),
            csrf_header: DEFAULT_CSRF_HEADER.to_string(),
            cookies: String::new(),
        }
    }
}

impl ClientConfig {
    /// Create a config for a page URL, with `/` as application root
    pub fn new(page_url: &str) -> Result<Self> {
        Ok(Self {
            page_url: parse_url(page_url)?,
            ..Self::default()
        })
    }

    /// Load overrides from `INVOKE_APP_PATH`, `INVOKE_PAGE_URL` and
    /// `INVOKE_COOKIES`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("INVOKE_APP_PATH") {
            config = config.with_application_path(&path);
        }
        if let Ok(url) = std::env::var("INVOKE_PAGE_URL") {
            config.page_url = parse_url(&url)?;
        }
        if let Ok(cookies) = std::env::var("INVOKE_COOKIES") {
            config.cookies = cookies;
        }
        Ok(config)
    }

    pub fn with_application_path(mut self, path: &str) -> Self {
        self.application_path = normalize_application_path(path);
        self
    }

    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = cookies.into();
        self
    }

    /// Expand `~/` against the application root
    pub fn resolve_url(&self, path: &str) -> String {
        paths::resolve_url(&self.application_path, path)
    }

    /// Resolve a bare service name or URL
    pub fn resolve_service_url(&self, name: &str) -> String {
        paths::resolve_service_url(&self.application_path, name)
    }

    /// Turn a resolved path into an absolute URL against the page URL.
    ///
    /// Absolute inputs are returned as-is.
    pub fn absolute_url(&self, resolved: &str) -> Result<Url> {
        self.page_url
            .join(resolved)
            .map_err(|source| Error::InvalidUrl {
                url: resolved.to_string(),
                source,
            })
    }

    /// Development mode as judged by the page host
    pub fn is_development_mode(&self) -> bool {
        is_development_mode(self.page_url.host_str().unwrap_or_default())
    }
}

fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|source| Error::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    // Relative service paths are joined onto the page URL
    if parsed.cannot_be_a_base() {
        return Err(Error::InvalidConfig(format!(
            "page URL {url} cannot be used as a base"
        )));
    }
    Ok(parsed)
}

fn normalize_application_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

/// Whether `hostname` looks like a developer machine.
///
/// True for `localhost`, `127.0.0.1`, `[::1]` and names under `.local` or
/// `.localhost`, compared case-insensitively.
pub fn is_development_mode(hostname: &str) -> bool {
    let hostname = hostname.to_ascii_lowercase();
    hostname == "localhost"
        || hostname == "127.0.0.1"
        || hostname == "[::1]"
        || hostname.ends_with(".local")
        || hostname.ends_with(".localhost")
}
