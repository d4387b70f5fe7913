//! Virtual path resolution
//!
//! Paths starting with `~/` are relative to the application root. Bare
//! service names (no scheme, no leading `/` or `~`) live under `~/Services/`.
//! Anything else is passed through untouched, so resolving an already
//! qualified path is a no-op.

use serde::{Deserialize, Serialize};

/// Virtual prefix that bare service names are resolved under
pub const SERVICES_PREFIX: &str = "~/Services/";

/// Expand a `~/`-prefixed path against `application_path`.
///
/// `application_path` is used verbatim, so it should end with `/`
/// (see [`ClientConfig`](crate::ClientConfig), which normalizes it).
pub fn resolve_url(application_path: &str, path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => format!("{application_path}{rest}"),
        None => path.to_string(),
    }
}

/// Resolve a service name or URL.
///
/// `Northwind/Order/List` becomes `{application_path}Services/Northwind/Order/List`;
/// `~/x`, `/x` and `https://host/x` go through [`resolve_url`] unchanged.
pub fn resolve_service_url(application_path: &str, name: &str) -> String {
    if is_bare_service_name(name) {
        resolve_url(application_path, &format!("{SERVICES_PREFIX}{name}"))
    } else {
        resolve_url(application_path, name)
    }
}

fn is_bare_service_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('~') && !name.starts_with('/') && !name.contains("://")
}

/// What a call is aimed at: exactly one of a service name or a literal URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceTarget {
    /// Service name, resolved with [`resolve_service_url`]
    Service(String),
    /// Literal URL, resolved with [`resolve_url`]
    Url(String),
}

impl ServiceTarget {
    pub fn service(name: impl Into<String>) -> Self {
        ServiceTarget::Service(name.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        ServiceTarget::Url(url.into())
    }

    /// Resolve against the application root
    pub fn resolve(&self, application_path: &str) -> String {
        match self {
            ServiceTarget::Service(name) => resolve_service_url(application_path, name),
            ServiceTarget::Url(url) => resolve_url(application_path, url),
        }
    }
}

impl std::fmt::Display for ServiceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceTarget::Service(name) => write!(f, "service {name}"),
            ServiceTarget::Url(url) => write!(f, "url {url}"),
        }
    }
}
