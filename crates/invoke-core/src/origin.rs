//! Origin comparison
//!
//! Decides whether the same-origin security token may be attached to a
//! request. Cross-origin targets never receive it.

use url::Url;

/// Compare two parsed URLs by scheme, host and port.
///
/// Default ports are normalized, so `http://a` and `http://a:80` match.
pub fn is_same_origin_url(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Compare two URL strings by scheme, host and port.
///
/// Returns `false` if either side does not parse as an absolute URL.
pub fn is_same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => is_same_origin_url(&a, &b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_url_is_same_origin() {
        for url in [
            "http://localhost/",
            "https://example.com:8443/a/b?c=d",
            "http://127.0.0.1:3000",
        ] {
            assert!(is_same_origin(url, url), "{url}");
        }
    }

    #[test]
    fn test_path_and_query_ignored() {
        assert!(is_same_origin(
            "https://example.com/Services/A",
            "https://example.com/page?x=1#frag"
        ));
    }

    #[test]
    fn test_default_port_normalized() {
        assert!(is_same_origin("http://example.com:80/", "http://example.com/"));
        assert!(is_same_origin("https://example.com:443/", "https://example.com/"));
    }

    #[test]
    fn test_differs_by_component() {
        let base = "https://example.com/";
        assert!(!is_same_origin("http://example.com/", base), "scheme");
        assert!(!is_same_origin("https://api.example.com/", base), "host");
        assert!(!is_same_origin("https://example.com:8443/", base), "port");
    }

    #[test]
    fn test_unparseable_is_not_same_origin() {
        assert!(!is_same_origin("/relative/path", "http://localhost/"));
        assert!(!is_same_origin("http://localhost/", "not a url"));
    }
}
