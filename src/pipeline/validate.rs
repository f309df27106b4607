//! Target URL validation.
//!
//! Only absolute `http`/`https` URLs are rendered. Everything else,
//! including `javascript:`, `data:`, `file:` and relative references, is
//! rejected before a page is ever opened.

use url::Url;

/// `true` iff `candidate` parses as an absolute URL with scheme `http` or `https`.
pub fn is_valid_target(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(is_valid_target("https://example.com"));
        assert!(is_valid_target("http://example.com/path?q=1#frag"));
        assert!(is_valid_target("https://localhost:3000/report"));
        assert!(is_valid_target("HTTPS://EXAMPLE.COM"));
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(!is_valid_target("ftp://x"));
        assert!(!is_valid_target("javascript:alert(1)"));
        assert!(!is_valid_target("file:///etc/passwd"));
        assert!(!is_valid_target("data:text/html,<h1>hi</h1>"));
    }

    #[test]
    fn rejects_unparseable() {
        assert!(!is_valid_target("not a url"));
        assert!(!is_valid_target(""));
        assert!(!is_valid_target("/relative/path"));
        assert!(!is_valid_target("example.com"));
    }
}
