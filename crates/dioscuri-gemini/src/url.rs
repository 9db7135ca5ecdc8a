//! Gemini URLs and the proxy path mapping
//!
//! A capsule URL `gemini://host[:port]/path[?query]` is served locally at
//! `/host[:port]/path[?query]`.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use url::Url;

use crate::{GeminiError, Result};

pub const DEFAULT_PORT: u16 = 1965;

/// Longest request URL a server is required to accept
pub const MAX_REQUEST_LEN: usize = 1024;

const SCHEME: &str = "gemini";

/// RFC 3986 unreserved characters stay literal in queries
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The proxy path is decoded once on the way back in, so existing
/// escapes in the capsule path must survive that decode
const PROXY_PATH: &AsciiSet = &CONTROLS.add(b'%');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiUrl(Url);

/// Where a link on a page points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Gemini(GeminiUrl),
    External(String),
}

impl GeminiUrl {
    /// Parse an absolute `gemini://` URL
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| GeminiError::InvalidUrl(format!("{input}: {e}")))?;
        Self::from_url(url)
    }

    /// Interpret whatever was typed into the address bar
    ///
    /// Leading slashes are dropped and a missing scheme means `gemini://`.
    pub fn from_address(input: &str) -> Result<Self> {
        let address = input.trim().trim_start_matches('/');
        if address.is_empty() {
            return Err(GeminiError::InvalidUrl("empty address".to_string()));
        }

        if has_scheme(address) {
            Self::parse(address)
        } else {
            Self::parse(&format!("{SCHEME}://{address}"))
        }
    }

    fn from_url(mut url: Url) -> Result<Self> {
        if url.scheme() != SCHEME {
            return Err(GeminiError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(GeminiError::InvalidUrl(format!("{url}: missing host")));
        }
        if url.path().is_empty() {
            url.set_path("/");
        }
        // Fragments are never sent to the server
        url.set_fragment(None);
        Ok(Self(url))
    }

    /// Host without IPv6 brackets, suitable for connecting and SNI
    pub fn host(&self) -> &str {
        self.0
            .host_str()
            .unwrap_or_default()
            .trim_start_matches('[')
            .trim_end_matches(']')
    }

    pub fn port(&self) -> u16 {
        self.0.port().unwrap_or(DEFAULT_PORT)
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.0.query()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Key used to pin this host's certificate
    pub fn host_key(&self) -> String {
        format!("{}:{}", self.host(), self.port())
    }

    /// Local HTTP path that maps back to this URL
    pub fn proxy_path(&self) -> String {
        let mut path = String::from("/");
        path.push_str(self.0.host_str().unwrap_or_default());
        if let Some(port) = self.0.port() {
            path.push_str(&format!(":{port}"));
        }
        path.extend(utf8_percent_encode(self.0.path(), PROXY_PATH));
        if let Some(query) = self.0.query() {
            path.push('?');
            path.push_str(query);
        }
        path
    }

    /// Same URL with the query replaced by raw (already encoded) text
    pub fn with_raw_query(&self, query: Option<&str>) -> Self {
        let mut url = self.0.clone();
        url.set_query(query.filter(|q| !q.is_empty()));
        Self(url)
    }

    /// Same URL with `input` percent-encoded as the query, as sent
    /// in reply to an input prompt
    pub fn with_input(&self, input: &str) -> Self {
        let encoded = utf8_percent_encode(input, QUERY).to_string();
        self.with_raw_query(Some(&encoded))
    }

    /// Resolve a link found on this page
    pub fn resolve(&self, reference: &str) -> Option<LinkTarget> {
        let joined = self.0.join(reference.trim()).ok()?;
        if joined.scheme() == SCHEME {
            Self::from_url(joined).ok().map(LinkTarget::Gemini)
        } else {
            Some(LinkTarget::External(joined.to_string()))
        }
    }

    /// The request line sent to the server
    pub fn request_line(&self) -> Result<String> {
        let len = self.0.as_str().len();
        if len > MAX_REQUEST_LEN {
            return Err(GeminiError::RequestTooLong(len));
        }
        Ok(format!("{}\r\n", self.0))
    }
}

impl fmt::Display for GeminiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for GeminiUrl {
    type Err = GeminiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// `scheme://` prefix check per RFC 3986 scheme syntax
fn has_scheme(input: &str) -> bool {
    match input.find("://") {
        Some(idx) => {
            let scheme = &input[..idx];
            scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_address_without_scheme() {
        let url = GeminiUrl::from_address("geminiprotocol.net").unwrap();
        assert_eq!(url.as_str(), "gemini://geminiprotocol.net/");
        assert_eq!(url.host(), "geminiprotocol.net");
        assert_eq!(url.port(), DEFAULT_PORT);

        let url = GeminiUrl::from_address("/bbs.geminispace.org/s/gemini?page=2").unwrap();
        assert_eq!(url.path(), "/s/gemini");
        assert_eq!(url.query(), Some("page=2"));
    }

    #[test]
    fn test_from_address_with_scheme() {
        let url = GeminiUrl::from_address("  gemini://example.org:1966/docs/#top ").unwrap();
        assert_eq!(url.as_str(), "gemini://example.org:1966/docs/");
        assert_eq!(url.port(), 1966);
        assert_eq!(url.host_key(), "example.org:1966");
    }

    #[test]
    fn test_from_address_rejects_other_schemes() {
        assert!(matches!(
            GeminiUrl::from_address("https://example.org"),
            Err(GeminiError::UnsupportedScheme(s)) if s == "https"
        ));
        assert!(matches!(
            GeminiUrl::from_address(""),
            Err(GeminiError::InvalidUrl(_))
        ));
        assert!(matches!(
            GeminiUrl::from_address("/"),
            Err(GeminiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_scheme_like_text_in_query_is_not_a_scheme() {
        let url = GeminiUrl::from_address("example.org/go?to=gemini://x").unwrap();
        assert_eq!(url.host(), "example.org");
    }

    #[test]
    fn test_proxy_path() {
        let url = GeminiUrl::parse("gemini://example.org:1966/a/b.gmi?q=1").unwrap();
        assert_eq!(url.proxy_path(), "/example.org:1966/a/b.gmi?q=1");

        let url = GeminiUrl::parse("gemini://example.org").unwrap();
        assert_eq!(url.proxy_path(), "/example.org/");

        let back = GeminiUrl::from_address(&url.proxy_path()).unwrap();
        assert_eq!(back, url);
    }

    #[test]
    fn test_proxy_path_keeps_escapes_in_path() {
        let url = GeminiUrl::parse("gemini://example.org/what%3F/a%2Fb%25c.gmi").unwrap();
        assert_eq!(url.proxy_path(), "/example.org/what%253F/a%252Fb%2525c.gmi");

        let url = GeminiUrl::parse("gemini://example.org/caf%C3%A9?q=%20").unwrap();
        assert_eq!(url.proxy_path(), "/example.org/caf%25C3%25A9?q=%20");
    }

    #[test]
    fn test_resolve_links() {
        let page = GeminiUrl::parse("gemini://example.org/docs/index.gmi").unwrap();

        match page.resolve("faq.gmi") {
            Some(LinkTarget::Gemini(url)) => {
                assert_eq!(url.as_str(), "gemini://example.org/docs/faq.gmi")
            }
            other => panic!("Expected Gemini link, got {other:?}"),
        }

        match page.resolve("/news/") {
            Some(LinkTarget::Gemini(url)) => assert_eq!(url.proxy_path(), "/example.org/news/"),
            other => panic!("Expected Gemini link, got {other:?}"),
        }

        match page.resolve("gemini://other.net/") {
            Some(LinkTarget::Gemini(url)) => assert_eq!(url.host(), "other.net"),
            other => panic!("Expected Gemini link, got {other:?}"),
        }

        assert_eq!(
            page.resolve("https://example.com/x"),
            Some(LinkTarget::External("https://example.com/x".to_string()))
        );
    }

    #[test]
    fn test_with_input_encodes_query() {
        let url = GeminiUrl::parse("gemini://example.org/search").unwrap();
        let url = url.with_input("rust lang?");
        assert_eq!(url.as_str(), "gemini://example.org/search?rust%20lang%3F");

        let cleared = url.with_raw_query(Some(""));
        assert_eq!(cleared.query(), None);
    }

    #[test]
    fn test_request_line() {
        let url = GeminiUrl::parse("gemini://example.org/").unwrap();
        assert_eq!(url.request_line().unwrap(), "gemini://example.org/\r\n");

        let long = GeminiUrl::parse(&format!("gemini://example.org/{}", "a".repeat(1024))).unwrap();
        assert!(matches!(
            long.request_line(),
            Err(GeminiError::RequestTooLong(n)) if n > MAX_REQUEST_LEN
        ));
    }

    #[test]
    fn test_ipv6_host() {
        let url = GeminiUrl::from_address("[::1]:1966/").unwrap();
        assert_eq!(url.host(), "::1");
        assert_eq!(url.proxy_path(), "/[::1]:1966/");
    }
}
