//! Route request extraction
//!
//! Pulls host and path out of whatever the caller has: a full URL string,
//! a hyper `Uri`, or an origin-form request plus its `Host` header.

use hyper::Uri;
use percent_encoding::percent_decode_str;

/// Host and path of one intercepted request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRequest {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub path: Option<String>,
}

impl RouteRequest {
    pub fn new(host: Option<&str>, path: Option<&str>) -> Self {
        Self {
            scheme: None,
            host: host.map(ToString::to_string),
            path: path.map(ToString::to_string),
        }
    }

    /// Parse a URL string such as `https://mypage.test/app.js`
    ///
    /// Returns `None` when the string is not a valid URI at all.
    pub fn parse(url: &str) -> Option<Self> {
        url.parse::<Uri>().ok().map(|uri| Self::from_uri(&uri))
    }

    /// Build from a request URI; the path is percent-decoded
    pub fn from_uri(uri: &Uri) -> Self {
        let path = uri.path();
        Self {
            scheme: uri.scheme_str().map(ToString::to_string),
            host: uri.host().map(ToString::to_string),
            path: if path.is_empty() {
                None
            } else {
                Some(decode_path(path))
            },
        }
    }

    /// Fill in the host from a `Host` header when the URI carried none
    #[must_use]
    pub fn or_host_header(mut self, host_header: Option<&str>) -> Self {
        if self.host.is_none() {
            self.host = host_header
                .map(strip_port)
                .filter(|h| !h.is_empty())
                .map(ToString::to_string);
        }
        self
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl std::fmt::Display for RouteRequest {
    /// `scheme://host/path`, with `http` and `-` standing in for missing parts
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}://{}{}",
            self.scheme.as_deref().unwrap_or("http"),
            self.host().unwrap_or("-"),
            self.path().unwrap_or("/"),
        )
    }
}

fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// Strip the port from a `Host` header value (`example.com:8080`, `[::1]:80`)
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split(':').next().unwrap_or(host)
}
