//! Request and response values exchanged between pages, the worker and the network
//!
//! A response body can be read at most once. Anything that needs to both
//! hand a response back and keep a copy calls [`Response::tee`] before
//! reading either.

use crate::error::{ShellcacheError, ShellcacheResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// Get the canonical method name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ShellcacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            other => Err(ShellcacheError::User(format!(
                "Unsupported HTTP method: {}",
                other
            ))),
        }
    }
}

/// Identity under which a response is stored: method plus URL without fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// An outgoing request issued by a controlled page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Create a request with no headers and an empty body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: vec![],
            body: vec![],
        }
    }

    /// Create a GET request
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// Parse an absolute URL into a request
    pub fn parse(method: Method, url: &str) -> ShellcacheResult<Self> {
        let url = Url::parse(url).map_err(|e| ShellcacheError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(method, url))
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a request body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// The store identity of this request
    pub fn key(&self) -> RequestKey {
        let mut url = self.url.clone();
        url.set_fragment(None);
        RequestKey {
            method: self.method,
            url: url.to_string(),
        }
    }

    /// Host component of the URL, if any
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Whether the URL uses a network-fetchable scheme
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }
}

/// How a response relates to the origin that requested it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response
    Basic,
    /// Cross-origin response
    Cors,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Cors => write!(f, "cors"),
        }
    }
}

/// A response body that may be consumed once
#[derive(Debug, Default)]
pub struct Body {
    bytes: Option<Vec<u8>>,
}

impl Body {
    /// Create a readable body
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    /// Whether the body has already been read
    pub fn is_consumed(&self) -> bool {
        self.bytes.is_none()
    }

    /// Length in bytes, if not yet consumed
    pub fn len(&self) -> Option<usize> {
        self.bytes.as_ref().map(Vec::len)
    }

    /// Whether the body is empty (a consumed body counts as empty)
    pub fn is_empty(&self) -> bool {
        self.len().unwrap_or(0) == 0
    }

    /// Read the body, leaving it consumed
    pub fn take(&mut self) -> ShellcacheResult<Vec<u8>> {
        self.bytes.take().ok_or(ShellcacheError::BodyConsumed)
    }
}

/// A response from the network or the cache store
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub response_type: ResponseType,
    pub redirected: bool,
    /// Final URL the body was served from
    pub url: Option<Url>,
    body: Body,
}

impl Response {
    /// Create a same-origin response
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![],
            response_type: ResponseType::Basic,
            redirected: false,
            url: None,
            body: Body::new(body),
        }
    }

    /// Set the response type
    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the final URL
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Mark as produced by following a redirect
    pub fn with_redirected(mut self, redirected: bool) -> Self {
        self.redirected = redirected;
        self
    }

    /// Status is in the 2xx range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Same-origin, non-redirected 200 response
    ///
    /// Cross-origin responses never qualify, including CDN libraries that
    /// install stored from the manifest.
    pub fn is_basic_success(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic && !self.redirected
    }

    /// Look up a header value, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Access the body without consuming the response
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Read the body, leaving it consumed
    pub fn take_body(&mut self) -> ShellcacheResult<Vec<u8>> {
        self.body.take()
    }

    /// Consume the response and return its body
    pub fn bytes(mut self) -> ShellcacheResult<Vec<u8>> {
        self.body.take()
    }

    /// Consume the response and return its body as UTF-8 (lossy)
    pub fn text(self) -> ShellcacheResult<String> {
        Ok(String::from_utf8_lossy(&self.bytes()?).into_owned())
    }

    /// Split into two independent responses with identical bodies
    ///
    /// Fails if the body has already been read.
    pub fn tee(mut self) -> ShellcacheResult<(Response, Response)> {
        let bytes = self.body.take()?;
        let copy = Response {
            status: self.status,
            headers: self.headers.clone(),
            response_type: self.response_type,
            redirected: self.redirected,
            url: self.url.clone(),
            body: Body::new(bytes.clone()),
        };
        self.body = Body::new(bytes);
        Ok((self, copy))
    }
}
