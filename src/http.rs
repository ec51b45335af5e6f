//! Request and response values with single-read bodies
//!
//! A body can be read exactly once. Anything that needs a request or
//! response twice (forwarding and inspecting, returning and persisting)
//! must call `duplicate()` before the first read.

use crate::error::{PrecacheError, PrecacheResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use ureq::http::StatusCode;
use url::Url;

/// Header attached to synthesized offline responses
pub const FALLBACK_HEADER: &str = "x-precache-fallback";

pub use ureq::http::Method;

/// Parse a method name, case-insensitively
pub fn parse_method(name: &str) -> PrecacheResult<Method> {
    Method::from_bytes(name.to_ascii_uppercase().as_bytes()).map_err(|e| {
        PrecacheError::InvalidMethod {
            method: name.to_string(),
            reason: e.to_string(),
        }
    })
}

/// How a cross-origin request is made, which decides the response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Cross-origin responses are opaque
    #[default]
    NoCors,
    /// Cross-origin responses are readable (type `cors`)
    Cors,
}

/// Classification of a response relative to the requesting origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response
    Basic,
    /// Cross-origin response made readable by CORS
    Cors,
    /// Cross-origin response whose status and body cannot be inspected
    Opaque,
    /// Synthesized failure response
    Error,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Cors => write!(f, "cors"),
            Self::Opaque => write!(f, "opaque"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Single-read body
#[derive(Debug)]
pub struct Body {
    bytes: Option<Vec<u8>>,
}

impl Body {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Whether the body has already been consumed
    pub fn is_used(&self) -> bool {
        self.bytes.is_none()
    }

    /// Consume the body. A second call fails with `BodyUsed`.
    pub fn read(&mut self) -> PrecacheResult<Vec<u8>> {
        self.bytes.take().ok_or(PrecacheError::BodyUsed)
    }

    fn duplicate(&self) -> PrecacheResult<Self> {
        match &self.bytes {
            Some(bytes) => Ok(Self::new(bytes.clone())),
            None => Err(PrecacheError::BodyUsed),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

/// Identity a response is stored under: method plus URL without fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.as_str().to_string(),
            url: url.to_string(),
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// An outgoing request
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
    mode: RequestMode,
    body: Body,
}

impl Request {
    pub fn new(method: Method, url: &str) -> PrecacheResult<Self> {
        let url = Url::parse(url).map_err(|e| PrecacheError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_url(method, url))
    }

    pub fn get(url: &str) -> PrecacheResult<Self> {
        Self::new(Method::GET, url)
    }

    pub fn from_url(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            mode: RequestMode::default(),
            body: Body::empty(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Body::new(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    /// Consume the request body
    pub fn take_body(&mut self) -> PrecacheResult<Vec<u8>> {
        self.body.read()
    }

    /// Copy the request so it can be sent while the original stays with the caller.
    ///
    /// Fails if the body was already consumed.
    pub fn duplicate(&self) -> PrecacheResult<Self> {
        Ok(Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            mode: self.mode,
            body: self.body.duplicate()?,
        })
    }
}

/// A response, either from the network, the cache or synthesized
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub response_type: ResponseType,
    /// Final URL after redirects, when known
    pub url: Option<String>,
    body: Body,
}

impl Response {
    pub fn new(status: u16, response_type: ResponseType, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: reason_phrase(status),
            headers: Vec::new(),
            response_type,
            url: None,
            body: Body::new(body),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Typed stand-in returned when the network is unreachable
    pub fn unavailable(url: &Url) -> Self {
        Self::new(503, ResponseType::Error, Vec::new())
            .with_header(FALLBACK_HEADER, "offline")
            .with_url(url.as_str())
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Status in the 200-299 range
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// A complete same-origin success: the only kind of response worth persisting
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    /// Consume the response body
    pub fn bytes(&mut self) -> PrecacheResult<Vec<u8>> {
        self.body.read()
    }

    /// Copy the response so one copy can be returned and the other persisted.
    ///
    /// Fails if the body was already consumed.
    pub fn duplicate(&self) -> PrecacheResult<Self> {
        Ok(Self {
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            response_type: self.response_type,
            url: self.url.clone(),
            body: self.body.duplicate()?,
        })
    }
}

/// Canonical reason phrase, empty for unknown or synthetic statuses
fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or_default()
        .to_string()
}
