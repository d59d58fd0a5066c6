//! Responses with a read-once body.
//!
//! Neither [`Response`] nor [`Body`] implements `Clone`. Storing a response
//! consumes it, so code that must also hand the response back to the page has
//! to call [`Response::duplicate`] first. Forgetting to do so is a move error.

use bytes::Bytes;

/// A response body that can be consumed exactly once.
#[derive(Debug, Default)]
pub struct Body {
    bytes: Bytes,
}

impl Body {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the body.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// An HTTP response as seen by the page.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Body,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::new(body),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }

    pub fn from_parts(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body: Body::new(body),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Only status 200 is eligible for caching.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Split into two independent responses with the same status, headers and body.
    pub fn duplicate(self) -> (Response, Response) {
        let copy = Response {
            status: self.status,
            headers: self.headers.clone(),
            body: Body::new(self.body.bytes.clone()),
        };
        (self, copy)
    }

    /// Consume the response, returning its body.
    pub fn into_body(self) -> Bytes {
        self.body.into_bytes()
    }

    pub fn into_parts(self) -> (u16, Vec<(String, String)>, Bytes) {
        (self.status, self.headers, self.body.into_bytes())
    }
}
