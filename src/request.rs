//! Read-only request projection consumed by the decoder.
//!
//! The hosting HTTP framework owns the real request; the decoder only
//! needs the declared content type, the headers in transport order, and
//! the single-pass body stream. Framework adapters implement
//! [`RequestView`] over their native request type; [`OwnedRequest`] is an
//! in-memory implementation for tests and frameworkless embedders.

use std::io::Cursor;

use tokio::io::AsyncRead;

/// Read-only projection of one inbound HTTP request.
///
/// The view lives for the duration of a single request; the decoder
/// neither owns nor outlives it. The body is a single-pass stream: it is
/// drained at most once, by the decoder.
pub trait RequestView {
    /// Body stream type.
    type Body: AsyncRead + Unpin + Send;

    /// Declared content type, if any.
    fn content_type(&self) -> Option<&str>;

    /// Headers in transport order.
    ///
    /// Repeated header names are visited once per occurrence, in order.
    fn headers(&self) -> impl Iterator<Item = (&str, &str)>;

    /// The request body stream.
    fn body(&mut self) -> &mut Self::Body;
}

/// In-memory [`RequestView`] implementation.
///
/// # Examples
///
/// ```
/// use cloudwire::OwnedRequest;
///
/// let request = OwnedRequest::new()
///     .with_content_type("text/plain")
///     .with_header("ce-specversion", "1.0")
///     .with_body("hello");
/// ```
#[derive(Clone, Debug, Default)]
pub struct OwnedRequest {
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    body: Cursor<Vec<u8>>,
}

impl OwnedRequest {
    /// Create an empty request with no content type, headers, or body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Append a header. Repeated names are kept in insertion order.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body bytes.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Cursor::new(body.into());
        self
    }
}

impl RequestView for OwnedRequest {
    type Body = Cursor<Vec<u8>>;

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    fn body(&mut self) -> &mut Self::Body {
        &mut self.body
    }
}
