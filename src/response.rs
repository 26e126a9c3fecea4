//! Responses, their once-readable bodies, and the value an invocation returns.
//!
//! A [`Response`] body is either a live [`BodyStream`] owned by the transport
//! or an in-memory buffer. A live stream can be read exactly once; closing a
//! body is idempotent and dropping an unclosed body closes it.

use crate::error::ResponseHead;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::io;

/// A body that is still connected to the transport.
///
/// Transports implement this for their response type. `close` releases the
/// connection; [`Body`] guarantees it is called at most once.
#[async_trait]
pub trait BodyStream: Send {
    /// Reads the remaining body into memory.
    async fn read_to_end(&mut self) -> io::Result<Bytes>;

    /// Releases the underlying connection.
    fn close(&mut self) {}
}

enum Source {
    Buffered(Bytes),
    Stream(Box<dyn BodyStream>),
    Consumed,
}

/// The body of a [`Response`].
pub struct Body {
    source: Source,
    length: Option<u64>,
    closed: bool,
}

impl Body {
    /// Creates a repeatable body from bytes already in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            length: Some(bytes.len() as u64),
            source: Source::Buffered(bytes),
            closed: false,
        }
    }

    /// Creates a once-readable body backed by a live stream.
    pub fn from_stream(stream: impl BodyStream + 'static, length: Option<u64>) -> Self {
        Self {
            source: Source::Stream(Box::new(stream)),
            length,
            closed: false,
        }
    }

    /// The body length, if known.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Returns `true` if the body is held in memory and can be read repeatedly.
    pub fn is_repeatable(&self) -> bool {
        matches!(self.source, Source::Buffered(_))
    }

    /// Returns `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reads the whole body.
    ///
    /// Buffered bodies can be read any number of times. A stream is drained,
    /// closed and cannot be read again.
    ///
    /// # Errors
    ///
    /// Returns the stream's I/O error, or an error if the stream was already
    /// consumed or closed.
    pub async fn bytes(&mut self) -> io::Result<Bytes> {
        match std::mem::replace(&mut self.source, Source::Consumed) {
            Source::Buffered(bytes) => {
                self.source = Source::Buffered(bytes.clone());
                Ok(bytes)
            }
            Source::Stream(mut stream) => {
                let result = stream.read_to_end().await;
                stream.close();
                result
            }
            Source::Consumed => Err(io::Error::other("response body already consumed")),
        }
    }

    /// Reads the whole body as text, replacing invalid UTF-8 sequences.
    pub async fn text(&mut self) -> io::Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Drains a stream into memory so the body becomes repeatable.
    ///
    /// Does nothing for bodies that are already buffered.
    pub async fn buffer(&mut self) -> io::Result<()> {
        if let Source::Stream(_) = self.source {
            let bytes = self.bytes().await?;
            self.length = Some(bytes.len() as u64);
            self.source = Source::Buffered(bytes);
        }
        Ok(())
    }

    /// Closes the body. Calling this more than once has no effect.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Source::Stream(stream) = &mut self.source {
            stream.close();
            self.source = Source::Consumed;
        }
    }
}

impl Drop for Body {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            Source::Buffered(bytes) => format!("buffered({} bytes)", bytes.len()),
            Source::Stream(_) => "stream".to_string(),
            Source::Consumed => "consumed".to_string(),
        };
        f.debug_struct("Body")
            .field("source", &source)
            .field("length", &self.length)
            .field("closed", &self.closed)
            .finish()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::from_bytes(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::from_bytes(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::from_bytes(text)
    }
}

/// A response returned by a [`Transport`](crate::Transport).
///
/// # Examples
///
/// ```
/// use declient::Response;
/// use http::{HeaderMap, HeaderValue, StatusCode};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("content-type", HeaderValue::from_static("application/json"));
///
/// let response = Response::new(StatusCode::OK)
///     .with_headers(headers)
///     .with_body("{}");
///
/// assert!(response.is_success());
/// assert_eq!(response.header("content-type"), Some("application/json"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    body: Option<Body>,
}

impl Response {
    /// Creates a response with the given status, no headers and no body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: status.canonical_reason().map(str::to_string),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Sets the reason phrase.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns `true` for statuses in `200..300`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The reason phrase.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value by name, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The body, if the response has one.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Mutable access to the body, for reading it.
    pub fn body_mut(&mut self) -> Option<&mut Body> {
        self.body.as_mut()
    }

    /// Reads the whole body. A response without body yields empty bytes.
    pub async fn bytes(&mut self) -> io::Result<Bytes> {
        match self.body.as_mut() {
            Some(body) => body.bytes().await,
            None => Ok(Bytes::new()),
        }
    }

    /// Reads the whole body as text. A response without body yields `""`.
    pub async fn text(&mut self) -> io::Result<String> {
        match self.body.as_mut() {
            Some(body) => body.text().await,
            None => Ok(String::new()),
        }
    }

    /// Closes the body, if any. Idempotent.
    pub fn close(&mut self) {
        if let Some(body) = self.body.as_mut() {
            body.close();
        }
    }

    /// Reads the body and returns an equivalent response detached from the
    /// transport, holding the bytes in memory.
    pub(crate) async fn detach(&mut self) -> io::Result<Response> {
        let bytes = self.bytes().await?;
        Ok(Response {
            status: self.status,
            reason: self.reason.clone(),
            headers: self.headers.clone(),
            body: Some(Body::from_bytes(bytes)),
        })
    }

    /// Moves the response out, leaving a bodiless response with the same status.
    pub(crate) fn take(&mut self) -> Response {
        let status = self.status;
        std::mem::replace(self, Response::new(status))
    }

    pub(crate) fn head(&self) -> ResponseHead {
        ResponseHead {
            status: self.status,
            reason: self.reason.clone(),
            headers: self.headers.clone(),
        }
    }
}

/// What a successful invocation hands back to the caller.
///
/// The variant follows the method's declared
/// [`ReturnType`](crate::metadata::ReturnType).
#[derive(Debug)]
pub enum Reply<T> {
    /// The decoder's result.
    Decoded(T),
    /// The raw response, with its body buffered in memory.
    Response(Response),
    /// The method declares no result.
    Empty,
}

impl<T> Reply<T> {
    /// Returns the decoded value, if this is [`Reply::Decoded`].
    pub fn into_decoded(self) -> Option<T> {
        match self {
            Reply::Decoded(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the raw response, if this is [`Reply::Response`].
    pub fn into_response(self) -> Option<Response> {
        match self {
            Reply::Response(response) => Some(response),
            _ => None,
        }
    }

    /// Returns `true` for [`Reply::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Reply::Empty)
    }

    /// Maps the decoded value, leaving the other variants untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use declient::Reply;
    ///
    /// let reply = Reply::Decoded(42).map(|n| n.to_string());
    /// assert_eq!(reply.into_decoded().as_deref(), Some("42"));
    /// ```
    pub fn map<U, F>(self, f: F) -> Reply<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Reply::Decoded(value) => Reply::Decoded(f(value)),
            Reply::Response(response) => Reply::Response(response),
            Reply::Empty => Reply::Empty,
        }
    }
}
