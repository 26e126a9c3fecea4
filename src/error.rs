//! Error types for declarative client invocations.
//!
//! Every failure an invocation can surface is a variant of [`Error`]. The
//! variants are grouped by the phase that produced them (see [`ErrorKind`]):
//! sending the request, reading the response, a non-success status, decoding
//! a successful body, or a transient failure that the retry loop may repeat.

use crate::request::Request;
use http::{HeaderMap, StatusCode};
use std::io;
use std::time::{Duration, SystemTime};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The phase an [`Error`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The transport failed before a response was obtained.
    Send,
    /// A response was obtained but reading or buffering its body failed.
    Read,
    /// The server answered with a status outside `200..300`.
    Status,
    /// A successful body could not be decoded into the declared type.
    Decode,
    /// A transient failure eligible for another attempt.
    Retryable,
    /// The client, target or a request was misconfigured.
    Configuration,
    /// A request body could not be serialized.
    Serialization,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Send => "send",
            Self::Read => "read",
            Self::Status => "status",
            Self::Decode => "decode",
            Self::Retryable => "retryable",
            Self::Configuration => "configuration",
            Self::Serialization => "serialization",
        };
        f.write_str(text)
    }
}

/// Status line and headers of a response whose body is no longer available.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The reason phrase, if the transport reported one.
    pub reason: Option<String>,
    /// The response headers.
    pub headers: HeaderMap,
}

/// The main error type for declarative client invocations.
///
/// # Examples
///
/// ```
/// use declient::{Error, ErrorKind};
/// use http::StatusCode;
///
/// let err = Error::Status {
///     config_key: "Api#getUser".to_string(),
///     status: StatusCode::NOT_FOUND,
///     reason: None,
///     headers: Box::default(),
///     body: Some("no such user".into()),
/// };
///
/// assert_eq!(err.kind(), ErrorKind::Status);
/// assert_eq!(err.raw_response(), Some("no such user"));
/// assert!(!err.is_retryable());
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The transport failed while sending the request; no response exists.
    #[error("error executing {method} {url}: {source}", method = .request.method(), url = .request.url())]
    Executing {
        /// The request that was being sent
        request: Box<Request>,
        /// The transport failure
        #[source]
        source: io::Error,
        /// Time spent in the transport call before it failed
        elapsed: Duration,
    },

    /// Reading, buffering or decoding the response body failed.
    #[error(
        "error reading {method} {url} (status {status}): {source}",
        method = .request.method(),
        url = .request.url(),
        status = .response.status
    )]
    Reading {
        /// The request that produced the response
        request: Box<Request>,
        /// Status and headers of the response being read
        response: Box<ResponseHead>,
        /// The I/O failure
        #[source]
        source: io::Error,
        /// Time the transport call took
        elapsed: Duration,
    },

    /// The server returned a status outside `200..300`.
    ///
    /// Produced by [`DefaultErrorDecoder`](crate::codec::DefaultErrorDecoder).
    #[error("HTTP error {status} calling {config_key}")]
    Status {
        /// The config key of the method that was called
        config_key: String,
        /// The HTTP status code
        status: StatusCode,
        /// The reason phrase
        reason: Option<String>,
        /// The response headers
        headers: Box<HeaderMap>,
        /// The response body, if it could be read as text
        body: Option<Box<str>>,
    },

    /// A successful response could not be decoded.
    ///
    /// The raw body is preserved when the decoder had read it.
    #[error("Failed to decode response (status {status}): {source}")]
    Decode {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body that failed to decode
        raw_response: Option<Box<str>>,
        /// The decoder failure
        #[source]
        source: BoxError,
    },

    /// A transient failure; the retry loop consults the retryer on it.
    #[error(transparent)]
    Retryable(#[from] RetryableError),

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize a request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided or produced by a target.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    pub(crate) fn executing(request: Request, source: io::Error, elapsed: Duration) -> Self {
        Error::Executing {
            request: Box::new(request),
            source,
            elapsed,
        }
    }

    pub(crate) fn reading(
        request: Request,
        response: ResponseHead,
        source: io::Error,
        elapsed: Duration,
    ) -> Self {
        Error::Reading {
            request: Box::new(request),
            response: Box::new(response),
            source,
            elapsed,
        }
    }

    /// Returns the phase this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Executing { .. } => ErrorKind::Send,
            Error::Reading { .. } => ErrorKind::Read,
            Error::Status { .. } => ErrorKind::Status,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::Retryable(_) => ErrorKind::Retryable,
            Error::ConfigurationError(_) | Error::InvalidUrl(_) => ErrorKind::Configuration,
            Error::SerializationFailed(_) => ErrorKind::Serialization,
        }
    }

    /// Returns `true` if the retry loop will hand this error to the retryer.
    ///
    /// Only [`Error::Retryable`] re-enters the loop; every other variant is
    /// terminal at this layer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Retryable(_))
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Decode { status, .. } => Some(*status),
            Error::Reading { response, .. } => Some(response.status),
            Error::Retryable(retryable) => retryable.cause().status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Status { body, .. } => body.as_deref(),
            Error::Decode { raw_response, .. } => raw_response.as_deref(),
            Error::Retryable(retryable) => retryable.cause().raw_response(),
            _ => None,
        }
    }

    /// Returns the request this error was raised for, for transport failures.
    pub fn request(&self) -> Option<&Request> {
        match self {
            Error::Executing { request, .. } | Error::Reading { request, .. } => Some(request),
            Error::Retryable(retryable) => retryable.cause().request(),
            _ => None,
        }
    }

    /// Returns how long the transport call took, for transport failures.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Error::Executing { elapsed, .. } | Error::Reading { elapsed, .. } => Some(*elapsed),
            _ => None,
        }
    }
}

/// A transient failure that may succeed if the call is attempted again.
///
/// Error decoders return `Error::Retryable` to ask for another attempt. The
/// optional `retry_after` instant is a hint from the server about when the
/// next attempt may be made.
#[derive(thiserror::Error, Debug)]
#[error("retryable failure: {cause}")]
pub struct RetryableError {
    #[source]
    cause: Box<Error>,
    retry_after: Option<SystemTime>,
}

impl RetryableError {
    /// Wraps `cause` as retryable, with an optional retry-after hint.
    pub fn new(cause: Error, retry_after: Option<SystemTime>) -> Self {
        Self {
            cause: Box::new(cause),
            retry_after,
        }
    }

    /// The failure that made this attempt unsuccessful.
    pub fn cause(&self) -> &Error {
        &self.cause
    }

    /// Unwraps the underlying failure.
    pub fn into_cause(self) -> Error {
        *self.cause
    }

    /// The earliest instant the server asked to be retried at.
    pub fn retry_after(&self) -> Option<SystemTime> {
        self.retry_after
    }
}

/// Failure reported by a [`Decoder`](crate::codec::Decoder).
///
/// The variant decides how the invocation surfaces it: I/O failures become
/// [`Error::Reading`], errors already of type [`Error`] pass through as they
/// are, and everything else is wrapped into [`Error::Decode`].
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// Reading the body failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The decoder produced a client error of its own.
    #[error(transparent)]
    Client(#[from] Error),

    /// The body was read but did not deserialize.
    #[error("{source}")]
    Deserialize {
        /// The raw body text
        raw_response: String,
        /// The serde error
        #[source]
        source: serde_json::Error,
    },

    /// Any other decoder fault.
    #[error(transparent)]
    Other(BoxError),
}

impl DecodeError {
    /// Wraps an arbitrary decoder fault.
    pub fn other(error: impl Into<BoxError>) -> Self {
        DecodeError::Other(error.into())
    }
}

/// A specialized `Result` type for client invocations.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
