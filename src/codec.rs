//! Decoders for successful responses and error decoders for everything else.

use crate::error::{DecodeError, RetryableError};
use crate::metadata::ReturnType;
use crate::response::Response;
use crate::retry_after::RetryHint;
use crate::Error;
use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use serde::de::DeserializeOwned;
use std::time::SystemTime;

/// Turns the body of a `2xx` response into a value of type `T`.
///
/// The invocation owns the response and closes it after `decode` returns, so
/// decoders only read from it. Report read failures as
/// [`DecodeError::Io`]; they surface as read-phase errors.
#[async_trait]
pub trait Decoder<T: Send + 'static>: Send + Sync {
    /// Decodes `response` into the declared `return_type`.
    async fn decode(
        &self,
        response: &mut Response,
        return_type: &ReturnType,
    ) -> Result<T, DecodeError>;
}

/// Decodes JSON bodies with `serde_json`.
///
/// The raw body is kept in the error when deserialization fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

#[async_trait]
impl<T> Decoder<T> for JsonDecoder
where
    T: DeserializeOwned + Send + 'static,
{
    async fn decode(
        &self,
        response: &mut Response,
        _return_type: &ReturnType,
    ) -> Result<T, DecodeError> {
        let raw_response = response.text().await?;
        serde_json::from_str(&raw_response).map_err(|source| {
            tracing::error!(
                error = %source,
                raw_response = %raw_response,
                "Failed to deserialize response"
            );
            DecodeError::Deserialize {
                raw_response,
                source,
            }
        })
    }
}

/// Decodes bodies as text or raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDecoder;

#[async_trait]
impl Decoder<String> for DefaultDecoder {
    async fn decode(
        &self,
        response: &mut Response,
        _return_type: &ReturnType,
    ) -> Result<String, DecodeError> {
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Decoder<Bytes> for DefaultDecoder {
    async fn decode(
        &self,
        response: &mut Response,
        _return_type: &ReturnType,
    ) -> Result<Bytes, DecodeError> {
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl Decoder<Vec<u8>> for DefaultDecoder {
    async fn decode(
        &self,
        response: &mut Response,
        _return_type: &ReturnType,
    ) -> Result<Vec<u8>, DecodeError> {
        Ok(response.bytes().await?.to_vec())
    }
}

/// Turns a response with a status outside `200..300` into an [`Error`].
///
/// Returning [`Error::Retryable`] asks the invocation to try again.
#[async_trait]
pub trait ErrorDecoder: Send + Sync {
    /// Builds the error for `response`, returned by the method `config_key`.
    async fn decode(&self, config_key: &str, response: &mut Response) -> Error;
}

/// The standard error decoder.
///
/// Produces [`Error::Status`] with the body text. The error is wrapped as
/// retryable when the response carries a retry hint (`Retry-After`, or an
/// exhausted rate limit with a reset time) or when its status was registered
/// with [`retry_on_status`](Self::retry_on_status).
///
/// # Examples
///
/// ```
/// use declient::DefaultErrorDecoder;
/// use http::StatusCode;
///
/// let decoder = DefaultErrorDecoder::new()
///     .retry_on_status(StatusCode::SERVICE_UNAVAILABLE)
///     .retry_on_status(StatusCode::BAD_GATEWAY);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultErrorDecoder {
    retry_statuses: Vec<StatusCode>,
}

impl DefaultErrorDecoder {
    /// Creates a decoder that only retries on server retry hints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also treats `status` as retryable.
    pub fn retry_on_status(mut self, status: StatusCode) -> Self {
        if !self.retry_statuses.contains(&status) {
            self.retry_statuses.push(status);
        }
        self
    }
}

#[async_trait]
impl ErrorDecoder for DefaultErrorDecoder {
    async fn decode(&self, config_key: &str, response: &mut Response) -> Error {
        let status = response.status();
        let body = match response.text().await {
            Ok(text) if !text.is_empty() => Some(text.into_boxed_str()),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    status = status.as_u16(),
                    "Could not read error response body"
                );
                None
            }
        };

        let hint = RetryHint::from_headers(response.headers());
        let error = Error::Status {
            config_key: config_key.to_string(),
            status,
            reason: response.reason().map(str::to_string),
            headers: Box::new(response.headers().clone()),
            body,
        };

        if hint.is_present() || self.retry_statuses.contains(&status) {
            RetryableError::new(error, hint.retry_at(SystemTime::now())).into()
        } else {
            error
        }
    }
}
