//! Transports execute immutable requests.
//!
//! [`ReqwestTransport`] is the default, backed by pooled `reqwest::Client`s.

use crate::request::{Options, Request};
use crate::response::{Body, BodyStream, Response};
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Sends a [`Request`] and returns the [`Response`].
///
/// Transport failures are reported as `io::Error`; the invocation turns them
/// into send-phase errors. Implementations must honour the [`Options`] of
/// each call and must not hold on to the request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes `request` with the given options.
    async fn execute(&self, request: &Request, options: &Options) -> io::Result<Response>;
}

/// The settings fixed when a `reqwest::Client` is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PoolKey {
    connect_timeout: Duration,
    follow_redirects: bool,
}

impl From<&Options> for PoolKey {
    fn from(options: &Options) -> Self {
        Self {
            connect_timeout: options.connect_timeout(),
            follow_redirects: options.follow_redirects(),
        }
    }
}

/// A [`Transport`] backed by `reqwest`.
///
/// Connect timeout and redirect policy are fixed per `reqwest::Client`, so the
/// transport keeps one pooled client for every combination it is asked for
/// and picks it from the [`Options`] of each call. The read timeout is applied
/// per request. Clones share the same clients.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    clients: Arc<Mutex<HashMap<PoolKey, reqwest::Client>>>,
}

impl ReqwestTransport {
    /// Builds a transport, creating the client for `options` up front.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(options: &Options) -> Result<Self> {
        let transport = Self::default();
        transport.client_for(options).map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(transport)
    }

    fn client_for(&self, options: &Options) -> std::result::Result<reqwest::Client, reqwest::Error> {
        let key = PoolKey::from(options);
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let redirect = if key.follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };
        let client = reqwest::Client::builder()
            .connect_timeout(key.connect_timeout)
            .redirect(redirect)
            .build()?;

        tracing::debug!(
            connect_timeout_ms = key.connect_timeout.as_millis(),
            follow_redirects = key.follow_redirects,
            "Built HTTP client"
        );
        clients.insert(key, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &Request, options: &Options) -> io::Result<Response> {
        let http_client = self.client_for(options).map_err(io::Error::other)?;

        let mut builder = http_client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone())
            .timeout(options.read_timeout());

        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(into_io_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let length = response.content_length();

        tracing::debug!(
            status = status.as_u16(),
            content_length = ?length,
            url = %request.url(),
            "Transport received response"
        );

        let mut result = Response::new(status).with_headers(headers);
        if length != Some(0) {
            result = result.with_body(Body::from_stream(
                ReqwestBody {
                    response: Some(response),
                },
                length,
            ));
        }
        Ok(result)
    }
}

struct ReqwestBody {
    response: Option<reqwest::Response>,
}

#[async_trait]
impl BodyStream for ReqwestBody {
    async fn read_to_end(&mut self) -> io::Result<Bytes> {
        let response = self
            .response
            .take()
            .ok_or_else(|| io::Error::other("response body already consumed"))?;
        response.bytes().await.map_err(into_io_error)
    }

    fn close(&mut self) {
        self.response = None;
    }
}

fn into_io_error(error: reqwest::Error) -> io::Error {
    if error.is_timeout() {
        io::Error::new(io::ErrorKind::TimedOut, error)
    } else {
        io::Error::other(error)
    }
}
