//! Level-gated logging hooks for invocations.

use crate::request::Request;
use crate::response::Response;
use crate::Error;
use async_trait::async_trait;
use http::HeaderMap;
use std::io;
use std::str::FromStr;
use std::time::Duration;

/// How much of each exchange is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    /// No logging.
    #[default]
    None,
    /// Request method and URL, response status and timing.
    Basic,
    /// Everything in `Basic`, plus request and response headers.
    Headers,
    /// Everything in `Headers`, plus request and response bodies.
    Full,
}

impl FromStr for Level {
    type Err = Error;

    /// Parses a level name, ignoring case.
    ///
    /// # Examples
    ///
    /// ```
    /// use declient::Level;
    ///
    /// assert_eq!("full".parse::<Level>().unwrap(), Level::Full);
    /// assert!("verbose".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Level::None),
            "basic" => Ok(Level::Basic),
            "headers" => Ok(Level::Headers),
            "full" => Ok(Level::Full),
            other => Err(Error::ConfigurationError(format!(
                "Unknown log level: {}",
                other
            ))),
        }
    }
}

/// Observability hooks called by the invocation pipeline.
///
/// The pipeline never calls a hook when the configured level is
/// [`Level::None`]. Hooks must not change the outcome of a call; the only
/// permitted side effect is replacing a response body with an equivalent
/// buffered copy in [`log_and_rebuffer_response`](Self::log_and_rebuffer_response).
#[async_trait]
pub trait Logger: Send + Sync {
    /// Called before the request is sent.
    fn log_request(&self, config_key: &str, level: Level, request: &Request);

    /// Called once a response was received, before it is classified.
    ///
    /// Implementations that inspect the body must buffer it first, so the
    /// decoder still sees the full content.
    async fn log_and_rebuffer_response(
        &self,
        config_key: &str,
        level: Level,
        response: &mut Response,
        elapsed: Duration,
    ) -> io::Result<()>;

    /// Called when sending the request or reading the response failed.
    fn log_io_error(&self, config_key: &str, level: Level, error: &io::Error, elapsed: Duration);

    /// Called when the retryer granted another attempt.
    fn log_retry(&self, config_key: &str, level: Level);
}

/// A [`Logger`] that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

fn format_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Logger for TracingLogger {
    fn log_request(&self, config_key: &str, level: Level, request: &Request) {
        match level {
            Level::None => {}
            Level::Basic => tracing::debug!(
                config_key = %config_key,
                method = %request.method(),
                url = %request.url(),
                "---> Executing HTTP request"
            ),
            Level::Headers => tracing::debug!(
                config_key = %config_key,
                method = %request.method(),
                url = %request.url(),
                headers = %format_headers(request.headers()),
                "---> Executing HTTP request"
            ),
            Level::Full => {
                let body = request
                    .body()
                    .map(|body| String::from_utf8_lossy(body).into_owned())
                    .unwrap_or_default();
                tracing::debug!(
                    config_key = %config_key,
                    method = %request.method(),
                    url = %request.url(),
                    headers = %format_headers(request.headers()),
                    body_bytes = request.body().map_or(0, |b| b.len()),
                    body = %body,
                    "---> Executing HTTP request"
                );
            }
        }
    }

    async fn log_and_rebuffer_response(
        &self,
        config_key: &str,
        level: Level,
        response: &mut Response,
        elapsed: Duration,
    ) -> io::Result<()> {
        let status = response.status().as_u16();
        let elapsed_ms = elapsed.as_millis();
        match level {
            Level::None => {}
            Level::Basic => tracing::info!(
                config_key = %config_key,
                status = status,
                elapsed_ms = elapsed_ms,
                "<--- Received HTTP response"
            ),
            Level::Headers => tracing::info!(
                config_key = %config_key,
                status = status,
                elapsed_ms = elapsed_ms,
                headers = %format_headers(response.headers()),
                "<--- Received HTTP response"
            ),
            Level::Full => {
                let body = match response.body_mut() {
                    Some(body) => {
                        body.buffer().await?;
                        body.text().await?
                    }
                    None => String::new(),
                };
                tracing::info!(
                    config_key = %config_key,
                    status = status,
                    elapsed_ms = elapsed_ms,
                    headers = %format_headers(response.headers()),
                    body_bytes = body.len(),
                    body = %body,
                    "<--- Received HTTP response"
                );
            }
        }
        Ok(())
    }

    fn log_io_error(&self, config_key: &str, level: Level, error: &io::Error, elapsed: Duration) {
        if level == Level::None {
            return;
        }
        tracing::warn!(
            config_key = %config_key,
            error = %error,
            io_kind = ?error.kind(),
            elapsed_ms = elapsed.as_millis(),
            "<--- ERROR during HTTP exchange"
        );
    }

    fn log_retry(&self, config_key: &str, level: Level) {
        if level == Level::None {
            return;
        }
        tracing::info!(config_key = %config_key, "---> RETRYING");
    }
}
