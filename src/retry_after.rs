//! Retry hints carried by response headers.
//!
//! Servers signal when a failed call may be repeated through `Retry-After`
//! (seconds or an HTTP date) or through rate limit reset headers. The default
//! error decoder uses these hints to mark a failure as retryable.

use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Retry information extracted from response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryHint {
    /// How long to wait before retrying (from `Retry-After`).
    pub retry_after: Option<Duration>,

    /// When the rate limit resets (from `X-RateLimit-Reset` or `RateLimit-Reset`).
    pub reset_at: Option<SystemTime>,

    /// Number of requests remaining in the current window.
    pub remaining: Option<u64>,
}

impl RetryHint {
    /// Extracts retry information from response headers.
    ///
    /// # Examples
    ///
    /// ```
    /// use declient::retry_after::RetryHint;
    /// use http::HeaderMap;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("retry-after", "60".parse().unwrap());
    ///
    /// let hint = RetryHint::from_headers(&headers);
    /// assert!(hint.is_present());
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            retry_after: parse_retry_after(headers),
            reset_at: parse_rate_limit_reset(headers),
            remaining: parse_rate_limit_remaining(headers),
        }
    }

    /// Returns `true` if the server asked for a retry.
    ///
    /// That is the case when `Retry-After` is present, or when the rate limit
    /// is exhausted and a reset time is known.
    pub fn is_present(&self) -> bool {
        self.retry_after.is_some() || (self.remaining == Some(0) && self.reset_at.is_some())
    }

    /// The instant, relative to `now`, at which a retry may be attempted.
    pub fn retry_at(&self, now: SystemTime) -> Option<SystemTime> {
        if let Some(retry_after) = self.retry_after {
            return Some(now + retry_after);
        }
        if self.remaining == Some(0) {
            return self.reset_at;
        }
        None
    }
}

/// Parses the Retry-After header.
///
/// Supports both delay-seconds (integer) and HTTP-date formats.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date_time = httpdate::parse_http_date(header).ok()?;
    Some(
        date_time
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO),
    )
}

/// Parses X-RateLimit-Reset or RateLimit-Reset headers (Unix timestamp).
fn parse_rate_limit_reset(headers: &HeaderMap) -> Option<SystemTime> {
    ["x-ratelimit-reset", "ratelimit-reset"]
        .iter()
        .filter_map(|name| headers.get(*name)?.to_str().ok()?.trim().parse::<u64>().ok())
        .map(|timestamp| UNIX_EPOCH + Duration::from_secs(timestamp))
        .next()
}

fn parse_rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("x-ratelimit-remaining")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
