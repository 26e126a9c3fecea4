//! Example demonstrating custom retryers and error decoders.
//!
//! This example shows how to:
//! - Mark responses as retryable from an error decoder
//! - Implement a retryer with its own policy
//! - Compare it with the built-in backoff strategies
//!
//! Run with: `cargo run --example custom_retry`

use async_trait::async_trait;
use declient::{
    Client, DefaultDecoder, DefaultErrorDecoder, Error, ErrorDecoder, MethodMetadata,
    RequestTemplate, Response, RetryStrategy, RetryableError, Retryer, ReturnType,
};
use http::{Method, StatusCode};
use std::time::{Duration, Instant, SystemTime};

/// Retries until a deadline, waiting a fixed pause between attempts.
struct DeadlineRetryer {
    budget: Duration,
    pause: Duration,
    started: Instant,
}

impl DeadlineRetryer {
    fn new(budget: Duration, pause: Duration) -> Self {
        Self {
            budget,
            pause,
            started: Instant::now(),
        }
    }
}

#[async_trait]
impl Retryer for DeadlineRetryer {
    async fn continue_or_propagate(&mut self, error: RetryableError) -> declient::Result<()> {
        if self.started.elapsed() + self.pause > self.budget {
            return Err(error.into());
        }
        println!("  retrying after {:?} ({})", self.pause, error.cause());
        tokio::time::sleep(self.pause).await;
        Ok(())
    }

    fn fresh(&self) -> Box<dyn Retryer> {
        Box::new(DeadlineRetryer::new(self.budget, self.pause))
    }
}

/// Treats any body mentioning "try again" as a transient failure.
struct MessageErrorDecoder {
    fallback: DefaultErrorDecoder,
}

#[async_trait]
impl ErrorDecoder for MessageErrorDecoder {
    async fn decode(&self, config_key: &str, response: &mut Response) -> Error {
        let error = self.fallback.decode(config_key, response).await;
        let transient = error
            .raw_response()
            .is_some_and(|body| body.to_ascii_lowercase().contains("try again"));
        if transient && !error.is_retryable() {
            RetryableError::new(error, Some(SystemTime::now() + Duration::from_millis(200))).into()
        } else {
            error
        }
    }
}

fn status_method(builder: declient::ClientBuilder) -> declient::ClientBuilder {
    builder.method::<u16, String>(
        MethodMetadata::new("HttpBin#status", ReturnType::decoded::<String>()),
        |code: &u16| RequestTemplate::new(Method::GET, format!("/status/{code}")),
        DefaultDecoder,
    )
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("declient=info,custom_retry=info")
        .init();

    println!("=== Example 1: Deadline-based retryer ===");
    let client = status_method(
        Client::builder()
            .base_url("https://httpbin.org")?
            .retryer(DeadlineRetryer::new(
                Duration::from_secs(3),
                Duration::from_millis(500),
            ))
            .error_decoder(
                DefaultErrorDecoder::new().retry_on_status(StatusCode::SERVICE_UNAVAILABLE),
            ),
    )
    .build()?;

    let start = Instant::now();
    match client.invoke::<u16, String>("HttpBin#status", &503).await {
        Ok(_) => println!("Unexpected success"),
        Err(e) => println!("Gave up after {:?}: {}", start.elapsed(), e),
    }
    println!();

    println!("=== Example 2: Exponential backoff with jitter ===");
    let client = status_method(
        Client::builder()
            .base_url("https://httpbin.org")?
            .retry_strategy(RetryStrategy::ExponentialBackoff {
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(2),
                max_retries: 3,
                jitter: true,
            })
            .error_decoder(
                DefaultErrorDecoder::new()
                    .retry_on_status(StatusCode::BAD_GATEWAY)
                    .retry_on_status(StatusCode::SERVICE_UNAVAILABLE),
            ),
    )
    .build()?;

    match client.invoke::<u16, String>("HttpBin#status", &502).await {
        Ok(_) => println!("Unexpected success"),
        Err(e) => println!("Failed with {:?} after retries: {}", e.status(), e),
    }
    println!();

    println!("=== Example 3: Error decoder deciding from the body ===");
    let client = status_method(
        Client::builder()
            .base_url("https://httpbin.org")?
            .retry_strategy(RetryStrategy::Linear {
                delay: Duration::from_millis(250),
                max_retries: 2,
            })
            .error_decoder(MessageErrorDecoder {
                fallback: DefaultErrorDecoder::new(),
            }),
    )
    .build()?;

    match client.invoke::<u16, String>("HttpBin#status", &500).await {
        Ok(_) => println!("Unexpected success"),
        Err(e) => println!("Failed ({}): {}", e.kind(), e),
    }

    Ok(())
}
