//! # Declient - declarative HTTP clients
//!
//! Declient executes the methods of a declarative HTTP client. Each method is
//! described once, by a config key, a template factory that turns call
//! arguments into a request template, and a decoder for its result; the
//! library takes care of everything between the call and the value:
//! interceptors, binding to a target, sending, retrying, classifying the
//! response and releasing it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use declient::metadata::{MethodMetadata, ReturnType};
//! use declient::{Client, JsonDecoder, RequestTemplate, RetryStrategy};
//! use http::Method;
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), declient::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .read_timeout(Duration::from_secs(30))
//!         .retry_strategy(RetryStrategy::ExponentialBackoff {
//!             initial_delay: Duration::from_millis(100),
//!             max_delay: Duration::from_secs(10),
//!             max_retries: 3,
//!             jitter: true,
//!         })
//!         .method::<u64, User>(
//!             MethodMetadata::new("Users#get", ReturnType::decoded::<User>()),
//!             |id: &u64| RequestTemplate::new(Method::GET, format!("/users/{id}")),
//!             JsonDecoder,
//!         )
//!         .method::<CreateUser, ()>(
//!             MethodMetadata::new("Users#create", ReturnType::Unit),
//!             |user: &CreateUser| {
//!                 let mut template = RequestTemplate::new(Method::POST, "/users");
//!                 template.json_body(user).expect("serializable");
//!                 template
//!             },
//!             JsonDecoder,
//!         )
//!         .build()?;
//!
//!     let user = client.invoke::<u64, User>("Users#get", &123).await?;
//!     if let Some(user) = user.into_decoded() {
//!         println!("User {}: {}", user.id, user.name);
//!     }
//!
//!     let created = CreateUser {
//!         name: "Alice".to_string(),
//!     };
//!     client
//!         .invoke::<CreateUser, ()>("Users#create", &created)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every failure tells you in which phase it happened:
//!
//! ```no_run
//! use declient::{Client, Error, ErrorKind};
//!
//! # async fn example(client: Client) {
//! match client.invoke::<u64, serde_json::Value>("Users#get", &7).await {
//!     Ok(reply) => println!("Success: {:?}", reply.into_decoded()),
//!     Err(e) => match e.kind() {
//!         ErrorKind::Send => eprintln!("Request never got a response: {}", e),
//!         ErrorKind::Read => eprintln!("Response could not be read: {}", e),
//!         ErrorKind::Status => eprintln!("HTTP {:?}: {:?}", e.status(), e.raw_response()),
//!         ErrorKind::Decode => eprintln!("Bad payload: {:?}", e.raw_response()),
//!         _ => eprintln!("Other error: {}", e),
//!     },
//! }
//! # }
//! ```
//!
//! ## Retries
//!
//! Responses the [`ErrorDecoder`] marks as retryable are handed to the
//! client's [`Retryer`]. Send failures are never retried.
//!
//! ```no_run
//! use declient::{Client, DefaultErrorDecoder, RetryStrategy};
//! use http::StatusCode;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), declient::Error> {
//! let client = Client::builder()
//!     .base_url("https://api.example.com")?
//!     .retry_strategy(RetryStrategy::ExponentialBackoff {
//!         initial_delay: Duration::from_millis(100),
//!         max_delay: Duration::from_secs(30),
//!         max_retries: 5,
//!         jitter: true,
//!     })
//!     .error_decoder(
//!         DefaultErrorDecoder::new()
//!             .retry_on_status(StatusCode::SERVICE_UNAVAILABLE)
//!             .retry_on_status(StatusCode::BAD_GATEWAY),
//!     )
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod codec;
mod error;
mod handler;
mod interceptor;
mod logger;
pub mod metadata;
mod request;
mod response;
pub mod retry;
pub mod retry_after;
mod target;
mod template;
mod transport;

pub use client::{Client, ClientBuilder};
pub use codec::{Decoder, DefaultDecoder, DefaultErrorDecoder, ErrorDecoder, JsonDecoder};
pub use error::{DecodeError, Error, ErrorKind, ResponseHead, Result, RetryableError};
pub use handler::MethodHandler;
pub use interceptor::{HeaderInterceptor, RequestInterceptor};
pub use logger::{Level, Logger, TracingLogger};
pub use metadata::{MethodMetadata, ReturnType};
pub use request::{Options, Request};
pub use response::{Body, BodyStream, Reply, Response};
pub use retry::{BackoffRetryer, NeverRetry, RetryStrategy, Retryer};
pub use target::{HardCodedTarget, Target};
pub use template::{RequestTemplate, TemplateFactory};
pub use transport::{ReqwestTransport, Transport};
