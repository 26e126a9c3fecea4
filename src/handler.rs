//! The invocation pipeline behind every client method.
//!
//! A [`MethodHandler`] turns call arguments into a request, sends it, and
//! classifies the response:
//!
//! 1. the template factory builds the invocation's template once; every
//!    attempt clones it, runs the interceptors in order and binds it through
//!    the target;
//! 2. the transport executes the request; a failure here is a send-phase
//!    error and is never retried;
//! 3. a `2xx` response is returned raw, dropped (unit) or decoded according
//!    to the declared return type; any other status goes to the error
//!    decoder; I/O failures while reading become read-phase errors;
//! 4. the response body is closed before the attempt's outcome leaves the
//!    handler;
//! 5. `Error::Retryable` is handed to a per-invocation retryer, which decides
//!    whether the loop runs another attempt.

use crate::codec::{Decoder, ErrorDecoder};
use crate::error::DecodeError;
use crate::interceptor::RequestInterceptor;
use crate::logger::{Level, Logger};
use crate::metadata::{MethodMetadata, ReturnType};
use crate::request::{Options, Request};
use crate::response::{Reply, Response};
use crate::retry::Retryer;
use crate::target::Target;
use crate::template::{RequestTemplate, TemplateFactory};
use crate::transport::Transport;
use crate::{Error, Result};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Collaborators shared by every method of a client.
pub(crate) struct Shared {
    pub(crate) target: Arc<dyn Target>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) retryer: Arc<dyn Retryer>,
    pub(crate) interceptors: Vec<Arc<dyn RequestInterceptor>>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) log_level: Level,
    pub(crate) options: Options,
    pub(crate) error_decoder: Arc<dyn ErrorDecoder>,
}

/// How a single attempt failed inside the response scope.
enum Failure {
    Io(io::Error),
    Client(Error),
}

/// Executes one method of a declarative client.
///
/// Handlers are immutable once built and can be shared between tasks; every
/// invocation allocates its own template copies and retryer.
///
/// # Type Parameters
///
/// * `A` - The call arguments handed to the template factory
/// * `T` - The decoded result type
pub struct MethodHandler<A: ?Sized, T: Send + 'static> {
    shared: Arc<Shared>,
    metadata: MethodMetadata,
    factory: Box<dyn TemplateFactory<A>>,
    decoder: Arc<dyn Decoder<T>>,
}

impl<A, T> MethodHandler<A, T>
where
    A: ?Sized + Sync,
    T: Send + 'static,
{
    pub(crate) fn new(
        shared: Arc<Shared>,
        metadata: MethodMetadata,
        factory: Box<dyn TemplateFactory<A>>,
        decoder: Arc<dyn Decoder<T>>,
    ) -> Self {
        Self {
            shared,
            metadata,
            factory,
            decoder,
        }
    }

    /// The metadata of the method this handler executes.
    pub fn metadata(&self) -> &MethodMetadata {
        &self.metadata
    }

    /// Invokes the method with `args`.
    ///
    /// Retryable failures are repeated for as long as the retryer allows; the
    /// error of the last attempt is returned once it propagates.
    pub async fn invoke(&self, args: &A) -> Result<Reply<T>> {
        let template = self.factory.create(args);
        let mut retryer = self.shared.retryer.fresh();

        loop {
            match self.execute_and_decode(template.clone()).await {
                Err(Error::Retryable(error)) => {
                    retryer.continue_or_propagate(error).await?;
                    if self.logging() {
                        self.shared
                            .logger
                            .log_retry(self.metadata.config_key(), self.shared.log_level);
                    }
                }
                result => return result,
            }
        }
    }

    fn logging(&self) -> bool {
        self.shared.log_level != Level::None
    }

    fn target_request(&self, mut template: RequestTemplate) -> Result<Request> {
        for interceptor in &self.shared.interceptors {
            interceptor.apply(&mut template);
        }
        self.shared.target.apply(template)
    }

    async fn execute_and_decode(&self, template: RequestTemplate) -> Result<Reply<T>> {
        let request = self.target_request(template)?;
        let config_key = self.metadata.config_key();
        let level = self.shared.log_level;

        if self.logging() {
            self.shared.logger.log_request(config_key, level, &request);
        }

        let start = Instant::now();
        let mut response = match self
            .shared
            .transport
            .execute(&request, &self.shared.options)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let elapsed = start.elapsed();
                if self.logging() {
                    self.shared
                        .logger
                        .log_io_error(config_key, level, &e, elapsed);
                }
                return Err(Error::executing(request, e, elapsed));
            }
        };
        let elapsed = start.elapsed();

        let outcome = self.classify(&mut response, elapsed).await;
        response.close();

        outcome.map_err(|failure| match failure {
            Failure::Client(error) => error,
            Failure::Io(e) => {
                let elapsed = start.elapsed();
                if self.logging() {
                    self.shared
                        .logger
                        .log_io_error(config_key, level, &e, elapsed);
                }
                Error::reading(request, response.head(), e, elapsed)
            }
        })
    }

    /// Maps a response onto the declared return type. The caller closes the
    /// body afterwards, whatever the outcome.
    async fn classify(
        &self,
        response: &mut Response,
        elapsed: Duration,
    ) -> std::result::Result<Reply<T>, Failure> {
        let config_key = self.metadata.config_key();

        if self.logging() {
            self.shared
                .logger
                .log_and_rebuffer_response(config_key, self.shared.log_level, response, elapsed)
                .await
                .map_err(Failure::Io)?;
        }

        if !response.is_success() {
            let error = self.shared.error_decoder.decode(config_key, response).await;
            return Err(Failure::Client(error));
        }

        match self.metadata.return_type() {
            ReturnType::Response => {
                if response.body().is_none() {
                    return Ok(Reply::Response(response.take()));
                }
                let detached = response.detach().await.map_err(Failure::Io)?;
                Ok(Reply::Response(detached))
            }
            ReturnType::Unit => Ok(Reply::Empty),
            ReturnType::Decoded(_) => self.decode(response).await,
        }
    }

    async fn decode(&self, response: &mut Response) -> std::result::Result<Reply<T>, Failure> {
        let status = response.status();
        match self.decoder.decode(response, self.metadata.return_type()).await {
            Ok(value) => Ok(Reply::Decoded(value)),
            Err(DecodeError::Io(e)) => Err(Failure::Io(e)),
            Err(DecodeError::Client(error)) => Err(Failure::Client(error)),
            Err(DecodeError::Deserialize {
                raw_response,
                source,
            }) => Err(Failure::Client(Error::Decode {
                status,
                raw_response: Some(raw_response.into_boxed_str()),
                source: Box::new(source),
            })),
            Err(DecodeError::Other(source)) => Err(Failure::Client(Error::Decode {
                status,
                raw_response: None,
                source,
            })),
        }
    }
}

impl<A: ?Sized, T: Send + 'static> std::fmt::Debug for MethodHandler<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodHandler")
            .field("metadata", &self.metadata)
            .field("target", &self.shared.target.name())
            .field("log_level", &self.shared.log_level)
            .finish()
    }
}
