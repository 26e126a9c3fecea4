//! Declarative clients: shared configuration plus one handler per method.
//!
//! The [`Client`] type holds a [`MethodHandler`] for every registered method,
//! keyed by its config key. Use [`ClientBuilder`] to configure and create
//! clients.

use crate::codec::{Decoder, DefaultErrorDecoder, ErrorDecoder};
use crate::handler::{MethodHandler, Shared};
use crate::interceptor::{HeaderInterceptor, RequestInterceptor};
use crate::logger::{Level, Logger, TracingLogger};
use crate::metadata::MethodMetadata;
use crate::request::Options;
use crate::response::Reply;
use crate::retry::{BackoffRetryer, RetryStrategy, Retryer};
use crate::target::{HardCodedTarget, Target};
use crate::template::TemplateFactory;
use crate::transport::{ReqwestTransport, Transport};
use crate::{Error, Result};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

type AnyHandler = Arc<dyn Any + Send + Sync>;
type Registration = Box<dyn FnOnce(Arc<Shared>) -> AnyHandler + Send>;

/// A declarative HTTP client.
///
/// The client is designed to be built once and shared; cloning is cheap and
/// every clone uses the same handlers.
///
/// # Examples
///
/// ```no_run
/// use declient::metadata::{MethodMetadata, ReturnType};
/// use declient::{Client, JsonDecoder, RequestTemplate, RetryStrategy};
/// use http::Method;
/// use serde::Deserialize;
/// use std::time::Duration;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), declient::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .read_timeout(Duration::from_secs(30))
///     .retry_strategy(RetryStrategy::ExponentialBackoff {
///         initial_delay: Duration::from_millis(100),
///         max_delay: Duration::from_secs(10),
///         max_retries: 3,
///         jitter: true,
///     })
///     .method::<u64, User>(
///         MethodMetadata::new("Api#getUser", ReturnType::decoded::<User>()),
///         |id: &u64| RequestTemplate::new(Method::GET, format!("/users/{id}")),
///         JsonDecoder,
///     )
///     .build()?;
///
/// let user = client
///     .invoke::<u64, User>("Api#getUser", &42)
///     .await?
///     .into_decoded();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    shared: Arc<Shared>,
    handlers: HashMap<String, AnyHandler>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the handler registered under `config_key`.
    ///
    /// Returns `None` if no method has that key, or if it was registered with
    /// different argument or result types.
    pub fn handler<A, T>(&self, config_key: &str) -> Option<Arc<MethodHandler<A, T>>>
    where
        A: ?Sized + Sync + 'static,
        T: Send + 'static,
    {
        self.inner
            .handlers
            .get(config_key)?
            .clone()
            .downcast::<MethodHandler<A, T>>()
            .ok()
    }

    /// Invokes the method registered under `config_key` with `args`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no such method was registered with
    /// these types, otherwise whatever the invocation returns.
    pub async fn invoke<A, T>(&self, config_key: &str, args: &A) -> Result<Reply<T>>
    where
        A: ?Sized + Sync + 'static,
        T: Send + 'static,
    {
        let handler = self.handler::<A, T>(config_key).ok_or_else(|| {
            Error::ConfigurationError(format!(
                "No method registered for {} with the requested types",
                config_key
            ))
        })?;
        handler.invoke(args).await
    }

    /// The config keys of all registered methods.
    pub fn config_keys(&self) -> impl Iterator<Item = &str> {
        self.inner.handlers.keys().map(String::as_str)
    }

    /// The target every method is bound to.
    pub fn target(&self) -> &dyn Target {
        self.inner.shared.target.as_ref()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("target", &self.inner.shared.target.url().as_str())
            .field("methods", &self.inner.handlers.len())
            .field("log_level", &self.inner.shared.log_level)
            .field("options", &self.inner.shared.options)
            .finish()
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// Defaults: a [`ReqwestTransport`] built from the options, a
/// [`BackoffRetryer`] with its default strategy, the [`DefaultErrorDecoder`],
/// the [`TracingLogger`] at [`Level::None`].
///
/// # Examples
///
/// ```no_run
/// use declient::{ClientBuilder, Level, RetryStrategy};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), declient::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .connect_timeout(Duration::from_secs(5))
///     .read_timeout(Duration::from_secs(30))
///     .retry_strategy(RetryStrategy::Linear {
///         delay: Duration::from_millis(500),
///         max_retries: 3,
///     })
///     .default_header("User-Agent", "my-app/1.0")?
///     .log_level(Level::Basic)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    target: Option<Arc<dyn Target>>,
    transport: Option<Arc<dyn Transport>>,
    retryer: Arc<dyn Retryer>,
    default_headers: HeaderInterceptor,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    logger: Arc<dyn Logger>,
    log_level: Level,
    options: Options,
    error_decoder: Arc<dyn ErrorDecoder>,
    methods: Vec<(String, Registration)>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            target: None,
            transport: None,
            retryer: Arc::new(BackoffRetryer::default()),
            default_headers: HeaderInterceptor::new(),
            interceptors: Vec::new(),
            logger: Arc::new(TracingLogger),
            log_level: Level::None,
            options: Options::default(),
            error_decoder: Arc::new(DefaultErrorDecoder::new()),
            methods: Vec::new(),
        }
    }

    /// Targets a fixed base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();
        let name = url::Url::parse(url)?
            .host_str()
            .unwrap_or_default()
            .to_string();
        self.target = Some(Arc::new(HardCodedTarget::new(name, url)?));
        Ok(self)
    }

    /// Sets the target requests are bound to.
    pub fn target(mut self, target: impl Target + 'static) -> Self {
        self.target = Some(Arc::new(target));
        self
    }

    /// Sets the transport. Defaults to a [`ReqwestTransport`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets all transport options at once.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_connect_timeout(timeout);
        self
    }

    /// Sets the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_read_timeout(timeout);
        self
    }

    /// Sets whether redirects are followed.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.options = self.options.with_follow_redirects(follow);
        self
    }

    /// Sets the retryer. Each invocation works on a fresh copy of it.
    pub fn retryer(mut self, retryer: impl Retryer + 'static) -> Self {
        self.retryer = Arc::new(retryer);
        self
    }

    /// Retries with a [`BackoffRetryer`] following `strategy`.
    pub fn retry_strategy(self, strategy: RetryStrategy) -> Self {
        self.retryer(BackoffRetryer::new(strategy))
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// Default headers are applied before any registered interceptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        self.default_headers = self.default_headers.header(name, value)?;
        Ok(self)
    }

    /// Appends a request interceptor. Interceptors run in registration order.
    pub fn interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Sets the logger.
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Sets the log level. [`Level::None`] disables every logging hook.
    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    /// Sets the decoder for responses with a status outside `200..300`.
    pub fn error_decoder(mut self, error_decoder: impl ErrorDecoder + 'static) -> Self {
        self.error_decoder = Arc::new(error_decoder);
        self
    }

    /// Registers a method.
    ///
    /// `factory` builds the request template from the call arguments and
    /// `decoder` turns successful responses into `T`.
    pub fn method<A, T>(
        mut self,
        metadata: MethodMetadata,
        factory: impl TemplateFactory<A> + 'static,
        decoder: impl Decoder<T> + 'static,
    ) -> Self
    where
        A: ?Sized + Sync + 'static,
        T: Send + 'static,
    {
        let config_key = metadata.config_key().to_string();
        let factory: Box<dyn TemplateFactory<A>> = Box::new(factory);
        let decoder: Arc<dyn Decoder<T>> = Arc::new(decoder);
        let registration: Registration = Box::new(move |shared: Arc<Shared>| -> AnyHandler {
            Arc::new(MethodHandler::new(shared, metadata, factory, decoder))
        });
        self.methods.push((config_key, registration));
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no target was provided, if two methods share a
    /// config key, or if the default transport cannot be built.
    pub fn build(self) -> Result<Client> {
        let target = self
            .target
            .ok_or_else(|| Error::ConfigurationError("Target is required".to_string()))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.options)?),
        };

        let mut interceptors: Vec<Arc<dyn RequestInterceptor>> = Vec::new();
        if !self.default_headers.is_empty() {
            interceptors.push(Arc::new(self.default_headers));
        }
        interceptors.extend(self.interceptors);

        let shared = Arc::new(Shared {
            target,
            transport,
            retryer: self.retryer,
            interceptors,
            logger: self.logger,
            log_level: self.log_level,
            options: self.options,
            error_decoder: self.error_decoder,
        });

        let mut handlers = HashMap::with_capacity(self.methods.len());
        for (config_key, register) in self.methods {
            if handlers.contains_key(&config_key) {
                return Err(Error::ConfigurationError(format!(
                    "Method registered twice: {}",
                    config_key
                )));
            }
            handlers.insert(config_key, register(shared.clone()));
        }

        tracing::debug!(
            target_url = %shared.target.url(),
            methods = handlers.len(),
            log_level = ?shared.log_level,
            "Built declarative client"
        );

        Ok(Client {
            inner: Arc::new(ClientInner { shared, handlers }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
