//! Invocation pipeline tests against a scripted in-memory transport.
//!
//! The transport counts how often response bodies are closed, so every test
//! can check that each attempt releases its body exactly once.

use async_trait::async_trait;
use bytes::Bytes;
use declient::{
    Body, BodyStream, Client, DecodeError, Decoder, DefaultDecoder, DefaultErrorDecoder, Error,
    ErrorDecoder, ErrorKind, JsonDecoder, Level, Logger, MethodMetadata, NeverRetry, Options,
    Request, RequestTemplate, Response, RetryStrategy, ReturnType, TracingLogger,
    Transport,
};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde::Deserialize;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const GET_USER: &str = "Api#getUser";

enum Step {
    Respond {
        status: u16,
        headers: Vec<(&'static str, &'static str)>,
        body: Option<&'static str>,
    },
    BrokenBody {
        status: u16,
    },
    Fail(io::ErrorKind),
}

fn respond(status: u16, body: &'static str) -> Step {
    Step::Respond {
        status,
        headers: Vec::new(),
        body: Some(body),
    }
}

struct CountingStream {
    data: Option<io::Result<Bytes>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl BodyStream for CountingStream {
    async fn read_to_end(&mut self) -> io::Result<Bytes> {
        self.data
            .take()
            .unwrap_or_else(|| Err(io::Error::other("stream drained")))
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct ScriptState {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<Request>>,
    closes: Arc<AtomicUsize>,
}

#[derive(Clone, Default)]
struct ScriptedTransport {
    state: Arc<ScriptState>,
}

impl ScriptedTransport {
    fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        let transport = Self::default();
        transport.state.steps.lock().unwrap().extend(steps);
        transport
    }

    fn calls(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<Request> {
        self.state.requests.lock().unwrap().clone()
    }

    fn stream(&self, data: io::Result<Bytes>) -> CountingStream {
        CountingStream {
            data: Some(data),
            closes: self.state.closes.clone(),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &Request, _options: &Options) -> io::Result<Response> {
        self.state.requests.lock().unwrap().push(request.clone());
        let step = self
            .state
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("script exhausted");

        match step {
            Step::Fail(kind) => Err(io::Error::new(kind, "scripted failure")),
            Step::Respond {
                status,
                headers,
                body,
            } => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.insert(name, HeaderValue::from_static(value));
                }
                let mut response =
                    Response::new(StatusCode::from_u16(status).unwrap()).with_headers(map);
                if let Some(body) = body {
                    let stream = self.stream(Ok(Bytes::from_static(body.as_bytes())));
                    response = response.with_body(Body::from_stream(stream, Some(body.len() as u64)));
                }
                Ok(response)
            }
            Step::BrokenBody { status } => {
                let stream = self.stream(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset mid-body",
                )));
                Ok(Response::new(StatusCode::from_u16(status).unwrap())
                    .with_body(Body::from_stream(stream, None)))
            }
        }
    }
}

#[derive(Clone, Default)]
struct CountingDecoder {
    calls: Arc<AtomicUsize>,
}

impl CountingDecoder {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Decoder<String> for CountingDecoder {
    async fn decode(
        &self,
        response: &mut Response,
        _return_type: &ReturnType,
    ) -> Result<String, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(response.text().await?)
    }
}

struct FailingDecoder;

#[async_trait]
impl Decoder<String> for FailingDecoder {
    async fn decode(
        &self,
        response: &mut Response,
        _return_type: &ReturnType,
    ) -> Result<String, DecodeError> {
        let _ = response.bytes().await?;
        Err(DecodeError::other("unsupported payload"))
    }
}

#[derive(Clone)]
struct CountingErrorDecoder {
    calls: Arc<AtomicUsize>,
    inner: DefaultErrorDecoder,
}

impl CountingErrorDecoder {
    fn new(inner: DefaultErrorDecoder) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            inner,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ErrorDecoder for CountingErrorDecoder {
    async fn decode(&self, config_key: &str, response: &mut Response) -> Error {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(config_key, response).await
    }
}

#[derive(Clone, Default)]
struct CountingLogger {
    requests: Arc<AtomicUsize>,
    responses: Arc<AtomicUsize>,
    io_errors: Arc<AtomicUsize>,
    retries: Arc<AtomicUsize>,
}

impl CountingLogger {
    fn counts(&self) -> [usize; 4] {
        [
            self.requests.load(Ordering::SeqCst),
            self.responses.load(Ordering::SeqCst),
            self.io_errors.load(Ordering::SeqCst),
            self.retries.load(Ordering::SeqCst),
        ]
    }
}

#[async_trait]
impl Logger for CountingLogger {
    fn log_request(&self, config_key: &str, level: Level, request: &Request) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        TracingLogger.log_request(config_key, level, request);
    }

    async fn log_and_rebuffer_response(
        &self,
        config_key: &str,
        level: Level,
        response: &mut Response,
        elapsed: Duration,
    ) -> io::Result<()> {
        self.responses.fetch_add(1, Ordering::SeqCst);
        TracingLogger
            .log_and_rebuffer_response(config_key, level, response, elapsed)
            .await
    }

    fn log_io_error(&self, config_key: &str, level: Level, error: &io::Error, elapsed: Duration) {
        self.io_errors.fetch_add(1, Ordering::SeqCst);
        TracingLogger.log_io_error(config_key, level, error, elapsed);
    }

    fn log_retry(&self, config_key: &str, level: Level) {
        self.retries.fetch_add(1, Ordering::SeqCst);
        TracingLogger.log_retry(config_key, level);
    }
}

fn get_user() -> RequestTemplate {
    RequestTemplate::new(Method::GET, "/users/42")
}

fn quick_retries(max_retries: usize) -> RetryStrategy {
    RetryStrategy::Linear {
        delay: Duration::from_millis(1),
        max_retries,
    }
}

fn client_with(
    transport: &ScriptedTransport,
    return_type: ReturnType,
    decoder: impl Decoder<String> + 'static,
) -> Client {
    Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .retryer(NeverRetry)
        .method::<(), String>(
            MethodMetadata::new(GET_USER, return_type),
            |_: &()| get_user(),
            decoder,
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_decoded_result_closes_body_once() {
    let transport = ScriptedTransport::new([respond(200, "Ada")]);
    let decoder = CountingDecoder::default();
    let client = client_with(&transport, ReturnType::decoded::<String>(), decoder.clone());

    let reply = client.invoke::<(), String>(GET_USER, &()).await.unwrap();

    assert_eq!(reply.into_decoded().as_deref(), Some("Ada"));
    assert_eq!(decoder.calls(), 1);
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.closes(), 1);
}

#[tokio::test]
async fn test_unit_return_never_decodes() {
    let transport = ScriptedTransport::new([respond(200, "ignored")]);
    let decoder = CountingDecoder::default();
    let client = client_with(&transport, ReturnType::Unit, decoder.clone());

    let reply = client.invoke::<(), String>(GET_USER, &()).await.unwrap();

    assert!(reply.is_empty());
    assert_eq!(decoder.calls(), 0);
    assert_eq!(transport.closes(), 1);
}

#[tokio::test]
async fn test_raw_response_is_buffered_and_rereadable() {
    let transport = ScriptedTransport::new([Step::Respond {
        status: 200,
        headers: vec![("x-request-id", "abc")],
        body: Some("raw payload"),
    }]);
    let decoder = CountingDecoder::default();
    let client = client_with(&transport, ReturnType::Response, decoder.clone());

    let reply = client.invoke::<(), String>(GET_USER, &()).await.unwrap();
    let mut response = reply.into_response().unwrap();

    assert_eq!(transport.closes(), 1);
    assert_eq!(decoder.calls(), 0);
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.header("x-request-id"), Some("abc"));
    assert!(response.body().unwrap().is_repeatable());
    assert_eq!(response.text().await.unwrap(), "raw payload");
    assert_eq!(response.text().await.unwrap(), "raw payload");
}

#[tokio::test]
async fn test_raw_response_without_body() {
    let transport = ScriptedTransport::new([Step::Respond {
        status: 204,
        headers: Vec::new(),
        body: None,
    }]);
    let client = client_with(&transport, ReturnType::Response, DefaultDecoder);

    let response = client
        .invoke::<(), String>(GET_USER, &())
        .await
        .unwrap()
        .into_response()
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.body().is_none());
}

#[tokio::test]
async fn test_error_status_goes_to_error_decoder_only() {
    let transport = ScriptedTransport::new([respond(404, "no such user")]);
    let decoder = CountingDecoder::default();
    let error_decoder = CountingErrorDecoder::new(DefaultErrorDecoder::new());
    let client = Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .error_decoder(error_decoder.clone())
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::decoded::<String>()),
            |_: &()| get_user(),
            decoder.clone(),
        )
        .build()
        .unwrap();

    let err = client.invoke::<(), String>(GET_USER, &()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Status);
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.raw_response(), Some("no such user"));
    match &err {
        Error::Status { config_key, .. } => assert_eq!(config_key, GET_USER),
        other => panic!("Expected Status, got {:?}", other),
    }
    assert_eq!(decoder.calls(), 0);
    assert_eq!(error_decoder.calls(), 1);
    assert_eq!(transport.closes(), 1);
}

#[tokio::test]
async fn test_decoder_failure_closes_body() {
    let transport = ScriptedTransport::new([respond(200, "<html/>")]);
    let client = client_with(&transport, ReturnType::decoded::<String>(), FailingDecoder);

    let err = client.invoke::<(), String>(GET_USER, &()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(err.status(), Some(StatusCode::OK));
    assert!(err.to_string().contains("unsupported payload"));
    assert_eq!(transport.closes(), 1);
}

#[tokio::test]
async fn test_json_decode_failure_keeps_raw_body() {
    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct User {
        id: u64,
    }

    let transport = ScriptedTransport::new([respond(200, "not json")]);
    let client = Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .method::<(), User>(
            MethodMetadata::new(GET_USER, ReturnType::decoded::<User>()),
            |_: &()| get_user(),
            JsonDecoder,
        )
        .build()
        .unwrap();

    let err = client.invoke::<(), User>(GET_USER, &()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(err.raw_response(), Some("not json"));
    assert_eq!(transport.closes(), 1);
}

#[tokio::test]
async fn test_send_failure_is_never_retried() {
    let transport = ScriptedTransport::new([Step::Fail(io::ErrorKind::ConnectionRefused)]);
    let decoder = CountingDecoder::default();
    let error_decoder = CountingErrorDecoder::new(DefaultErrorDecoder::new());
    let client = Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .retry_strategy(quick_retries(3))
        .error_decoder(error_decoder.clone())
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::decoded::<String>()),
            |_: &()| get_user(),
            decoder.clone(),
        )
        .build()
        .unwrap();

    let err = client.invoke::<(), String>(GET_USER, &()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Send);
    assert!(!err.is_retryable());
    match &err {
        Error::Executing { request, source, .. } => {
            assert_eq!(source.kind(), io::ErrorKind::ConnectionRefused);
            assert_eq!(request.url().as_str(), "http://scripted.test/users/42");
        }
        other => panic!("Expected Executing, got {:?}", other),
    }
    assert_eq!(transport.calls(), 1);
    assert_eq!(decoder.calls(), 0);
    assert_eq!(error_decoder.calls(), 0);
}

#[tokio::test]
async fn test_read_failure_is_read_phase_and_closes_body() {
    let transport = ScriptedTransport::new([Step::BrokenBody { status: 200 }]);
    let client = Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .retry_strategy(quick_retries(3))
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::decoded::<String>()),
            |_: &()| get_user(),
            DefaultDecoder,
        )
        .build()
        .unwrap();

    let err = client.invoke::<(), String>(GET_USER, &()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Read);
    assert_eq!(err.status(), Some(StatusCode::OK));
    match &err {
        Error::Reading { source, .. } => {
            assert_eq!(source.kind(), io::ErrorKind::ConnectionReset)
        }
        other => panic!("Expected Reading, got {:?}", other),
    }
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.closes(), 1);
}

#[tokio::test]
async fn test_retries_are_bounded_and_last_error_surfaces() {
    let transport = ScriptedTransport::new([
        respond(503, "first"),
        respond(503, "second"),
        respond(503, "third"),
    ]);
    let client = Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .retry_strategy(quick_retries(2))
        .error_decoder(DefaultErrorDecoder::new().retry_on_status(StatusCode::SERVICE_UNAVAILABLE))
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::decoded::<String>()),
            |_: &()| get_user(),
            DefaultDecoder,
        )
        .build()
        .unwrap();

    let err = client.invoke::<(), String>(GET_USER, &()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Retryable);
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(err.raw_response(), Some("third"));
    assert_eq!(transport.calls(), 3);
    assert_eq!(transport.closes(), 3);
}

#[tokio::test]
async fn test_retry_then_success() {
    let transport = ScriptedTransport::new([respond(503, "busy"), respond(200, "Ada")]);
    let client = Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .retry_strategy(quick_retries(2))
        .error_decoder(DefaultErrorDecoder::new().retry_on_status(StatusCode::SERVICE_UNAVAILABLE))
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::decoded::<String>()),
            |_: &()| get_user(),
            DefaultDecoder,
        )
        .build()
        .unwrap();

    let reply = client.invoke::<(), String>(GET_USER, &()).await.unwrap();

    assert_eq!(reply.into_decoded().as_deref(), Some("Ada"));
    assert_eq!(transport.calls(), 2);
    assert_eq!(transport.closes(), 2);
}

#[tokio::test]
async fn test_each_invocation_gets_a_fresh_retryer() {
    let transport = ScriptedTransport::new([
        respond(503, "busy"),
        respond(200, "one"),
        respond(503, "busy"),
        respond(200, "two"),
    ]);
    let client = Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .retry_strategy(quick_retries(1))
        .error_decoder(DefaultErrorDecoder::new().retry_on_status(StatusCode::SERVICE_UNAVAILABLE))
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::decoded::<String>()),
            |_: &()| get_user(),
            DefaultDecoder,
        )
        .build()
        .unwrap();

    let first = client.invoke::<(), String>(GET_USER, &()).await.unwrap();
    let second = client.invoke::<(), String>(GET_USER, &()).await.unwrap();

    assert_eq!(first.into_decoded().as_deref(), Some("one"));
    assert_eq!(second.into_decoded().as_deref(), Some("two"));
    assert_eq!(transport.calls(), 4);
}

#[tokio::test]
async fn test_interceptors_run_in_order_on_every_attempt() {
    let transport = ScriptedTransport::new([respond(503, "busy"), respond(200, "ok")]);
    let client = Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .retry_strategy(quick_retries(1))
        .error_decoder(DefaultErrorDecoder::new().retry_on_status(StatusCode::SERVICE_UNAVAILABLE))
        .default_header("authorization", "Bearer token")
        .unwrap()
        .interceptor(|template: &mut RequestTemplate| {
            template.append_header("x-order", "first").unwrap();
        })
        .interceptor(|template: &mut RequestTemplate| {
            template.append_header("x-order", "second").unwrap();
            template.query_param("trace", "on");
        })
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::decoded::<String>()),
            |_: &()| get_user(),
            DefaultDecoder,
        )
        .build()
        .unwrap();

    client.invoke::<(), String>(GET_USER, &()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        let order: Vec<_> = request
            .headers()
            .get_all("x-order")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(order, vec!["first", "second"]);
        assert_eq!(request.header("authorization"), Some("Bearer token"));
        assert_eq!(request.url().as_str(), "http://scripted.test/users/42?trace=on");
    }
}

#[tokio::test]
async fn test_template_factory_sees_arguments() {
    let transport = ScriptedTransport::new([respond(200, "deleted")]);
    let client = Client::builder()
        .base_url("http://scripted.test/api")
        .unwrap()
        .transport(transport.clone())
        .method::<u64, String>(
            MethodMetadata::new("Api#deleteUser", ReturnType::decoded::<String>()),
            |id: &u64| RequestTemplate::new(Method::DELETE, format!("/users/{id}")),
            DefaultDecoder,
        )
        .build()
        .unwrap();

    client
        .invoke::<u64, String>("Api#deleteUser", &7)
        .await
        .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(*request.method(), Method::DELETE);
    assert_eq!(request.url().as_str(), "http://scripted.test/api/users/7");
}

#[tokio::test]
async fn test_full_logging_does_not_change_outcome() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("declient=debug")
        .with_test_writer()
        .try_init();

    let transport = ScriptedTransport::new([respond(200, "Ada")]);
    let decoder = CountingDecoder::default();
    let client = Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .log_level(Level::Full)
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::decoded::<String>()),
            |_: &()| get_user(),
            decoder.clone(),
        )
        .build()
        .unwrap();

    let reply = client.invoke::<(), String>(GET_USER, &()).await.unwrap();

    assert_eq!(reply.into_decoded().as_deref(), Some("Ada"));
    assert_eq!(decoder.calls(), 1);
    assert_eq!(transport.closes(), 1);
}

fn retrying_client(
    transport: &ScriptedTransport,
    logger: &CountingLogger,
    level: Level,
) -> Client {
    Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .retry_strategy(quick_retries(2))
        .error_decoder(DefaultErrorDecoder::new().retry_on_status(StatusCode::SERVICE_UNAVAILABLE))
        .logger(logger.clone())
        .log_level(level)
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::decoded::<String>()),
            |_: &()| get_user(),
            DefaultDecoder,
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_level_none_never_calls_logger() {
    let transport = ScriptedTransport::new([
        respond(503, "busy"),
        Step::Fail(io::ErrorKind::ConnectionRefused),
    ]);
    let logger = CountingLogger::default();
    let client = retrying_client(&transport, &logger, Level::None);

    let err = client.invoke::<(), String>(GET_USER, &()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Send);
    assert_eq!(transport.calls(), 2);
    assert_eq!(logger.counts(), [0, 0, 0, 0]);
}

#[tokio::test]
async fn test_log_retry_once_per_granted_retry() {
    let transport = ScriptedTransport::new([
        respond(503, "first"),
        respond(503, "second"),
        respond(503, "third"),
    ]);
    let logger = CountingLogger::default();
    let client = retrying_client(&transport, &logger, Level::Basic);

    let err = client.invoke::<(), String>(GET_USER, &()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Retryable);
    assert_eq!(transport.calls(), 3);
    // requests, responses, io errors, retries
    assert_eq!(logger.counts(), [3, 3, 0, 2]);
}

#[tokio::test]
async fn test_broken_body_on_raw_response_is_read_phase() {
    let transport = ScriptedTransport::new([Step::BrokenBody { status: 200 }]);
    let decoder = CountingDecoder::default();
    let client = client_with(&transport, ReturnType::Response, decoder.clone());

    let err = client.invoke::<(), String>(GET_USER, &()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Read);
    assert_eq!(err.status(), Some(StatusCode::OK));
    assert_eq!(decoder.calls(), 0);
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.closes(), 1);
}

#[tokio::test]
async fn test_broken_body_while_full_logging_is_read_phase() {
    let transport = ScriptedTransport::new([Step::BrokenBody { status: 200 }]);
    let decoder = CountingDecoder::default();
    let logger = CountingLogger::default();
    let client = Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(transport.clone())
        .retry_strategy(quick_retries(3))
        .logger(logger.clone())
        .log_level(Level::Full)
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::decoded::<String>()),
            |_: &()| get_user(),
            decoder.clone(),
        )
        .build()
        .unwrap();

    let err = client.invoke::<(), String>(GET_USER, &()).await.unwrap_err();

    match &err {
        Error::Reading { source, .. } => {
            assert_eq!(source.kind(), io::ErrorKind::ConnectionReset)
        }
        other => panic!("Expected Reading, got {:?}", other),
    }
    assert_eq!(decoder.calls(), 0);
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.closes(), 1);
    assert_eq!(logger.counts(), [1, 1, 1, 0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invocations_share_one_client() {
    const CALLS: usize = 8;
    let transport = ScriptedTransport::new((0..CALLS).map(|_| respond(200, "Ada")));
    let decoder = CountingDecoder::default();
    let client = client_with(&transport, ReturnType::decoded::<String>(), decoder.clone());

    let tasks: Vec<_> = (0..CALLS)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.invoke::<(), String>(GET_USER, &()).await })
        })
        .collect();

    for task in tasks {
        let reply = task.await.unwrap().unwrap();
        assert_eq!(reply.into_decoded().as_deref(), Some("Ada"));
    }
    assert_eq!(decoder.calls(), CALLS);
    assert_eq!(transport.calls(), CALLS);
    assert_eq!(transport.closes(), CALLS);
}

#[tokio::test]
async fn test_handler_lookup_checks_types() {
    let transport = ScriptedTransport::new([respond(200, "Ada")]);
    let client = client_with(&transport, ReturnType::decoded::<String>(), DefaultDecoder);

    let handler = client.handler::<(), String>(GET_USER).unwrap();
    assert_eq!(handler.metadata().config_key(), GET_USER);
    assert!(client.handler::<u64, String>(GET_USER).is_none());
    assert!(client.handler::<(), String>("Api#missing").is_none());

    let reply = handler.invoke(&()).await.unwrap();
    assert_eq!(reply.map(|name| name.len()).into_decoded(), Some(3));

    let err = client
        .invoke::<(), String>("Api#missing", &())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(transport.calls(), 1);
}

#[test]
fn test_builder_rejects_missing_target_and_duplicate_keys() {
    let err = Client::builder()
        .transport(ScriptedTransport::default())
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = Client::builder()
        .base_url("http://scripted.test")
        .unwrap()
        .transport(ScriptedTransport::default())
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::Unit),
            |_: &()| get_user(),
            DefaultDecoder,
        )
        .method::<(), String>(
            MethodMetadata::new(GET_USER, ReturnType::Unit),
            |_: &()| get_user(),
            DefaultDecoder,
        )
        .build()
        .unwrap_err();
    assert!(err.to_string().contains(GET_USER));
}
