//! Request templates: the mutable shape of a request before it is bound to a target.

use crate::Error;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

/// A request that has not been bound to a destination yet.
///
/// Templates are produced from call arguments by a [`TemplateFactory`],
/// adjusted by [`RequestInterceptor`](crate::RequestInterceptor)s and finally
/// turned into an immutable [`Request`](crate::Request) by a
/// [`Target`](crate::Target). Every attempt of an invocation works on its own
/// clone.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl RequestTemplate {
    /// Creates a new `RequestTemplate` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path, relative to the target's base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters, in insertion order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// The headers set so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The body, if one was set.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Sets a header, replacing any previous values for the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(
        &mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<&mut Self, Error> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Appends a header value, keeping existing values for the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn append_header(
        &mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<&mut Self, Error> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Sets an already validated header.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a query parameter.
    pub fn query_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Replaces every value of the query parameter `key` with `value`.
    pub fn set_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        self.query.retain(|(k, _)| *k != key);
        self.query.push((key, value.into()));
        self
    }

    /// Sets the raw body.
    pub fn body_bytes(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `body` as JSON and sets the matching content type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `body` cannot be serialized.
    pub fn json_body<B: Serialize + ?Sized>(&mut self, body: &B) -> Result<&mut Self, Error> {
        let json = serde_json::to_vec(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(json));
        Ok(self)
    }

    pub(crate) fn into_parts(self) -> (Method, String, Vec<(String, String)>, HeaderMap, Option<Bytes>) {
        (self.method, self.path, self.query, self.headers, self.body)
    }
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let name = HeaderName::try_from(name)
        .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
    Ok((name, value))
}

/// Builds a fresh [`RequestTemplate`] from the arguments of a call.
///
/// Implemented for every `Fn(&A) -> RequestTemplate` closure.
///
/// # Examples
///
/// ```
/// use declient::{RequestTemplate, TemplateFactory};
/// use http::Method;
///
/// let factory = |id: &u64| RequestTemplate::new(Method::GET, format!("/users/{id}"));
/// assert_eq!(factory.create(&42).path(), "/users/42");
/// ```
pub trait TemplateFactory<A: ?Sized>: Send + Sync {
    /// Creates the template for one invocation.
    fn create(&self, args: &A) -> RequestTemplate;
}

impl<A: ?Sized, F> TemplateFactory<A> for F
where
    F: Fn(&A) -> RequestTemplate + Send + Sync,
{
    fn create(&self, args: &A) -> RequestTemplate {
        self(args)
    }
}
