//! Request interceptors, applied to every attempt's template before binding.

use crate::template::RequestTemplate;
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};

/// Adjusts a [`RequestTemplate`] before it is bound to the target.
///
/// Interceptors run in registration order, once per attempt, each on a fresh
/// copy of the invocation's template. They may add or replace headers, query
/// parameters or the body. Implemented for every
/// `Fn(&mut RequestTemplate)` closure.
///
/// # Examples
///
/// ```
/// use declient::{RequestInterceptor, RequestTemplate};
/// use http::Method;
///
/// let add_page = |template: &mut RequestTemplate| {
///     template.query_param("page", "1");
/// };
///
/// let mut template = RequestTemplate::new(Method::GET, "/users");
/// add_page.apply(&mut template);
/// assert_eq!(template.query().len(), 1);
/// ```
pub trait RequestInterceptor: Send + Sync {
    /// Applies the interceptor to `template`.
    fn apply(&self, template: &mut RequestTemplate);
}

impl<F> RequestInterceptor for F
where
    F: Fn(&mut RequestTemplate) + Send + Sync,
{
    fn apply(&self, template: &mut RequestTemplate) {
        self(template)
    }
}

/// Sets a fixed set of headers on every request.
///
/// Headers already present on the template are replaced.
#[derive(Debug, Clone, Default)]
pub struct HeaderInterceptor {
    headers: HeaderMap,
}

impl HeaderInterceptor {
    /// Creates an interceptor with no headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Returns `true` if no headers were added.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl RequestInterceptor for HeaderInterceptor {
    fn apply(&self, template: &mut RequestTemplate) {
        for (name, value) in &self.headers {
            template.insert_header(name.clone(), value.clone());
        }
    }
}
