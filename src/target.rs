//! Targets bind request templates to a concrete destination.

use crate::request::Request;
use crate::template::RequestTemplate;
use crate::{Error, Result};
use url::Url;

/// Binds a finalized [`RequestTemplate`] to an absolute destination.
pub trait Target: Send + Sync {
    /// A name for the remote service, used in logs.
    fn name(&self) -> &str;

    /// The base URL requests are resolved against.
    fn url(&self) -> &Url;

    /// Turns `template` into an immutable [`Request`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the template cannot be bound.
    fn apply(&self, template: RequestTemplate) -> Result<Request>;
}

/// A target with a fixed base URL.
///
/// The template path is appended to the base URL's path, and query parameters
/// are appended in template order. A query written into the template path
/// (`/search?q=rust`) is kept as a query and comes first.
///
/// # Examples
///
/// ```
/// use declient::{HardCodedTarget, RequestTemplate, Target};
/// use http::Method;
///
/// let target = HardCodedTarget::new("users", "https://api.example.com/v1")?;
/// let mut template = RequestTemplate::new(Method::GET, "/users/42");
/// template.query_param("expand", "team");
///
/// let request = target.apply(template)?;
/// assert_eq!(
///     request.url().as_str(),
///     "https://api.example.com/v1/users/42?expand=team"
/// );
/// # Ok::<(), declient::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct HardCodedTarget {
    name: String,
    url: Url,
}

impl HardCodedTarget {
    /// Creates a target named `name` for the base URL `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or cannot carry a path.
    pub fn new(name: impl Into<String>, url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())?;
        if url.cannot_be_a_base() {
            return Err(Error::ConfigurationError(format!(
                "Target URL cannot be a base: {}",
                url
            )));
        }
        Ok(Self {
            name: name.into(),
            url,
        })
    }
}

impl Target for HardCodedTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn apply(&self, template: RequestTemplate) -> Result<Request> {
        let (method, path, query, headers, body) = template.into_parts();

        // A query written into the path goes ahead of the template's pairs.
        let (path, inline_query) = match path.split_once('?') {
            Some((path, inline)) => (path, Some(inline)),
            None => (path.as_str(), None),
        };
        let inline_pairs = inline_query
            .into_iter()
            .flat_map(|inline| url::form_urlencoded::parse(inline.as_bytes()))
            .map(|(key, value)| (key.into_owned(), value.into_owned()));
        let pairs: Vec<(String, String)> = inline_pairs.chain(query).collect();

        let mut url = self.url.clone();
        let base_path = url.path().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let full_path = if path.is_empty() {
            format!("{}/", base_path)
        } else {
            format!("{}/{}", base_path, path)
        };
        url.set_path(&full_path);

        if !pairs.is_empty() {
            let mut serializer = url.query_pairs_mut();
            for (key, value) in &pairs {
                serializer.append_pair(key, value);
            }
        }

        Ok(Request::new(method, url, headers, body))
    }
}
