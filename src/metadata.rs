//! Identity and declared result of a client method.

use std::borrow::Cow;

/// What a method declares as its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    /// The raw [`Response`](crate::Response), buffered in memory.
    Response,
    /// No result; the body is never decoded.
    Unit,
    /// A value produced by the method's [`Decoder`](crate::codec::Decoder).
    Decoded(Cow<'static, str>),
}

impl ReturnType {
    /// A decoded result named after the Rust type `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use declient::metadata::ReturnType;
    ///
    /// assert_eq!(
    ///     ReturnType::decoded::<String>(),
    ///     ReturnType::Decoded("alloc::string::String".into())
    /// );
    /// ```
    pub fn decoded<T: ?Sized>() -> Self {
        ReturnType::Decoded(Cow::Borrowed(std::any::type_name::<T>()))
    }
}

impl std::fmt::Display for ReturnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnType::Response => f.write_str("Response"),
            ReturnType::Unit => f.write_str("()"),
            ReturnType::Decoded(name) => f.write_str(name),
        }
    }
}

/// Metadata identifying a method of a declarative client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMetadata {
    config_key: String,
    return_type: ReturnType,
}

impl MethodMetadata {
    /// Creates metadata for the method identified by `config_key`,
    /// conventionally `"Interface#method"`.
    pub fn new(config_key: impl Into<String>, return_type: ReturnType) -> Self {
        Self {
            config_key: config_key.into(),
            return_type,
        }
    }

    /// The stable identifier used for decoder routing and logging.
    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    /// The declared result.
    pub fn return_type(&self) -> &ReturnType {
        &self.return_type
    }
}
