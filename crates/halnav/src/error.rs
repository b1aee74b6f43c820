//! # Engine Errors
//!
//! This module defines the single error type used throughout the rendering and
//! navigation engine. By centralizing error definitions, we ensure that a failure
//! raised deep inside an upstream fetch keeps its context (status code, failing URI,
//! upstream error document) all the way up to the response that is finally served.
//!
//! ## Taxonomy
//!
//! | Variant | Meaning | Retried? |
//! |---------|---------|----------|
//! | [`HalError::Developer`] | Misuse of the declaration contract | Never |
//! | [`HalError::Client`] | An upstream fetch failed (transport, status, body) | By the caller only |
//! | [`HalError::Server`] | A resource asked for a specific response status | Never |
//! | [`HalError::Resource`] | Any other failure raised by a resource implementation | Never |
//!
//! `HalError` is `Clone` because a single in-flight upstream fetch can be joined by
//! many callers, and every one of them must receive the same failure.

use crate::hal::HalResource;
use std::error::Error as StdError;
use std::sync::Arc;

/// Shared, type-erased cause of a failure.
pub type BoxedCause = Arc<dyn StdError + Send + Sync>;

/// Result alias used by every fallible engine operation.
pub type Result<T> = std::result::Result<T, HalError>;

/// Errors that can occur while rendering resources or navigating remote ones.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HalError {
    /// The declaration contract was violated (ambiguous state accessor, unresolved
    /// template, empty "exactly one" result, ...). Intended to surface during development.
    #[error("Developer error: {0}")]
    Developer(String),

    /// An upstream resource could not be retrieved or understood.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A resource implementation explicitly requested an error response.
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Any other failure raised by a resource implementation.
    #[error("Resource error: {0}")]
    Resource(#[source] BoxedCause),
}

impl HalError {
    pub fn developer(message: impl Into<String>) -> Self {
        HalError::Developer(message.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        HalError::Server {
            status,
            message: message.into(),
        }
    }

    pub fn resource<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        HalError::Resource(Arc::new(error))
    }

    /// Short, stable name of the variant, used in error documents and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            HalError::Developer(_) => "DeveloperError",
            HalError::Client(_) => "ClientError",
            HalError::Server { .. } => "ServerError",
            HalError::Resource(_) => "ResourceError",
        }
    }

    pub fn as_client_error(&self) -> Option<&ClientError> {
        match self {
            HalError::Client(e) => Some(e),
            _ => None,
        }
    }

    /// Attempts to view a [`HalError::Resource`] cause as a concrete error type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            HalError::Resource(cause) => cause.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// An upstream fetch failed.
///
/// Transport failures, non-2xx responses and unparsable bodies are all represented
/// by this one type; they differ only in whether a [`status`](ClientError::status)
/// was received and whether the upstream body was itself an error document.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ClientError {
    message: String,
    uri: String,
    status: Option<u16>,
    upstream_error: Option<HalResource>,
    #[source]
    cause: Option<BoxedCause>,
}

impl ClientError {
    pub fn new(message: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            uri: uri.into(),
            status: None,
            upstream_error: None,
            cause: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_upstream_error(mut self, body: HalResource) -> Self {
        self.upstream_error = Some(body);
        self
    }

    pub fn with_cause(mut self, cause: BoxedCause) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The fully qualified URI of the failed request.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The HTTP status, or `None` if no response was ever received.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The parsed upstream error document, if the upstream body was one.
    pub fn upstream_error(&self) -> Option<&HalResource> {
        self.upstream_error.as_ref()
    }
}
