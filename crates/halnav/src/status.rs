//! # Exception & Status Strategy
//!
//! Decides which HTTP status a failure maps to and whether it is routine enough to
//! be logged as a single line. Strategies are composable: the built-in
//! [`DefaultExceptionStrategy`] knows the engine's own client and server errors,
//! and integrations register more (for example one that recognizes their own
//! "not found" error) through
//! [`HalApiConfig::with_exception_strategy`](crate::config::HalApiConfig::with_exception_strategy).
//!
//! The first strategy returning `Some` wins. A failure no strategy recognizes maps
//! to `500 Internal Server Error` and is logged in full.

use crate::error::HalError;
use std::sync::Arc;

/// Maps failures to response status codes and logging verbosity.
pub trait ExceptionStatusAndLoggingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// The status code for this failure, or `None` if the strategy doesn't know it.
    fn extract_status_code(&self, error: &HalError) -> Option<u16>;

    /// `Some(true)` if the failure is expected enough to be logged without details.
    fn is_compact_logging(&self, _error: &HalError) -> Option<bool> {
        None
    }
}

/// Recognizes [`HalError::Client`] and [`HalError::Server`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExceptionStrategy;

impl ExceptionStatusAndLoggingStrategy for DefaultExceptionStrategy {
    fn name(&self) -> &'static str {
        "default"
    }

    fn extract_status_code(&self, error: &HalError) -> Option<u16> {
        match error {
            HalError::Client(client) => client.status(),
            HalError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn is_compact_logging(&self, error: &HalError) -> Option<bool> {
        match error {
            HalError::Client(client) if client.status().is_some() => Some(true),
            HalError::Server { status, .. } if *status < 500 => Some(true),
            _ => None,
        }
    }
}

/// Tries strategies in registration order.
#[derive(Clone, Default)]
pub struct CompositeExceptionStrategy {
    strategies: Vec<Arc<dyn ExceptionStatusAndLoggingStrategy>>,
}

impl CompositeExceptionStrategy {
    pub const FALLBACK_STATUS: u16 = 500;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_strategies() -> Self {
        let mut composite = Self::new();
        composite.register(Arc::new(DefaultExceptionStrategy));
        composite
    }

    pub fn register(&mut self, strategy: Arc<dyn ExceptionStatusAndLoggingStrategy>) {
        self.strategies.push(strategy);
    }

    /// The mapped status, falling back to `500`.
    pub fn status_code(&self, error: &HalError) -> u16 {
        self.extract_status_code(error)
            .unwrap_or(Self::FALLBACK_STATUS)
    }

    pub fn compact_logging(&self, error: &HalError) -> bool {
        self.is_compact_logging(error).unwrap_or(false)
    }
}

impl ExceptionStatusAndLoggingStrategy for CompositeExceptionStrategy {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn extract_status_code(&self, error: &HalError) -> Option<u16> {
        self.strategies
            .iter()
            .find_map(|s| s.extract_status_code(error))
    }

    fn is_compact_logging(&self, error: &HalError) -> Option<bool> {
        self.strategies
            .iter()
            .find_map(|s| s.is_compact_logging(error))
    }
}
