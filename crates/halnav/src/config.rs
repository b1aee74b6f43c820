//! Engine configuration.
//!
//! [`HalApiConfig`] is built once at startup and handed to
//! [`HalApiRuntime::new`](crate::api::HalApiRuntime::new). Every setting has a
//! default, so `HalApiConfig::default()` is a working configuration.
//!
//! ```rust
//! use halnav::config::HalApiConfig;
//! use std::time::Duration;
//!
//! let config = HalApiConfig::default()
//!     .with_render_concurrency(8)
//!     .with_max_age_ceiling(Duration::from_secs(300))
//!     .with_diagnostics_query_param("debugHal");
//!
//! assert_eq!(config.render_concurrency(), 8);
//! assert_eq!(config.content_type(), "application/hal+json");
//! ```

use crate::annotation::{AnnotationSupport, CompositeAnnotationSupport};
use crate::renderer::DEFAULT_CONCURRENCY;
use crate::response::HAL_CONTENT_TYPE;
use crate::status::{CompositeExceptionStrategy, ExceptionStatusAndLoggingStrategy};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DIAGNOSTICS_QUERY_PARAM: &str = "embedDiagnostics";

#[derive(Clone)]
pub struct HalApiConfig {
    content_type: String,
    diagnostics_query_param: String,
    always_embed_diagnostics: bool,
    render_concurrency: usize,
    max_age_ceiling: Option<Duration>,
    default_max_age: Option<Duration>,
    annotation_strategies: Vec<Arc<dyn AnnotationSupport>>,
    exception_strategies: Vec<Arc<dyn ExceptionStatusAndLoggingStrategy>>,
}

impl Default for HalApiConfig {
    fn default() -> Self {
        Self {
            content_type: HAL_CONTENT_TYPE.to_string(),
            diagnostics_query_param: DEFAULT_DIAGNOSTICS_QUERY_PARAM.to_string(),
            always_embed_diagnostics: false,
            render_concurrency: DEFAULT_CONCURRENCY,
            max_age_ceiling: None,
            default_max_age: None,
            annotation_strategies: Vec::new(),
            exception_strategies: Vec::new(),
        }
    }
}

impl HalApiConfig {
    /// Content type of rendered resources whose interface doesn't declare one.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Query parameter that asks for the diagnostics document to be embedded.
    pub fn with_diagnostics_query_param(mut self, name: impl Into<String>) -> Self {
        self.diagnostics_query_param = name.into();
        self
    }

    pub fn with_always_embed_diagnostics(mut self, enabled: bool) -> Self {
        self.always_embed_diagnostics = enabled;
        self
    }

    pub fn with_render_concurrency(mut self, concurrency: usize) -> Self {
        self.render_concurrency = concurrency.max(1);
        self
    }

    /// Upper bound for the max-age of every response.
    pub fn with_max_age_ceiling(mut self, ceiling: Duration) -> Self {
        self.max_age_ceiling = Some(ceiling);
        self
    }

    /// Max-age used when neither upstream responses nor the resource set one.
    pub fn with_default_max_age(mut self, max_age: Duration) -> Self {
        self.default_max_age = Some(max_age);
        self
    }

    /// Adds an annotation strategy, consulted after the built-in vocabulary.
    pub fn with_annotation_support(mut self, strategy: Arc<dyn AnnotationSupport>) -> Self {
        self.annotation_strategies.push(strategy);
        self
    }

    /// Adds an exception strategy, consulted after the built-in one.
    pub fn with_exception_strategy(
        mut self,
        strategy: Arc<dyn ExceptionStatusAndLoggingStrategy>,
    ) -> Self {
        self.exception_strategies.push(strategy);
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn diagnostics_query_param(&self) -> &str {
        &self.diagnostics_query_param
    }

    pub fn always_embed_diagnostics(&self) -> bool {
        self.always_embed_diagnostics
    }

    pub fn render_concurrency(&self) -> usize {
        self.render_concurrency
    }

    pub fn max_age_ceiling(&self) -> Option<Duration> {
        self.max_age_ceiling
    }

    pub fn default_max_age(&self) -> Option<Duration> {
        self.default_max_age
    }

    pub fn annotation_support(&self) -> CompositeAnnotationSupport {
        let mut composite = CompositeAnnotationSupport::with_default_strategies();
        for strategy in &self.annotation_strategies {
            composite.register(strategy.clone());
        }
        composite
    }

    pub fn exception_strategy(&self) -> CompositeExceptionStrategy {
        let mut composite = CompositeExceptionStrategy::with_default_strategies();
        for strategy in &self.exception_strategies {
            composite.register(strategy.clone());
        }
        composite
    }
}

impl std::fmt::Debug for HalApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let annotation_strategies: Vec<_> =
            self.annotation_strategies.iter().map(|s| s.name()).collect();
        let exception_strategies: Vec<_> =
            self.exception_strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("HalApiConfig")
            .field("content_type", &self.content_type)
            .field("diagnostics_query_param", &self.diagnostics_query_param)
            .field("always_embed_diagnostics", &self.always_embed_diagnostics)
            .field("render_concurrency", &self.render_concurrency)
            .field("max_age_ceiling", &self.max_age_ceiling)
            .field("default_max_age", &self.default_max_age)
            .field("annotation_strategies", &annotation_strategies)
            .field("exception_strategies", &exception_strategies)
            .finish()
    }
}
