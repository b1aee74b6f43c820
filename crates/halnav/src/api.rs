//! # Runtime & Request Scopes
//!
//! The engine has two lifetimes:
//!
//! | Scope | Type | Owns |
//! |-------|------|------|
//! | Process | [`HalApiRuntime`] | configuration, memoized [`TypeRegistry`], error renderer |
//! | Request | [`HalApi`] | [`RequestMetricsCollector`], document cache, proxy factory, renderer |
//!
//! Nothing mutable is shared between requests: every call to
//! [`HalApiRuntime::request`] creates a fresh metrics collector and a fresh fetch
//! cache, and both are dropped with the `HalApi`.
//!
//! ## Request Flow
//!
//! ```rust,ignore
//! let runtime = HalApiRuntime::new(HalApiConfig::default());
//!
//! // per incoming request
//! let api = runtime.request("http://gateway.local/summary?embedDiagnostics", client);
//! let upstream: CatalogProxy = api.remote("http://catalog.local/")?;
//! let response = api.render_response(SummaryResource::new(upstream)).await;
//! ```
//!
//! `render_response` never fails: errors are turned into `application/vnd.error+json`
//! documents with the status chosen by the exception strategies.

use crate::client::{CachingResourceLoader, HttpClient, ProxyFactory, RemoteResource};
use crate::config::HalApiConfig;
use crate::descriptor::TypeRegistry;
use crate::error::{HalError, Result};
use crate::metrics::RequestMetricsCollector;
use crate::renderer::AsyncResourceRenderer;
use crate::resource::IntoResource;
use crate::response::{HalResponse, VndErrorResponseRenderer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use url::Url;

/// Relation under which the diagnostics document is embedded.
pub const DIAGNOSTICS_RELATION: &str = "halnav:diagnostics";

/// Process-wide engine state.
pub struct HalApiRuntime {
    config: Arc<HalApiConfig>,
    registry: Arc<TypeRegistry>,
    errors: VndErrorResponseRenderer,
}

impl HalApiRuntime {
    pub fn new(config: HalApiConfig) -> Self {
        let registry = Arc::new(TypeRegistry::new(Arc::new(config.annotation_support())));
        let errors = VndErrorResponseRenderer::new(config.exception_strategy());
        Self {
            config: Arc::new(config),
            registry,
            errors,
        }
    }

    pub fn config(&self) -> &HalApiConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Opens the scope of one incoming request.
    pub fn request(&self, request_uri: &str, client: Arc<dyn HttpClient>) -> HalApi {
        let metrics = Arc::new(RequestMetricsCollector::new());
        if let Some(ceiling) = self.config.max_age_ceiling() {
            metrics.set_response_max_age(ceiling);
        }
        let loader = Arc::new(CachingResourceLoader::new(client, metrics.clone()));
        let renderer = AsyncResourceRenderer::new(self.registry.clone(), metrics.clone())
            .with_concurrency(self.config.render_concurrency());

        HalApi {
            request_uri: request_uri.to_string(),
            config: self.config.clone(),
            registry: self.registry.clone(),
            metrics,
            proxies: ProxyFactory::new(self.registry.clone(), loader),
            renderer,
            errors: self.errors.clone(),
        }
    }
}

/// Per-request façade over the renderer and the navigation proxies.
pub struct HalApi {
    request_uri: String,
    config: Arc<HalApiConfig>,
    registry: Arc<TypeRegistry>,
    metrics: Arc<RequestMetricsCollector>,
    proxies: ProxyFactory,
    renderer: AsyncResourceRenderer,
    errors: VndErrorResponseRenderer,
}

impl HalApi {
    pub fn request_uri(&self) -> &str {
        &self.request_uri
    }

    /// A navigation proxy for an upstream resource, sharing this request's fetch cache.
    pub fn remote<P: RemoteResource>(&self, uri: &str) -> Result<P> {
        self.proxies.create_proxy(uri)
    }

    pub fn proxy_factory(&self) -> &ProxyFactory {
        &self.proxies
    }

    pub fn metrics(&self) -> &Arc<RequestMetricsCollector> {
        &self.metrics
    }

    /// Lowers the max-age of this request's response.
    pub fn set_response_max_age(&self, max_age: Duration) {
        self.metrics.set_response_max_age(max_age);
    }

    /// Whether the request asked for the diagnostics document.
    pub fn diagnostics_requested(&self) -> bool {
        if self.config.always_embed_diagnostics() {
            return true;
        }
        let flag = self.config.diagnostics_query_param();
        let query = match Url::parse(&self.request_uri) {
            Ok(url) => url.query().map(str::to_string),
            Err(_) => self
                .request_uri
                .split_once('?')
                .map(|(_, query)| query.to_string()),
        };
        query.is_some_and(|query| {
            url::form_urlencoded::parse(query.as_bytes()).any(|(name, value)| {
                name == flag && !matches!(&*value, "false" | "0")
            })
        })
    }

    /// Renders a resource, failing if any part of it fails.
    #[tracing::instrument(name = "render", skip_all, fields(uri = %self.request_uri))]
    pub async fn render<R: IntoResource + Send>(&self, resource: R) -> Result<HalResponse> {
        let started = Instant::now();
        let resource = resource.into_resource();
        let descriptor = self.registry.describe_implementation(&resource.interfaces())?;
        let content_type = descriptor
            .content_type()
            .unwrap_or(self.config.content_type())
            .to_string();

        let mut body = self.renderer.render(resource).await?;
        if self.diagnostics_requested() {
            let diagnostics = self.metrics.create_diagnostics_document(&body);
            body.add_embedded(DIAGNOSTICS_RELATION, diagnostics);
        }

        let max_age = self
            .metrics
            .response_max_age()
            .or_else(|| self.config.default_max_age().map(|d| d.as_secs()));
        info!(
            status = 200,
            ?max_age,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered resource"
        );
        Ok(HalResponse::new(200, content_type, body).with_max_age(max_age))
    }

    /// Renders a resource, turning any failure into an error document.
    pub async fn render_response<R: IntoResource + Send>(&self, resource: R) -> HalResponse {
        match self.render(resource).await {
            Ok(response) => response,
            Err(e) => self.render_error(&e),
        }
    }

    pub fn render_error(&self, error: &HalError) -> HalResponse {
        self.errors.render_error(&self.request_uri, error)
    }
}
