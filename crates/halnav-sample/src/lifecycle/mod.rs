//! # Service Wiring & Request Handling
//!
//! Two HAL services run in one process:
//!
//! | Service | Base URI | Renders |
//! |---------|----------|---------|
//! | [`CatalogService`] | `http://catalog.local` | catalog, products, search results |
//! | [`GatewayService`] | `http://gateway.local` | summary, proxied products and searches |
//!
//! The gateway reaches the catalog through an [`InProcessClient`], an
//! [`HttpClient`] that hands the request to the catalog service and converts its
//! [`HalResponse`](halnav::HalResponse) into the HTTP response a real transport
//! would have returned. Swapping it for a network client changes nothing else.
//!
//! ## The CatalogSystem Pattern
//!
//! [`CatalogSystem`] is the orchestrator: it builds both runtimes once, wires the
//! gateway to the catalog and then serves requests.
//!
//! ```rust,ignore
//! let system = CatalogSystem::new(products);
//! let response = system.gateway().handle("http://gateway.local/summary").await;
//! assert_eq!(response.status(), 200);
//! ```
//!
//! Every request gets its own [`HalApi`](halnav::HalApi) scope from the runtime, so
//! caches and metrics never leak between requests.

use crate::catalog::{CatalogResource, ProductListResource, ProductResource, ProductStore};
use crate::clients::CatalogClient;
use crate::error::{CatalogError, CatalogExceptionStrategy};
use crate::gateway::SummaryResource;
use crate::model::{Product, ProductQuery};
use async_trait::async_trait;
use halnav::client::{FetchResponse, HttpClient, RemoteResource, TransportError};
use halnav::{HalApi, HalApiConfig, HalApiRuntime, HalError, HalResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const CATALOG_BASE: &str = "http://catalog.local";
pub const GATEWAY_BASE: &str = "http://gateway.local";

/// Max-age of catalog documents.
const CATALOG_MAX_AGE: Duration = Duration::from_secs(60);
/// Max-age of single product documents, whose stock changes more often.
const PRODUCT_MAX_AGE: Duration = Duration::from_secs(30);

fn route(uri: &str) -> Result<(String, Vec<(String, String)>), CatalogError> {
    let url = Url::parse(uri).map_err(|_| CatalogError::UnknownPath(uri.to_string()))?;
    let query = url.query_pairs().into_owned().collect();
    Ok((url.path().to_string(), query))
}

fn product_query(pairs: &[(String, String)]) -> ProductQuery {
    let value = |name: &str| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    };
    ProductQuery {
        q: value("q"),
        max_price: value("maxPrice").and_then(|v| v.parse().ok()),
    }
}

fn product_id(segment: &str) -> Result<u32, CatalogError> {
    segment
        .parse()
        .map_err(|_| CatalogError::InvalidProductId(segment.to_string()))
}

/// The upstream catalog service.
pub struct CatalogService {
    runtime: HalApiRuntime,
    store: ProductStore,
    embed_products: bool,
}

impl CatalogService {
    pub fn new(store: ProductStore) -> Self {
        let config = HalApiConfig::default()
            .with_default_max_age(CATALOG_MAX_AGE)
            .with_exception_strategy(Arc::new(CatalogExceptionStrategy));
        Self {
            runtime: HalApiRuntime::new(config),
            store,
            embed_products: false,
        }
    }

    /// Embeds the product documents in the catalog entry point.
    pub fn with_embedded_products(mut self, embed: bool) -> Self {
        self.embed_products = embed;
        self
    }

    /// Handles a GET request. The catalog has no upstream services of its own.
    #[instrument(name = "catalog", skip(self))]
    pub async fn handle(&self, uri: &str) -> HalResponse {
        let api = self.runtime.request(uri, Arc::new(NoUpstream));
        match self.dispatch(&api).await {
            Ok(response) => response,
            Err(e) => api.render_error(&e),
        }
    }

    async fn dispatch(&self, api: &HalApi) -> Result<HalResponse, HalError> {
        let (path, query) = route(api.request_uri())?;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => {
                let catalog = CatalogResource::new(self.store.clone())
                    .with_embedded_products(self.embed_products);
                api.render(catalog).await
            }
            ["products"] => {
                let list = ProductListResource::new(self.store.clone(), product_query(&query));
                api.render(list).await
            }
            ["products", id] => {
                let product = self.store.get(product_id(id)?)?;
                api.set_response_max_age(PRODUCT_MAX_AGE);
                api.render(ProductResource::new(product, self.store.clone())).await
            }
            _ => Err(CatalogError::UnknownPath(path.clone()).into()),
        }
    }
}

/// Transport for services without upstream dependencies.
struct NoUpstream;

#[async_trait]
impl HttpClient for NoUpstream {
    async fn fetch(&self, uri: &str) -> Result<FetchResponse, TransportError> {
        Err(format!("no upstream route to {uri}").into())
    }
}

/// Routes requests for [`CATALOG_BASE`] to an in-process [`CatalogService`].
#[derive(Clone)]
pub struct InProcessClient {
    catalog: Arc<CatalogService>,
    latency: Duration,
}

impl InProcessClient {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self {
            catalog,
            latency: Duration::ZERO,
        }
    }

    /// Simulated network latency per request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl HttpClient for InProcessClient {
    async fn fetch(&self, uri: &str) -> Result<FetchResponse, TransportError> {
        if !uri.starts_with(CATALOG_BASE) {
            return Err(format!("no route to {uri}").into());
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let response = self.catalog.handle(uri).await;
        Ok(FetchResponse::from(response.to_http()))
    }
}

/// The downstream gateway service.
pub struct GatewayService {
    runtime: HalApiRuntime,
    upstream: Arc<dyn HttpClient>,
    catalog_uri: String,
}

impl GatewayService {
    pub fn new(upstream: Arc<dyn HttpClient>) -> Self {
        let config = HalApiConfig::default().with_max_age_ceiling(Duration::from_secs(300));
        Self {
            runtime: HalApiRuntime::new(config),
            upstream,
            catalog_uri: format!("{CATALOG_BASE}/"),
        }
    }

    #[instrument(name = "gateway", skip(self))]
    pub async fn handle(&self, uri: &str) -> HalResponse {
        let api = self.runtime.request(uri, self.upstream.clone());
        let response = match self.dispatch(&api).await {
            Ok(response) => response,
            Err(e) => api.render_error(&e),
        };
        info!(
            status = response.status(),
            upstream_requests = api.metrics().responses().len(),
            "Handled gateway request"
        );
        response
    }

    async fn dispatch(&self, api: &HalApi) -> Result<HalResponse, HalError> {
        let (path, query) = route(api.request_uri())?;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let catalog: CatalogClient = api.remote(&self.catalog_uri)?;

        match segments.as_slice() {
            ["summary"] => api.render(SummaryResource::new(catalog)).await,
            ["products", id] => {
                let id = product_id(id)?;
                match catalog.product(id).await? {
                    Some(product) => api.render(product.navigation().clone()).await,
                    None => Err(CatalogError::ProductNotFound(id).into()),
                }
            }
            ["search"] => match catalog.search(product_query(&query)).await? {
                Some(results) => api.render(results.navigation().clone()).await,
                None => Err(CatalogError::UnknownPath(path.clone()).into()),
            },
            _ => Err(CatalogError::UnknownPath(path.clone()).into()),
        }
    }
}

/// Both services, wired together.
pub struct CatalogSystem {
    catalog: Arc<CatalogService>,
    gateway: GatewayService,
}

impl CatalogSystem {
    pub fn new(products: Vec<Product>) -> Self {
        Self::from_catalog(CatalogService::new(ProductStore::new(products)))
    }

    pub fn from_catalog(catalog: CatalogService) -> Self {
        let catalog = Arc::new(catalog);
        let client = InProcessClient::new(catalog.clone());
        Self {
            gateway: GatewayService::new(Arc::new(client)),
            catalog,
        }
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn gateway(&self) -> &GatewayService {
        &self.gateway
    }
}

/// The demo inventory.
pub fn sample_products() -> Vec<Product> {
    vec![
        Product::new(1, "Desk Lamp", 39.0, 12),
        Product::new(2, "Floor Lamp", 129.0, 0),
        Product::new(3, "Ceiling Light", 89.5, 3),
        Product::new(4, "Reading Lamp", 24.9, 7),
    ]
}
