//! Per-request caching document loader.
//!
//! Every navigation proxy created for one incoming request shares one
//! [`CachingResourceLoader`]. The first caller asking for a URI creates a shared
//! in-flight fetch and every later caller joins it, so each URI is fetched at most
//! once per request. A failed fetch is evicted, so a caller that retries triggers
//! exactly one new request.

use crate::client::transport::HttpClient;
use crate::error::{ClientError, HalError, Result};
use crate::hal::HalResource;
use crate::metrics::RequestMetricsCollector;
use crate::uri_template::{self, UriTemplate};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, warn};

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<HalResource>>>>;

pub struct CachingResourceLoader {
    client: Arc<dyn HttpClient>,
    metrics: Arc<RequestMetricsCollector>,
    cache: Mutex<HashMap<String, SharedFetch>>,
}

impl CachingResourceLoader {
    pub fn new(client: Arc<dyn HttpClient>, metrics: Arc<RequestMetricsCollector>) -> Self {
        Self {
            client,
            metrics,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the document at `uri`, joining an in-flight or completed fetch if one exists.
    ///
    /// Unbound query variables of a template are dropped; any other unbound variable
    /// is a developer error.
    pub async fn load(&self, uri: &str) -> Result<Arc<HalResource>> {
        let expanded;
        let uri = if uri_template::has_expressions(uri) {
            let template = UriTemplate::parse(uri);
            if template.has_unbound_required() {
                return Err(HalError::developer(format!(
                    "cannot fetch {uri}: the URI template has unresolved variables"
                )));
            }
            expanded = template.expand();
            expanded.as_str()
        } else {
            uri
        };

        let fetch = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            match cache.get(uri) {
                Some(existing) => {
                    debug!(uri, "Joining cached fetch");
                    existing.clone()
                }
                None => {
                    let fetch = fetch_document(
                        self.client.clone(),
                        self.metrics.clone(),
                        uri.to_string(),
                    )
                    .boxed()
                    .shared();
                    cache.insert(uri.to_string(), fetch.clone());
                    fetch
                }
            }
        };

        let result = fetch.clone().await;
        if result.is_err() {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if cache.get(uri).is_some_and(|cached| cached.ptr_eq(&fetch)) {
                cache.remove(uri);
            }
        }
        result
    }

    /// Number of URIs currently cached (in flight or completed).
    pub fn cached_uris(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

async fn fetch_document(
    client: Arc<dyn HttpClient>,
    metrics: Arc<RequestMetricsCollector>,
    uri: String,
) -> Result<Arc<HalResource>> {
    let started = Instant::now();
    debug!(uri = %uri, "Fetching upstream resource");

    let response = match client.fetch(&uri).await {
        Ok(response) => response,
        Err(e) => {
            warn!(uri = %uri, error = %e, "Upstream request failed");
            return Err(ClientError::new(format!("Failed to fetch {uri}: {e}"), &uri)
                .with_cause(Arc::from(e))
                .into());
        }
    };
    let latency = started.elapsed();
    let status = response.status();
    let max_age = response.max_age();
    let parsed = serde_json::from_slice::<HalResource>(response.body());

    if !status.is_success() {
        warn!(uri = %uri, status = status.as_u16(), "Upstream responded with an error status");
        metrics.on_response_retrieved(&uri, None, max_age, latency);
        let mut error = ClientError::new(
            format!("Upstream responded with status {status} for {uri}"),
            &uri,
        )
        .with_status(status.as_u16());
        if let Ok(body) = parsed {
            error = error.with_upstream_error(body);
        }
        return Err(error.into());
    }

    let document = parsed.map_err(|e| {
        warn!(uri = %uri, error = %e, "Upstream body is not a HAL document");
        ClientError::new(format!("Failed to parse the document at {uri}: {e}"), &uri)
            .with_status(status.as_u16())
            .with_cause(Arc::new(e))
    })?;

    let title = document.self_link().and_then(|l| l.title());
    metrics.on_response_retrieved(&uri, title, max_age, latency);
    debug!(
        uri = %uri,
        status = status.as_u16(),
        ?max_age,
        latency_us = latency.as_micros() as u64,
        "Fetched upstream resource"
    );
    Ok(Arc::new(document))
}
