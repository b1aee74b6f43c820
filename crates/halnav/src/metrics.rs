//! Per-request metrics and diagnostics.
//!
//! A [`RequestMetricsCollector`] lives exactly as long as one incoming request. It
//! records every upstream response the navigation proxies retrieve and the timing
//! of every resource method the renderer invokes, and it computes the cache
//! lifetime the outgoing response may advertise.

use crate::hal::HalResource;
use crate::link::Link;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// One upstream response retrieved while handling the request.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub uri: String,
    pub title: Option<String>,
    pub max_age: Option<u64>,
    pub latency: Duration,
}

/// One timed resource method invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInvocation {
    pub category: String,
    pub description: String,
    pub duration: Duration,
}

#[derive(Debug)]
struct MetricsState {
    responses: Vec<UpstreamResponse>,
    invocations: Vec<MethodInvocation>,
    max_age_limit: Option<u64>,
}

/// Metrics for a single incoming request.
///
/// # Examples
///
/// ```rust
/// use halnav::metrics::RequestMetricsCollector;
/// use std::time::Duration;
///
/// let metrics = RequestMetricsCollector::new();
/// metrics.on_response_retrieved("http://upstream/a", None, Some(60), Duration::from_millis(3));
/// metrics.on_response_retrieved("http://upstream/b", None, Some(30), Duration::from_millis(5));
/// metrics.set_response_max_age(Duration::from_secs(120));
///
/// assert_eq!(metrics.response_max_age(), Some(30));
/// ```
#[derive(Debug)]
pub struct RequestMetricsCollector {
    started: Instant,
    state: Mutex<MetricsState>,
}

impl Default for RequestMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestMetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            state: Mutex::new(MetricsState {
                responses: Vec::new(),
                invocations: Vec::new(),
                max_age_limit: None,
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MetricsState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Records an upstream response. `max_age` is the upstream `Cache-Control` max-age in seconds.
    pub fn on_response_retrieved(
        &self,
        uri: &str,
        title: Option<&str>,
        max_age: Option<u64>,
        latency: Duration,
    ) {
        self.with_state(|state| {
            state.responses.push(UpstreamResponse {
                uri: uri.to_string(),
                title: title.map(str::to_string),
                max_age,
                latency,
            })
        });
    }

    pub fn on_method_invocation_finished(
        &self,
        category: &str,
        description: impl Into<String>,
        duration: Duration,
    ) {
        self.with_state(|state| {
            state.invocations.push(MethodInvocation {
                category: category.to_string(),
                description: description.into(),
                duration,
            })
        });
    }

    /// Caps the response max-age. Repeated calls keep the smallest value.
    pub fn set_response_max_age(&self, max_age: Duration) {
        let seconds = max_age.as_secs();
        self.with_state(|state| {
            state.max_age_limit = Some(state.max_age_limit.map_or(seconds, |l| l.min(seconds)));
        });
    }

    /// The smallest of every recorded upstream max-age and the explicit limit, in
    /// seconds. `None` if nothing carried a max-age.
    pub fn response_max_age(&self) -> Option<u64> {
        self.with_state(|state| {
            state
                .responses
                .iter()
                .filter_map(|r| r.max_age)
                .chain(state.max_age_limit)
                .min()
        })
    }

    pub fn responses(&self) -> Vec<UpstreamResponse> {
        self.with_state(|state| state.responses.clone())
    }

    pub fn invocations(&self) -> Vec<MethodInvocation> {
        self.with_state(|state| state.invocations.clone())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Summarizes the request: every upstream response as an `upstream` link and
    /// method timings grouped by category.
    pub fn create_diagnostics_document(&self, resource: &HalResource) -> HalResource {
        let responses = self.responses();
        let invocations = self.invocations();

        let mut by_category: BTreeMap<&str, (usize, Duration)> = BTreeMap::new();
        for invocation in &invocations {
            let entry = by_category.entry(invocation.category.as_str()).or_default();
            entry.0 += 1;
            entry.1 += invocation.duration;
        }
        let timings: Vec<Value> = by_category
            .iter()
            .map(|(category, (count, total))| {
                json!({
                    "category": category,
                    "invocations": count,
                    "totalMicros": total.as_micros() as u64,
                })
            })
            .collect();

        let subject = resource
            .self_link()
            .map(|l| l.href().to_string())
            .unwrap_or_else(|| "unlinked resource".to_string());
        let total_latency: Duration = responses.iter().map(|r| r.latency).sum();

        let mut diagnostics = HalResource::new();
        let state = json!({
            "title": format!("Diagnostics for {subject}"),
            "elapsedMillis": self.elapsed().as_millis() as u64,
            "upstreamRequests": responses.len(),
            "upstreamLatencyMillis": total_latency.as_millis() as u64,
            "maxAge": self.response_max_age(),
            "timings": timings,
        });
        if let Value::Object(map) = state {
            diagnostics = diagnostics.with_state_map(map);
        }

        for response in &responses {
            let max_age = response
                .max_age
                .map_or_else(|| "no max-age".to_string(), |s| format!("max-age {s}s"));
            let title = format!(
                "{} ({} ms, {max_age})",
                response.title.as_deref().unwrap_or("untitled"),
                response.latency.as_millis()
            );
            diagnostics.add_link("upstream", Link::new(&response.uri).with_title(title));
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_age_is_minimum_of_responses_and_limit() {
        let metrics = RequestMetricsCollector::new();
        metrics.on_response_retrieved("http://a", None, Some(60), Duration::ZERO);
        metrics.on_response_retrieved("http://b", None, Some(30), Duration::ZERO);
        metrics.set_response_max_age(Duration::from_secs(120));
        assert_eq!(metrics.response_max_age(), Some(30));

        metrics.set_response_max_age(Duration::from_secs(10));
        metrics.set_response_max_age(Duration::from_secs(90));
        assert_eq!(metrics.response_max_age(), Some(10));
    }

    #[test]
    fn test_missing_max_ages_yield_no_limit() {
        let metrics = RequestMetricsCollector::new();
        assert_eq!(metrics.response_max_age(), None);

        metrics.on_response_retrieved("http://a", Some("A"), None, Duration::ZERO);
        assert_eq!(metrics.response_max_age(), None);
    }

    #[test]
    fn test_diagnostics_document_lists_upstream_responses() {
        let metrics = RequestMetricsCollector::new();
        metrics.on_response_retrieved("http://a", Some("Catalog"), Some(60), Duration::from_millis(4));
        metrics.on_method_invocation_finished("related", "Catalog#items", Duration::from_micros(20));
        metrics.on_method_invocation_finished("related", "Catalog#search", Duration::from_micros(30));

        let resource = HalResource::new().with_link("self", Link::new("/catalog"));
        let diagnostics = metrics.create_diagnostics_document(&resource);

        assert_eq!(diagnostics.state()["upstreamRequests"], json!(1));
        assert_eq!(diagnostics.state()["maxAge"], json!(60));
        assert_eq!(diagnostics.state()["timings"][0]["invocations"], json!(2));
        assert_eq!(diagnostics.state()["timings"][0]["totalMicros"], json!(50));
        assert_eq!(diagnostics.links("upstream")[0].href(), "http://a");
        assert_eq!(
            diagnostics.links("upstream")[0].title(),
            Some("Catalog (4 ms, max-age 60s)")
        );
    }
}
