//! Rendered responses and error documents.

use crate::error::HalError;
use crate::hal::HalResource;
use crate::link::Link;
use crate::status::CompositeExceptionStrategy;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use serde_json::json;
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::{error, warn};

pub const HAL_CONTENT_TYPE: &str = "application/hal+json";
pub const VND_ERROR_CONTENT_TYPE: &str = "application/vnd.error+json";

/// An immutable rendered response. Every `with_*` method returns a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct HalResponse {
    status: u16,
    content_type: String,
    reason: Option<String>,
    body: Arc<HalResource>,
    max_age: Option<u64>,
}

impl HalResponse {
    pub fn new(status: u16, content_type: impl Into<String>, body: HalResource) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            reason: None,
            body: Arc::new(body),
            max_age: None,
        }
    }

    pub fn ok(body: HalResource) -> Self {
        Self::new(200, HAL_CONTENT_TYPE, body)
    }

    pub fn with_status(self, status: u16) -> Self {
        Self { status, ..self }
    }

    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            ..self
        }
    }

    pub fn with_reason(self, reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..self
        }
    }

    pub fn with_body(self, body: HalResource) -> Self {
        Self {
            body: Arc::new(body),
            ..self
        }
    }

    pub fn with_max_age(self, max_age: Option<u64>) -> Self {
        Self { max_age, ..self }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn body(&self) -> &HalResource {
        &self.body
    }

    /// Cache lifetime in seconds.
    pub fn max_age(&self) -> Option<u64> {
        self.max_age
    }

    /// The `Cache-Control` header value, if a max-age applies.
    pub fn cache_control_header(&self) -> Option<String> {
        self.max_age.map(|seconds| format!("max-age={seconds}"))
    }

    /// Converts into an `http` response carrying the serialized body and headers.
    pub fn to_http(&self) -> http::Response<Vec<u8>> {
        let mut response = http::Response::new(self.body.to_json().to_string().into_bytes());
        *response.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&self.content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        if let Some(value) = self
            .cache_control_header()
            .and_then(|v| HeaderValue::from_str(&v).ok())
        {
            headers.insert(CACHE_CONTROL, value);
        }
        response
    }
}

/// Renders failures as `application/vnd.error+json` documents.
///
/// The document carries the failure `message` and `class`. Upstream failures add
/// an `about` link to the failed URI and embed the upstream error document under
/// `errors`, followed by one entry per underlying cause.
#[derive(Clone, Default)]
pub struct VndErrorResponseRenderer {
    strategy: CompositeExceptionStrategy,
}

impl VndErrorResponseRenderer {
    pub fn new(strategy: CompositeExceptionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &CompositeExceptionStrategy {
        &self.strategy
    }

    pub fn render_error(&self, request_uri: &str, failure: &HalError) -> HalResponse {
        let status = self.strategy.status_code(failure);
        if self.strategy.compact_logging(failure) {
            warn!(uri = request_uri, status, kind = failure.kind(), "{failure}");
        } else {
            error!(uri = request_uri, status, error = ?failure, "Failed to render resource");
        }

        let mut document = HalResource::from_state(json!({
            "message": failure.to_string(),
            "class": failure.kind(),
        }))
        .unwrap_or_default();

        if let Some(client) = failure.as_client_error() {
            let mut about = Link::new(client.uri());
            if let Some(upstream_status) = client.status() {
                about = about.with_title(format!("Upstream responded with status {upstream_status}"));
            }
            document.add_link("about", about);
            if let Some(upstream) = client.upstream_error() {
                document.add_embedded("errors", upstream.clone());
            }
        }

        let mut cause = StdError::source(failure);
        while let Some(current) = cause {
            let entry = HalResource::from_state(json!({
                "message": current.to_string(),
                "class": "cause",
            }))
            .unwrap_or_default();
            document.add_embedded("errors", entry);
            cause = current.source();
        }

        let response = HalResponse::new(status, VND_ERROR_CONTENT_TYPE, document);
        match StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
        {
            Some(reason) => response.with_reason(reason),
            None => response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn test_with_methods_return_new_values() {
        let original = HalResponse::ok(HalResource::new());
        let cached = original.clone().with_max_age(Some(60)).with_status(203);

        assert_eq!(original.status(), 200);
        assert_eq!(original.cache_control_header(), None);
        assert_eq!(cached.status(), 203);
        assert_eq!(cached.cache_control_header().as_deref(), Some("max-age=60"));

        let http = cached.to_http();
        assert_eq!(http.headers()[CACHE_CONTROL], "max-age=60");
        assert_eq!(http.headers()[CONTENT_TYPE], HAL_CONTENT_TYPE);
    }

    #[test]
    fn test_upstream_failure_keeps_status_and_error_body() {
        let upstream = HalResource::from_state(json!({ "message": "no such item" })).unwrap();
        let failure: HalError = ClientError::new("Upstream responded with 404", "http://upstream/items/9")
            .with_status(404)
            .with_upstream_error(upstream)
            .into();

        let response = VndErrorResponseRenderer::new(CompositeExceptionStrategy::with_default_strategies())
            .render_error("/proxy/items/9", &failure);

        assert_eq!(response.status(), 404);
        assert_eq!(response.reason(), Some("Not Found"));
        assert_eq!(response.content_type(), VND_ERROR_CONTENT_TYPE);
        assert_eq!(response.body().state()["class"], json!("ClientError"));
        assert_eq!(response.body().link("about").unwrap().href(), "http://upstream/items/9");
        assert_eq!(
            response.body().embedded("errors")[0].state()["message"],
            json!("no such item")
        );
    }

    #[test]
    fn test_unclassified_failure_is_internal_error() {
        let response = VndErrorResponseRenderer::new(CompositeExceptionStrategy::with_default_strategies())
            .render_error("/x", &HalError::resource(std::io::Error::other("disk full")));

        assert_eq!(response.status(), 500);
        let causes = response.body().embedded("errors");
        assert_eq!(causes.len(), 1);
        assert_eq!(causes[0].state()["message"], json!("disk full"));
    }
}
