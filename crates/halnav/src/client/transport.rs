//! The abstract transport the navigation proxies fetch documents through.
//!
//! The engine never opens sockets itself. An integration provides an
//! [`HttpClient`] (backed by a real HTTP client, an in-process router or the
//! [`StubHttpClient`](crate::mock::StubHttpClient) in tests) and the engine only
//! looks at the status, the `Cache-Control` header and the body bytes.

use crate::hal::HalResource;
use async_trait::async_trait;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};

/// Failure to obtain any response at all (connection refused, timeout, ...).
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Fetches a fully qualified URI.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<FetchResponse, TransportError>;
}

/// The parts of an HTTP response the engine consumes.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// A response carrying a serialized HAL document.
    pub fn hal(status: StatusCode, document: &HalResource) -> Self {
        Self::new(status, document.to_json().to_string().into_bytes())
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/hal+json"))
    }

    pub fn with_header(mut self, name: http::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_max_age(self, seconds: u64) -> Self {
        match HeaderValue::from_str(&format!("max-age={seconds}")) {
            Ok(value) => self.with_header(CACHE_CONTROL, value),
            Err(_) => self,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The `max-age` directive of the `Cache-Control` header, in seconds.
    pub fn max_age(&self) -> Option<u64> {
        parse_max_age(&self.headers)
    }
}

impl From<http::Response<Vec<u8>>> for FetchResponse {
    fn from(response: http::Response<Vec<u8>>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }
}

pub fn parse_max_age(headers: &HeaderMap) -> Option<u64> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|directive| {
            let (name, value) = directive.trim().split_once('=')?;
            if name.trim().eq_ignore_ascii_case("max-age") {
                value.trim().trim_matches('"').parse().ok()
            } else {
                None
            }
        })
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_max_age_among_other_directives() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, Max-Age=45, must-revalidate"));
        assert_eq!(parse_max_age(&headers), Some(45));

        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        assert_eq!(parse_max_age(&headers), None);
    }

    #[test]
    fn test_from_http_response() {
        let response = http::Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header(CACHE_CONTROL, "max-age=5")
            .body(b"{}".to_vec())
            .unwrap();
        let fetched = FetchResponse::from(response);
        assert_eq!(fetched.status(), StatusCode::NOT_FOUND);
        assert_eq!(fetched.max_age(), Some(5));
        assert_eq!(fetched.body(), b"{}");
    }
}
