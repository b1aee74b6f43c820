//! # Stub Transport & Testing Guide
//!
//! [`StubHttpClient`] implements the same [`HttpClient`] trait as a production
//! transport but answers from in-memory expectations. It counts every fetch per
//! URI, which makes the caching guarantees of the navigation proxies directly
//! observable in tests.
//!
//! ## When to use the Stub vs a Real Service
//!
//! | Feature | StubHttpClient | In-process service |
//! |---------|----------------|--------------------|
//! | **Speed** | Instant | Fast (renders real resources) |
//! | **Determinism** | Fully deterministic | Deterministic |
//! | **Documents** | Hand-written | Rendered by the engine |
//! | **Use Case** | Proxy behavior, caching, failures | Service-to-service round trips |
//! | **Error Injection** | Easy (`return_status`, `return_transport_error`) | Requires a failing resource |
//!
//! ## Expectations
//!
//! Expectations are queued per URI and consumed in order. A URI can also be served
//! persistently with [`StubHttpClient::serve`]; queued expectations take precedence.
//!
//! ```rust
//! use halnav::hal::HalResource;
//! use halnav::mock::StubHttpClient;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut stub = StubHttpClient::new();
//!     stub.expect_get("http://upstream/items/1")
//!         .return_transport_error("connection reset");
//!     stub.expect_get("http://upstream/items/1")
//!         .return_hal_with_max_age(HalResource::from_state(json!({ "id": 1 })).unwrap(), 60);
//!
//!     let client = stub.client();
//!     assert!(client.fetch("http://upstream/items/1").await.is_err());
//!     let response = client.fetch("http://upstream/items/1").await.unwrap();
//!     assert_eq!(response.max_age(), Some(60));
//!
//!     assert_eq!(stub.fetch_count("http://upstream/items/1"), 2);
//!     stub.verify();
//! }
//! ```
//!
//! Requests for a URI with no expectation left and nothing served fail with a
//! transport error, so an unexpected fetch surfaces as a client error in the code
//! under test.

use crate::client::transport::{FetchResponse, HttpClient, TransportError};
use crate::hal::HalResource;
use async_trait::async_trait;
use http::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

enum StubReply {
    Response(FetchResponse),
    TransportError(String),
}

#[derive(Default)]
struct StubState {
    expectations: HashMap<String, VecDeque<StubReply>>,
    served: HashMap<String, FetchResponse>,
    fetches: HashMap<String, usize>,
}

/// In-memory [`HttpClient`] with per-URI expectations and fetch counting.
#[derive(Clone, Default)]
pub struct StubHttpClient {
    state: Arc<Mutex<StubState>>,
    delay: Option<Duration>,
}

impl StubHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every reply, so concurrent fetches of the same URI overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The client to hand to the code under test. It shares state with this stub.
    pub fn client(&self) -> Arc<dyn HttpClient> {
        Arc::new(self.clone())
    }

    /// Queues the reply to the next fetch of `uri`.
    pub fn expect_get(&mut self, uri: &str) -> GetExpectationBuilder {
        GetExpectationBuilder {
            uri: uri.to_string(),
            state: self.state.clone(),
        }
    }

    /// Serves `document` for every fetch of `uri` that has no queued expectation.
    pub fn serve(&mut self, uri: &str, document: HalResource) {
        self.lock()
            .served
            .insert(uri.to_string(), FetchResponse::hal(StatusCode::OK, &document));
    }

    /// Like [`serve`](Self::serve), with a `Cache-Control: max-age`.
    pub fn serve_with_max_age(&mut self, uri: &str, document: HalResource, max_age: u64) {
        self.lock().served.insert(
            uri.to_string(),
            FetchResponse::hal(StatusCode::OK, &document).with_max_age(max_age),
        );
    }

    pub fn fetch_count(&self, uri: &str) -> usize {
        self.lock().fetches.get(uri).copied().unwrap_or_default()
    }

    pub fn total_fetches(&self) -> usize {
        self.lock().fetches.values().sum()
    }

    /// Panics if any queued expectation was not consumed.
    pub fn verify(&self) {
        let state = self.lock();
        let remaining: usize = state.expectations.values().map(VecDeque::len).sum();
        if remaining > 0 {
            panic!("Not all expectations were met. {remaining} remaining");
        }
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reply(&self, uri: &str) -> Result<FetchResponse, TransportError> {
        let mut state = self.lock();
        *state.fetches.entry(uri.to_string()).or_default() += 1;

        let queued = state
            .expectations
            .get_mut(uri)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(StubReply::Response(response)) => Ok(response),
            Some(StubReply::TransportError(message)) => Err(message.into()),
            None => state
                .served
                .get(uri)
                .cloned()
                .ok_or_else(|| format!("unexpected request to {uri}").into()),
        }
    }
}

#[async_trait]
impl HttpClient for StubHttpClient {
    async fn fetch(&self, uri: &str) -> Result<FetchResponse, TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply(uri)
    }
}

/// Builder for one queued reply.
pub struct GetExpectationBuilder {
    uri: String,
    state: Arc<Mutex<StubState>>,
}

impl GetExpectationBuilder {
    fn push(self, reply: StubReply) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.expectations.entry(self.uri).or_default().push_back(reply);
    }

    /// Replies `200 OK` with the document.
    pub fn return_hal(self, document: HalResource) {
        self.push(StubReply::Response(FetchResponse::hal(StatusCode::OK, &document)));
    }

    /// Replies `200 OK` with the document and a `Cache-Control: max-age`.
    pub fn return_hal_with_max_age(self, document: HalResource, max_age: u64) {
        self.push(StubReply::Response(
            FetchResponse::hal(StatusCode::OK, &document).with_max_age(max_age),
        ));
    }

    /// Replies with an error status and an optional error document.
    pub fn return_status(self, status: StatusCode, body: Option<HalResource>) {
        let response = match body {
            Some(document) => FetchResponse::hal(status, &document),
            None => FetchResponse::new(status, Vec::new()),
        };
        self.push(StubReply::Response(response));
    }

    /// Replies with a raw body, e.g. to simulate a malformed document.
    pub fn return_body(self, status: StatusCode, body: &[u8]) {
        self.push(StubReply::Response(FetchResponse::new(status, body.to_vec())));
    }

    /// Fails without any response, like a refused connection.
    pub fn return_transport_error(self, message: &str) {
        self.push(StubReply::TransportError(message.to_string()));
    }
}
