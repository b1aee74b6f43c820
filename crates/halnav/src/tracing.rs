//! # Observability & Tracing
//!
//! The engine logs through the `tracing` crate with structured fields; the
//! [`setup_tracing`] helper installs a `tracing-subscriber` formatter for binaries
//! and tests that want to see those logs.
//!
//! ## Configuration
//!
//! Levels come from the `RUST_LOG` environment variable. The format is compact and
//! hides the module prefix (`with_target(false)`), since every event already
//! carries the fields that identify it.
//!
//! ```bash
//! # One line per rendered request and per upstream failure
//! RUST_LOG=info cargo run -p halnav-sample
//!
//! # Every fetch, cache hit, relation and template expansion
//! RUST_LOG=debug cargo run -p halnav-sample
//!
//! # Only the client side of the engine
//! RUST_LOG=halnav::client=debug cargo run -p halnav-sample
//! ```
//!
//! ## What Gets Traced
//!
//! | Level | Event | Fields |
//! |-------|-------|--------|
//! | `info` | Rendered response | `uri`, `status`, `max_age`, `elapsed_ms` |
//! | `warn` | Upstream failure, compact error response | `uri`, `status`, `error` |
//! | `error` | Unexpected failure while rendering | `uri`, `status`, `error` |
//! | `debug` | Fetch started, fetch joined, fetch finished | `uri`, `status`, `max_age`, `latency_us` |
//! | `debug` | Relation rendered | `resource`, `relation`, `items` |
//!
//! The request façade opens a `render` span per rendered resource, so with the
//! compact format every event inside a render is prefixed with it:
//!
//! ```text
//! DEBUG render: Fetching upstream resource uri=http://catalog.local/items/1
//! DEBUG render: Rendered relation resource="Catalog" relation="item" items=2
//!  INFO render: Rendered resource status=200 max_age=Some(30) elapsed_ms=3
//! ```

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Calling it more than once is harmless; only the first call installs a subscriber.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
