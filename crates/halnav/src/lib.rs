//! # halnav
//!
//! A toolkit for HAL+JSON hypermedia APIs. The same resource interface declarations
//! drive both sides of a service:
//!
//! - **Server side**: resource implementations are rendered into HAL documents
//!   without blocking, with related resources linked or embedded.
//! - **Client side**: navigation proxies fetch upstream HAL documents lazily, follow
//!   links and expand URI templates, sharing one document cache per request.
//!
//! ## Why declarations?
//!
//! A resource interface is declared once as plain data (an
//! [`InterfaceDeclaration`](declaration::InterfaceDeclaration) built by a function)
//! and described once by the [`TypeRegistry`](descriptor::TypeRegistry). The
//! renderer and the proxies both work from that description, so the server and the
//! client of one API can never disagree on relation names or template variables.
//!
//! ## Architecture Overview
//!
//! ```text
//! declarations ──▶ TypeRegistry ──▶ ResourceDescriptor
//!                                      │           │
//!                     AsyncResourceRenderer     Navigation proxies
//!                            │                       │
//!                       HalResource ◀──── CachingResourceLoader ◀── HttpClient
//!                            │
//!                       HalResponse (status, content type, max-age)
//! ```
//!
//! ## Module Tour
//!
//! ### 1. Describing resources ([`declaration`], [`annotation`], [`descriptor`])
//! - **Role**: Turn annotated declarations into validated, memoized descriptors.
//! - **Key items**: [`TypeRegistry`](descriptor::TypeRegistry),
//!   [`CompositeAnnotationSupport`](annotation::CompositeAnnotationSupport).
//!
//! ### 2. Async shapes ([`shape`])
//! - **Role**: Convert between the canonical stream and [`Single`], [`Maybe`] and [`Many`].
//!
//! ### 3. Rendering ([`resource`], [`renderer`], [`api`], [`response`])
//! - **Role**: Render server-side resources and produce responses, including
//!   `vnd.error` documents for failures.
//! - **Key items**: [`HalApiRuntime`], [`HalApi`], [`HalResponse`].
//!
//! ### 4. Navigation ([`client`])
//! - **Role**: Lazy, cached navigation proxies over upstream HAL documents.
//! - **Key items**: [`ProxyFactory`](client::ProxyFactory),
//!   [`RemoteResource`](client::RemoteResource).
//!
//! ### 5. Cross-cutting ([`metrics`], [`status`], [`config`], [`tracing`], [`mock`])
//! - **Role**: Per-request metrics and max-age, error-to-status mapping,
//!   configuration, logging setup and an in-memory transport for tests.
//!
//! ## Running Tests
//!
//! ```bash
//! RUST_LOG=debug cargo test -p halnav
//! ```

pub mod annotation;
pub mod api;
pub mod client;
pub mod config;
pub mod declaration;
pub mod descriptor;
pub mod error;
pub mod hal;
pub mod link;
pub mod metrics;
pub mod mock;
pub mod renderer;
pub mod resource;
pub mod response;
pub mod shape;
pub mod status;
pub mod tracing;
pub mod uri_template;

pub use api::{HalApi, HalApiRuntime};
pub use config::HalApiConfig;
pub use error::{ClientError, HalError, Result};
pub use hal::HalResource;
pub use link::Link;
pub use response::HalResponse;
pub use shape::{Many, Maybe, Single};
