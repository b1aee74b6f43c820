//! Client side of the engine: the transport abstraction, the per-request document
//! cache and the navigation proxies built on top of them.

pub mod loader;
pub mod navigation;
pub mod transport;

pub use loader::CachingResourceLoader;
pub use navigation::{Navigation, ProxyFactory, RemoteLink, RemoteResource, TemplateArgs};
pub use transport::{FetchResponse, HttpClient, TransportError};
