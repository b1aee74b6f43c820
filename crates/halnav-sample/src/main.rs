//! # HAL Catalog Demo
//!
//! Runs the catalog service and the gateway in one process and prints what a client
//! of the gateway would receive.
//!
//! ## 🚀 Core Components
//!
//! - **[`api`](halnav_sample::api)**: Interface declarations shared by server and clients.
//! - **[`catalog`](halnav_sample::catalog)**: Server-side resources of the catalog service.
//! - **[`clients`](halnav_sample::clients)**: Navigation proxies the gateway uses to read the catalog.
//! - **[`gateway`](halnav_sample::gateway)**: The aggregated summary resource.
//! - **[`lifecycle`](halnav_sample::lifecycle)**: Service wiring and routing.
//!
//! ## 📚 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run -p halnav-sample
//! RUST_LOG=halnav=debug cargo run -p halnav-sample
//! ```

use halnav::tracing::setup_tracing;
use halnav_sample::catalog::ProductStore;
use halnav_sample::lifecycle::{sample_products, CatalogService, CatalogSystem, GATEWAY_BASE};
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting catalog and gateway services");

    let catalog = CatalogService::new(ProductStore::new(sample_products())).with_embedded_products(true);
    let system = CatalogSystem::from_catalog(catalog);

    for path in ["/summary?embedDiagnostics", "/products/3", "/search?q=lamp&maxPrice=50", "/products/42"] {
        let uri = format!("{GATEWAY_BASE}{path}");
        let span = tracing::info_span!("request", path);
        let response = async { system.gateway().handle(&uri).await }
            .instrument(span)
            .await;

        let body = serde_json::to_string_pretty(&response.body().to_json()).map_err(|e| e.to_string())?;
        if response.status() < 400 {
            info!(status = response.status(), max_age = ?response.max_age(), "GET {path}");
        } else {
            error!(status = response.status(), "GET {path}");
        }
        println!("GET {uri} -> {} {}\n{body}\n", response.status(), response.content_type());
    }

    info!("Demo completed successfully");
    Ok(())
}
