//! # Catalog Gateway
//!
//! A downstream service that never touches the product store. Its
//! [`SummaryResource`] is rendered from the upstream catalog through the
//! [`clients`](crate::clients) proxies:
//!
//! - the state aggregates the catalog state and every product state,
//! - `featured` links the upstream products that are in stock,
//! - `via` links the upstream catalog itself.
//!
//! State and relations are rendered concurrently, yet every upstream document is
//! fetched once per request because all proxies share the request's cache.

use crate::api;
use crate::clients::{CatalogClient, ProductClient};
use crate::model::{Product, SummaryState};
use futures::future::{self, try_join_all};
use futures::TryStreamExt;
use halnav::client::RemoteResource;
use halnav::declaration::InterfaceFn;
use halnav::descriptor::MethodDescriptor;
use halnav::resource::{LinkableResource, MethodOutput, ResourceImpl};
use halnav::{HalError, Link, Many, Result, Single};
use std::sync::Arc;

/// Products whose state is checked concurrently for `featured`.
const FEATURED_CONCURRENCY: usize = 8;

pub struct SummaryResource {
    catalog: CatalogClient,
}

impl SummaryResource {
    pub fn new(catalog: CatalogClient) -> Self {
        Self { catalog }
    }

    async fn summarize(&self) -> Result<SummaryState> {
        let (catalog, products) = futures::try_join!(self.catalog.state(), self.product_states())?;
        let in_stock = products.iter().filter(|p| p.in_stock()).count();
        let cheapest = products
            .iter()
            .min_by(|a, b| a.price.total_cmp(&b.price))
            .map(|p| p.name.clone());
        Ok(SummaryState {
            catalog_name: catalog.name,
            product_count: catalog.product_count,
            in_stock,
            cheapest,
        })
    }

    async fn product_states(&self) -> Result<Vec<Product>> {
        let products = self.catalog.products().collect_all().await?;
        try_join_all(products.iter().map(ProductClient::state)).await
    }
}

impl LinkableResource for SummaryResource {
    fn create_link(&self) -> Link {
        Link::new("/summary").with_title("Catalog summary")
    }
}

impl ResourceImpl for SummaryResource {
    fn interfaces(&self) -> Vec<InterfaceFn> {
        vec![api::summary]
    }

    fn invoke(self: Arc<Self>, method: &MethodDescriptor) -> Result<MethodOutput> {
        match method.name() {
            "state" => Ok(MethodOutput::state(Single::new(async move {
                self.summarize().await
            }))),
            "featured" => {
                let featured = self
                    .catalog
                    .products()
                    .map_ok(|product| async move {
                        let state = product.state().await?;
                        Ok::<_, HalError>(state.in_stock().then_some(product))
                    })
                    .try_buffered(FEATURED_CONCURRENCY)
                    .try_filter_map(future::ok)
                    .map_ok(|product| product.navigation().clone());
                Ok(MethodOutput::related(Many::new(featured)))
            }
            "source" => Ok(MethodOutput::related(Single::ready(
                self.catalog.navigation().clone(),
            ))),
            other => Err(HalError::developer(format!(
                "CatalogSummary does not implement {other}"
            ))),
        }
    }

    fn as_linkable(&self) -> Option<&dyn LinkableResource> {
        Some(self)
    }
}
