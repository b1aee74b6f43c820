//! Resource state types shared by the catalog service, its clients and the gateway.

mod product;

pub use product::{Product, ProductQuery};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogState {
    pub name: String,
    pub product_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListState {
    pub count: usize,
}

/// State of the gateway's summary resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryState {
    pub catalog_name: String,
    pub product_count: usize,
    pub in_stock: usize,
    pub cheapest: Option<String>,
}
