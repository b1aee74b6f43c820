use serde::{Deserialize, Serialize};

/// A product of the catalog, also the state of the `Product` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub price: f64,
    pub stock: u32,
}

impl Product {
    /// Creates a new Product instance.
    ///
    /// # Arguments
    /// * `id` - Unique identifier, also the last segment of the product URI
    /// * `name` - Product name
    /// * `price` - Unit price
    /// * `stock` - Units available
    pub fn new(id: u32, name: impl Into<String>, price: f64, stock: u32) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            stock,
        }
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Search parameters, expanded into the `search` link template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<f64>,
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        let name_matches = self
            .q
            .as_deref()
            .map_or(true, |q| product.name.to_lowercase().contains(&q.to_lowercase()));
        let price_matches = self.max_price.map_or(true, |max| product.price <= max);
        name_matches && price_matches
    }
}
