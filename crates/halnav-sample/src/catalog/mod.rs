//! # Catalog Service Resources
//!
//! Server-side implementations of the [`api`](crate::api) interfaces, backed by an
//! in-memory [`ProductStore`].
//!
//! | Resource | Interface | Link | Capabilities |
//! |----------|-----------|------|--------------|
//! | [`CatalogResource`] | `Catalog` | `/` | linkable |
//! | [`ProductResource`] | `Product` | `/products/{id}` | linkable, embeddable |
//! | [`ProductListResource`] | `ProductList` | `/products?...` | linkable |
//! | [`LinkTemplate`] | any | a URI template | linkable |
//!
//! Whether the catalog embeds its products or only links them is a property of
//! the [`CatalogResource`]; the renderer asks each product through
//! [`EmbeddableResource::is_embedded`].

use crate::api;
use crate::error::CatalogError;
use crate::model::{CatalogState, Product, ProductListState, ProductQuery};
use halnav::declaration::InterfaceFn;
use halnav::descriptor::MethodDescriptor;
use halnav::resource::{EmbeddableResource, LinkableResource, MethodOutput, ResourceImpl};
use halnav::uri_template::UriTemplate;
use halnav::{HalError, Link, Many, Maybe, Result, Single};
use std::sync::Arc;
use tracing::debug;

pub const PRODUCT_TEMPLATE: &str = "/products/{id}";
pub const SEARCH_TEMPLATE: &str = "/products{?q,maxPrice}";

/// Read-only product storage shared by all resources of the service.
#[derive(Debug, Clone, Default)]
pub struct ProductStore {
    products: Arc<Vec<Product>>,
}

impl ProductStore {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: Arc::new(products),
        }
    }

    pub fn all(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: u32) -> std::result::Result<Product, CatalogError> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(CatalogError::ProductNotFound(id))
    }

    pub fn search(&self, query: &ProductQuery) -> Vec<Product> {
        self.products
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect()
    }
}

fn unknown_method(interface: &str, method: &MethodDescriptor) -> HalError {
    HalError::developer(format!("{interface} does not implement {}", method.name()))
}

/// The catalog entry point.
#[derive(Debug, Clone)]
pub struct CatalogResource {
    store: ProductStore,
    embed_products: bool,
}

impl CatalogResource {
    pub fn new(store: ProductStore) -> Self {
        Self {
            store,
            embed_products: false,
        }
    }

    /// Embeds every product document instead of only linking it.
    pub fn with_embedded_products(mut self, embed: bool) -> Self {
        self.embed_products = embed;
        self
    }
}

impl LinkableResource for CatalogResource {
    fn create_link(&self) -> Link {
        Link::new("/").with_title(api::CATALOG_NAME)
    }
}

impl ResourceImpl for CatalogResource {
    fn interfaces(&self) -> Vec<InterfaceFn> {
        vec![api::catalog]
    }

    fn invoke(self: Arc<Self>, method: &MethodDescriptor) -> Result<MethodOutput> {
        match method.name() {
            "state" => Ok(MethodOutput::state(Single::ready(CatalogState {
                name: api::CATALOG_NAME.to_string(),
                product_count: self.store.all().len(),
            }))),
            "products" => {
                let products: Vec<ProductResource> = self
                    .store
                    .all()
                    .iter()
                    .map(|p| ProductResource::new(p.clone(), self.store.clone()).embedded(self.embed_products))
                    .collect();
                Ok(MethodOutput::related(Many::from_vec(products)))
            }
            "product_by_id" => Ok(MethodOutput::related(Maybe::ready(Some(LinkTemplate::new(
                api::product,
                PRODUCT_TEMPLATE,
            ))))),
            "search" => Ok(MethodOutput::related(Maybe::ready(Some(LinkTemplate::new(
                api::product_list,
                SEARCH_TEMPLATE,
            ))))),
            _ => Err(unknown_method("Catalog", method)),
        }
    }

    fn as_linkable(&self) -> Option<&dyn LinkableResource> {
        Some(self)
    }
}

#[derive(Debug, Clone)]
pub struct ProductResource {
    product: Product,
    store: ProductStore,
    embedded: bool,
}

impl ProductResource {
    pub fn new(product: Product, store: ProductStore) -> Self {
        Self {
            product,
            store,
            embedded: false,
        }
    }

    pub fn embedded(mut self, embedded: bool) -> Self {
        self.embedded = embedded;
        self
    }
}

impl LinkableResource for ProductResource {
    fn create_link(&self) -> Link {
        Link::new(format!("/products/{}", self.product.id)).with_title(&self.product.name)
    }
}

impl EmbeddableResource for ProductResource {
    fn is_embedded(&self) -> bool {
        self.embedded
    }
}

impl ResourceImpl for ProductResource {
    fn interfaces(&self) -> Vec<InterfaceFn> {
        vec![api::product]
    }

    fn invoke(self: Arc<Self>, method: &MethodDescriptor) -> Result<MethodOutput> {
        match method.name() {
            "state" => Ok(MethodOutput::state(Single::ready(self.product.clone()))),
            "catalog" => Ok(MethodOutput::related(Single::ready(CatalogResource::new(
                self.store.clone(),
            )))),
            _ => Err(unknown_method("Product", method)),
        }
    }

    fn as_linkable(&self) -> Option<&dyn LinkableResource> {
        Some(self)
    }

    fn as_embeddable(&self) -> Option<&dyn EmbeddableResource> {
        Some(self)
    }
}

/// Search results; every matching product is embedded.
#[derive(Debug, Clone)]
pub struct ProductListResource {
    store: ProductStore,
    query: ProductQuery,
}

impl ProductListResource {
    pub fn new(store: ProductStore, query: ProductQuery) -> Self {
        Self { store, query }
    }
}

impl LinkableResource for ProductListResource {
    fn create_link(&self) -> Link {
        let variables = match serde_json::to_value(&self.query) {
            Ok(serde_json::Value::Object(variables)) => variables,
            _ => serde_json::Map::new(),
        };
        Link::new(UriTemplate::parse(SEARCH_TEMPLATE).bind_all(&variables).expand())
    }
}

impl ResourceImpl for ProductListResource {
    fn interfaces(&self) -> Vec<InterfaceFn> {
        vec![api::product_list]
    }

    fn invoke(self: Arc<Self>, method: &MethodDescriptor) -> Result<MethodOutput> {
        match method.name() {
            "state" => {
                let this = self.clone();
                Ok(MethodOutput::state(Single::new(async move {
                    let count = this.store.search(&this.query).len();
                    Ok(ProductListState { count })
                })))
            }
            "products" => {
                let matches = self.store.search(&self.query);
                debug!(query = ?self.query, matches = matches.len(), "Searched products");
                let products: Vec<ProductResource> = matches
                    .into_iter()
                    .map(|p| ProductResource::new(p, self.store.clone()).embedded(true))
                    .collect();
                Ok(MethodOutput::related(products))
            }
            _ => Err(unknown_method("ProductList", method)),
        }
    }

    fn as_linkable(&self) -> Option<&dyn LinkableResource> {
        Some(self)
    }
}

/// A link template standing in for a resource the client has to parameterize.
#[derive(Debug, Clone)]
pub struct LinkTemplate {
    interface: InterfaceFn,
    template: &'static str,
}

impl LinkTemplate {
    pub fn new(interface: InterfaceFn, template: &'static str) -> Self {
        Self {
            interface,
            template,
        }
    }
}

impl LinkableResource for LinkTemplate {
    fn create_link(&self) -> Link {
        Link::new(self.template)
    }
}

impl ResourceImpl for LinkTemplate {
    fn interfaces(&self) -> Vec<InterfaceFn> {
        vec![self.interface]
    }

    fn invoke(self: Arc<Self>, method: &MethodDescriptor) -> Result<MethodOutput> {
        Err(HalError::developer(format!(
            "the link template {} cannot be invoked as {}",
            self.template,
            method.qualified_name()
        )))
    }

    fn as_linkable(&self) -> Option<&dyn LinkableResource> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ProductStore {
        ProductStore::new(vec![
            Product::new(1, "Desk Lamp", 39.0, 4),
            Product::new(2, "Floor Lamp", 129.0, 0),
            Product::new(3, "Ceiling Light", 89.0, 2),
        ])
    }

    #[test]
    fn test_store_lookup_and_search() {
        let store = store();
        assert_eq!(store.get(3).unwrap().name, "Ceiling Light");
        assert!(matches!(store.get(9), Err(CatalogError::ProductNotFound(9))));

        let lamps = store.search(&ProductQuery {
            q: Some("lamp".into()),
            max_price: Some(100.0),
        });
        assert_eq!(lamps.len(), 1);
        assert_eq!(lamps[0].id, 1);
    }

    #[test]
    fn test_product_list_link_expands_query() {
        let list = ProductListResource::new(
            store(),
            ProductQuery {
                q: Some("lamp".into()),
                max_price: None,
            },
        );
        assert_eq!(list.create_link().href(), "/products?q=lamp");

        let everything = ProductListResource::new(store(), ProductQuery::default());
        assert_eq!(everything.create_link().href(), "/products");
    }
}
