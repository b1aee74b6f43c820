//! # Catalog Clients
//!
//! Navigation proxies for the catalog API. Each proxy wraps a
//! [`Navigation`] and exposes the interface methods with their declared shapes;
//! no request is made before a state or related-resource method is awaited.
//!
//! ```rust,ignore
//! let catalog: CatalogClient = api.remote("http://catalog.local/")?;
//! let lamp = catalog.product(1).await?;          // expands /products/{id}, no fetch
//! let state = lamp.unwrap().state().await?;      // fetches /products/1
//! ```

use crate::api;
use crate::model::{CatalogState, Product, ProductListState, ProductQuery};
use halnav::client::{Navigation, RemoteResource, TemplateArgs};
use halnav::declaration::InterfaceDeclaration;
use halnav::{Many, Maybe, Result, Single};

pub struct CatalogClient(Navigation);

impl RemoteResource for CatalogClient {
    fn declaration() -> InterfaceDeclaration {
        api::catalog()
    }

    fn from_navigation(navigation: Navigation) -> Self {
        Self(navigation)
    }

    fn navigation(&self) -> &Navigation {
        &self.0
    }
}

impl CatalogClient {
    pub fn state(&self) -> Single<CatalogState> {
        self.0.state("state")
    }

    pub fn products(&self) -> Many<ProductClient> {
        self.0.related("products")
    }

    pub fn product(&self, id: u32) -> Maybe<ProductClient> {
        self.0
            .related_with("product_by_id", TemplateArgs::new().arg(id))
    }

    pub fn search(&self, query: ProductQuery) -> Maybe<ProductListClient> {
        self.0.related_with("search", TemplateArgs::new().arg(query))
    }
}

pub struct ProductClient(Navigation);

impl RemoteResource for ProductClient {
    fn declaration() -> InterfaceDeclaration {
        api::product()
    }

    fn from_navigation(navigation: Navigation) -> Self {
        Self(navigation)
    }

    fn navigation(&self) -> &Navigation {
        &self.0
    }
}

impl ProductClient {
    pub fn state(&self) -> Single<Product> {
        self.0.state("state")
    }

    pub fn catalog(&self) -> Single<CatalogClient> {
        self.0.related("catalog")
    }

    /// Name and price, as shown in listings.
    pub async fn display_name(&self) -> Result<String> {
        let product = self.state().await?;
        Ok(format!("{} ({:.2})", product.name, product.price))
    }
}

pub struct ProductListClient(Navigation);

impl RemoteResource for ProductListClient {
    fn declaration() -> InterfaceDeclaration {
        api::product_list()
    }

    fn from_navigation(navigation: Navigation) -> Self {
        Self(navigation)
    }

    fn navigation(&self) -> &Navigation {
        &self.0
    }
}

impl ProductListClient {
    pub fn state(&self) -> Single<ProductListState> {
        self.0.state("state")
    }

    pub fn products(&self) -> Many<ProductClient> {
        self.0.related("products")
    }
}
