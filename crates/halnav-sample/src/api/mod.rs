//! # Catalog API Declarations
//!
//! The interfaces of the catalog service and of the gateway in front of it. The
//! catalog service renders them, the gateway navigates them through the proxies in
//! [`clients`](crate::clients), and both read the relation names and template
//! variables from these declarations only.
//!
//! | Interface | Relations |
//! |-----------|-----------|
//! | `Catalog` (entry point) | `product`, `product:by-id` (`{id}`), `search` (`{?q,maxPrice}`) |
//! | `Product` | `up` |
//! | `ProductList` | `product` |
//! | `CatalogSummary` | `featured`, `via` |

use halnav::declaration::{
    Cardinality, InterfaceDeclaration, ItemType, MethodDeclaration, ParameterDeclaration,
};

pub const CATALOG_NAME: &str = "Lighting";

pub fn catalog() -> InterfaceDeclaration {
    InterfaceDeclaration::hal_api("Catalog")
        .entry_point()
        .method(MethodDeclaration::state("state", Cardinality::One, "CatalogState"))
        .method(MethodDeclaration::link("create_link"))
        .method(MethodDeclaration::related(
            "products",
            "product",
            Cardinality::Many,
            ItemType::Resource(product),
        ))
        .method(
            MethodDeclaration::related(
                "product_by_id",
                "product:by-id",
                Cardinality::Optional,
                ItemType::Resource(product),
            )
            .param(ParameterDeclaration::variable("id", "id")),
        )
        .method(
            MethodDeclaration::related(
                "search",
                "search",
                Cardinality::Optional,
                ItemType::Resource(product_list),
            )
            .param(ParameterDeclaration::variables("query")),
        )
}

pub fn product() -> InterfaceDeclaration {
    InterfaceDeclaration::hal_api("Product")
        .method(MethodDeclaration::state("state", Cardinality::One, "Product"))
        .method(MethodDeclaration::link("create_link"))
        .method(MethodDeclaration::related(
            "catalog",
            "up",
            Cardinality::One,
            ItemType::Resource(catalog),
        ))
        .method(
            MethodDeclaration::new("display_name", Cardinality::One, ItemType::State("String"))
                .with_default(),
        )
}

pub fn product_list() -> InterfaceDeclaration {
    InterfaceDeclaration::hal_api("ProductList")
        .method(MethodDeclaration::state("state", Cardinality::One, "ProductListState"))
        .method(MethodDeclaration::link("create_link"))
        .method(MethodDeclaration::related(
            "products",
            "product",
            Cardinality::Many,
            ItemType::Resource(product),
        ))
}

pub fn summary() -> InterfaceDeclaration {
    InterfaceDeclaration::hal_api("CatalogSummary")
        .method(MethodDeclaration::state("state", Cardinality::One, "SummaryState"))
        .method(MethodDeclaration::link("create_link"))
        .method(MethodDeclaration::related(
            "featured",
            "featured",
            Cardinality::Many,
            ItemType::Resource(product),
        ))
        .method(MethodDeclaration::related(
            "source",
            "via",
            Cardinality::One,
            ItemType::LinkableResource,
        ))
}
