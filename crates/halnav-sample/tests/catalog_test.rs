use halnav::response::{HAL_CONTENT_TYPE, VND_ERROR_CONTENT_TYPE};
use halnav::Link;
use halnav_sample::catalog::ProductStore;
use halnav_sample::lifecycle::{sample_products, CatalogService, CATALOG_BASE};
use serde_json::json;

fn service() -> CatalogService {
    CatalogService::new(ProductStore::new(sample_products()))
}

fn hrefs(links: &[Link]) -> Vec<&str> {
    links.iter().map(Link::href).collect()
}

#[tokio::test]
async fn test_entry_point_links_products_and_templates() {
    let response = service().handle(&format!("{CATALOG_BASE}/")).await;
    let body = response.body();

    assert_eq!(response.status(), 200);
    assert_eq!(response.content_type(), HAL_CONTENT_TYPE);
    assert_eq!(response.max_age(), Some(60));
    assert_eq!(body.state()["name"], json!("Lighting"));
    assert_eq!(body.state()["productCount"], json!(4));
    assert_eq!(body.self_link().unwrap().title(), Some("Lighting"));

    assert_eq!(
        hrefs(body.links("product")),
        vec!["/products/1", "/products/2", "/products/3", "/products/4"]
    );
    assert!(body.embedded("product").is_empty());
    assert_eq!(body.link("product:by-id").unwrap().href(), "/products/{id}");
    assert!(body.link("search").unwrap().is_templated());

    let wire = body.to_json();
    assert_eq!(wire["_links"]["product:by-id"]["templated"], json!(true));
}

#[tokio::test]
async fn test_entry_point_can_embed_products() {
    let response = service()
        .with_embedded_products(true)
        .handle(&format!("{CATALOG_BASE}/"))
        .await;
    let body = response.body();

    assert_eq!(body.embedded("product").len(), 4);
    assert_eq!(body.links("product").len(), 4);

    let lamp = &body.embedded("product")[0];
    assert_eq!(lamp.state()["name"], json!("Desk Lamp"));
    assert_eq!(lamp.self_link().unwrap().href(), "/products/1");
    assert_eq!(lamp.link("up").unwrap().href(), "/");
}

#[tokio::test]
async fn test_product_document() {
    let response = service().handle(&format!("{CATALOG_BASE}/products/3")).await;
    let body = response.body();

    assert_eq!(response.status(), 200);
    assert_eq!(response.max_age(), Some(30));
    assert_eq!(body.state()["name"], json!("Ceiling Light"));
    assert_eq!(body.state()["stock"], json!(3));
    assert_eq!(body.self_link().unwrap().title(), Some("Ceiling Light"));
    assert_eq!(body.link("up").unwrap().href(), "/");
}

#[tokio::test]
async fn test_search_embeds_matches() {
    let response = service()
        .handle(&format!("{CATALOG_BASE}/products?q=lamp&maxPrice=50"))
        .await;
    let body = response.body();

    assert_eq!(response.status(), 200);
    assert_eq!(body.state()["count"], json!(2));
    let names: Vec<_> = body
        .embedded("product")
        .iter()
        .map(|p| p.state()["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("Desk Lamp"), json!("Reading Lamp")]);
    assert!(body.self_link().unwrap().href().starts_with("/products?q=lamp&maxPrice="));
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let response = service().handle(&format!("{CATALOG_BASE}/products/42")).await;

    assert_eq!(response.status(), 404);
    assert_eq!(response.reason(), Some("Not Found"));
    assert_eq!(response.content_type(), VND_ERROR_CONTENT_TYPE);
    assert_eq!(response.body().state()["class"], json!("ResourceError"));
    assert_eq!(
        response.body().embedded("errors")[0].state()["message"],
        json!("Product 42 not found")
    );

    let http = response.to_http();
    assert_eq!(http.status(), 404);
}

#[tokio::test]
async fn test_invalid_id_and_unknown_path() {
    let service = service();

    let invalid = service.handle(&format!("{CATALOG_BASE}/products/lamp")).await;
    assert_eq!(invalid.status(), 400);

    let unknown = service.handle(&format!("{CATALOG_BASE}/orders")).await;
    assert_eq!(unknown.status(), 404);
}
