use halnav::client::{Navigation, RemoteLink, RemoteResource, TemplateArgs};
use halnav::declaration::{
    Cardinality, InterfaceDeclaration, ItemType, MethodDeclaration, ParameterDeclaration,
};
use halnav::mock::StubHttpClient;
use halnav::{HalApi, HalApiConfig, HalApiRuntime, HalError, HalResource, Link, Many, Maybe, Single};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const CATALOG: &str = "http://catalog.test/";

// --- Declarations & proxies ---

fn catalog() -> InterfaceDeclaration {
    InterfaceDeclaration::hal_api("Catalog")
        .entry_point()
        .method(MethodDeclaration::state("state", Cardinality::One, "CatalogState"))
        .method(MethodDeclaration::related(
            "items",
            "item",
            Cardinality::Many,
            ItemType::Resource(item),
        ))
        .method(
            MethodDeclaration::related(
                "item_by_id",
                "item:by-id",
                Cardinality::Optional,
                ItemType::Resource(item),
            )
            .param(ParameterDeclaration::variable("id", "id")),
        )
        .method(
            MethodDeclaration::related("search", "search", Cardinality::Optional, ItemType::Resource(item))
                .param(ParameterDeclaration::variables("query")),
        )
        .method(MethodDeclaration::related(
            "docs",
            "docs",
            Cardinality::Optional,
            ItemType::LinkableResource,
        ))
}

fn item() -> InterfaceDeclaration {
    InterfaceDeclaration::hal_api("Item")
        .method(MethodDeclaration::state("state", Cardinality::Optional, "ItemState"))
        .method(MethodDeclaration::link("create_link"))
}

#[derive(Debug, Deserialize, PartialEq)]
struct CatalogState {
    name: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct ItemState {
    id: u32,
    name: String,
}

#[derive(Serialize, Default)]
struct Query {
    q: Option<String>,
    color: Option<String>,
}

struct CatalogProxy(Navigation);

impl RemoteResource for CatalogProxy {
    fn declaration() -> InterfaceDeclaration {
        catalog()
    }

    fn from_navigation(navigation: Navigation) -> Self {
        Self(navigation)
    }

    fn navigation(&self) -> &Navigation {
        &self.0
    }
}

impl CatalogProxy {
    fn state(&self) -> Single<CatalogState> {
        self.0.state("state")
    }

    fn items(&self) -> Many<ItemProxy> {
        self.0.related("items")
    }

    fn item(&self, id: Option<u32>) -> Maybe<ItemProxy> {
        self.0.related_with("item_by_id", TemplateArgs::new().arg(id))
    }

    fn search(&self, query: Query) -> Maybe<ItemProxy> {
        self.0.related_with("search", TemplateArgs::new().arg(query))
    }

    fn docs(&self) -> Maybe<RemoteLink> {
        self.0.related("docs")
    }
}

struct ItemProxy(Navigation);

impl RemoteResource for ItemProxy {
    fn declaration() -> InterfaceDeclaration {
        item()
    }

    fn from_navigation(navigation: Navigation) -> Self {
        Self(navigation)
    }

    fn navigation(&self) -> &Navigation {
        &self.0
    }
}

impl ItemProxy {
    fn state(&self) -> Maybe<ItemState> {
        self.0.state("state")
    }
}

// --- Fixtures ---

fn item_document(id: u32, name: &str) -> HalResource {
    HalResource::from_state(json!({ "id": id, "name": name }))
        .unwrap()
        .with_link("self", Link::new(format!("http://catalog.test/items/{id}")).with_title(name))
}

fn catalog_document() -> HalResource {
    HalResource::from_state(json!({ "name": "Lamps" }))
        .unwrap()
        .with_link("self", Link::new(CATALOG).with_title("Catalog"))
        .with_link("item", Link::new("/items/1"))
        .with_link("item", Link::new("items/2"))
        .with_link("item:by-id", Link::new("/items/{id}"))
        .with_link("search", Link::new("/items{?q,color}"))
        .with_link("docs", Link::new("http://docs.test/catalog"))
}

fn request(stub: &StubHttpClient) -> HalApi {
    HalApiRuntime::new(HalApiConfig::default()).request("http://gateway.test/summary", stub.client())
}

// --- Tests ---

#[tokio::test]
async fn test_concurrent_calls_fetch_each_uri_once() {
    let mut stub = StubHttpClient::new().with_delay(Duration::from_millis(20));
    stub.serve(CATALOG, catalog_document());

    let api = request(&stub);
    let first: CatalogProxy = api.remote(CATALOG).unwrap();
    let second: CatalogProxy = api.remote(CATALOG).unwrap();

    let (a, b, items) = futures::join!(first.state(), second.state(), first.items().collect_all());
    assert_eq!(a.unwrap().name, "Lamps");
    assert_eq!(b.unwrap().name, "Lamps");
    assert_eq!(items.unwrap().len(), 2);

    assert_eq!(stub.fetch_count(CATALOG), 1);
    assert_eq!(stub.total_fetches(), 1);
}

#[tokio::test]
async fn test_proxies_are_lazy_and_resolve_relative_links() {
    let mut stub = StubHttpClient::new();
    stub.serve(CATALOG, catalog_document());
    stub.serve("http://catalog.test/items/1", item_document(1, "Desk lamp"));
    stub.serve("http://catalog.test/items/2", item_document(2, "Floor lamp"));

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();
    assert_eq!(stub.total_fetches(), 0);
    assert_eq!(catalog.create_link().href(), CATALOG);

    let items = catalog.items().collect_all().await.unwrap();
    let uris: Vec<_> = items.iter().map(|i| i.create_link().href().to_string()).collect();
    assert_eq!(uris, vec!["http://catalog.test/items/1", "http://catalog.test/items/2"]);
    assert_eq!(stub.total_fetches(), 1);

    let state = items[1].state().await.unwrap().unwrap();
    assert_eq!(state.name, "Floor lamp");
    assert_eq!(stub.fetch_count("http://catalog.test/items/2"), 1);
    assert_eq!(stub.fetch_count("http://catalog.test/items/1"), 0);
}

#[tokio::test]
async fn test_embedded_documents_take_precedence_over_links() {
    let mut stub = StubHttpClient::new();
    let document = catalog_document()
        .with_embedded("item", item_document(1, "Desk lamp"))
        .with_embedded("item", item_document(2, "Floor lamp"));
    stub.serve(CATALOG, document);

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();
    let items = catalog.items().collect_all().await.unwrap();

    assert_eq!(items.len(), 2);
    assert!(items[0].navigation().is_embedded());
    assert_eq!(items[0].create_link().href(), "http://catalog.test/items/1");
    let state = items[0].state().await.unwrap().unwrap();
    assert_eq!(state, ItemState { id: 1, name: "Desk lamp".into() });
    assert_eq!(stub.total_fetches(), 1);
}

#[tokio::test]
async fn test_template_expansion_and_placeholders() {
    let mut stub = StubHttpClient::new();
    stub.serve(CATALOG, catalog_document());
    stub.serve("http://catalog.test/items/7", item_document(7, "Reading lamp"));

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();

    let bound = catalog.item(Some(7)).await.unwrap().unwrap();
    assert_eq!(bound.create_link().href(), "http://catalog.test/items/7");
    assert_eq!(bound.state().await.unwrap().unwrap().id, 7);

    let unbound = catalog.item(None).await.unwrap().unwrap();
    let link = unbound.create_link();
    assert_eq!(link.href(), "http://catalog.test/items/{id}");
    assert!(link.is_templated());
    assert_eq!(stub.total_fetches(), 2);

    let query = Query {
        q: Some("lamp".into()),
        ..Default::default()
    };
    let search = catalog.search(query).await.unwrap().unwrap();
    assert_eq!(search.create_link().href(), "http://catalog.test/items?q=lamp{&color}");
}

#[tokio::test]
async fn test_unresolved_template_cannot_be_fetched() {
    let mut stub = StubHttpClient::new();
    stub.serve(CATALOG, catalog_document());

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();
    let unbound = catalog.item(None).await.unwrap().unwrap();

    match unbound.state().await {
        Err(HalError::Developer(message)) => assert!(message.contains("{id}")),
        other => panic!("expected a developer error, got {other:?}"),
    }
    assert_eq!(stub.fetch_count("http://catalog.test/items/{id}"), 0);
}

#[tokio::test]
async fn test_linkable_resource_relation() {
    let mut stub = StubHttpClient::new();
    stub.serve(CATALOG, catalog_document());

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();
    let docs = catalog.docs().await.unwrap().unwrap();
    assert_eq!(docs.create_link().href(), "http://docs.test/catalog");
    assert_eq!(stub.fetch_count("http://docs.test/catalog"), 0);
}

#[tokio::test]
async fn test_failed_fetch_is_retried_once() {
    let mut stub = StubHttpClient::new();
    stub.expect_get(CATALOG).return_transport_error("connection reset");
    stub.expect_get(CATALOG).return_hal(catalog_document());

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();

    let error = catalog.state().await.unwrap_err();
    let client = error.as_client_error().unwrap();
    assert_eq!(client.uri(), CATALOG);
    assert_eq!(client.status(), None);

    assert_eq!(catalog.state().await.unwrap().name, "Lamps");
    assert_eq!(catalog.state().await.unwrap().name, "Lamps");
    assert_eq!(stub.fetch_count(CATALOG), 2);
    stub.verify();
}

#[tokio::test]
async fn test_error_status_carries_upstream_body() {
    let mut stub = StubHttpClient::new();
    let body = HalResource::from_state(json!({ "message": "catalog is closed" })).unwrap();
    stub.expect_get(CATALOG).return_status(StatusCode::SERVICE_UNAVAILABLE, Some(body));

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();
    let error = catalog.state().await.unwrap_err();

    let client = error.as_client_error().unwrap();
    assert_eq!(client.status(), Some(503));
    assert_eq!(
        client.upstream_error().unwrap().state()["message"],
        json!("catalog is closed")
    );

    let response = api.render_error(&error);
    assert_eq!(response.status(), 503);
    assert_eq!(response.body().link("about").unwrap().href(), CATALOG);
    assert_eq!(
        response.body().embedded("errors")[0].state()["message"],
        json!("catalog is closed")
    );
    stub.verify();
}

#[tokio::test]
async fn test_unparsable_body_is_a_client_error() {
    let mut stub = StubHttpClient::new();
    stub.expect_get(CATALOG).return_body(StatusCode::OK, b"<html>not hal</html>");

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();
    let error = catalog.state().await.unwrap_err();
    assert_eq!(error.as_client_error().unwrap().status(), Some(200));
}

#[tokio::test]
async fn test_wrong_proxy_type_is_a_developer_error() {
    let mut stub = StubHttpClient::new();
    stub.serve(CATALOG, catalog_document());

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();
    let wrong: Many<CatalogProxy> = catalog.0.related("items");

    match wrong.collect_all().await {
        Err(HalError::Developer(message)) => assert!(message.contains("Catalog#items")),
        other => panic!("expected a developer error, got {:?}", other.map(|v| v.len())),
    }
    assert_eq!(stub.total_fetches(), 0);
}

#[tokio::test]
async fn test_upstream_max_age_limits_the_response() {
    let mut stub = StubHttpClient::new();
    stub.serve_with_max_age(CATALOG, catalog_document(), 60);
    stub.serve_with_max_age("http://catalog.test/items/1", item_document(1, "Desk lamp"), 30);

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();
    catalog.state().await.unwrap();
    assert_eq!(api.metrics().response_max_age(), Some(60));

    let items = catalog.items().collect_all().await.unwrap();
    items[0].state().await.unwrap();
    assert_eq!(api.metrics().response_max_age(), Some(30));

    let titles: Vec<_> = api.metrics().responses().into_iter().map(|r| r.title).collect();
    assert_eq!(titles, vec![Some("Catalog".to_string()), Some("Desk lamp".to_string())]);
}

#[tokio::test]
async fn test_proxy_renders_as_server_resource() {
    let mut stub = StubHttpClient::new();
    stub.serve(CATALOG, catalog_document());

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();
    let response = api.render(catalog.navigation().clone()).await.unwrap();
    let body = response.body();

    assert_eq!(body.state()["name"], json!("Lamps"));
    assert_eq!(body.self_link().unwrap().href(), CATALOG);
    let items: Vec<_> = body.links("item").iter().map(Link::href).collect();
    assert_eq!(items, vec!["http://catalog.test/items/1", "http://catalog.test/items/2"]);
    assert_eq!(body.link("item:by-id").unwrap().href(), "http://catalog.test/items/{id}");
    assert_eq!(body.link("docs").unwrap().href(), "http://docs.test/catalog");
    assert_eq!(stub.total_fetches(), 1);
}

#[tokio::test]
async fn test_embedded_document_without_self_link_is_embedded_again() {
    let mut stub = StubHttpClient::new();
    let anonymous = HalResource::from_state(json!({ "id": 7, "name": "Spare bulb" })).unwrap();
    let document = HalResource::from_state(json!({ "name": "Lamps" }))
        .unwrap()
        .with_link("self", Link::new(CATALOG))
        .with_embedded("item", anonymous);
    stub.serve(CATALOG, document);

    let api = request(&stub);
    let catalog: CatalogProxy = api.remote(CATALOG).unwrap();
    let items = catalog.items().collect_all().await.unwrap();
    assert_eq!(items[0].navigation().uri(), None);

    let response = api.render(catalog.navigation().clone()).await.unwrap();
    let body = response.body();

    assert!(body.links("item").is_empty());
    assert!(body.to_json()["_links"].get("item").is_none());
    let embedded = &body.embedded("item")[0];
    assert_eq!(embedded.state()["name"], json!("Spare bulb"));
    assert!(embedded.self_link().is_none());
    assert_eq!(stub.total_fetches(), 1);
}
