use halnav::declaration::{
    self, Cardinality, InterfaceDeclaration, InterfaceFn, ItemType, MethodDeclaration,
    ParameterDeclaration,
};
use halnav::descriptor::MethodDescriptor;
use halnav::mock::StubHttpClient;
use halnav::resource::{EmbeddableResource, LinkableResource, MethodOutput, ResourceImpl};
use halnav::response::VND_ERROR_CONTENT_TYPE;
use halnav::{HalApi, HalApiConfig, HalApiRuntime, HalError, Link, Many, Maybe, Result, Single};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// --- Declarations ---

fn page() -> InterfaceDeclaration {
    InterfaceDeclaration::hal_api("Page")
        .method(MethodDeclaration::state("state", Cardinality::One, "PageState"))
        .method(MethodDeclaration::link("create_link"))
        .method(MethodDeclaration::related(
            "children",
            "item",
            Cardinality::Many,
            ItemType::Resource(child),
        ))
        .method(
            MethodDeclaration::related(
                "child_by_id",
                "item:by-id",
                Cardinality::Optional,
                ItemType::Resource(child),
            )
            .param(ParameterDeclaration::variable("id", "id")),
        )
        .method(MethodDeclaration::related(
            "author",
            "author",
            Cardinality::Optional,
            ItemType::LinkableResource,
        ))
}

fn child() -> InterfaceDeclaration {
    InterfaceDeclaration::hal_api("Child")
        .with_content_type("application/vnd.child+json")
        .method(MethodDeclaration::state("state", Cardinality::One, "ChildState"))
        .method(MethodDeclaration::link("create_link"))
}

#[derive(Serialize)]
struct PageState {
    title: &'static str,
}

#[derive(Serialize)]
struct ChildState {
    id: u32,
}

// --- Resources ---

#[derive(Clone, Default)]
struct ChildResource {
    id: Option<u32>,
    embedded: bool,
    linked_when_embedded: bool,
    delay: Duration,
    fail: bool,
}

impl ChildResource {
    fn linked(id: u32) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    fn embedded(id: u32, linked_when_embedded: bool) -> Self {
        Self {
            id: Some(id),
            embedded: true,
            linked_when_embedded,
            ..Default::default()
        }
    }

    fn delayed(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }
}

impl LinkableResource for ChildResource {
    fn create_link(&self) -> Link {
        match self.id {
            Some(id) => Link::new(format!("/children/{id}")),
            None => Link::new("/children/{id}"),
        }
    }
}

impl EmbeddableResource for ChildResource {
    fn is_embedded(&self) -> bool {
        self.embedded
    }

    fn is_linked_when_embedded(&self) -> bool {
        self.linked_when_embedded
    }
}

impl ResourceImpl for ChildResource {
    fn interfaces(&self) -> Vec<InterfaceFn> {
        vec![child]
    }

    fn invoke(self: Arc<Self>, method: &MethodDescriptor) -> Result<MethodOutput> {
        match method.name() {
            "state" => {
                let this = self.clone();
                Ok(MethodOutput::state(Single::new(async move {
                    tokio::time::sleep(this.delay).await;
                    if this.fail {
                        return Err(HalError::resource(std::io::Error::other("child store offline")));
                    }
                    Ok(ChildState {
                        id: this.id.unwrap_or_default(),
                    })
                })))
            }
            other => Err(HalError::developer(format!("Child has no method {other}"))),
        }
    }

    fn as_linkable(&self) -> Option<&dyn LinkableResource> {
        Some(self)
    }

    fn as_embeddable(&self) -> Option<&dyn EmbeddableResource> {
        Some(self)
    }
}

/// A related resource without any capability.
struct Opaque;

impl ResourceImpl for Opaque {
    fn interfaces(&self) -> Vec<InterfaceFn> {
        vec![child]
    }

    fn invoke(self: Arc<Self>, _method: &MethodDescriptor) -> Result<MethodOutput> {
        Err(HalError::developer("not invocable"))
    }
}

struct AuthorLink;

impl LinkableResource for AuthorLink {
    fn create_link(&self) -> Link {
        Link::new("/people/ada").with_title("Ada")
    }
}

impl ResourceImpl for AuthorLink {
    fn interfaces(&self) -> Vec<InterfaceFn> {
        vec![declaration::linkable_resource]
    }

    fn invoke(self: Arc<Self>, _method: &MethodDescriptor) -> Result<MethodOutput> {
        Err(HalError::developer("a link has no methods"))
    }

    fn as_linkable(&self) -> Option<&dyn LinkableResource> {
        Some(self)
    }
}

#[derive(Clone, Default)]
struct PageResource {
    children: Vec<Arc<dyn ResourceImpl>>,
    with_author: bool,
}

impl PageResource {
    fn with_children(children: Vec<ChildResource>) -> Self {
        Self {
            children: children
                .into_iter()
                .map(|c| Arc::new(c) as Arc<dyn ResourceImpl>)
                .collect(),
            with_author: false,
        }
    }
}

impl LinkableResource for PageResource {
    fn create_link(&self) -> Link {
        Link::new("/page")
    }
}

impl ResourceImpl for PageResource {
    fn interfaces(&self) -> Vec<InterfaceFn> {
        vec![page]
    }

    fn invoke(self: Arc<Self>, method: &MethodDescriptor) -> Result<MethodOutput> {
        match method.name() {
            "state" => Ok(MethodOutput::state(Single::ready(PageState { title: "Front" }))),
            "children" => Ok(MethodOutput::related(Many::from_vec(self.children.clone()))),
            "child_by_id" => Ok(MethodOutput::related(Maybe::ready(Some(ChildResource {
                id: None,
                embedded: true,
                ..Default::default()
            })))),
            "author" => {
                let author = self.with_author.then_some(AuthorLink);
                Ok(MethodOutput::related(Maybe::ready(author)))
            }
            other => Err(HalError::developer(format!("Page has no method {other}"))),
        }
    }

    fn as_linkable(&self) -> Option<&dyn LinkableResource> {
        Some(self)
    }
}

fn api(uri: &str) -> HalApi {
    HalApiRuntime::new(HalApiConfig::default()).request(uri, StubHttpClient::new().client())
}

fn hrefs(links: &[Link]) -> Vec<&str> {
    links.iter().map(Link::href).collect()
}

// --- Tests ---

#[tokio::test]
async fn test_embedded_resource_is_also_linked_when_requested() {
    let resource = PageResource::with_children(vec![
        ChildResource::embedded(1, true),
        ChildResource::linked(2),
    ]);

    let response = api("http://svc/page").render(resource).await.unwrap();
    let body = response.body();

    assert_eq!(response.status(), 200);
    assert_eq!(body.state()["title"], json!("Front"));
    assert_eq!(body.self_link().unwrap().href(), "/page");
    assert_eq!(hrefs(body.links("item")), vec!["/children/1", "/children/2"]);
    assert_eq!(body.embedded("item").len(), 1);

    let embedded = &body.embedded("item")[0];
    assert_eq!(embedded.state()["id"], json!(1));
    assert_eq!(embedded.self_link().unwrap().href(), "/children/1");

    let wire = body.to_json();
    assert!(wire["_links"]["item"].is_array());
    assert!(wire["_embedded"]["item"].is_object());
}

#[tokio::test]
async fn test_embedded_resource_without_link() {
    let resource = PageResource::with_children(vec![
        ChildResource::embedded(1, false),
        ChildResource::linked(2),
    ]);

    let response = api("http://svc/page").render(resource).await.unwrap();
    let body = response.body();

    assert_eq!(hrefs(body.links("item")), vec!["/children/2"]);
    assert_eq!(body.embedded("item").len(), 1);
    assert!(body.to_json()["_links"]["item"].is_object());
}

#[tokio::test]
async fn test_items_keep_emission_order_regardless_of_completion() {
    let resource = PageResource::with_children(vec![
        ChildResource::embedded(3, false).delayed(30),
        ChildResource::embedded(1, false),
        ChildResource::embedded(2, false).delayed(10),
    ]);

    let response = api("http://svc/page").render(resource).await.unwrap();
    let ids: Vec<_> = response
        .body()
        .embedded("item")
        .iter()
        .map(|doc| doc.state()["id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(3), json!(1), json!(2)]);
}

#[tokio::test]
async fn test_parameterized_relation_is_link_only() {
    let resource = PageResource::with_children(Vec::new());

    let response = api("http://svc/page").render(resource).await.unwrap();
    let body = response.body();

    let template = body.link("item:by-id").unwrap();
    assert_eq!(template.href(), "/children/{id}");
    assert!(template.is_templated());
    assert!(body.embedded("item:by-id").is_empty());
    assert!(body.links("item").is_empty());
}

#[tokio::test]
async fn test_linkable_resource_relation_and_absent_optional() {
    let mut resource = PageResource::with_children(Vec::new());
    let response = api("http://svc/page").render(resource.clone()).await.unwrap();
    assert!(response.body().link("author").is_none());

    resource.with_author = true;
    let response = api("http://svc/page").render(resource).await.unwrap();
    let author = response.body().link("author").unwrap();
    assert_eq!(author.href(), "/people/ada");
    assert_eq!(author.title(), Some("Ada"));
}

#[tokio::test]
async fn test_failing_embedded_state_fails_the_whole_render() {
    let failing = ChildResource {
        fail: true,
        ..ChildResource::embedded(2, true)
    };
    let resource = PageResource::with_children(vec![ChildResource::embedded(1, true), failing]);

    let api = api("http://svc/page");
    let error = api.render(resource.clone()).await.unwrap_err();
    assert_eq!(error.kind(), "ResourceError");

    let response = api.render_response(resource).await;
    assert_eq!(response.status(), 500);
    assert_eq!(response.content_type(), VND_ERROR_CONTENT_TYPE);
    assert_eq!(response.body().state()["class"], json!("ResourceError"));
    assert_eq!(
        response.body().embedded("errors")[0].state()["message"],
        json!("child store offline")
    );
}

#[tokio::test]
async fn test_resource_without_capabilities_is_a_developer_error() {
    let resource = PageResource {
        children: vec![Arc::new(Opaque)],
        with_author: false,
    };

    match api("http://svc/page").render(resource).await {
        Err(HalError::Developer(message)) => assert!(message.contains("Page#children")),
        other => panic!("expected a developer error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_declared_content_type_and_diagnostics() {
    let response = api("http://svc/children/4?embedDiagnostics")
        .render(ChildResource::linked(4))
        .await
        .unwrap();
    assert_eq!(response.content_type(), "application/vnd.child+json");

    let diagnostics = response.body().embedded("halnav:diagnostics");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].state()["title"],
        json!("Diagnostics for /children/4")
    );
    assert_eq!(diagnostics[0].state()["upstreamRequests"], json!(0));

    let plain = api("http://svc/page")
        .render(PageResource::default())
        .await
        .unwrap();
    assert_eq!(plain.content_type(), "application/hal+json");
    assert!(plain.body().embedded("halnav:diagnostics").is_empty());
}

#[tokio::test]
async fn test_max_age_defaults_and_resource_override() {
    let runtime = HalApiRuntime::new(
        HalApiConfig::default().with_default_max_age(Duration::from_secs(600)),
    );

    let api = runtime.request("http://svc/page", StubHttpClient::new().client());
    let response = api.render(PageResource::default()).await.unwrap();
    assert_eq!(response.max_age(), Some(600));

    let api = runtime.request("http://svc/page", StubHttpClient::new().client());
    api.set_response_max_age(Duration::from_secs(45));
    let response = api.render(PageResource::default()).await.unwrap();
    assert_eq!(response.max_age(), Some(45));
    assert_eq!(response.cache_control_header().as_deref(), Some("max-age=45"));
}

// --- Layout: a single-valued relation next to a list ---

fn layout() -> InterfaceDeclaration {
    InterfaceDeclaration::hal_api("Layout")
        .method(MethodDeclaration::state("state", Cardinality::One, "PageState"))
        .method(MethodDeclaration::related(
            "main",
            "main",
            Cardinality::One,
            ItemType::Resource(child),
        ))
        .method(MethodDeclaration::related(
            "aside",
            "aside",
            Cardinality::Many,
            ItemType::Resource(child),
        ))
}

#[derive(Clone, Default)]
struct LayoutResource {
    main: Vec<ChildResource>,
    aside: Vec<ChildResource>,
    state_delay: Duration,
}

impl ResourceImpl for LayoutResource {
    fn interfaces(&self) -> Vec<InterfaceFn> {
        vec![layout]
    }

    fn invoke(self: Arc<Self>, method: &MethodDescriptor) -> Result<MethodOutput> {
        match method.name() {
            "state" => {
                let delay = self.state_delay;
                Ok(MethodOutput::state(Single::new(async move {
                    tokio::time::sleep(delay).await;
                    Ok(PageState { title: "Layout" })
                })))
            }
            "main" => Ok(MethodOutput::related(Many::from_vec(self.main.clone()))),
            "aside" => Ok(MethodOutput::related(Many::from_vec(self.aside.clone()))),
            other => Err(HalError::developer(format!("Layout has no method {other}"))),
        }
    }
}

#[tokio::test]
async fn test_single_valued_relation_must_emit_exactly_one() {
    match api("http://svc/layout").render(LayoutResource::default()).await {
        Err(HalError::Developer(message)) => assert!(message.contains("Layout#main"), "{message}"),
        other => panic!("expected a developer error, got {other:?}"),
    }

    let crowded = LayoutResource {
        main: vec![ChildResource::linked(1), ChildResource::linked(2)],
        ..Default::default()
    };
    match api("http://svc/layout").render(crowded).await {
        Err(HalError::Developer(message)) => assert!(message.contains("Layout#main"), "{message}"),
        other => panic!("expected a developer error, got {other:?}"),
    }

    let valid = LayoutResource {
        main: vec![ChildResource::linked(1)],
        ..Default::default()
    };
    let response = api("http://svc/layout").render(valid).await.unwrap();
    assert_eq!(response.body().link("main").unwrap().href(), "/children/1");
    assert!(response.body().links("aside").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_state_and_relations_render_concurrently() {
    let resource = LayoutResource {
        main: vec![ChildResource::embedded(1, false).delayed(50)],
        aside: vec![
            ChildResource::embedded(2, false).delayed(50),
            ChildResource::embedded(3, false).delayed(50),
        ],
        state_delay: Duration::from_millis(50),
    };

    let started = tokio::time::Instant::now();
    let response = api("http://svc/layout").render(resource).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.body().state()["title"], json!("Layout"));
    assert_eq!(response.body().embedded("main").len(), 1);
    assert_eq!(response.body().embedded("aside").len(), 2);
    assert!(elapsed < Duration::from_millis(100), "rendered in {elapsed:?}");
}
