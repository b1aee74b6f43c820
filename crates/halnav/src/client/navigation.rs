//! # Client Navigation Proxies
//!
//! A navigation proxy is a small hand-written type implementing
//! [`RemoteResource`]. It wraps a [`Navigation`], the shared navigation state (the
//! bound URI or embedded document plus the request's [`ProxyFactory`]), and
//! forwards every interface method to it:
//!
//! ```rust,ignore
//! pub struct CatalogProxy(Navigation);
//!
//! impl RemoteResource for CatalogProxy {
//!     fn declaration() -> InterfaceDeclaration { catalog() }
//!     fn from_navigation(navigation: Navigation) -> Self { Self(navigation) }
//!     fn navigation(&self) -> &Navigation { &self.0 }
//! }
//!
//! impl CatalogProxy {
//!     pub fn state(&self) -> Single<CatalogState> { self.0.state("state") }
//!     pub fn items(&self) -> Many<ItemProxy> { self.0.related("items") }
//!     pub fn item(&self, id: u32) -> Maybe<ItemProxy> {
//!         self.0.related_with("item_by_id", TemplateArgs::new().arg(id))
//!     }
//! }
//! ```
//!
//! ## Behavior per role
//!
//! | Method | Network access |
//! |--------|----------------|
//! | link | none, the link is the bound URI |
//! | state / representation | fetches (or joins the fetch of) the bound URI |
//! | related, no parameters | fetches the document, then yields embedded documents if the relation has any, otherwise one lazy proxy per link |
//! | related, with parameters | fetches the document, expands the relation's link template; the resulting proxies fetch nothing until used |
//!
//! Relative hrefs are resolved against the URI of the document they appear in, so
//! the fetch cache is always keyed by fully qualified URIs.

use crate::client::loader::CachingResourceLoader;
use crate::declaration::{self, InterfaceDeclaration, InterfaceFn, ItemType};
use crate::descriptor::{MethodDescriptor, MethodRole, ResourceDescriptor, TypeRegistry};
use crate::error::{ClientError, HalError, Result};
use crate::hal::HalResource;
use crate::annotation::TemplateParameter;
use crate::link::Link;
use crate::resource::{EmbeddableResource, LinkableResource, MethodOutput, ResourceImpl};
use crate::shape::{FromSequence, HalStream};
use crate::uri_template::{self, UriTemplate};
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::future;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// A client-side proxy type for one declared resource interface.
pub trait RemoteResource: Send + Sync + Sized + 'static {
    fn declaration() -> InterfaceDeclaration;

    fn from_navigation(navigation: Navigation) -> Self;

    fn navigation(&self) -> &Navigation;

    /// A link to the remote resource, without network access.
    fn create_link(&self) -> Link {
        self.navigation().create_link()
    }
}

/// Proxy for related resources declared as [`ItemType::LinkableResource`]: they are
/// known only by their link.
pub struct RemoteLink(Navigation);

impl RemoteResource for RemoteLink {
    fn declaration() -> InterfaceDeclaration {
        declaration::linkable_resource()
    }

    fn from_navigation(navigation: Navigation) -> Self {
        Self(navigation)
    }

    fn navigation(&self) -> &Navigation {
        &self.0
    }
}

/// Arguments of a parameterized related-resource method, in parameter order.
#[derive(Debug, Clone, Default)]
pub struct TemplateArgs {
    values: Vec<std::result::Result<Value, String>>,
}

impl TemplateArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next argument. `None` leaves the variable unbound.
    pub fn arg<T: Serialize>(mut self, value: T) -> Self {
        self.values
            .push(serde_json::to_value(value).map_err(|e| e.to_string()));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Creates navigation proxies sharing one request's document cache.
#[derive(Clone)]
pub struct ProxyFactory {
    registry: Arc<TypeRegistry>,
    loader: Arc<CachingResourceLoader>,
}

impl ProxyFactory {
    pub fn new(registry: Arc<TypeRegistry>, loader: Arc<CachingResourceLoader>) -> Self {
        Self { registry, loader }
    }

    /// A proxy for the resource at `uri`. Nothing is fetched until a state or
    /// related-resource method is called.
    pub fn create_proxy<P: RemoteResource>(&self, uri: &str) -> Result<P> {
        let navigation = self.navigation(P::declaration, Target::Uri(uri.to_string()))?;
        Ok(P::from_navigation(navigation))
    }

    pub fn loader(&self) -> &Arc<CachingResourceLoader> {
        &self.loader
    }

    fn navigation(&self, interface: InterfaceFn, target: Target) -> Result<Navigation> {
        Ok(Navigation {
            factory: self.clone(),
            interface,
            descriptor: self.registry.describe(interface)?,
            target,
        })
    }
}

#[derive(Clone)]
enum Target {
    Uri(String),
    /// An embedded document and its self link resolved against the embedding document.
    Embedded {
        document: Arc<HalResource>,
        uri: Option<String>,
    },
}

/// The shared navigation state behind every proxy.
#[derive(Clone)]
pub struct Navigation {
    factory: ProxyFactory,
    interface: InterfaceFn,
    descriptor: Arc<ResourceDescriptor>,
    target: Target,
}

impl std::fmt::Debug for Navigation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigation")
            .field("interface", &self.descriptor.interface())
            .field("uri", &self.uri())
            .field("embedded", &self.is_embedded())
            .finish()
    }
}

impl Navigation {
    pub fn descriptor(&self) -> &Arc<ResourceDescriptor> {
        &self.descriptor
    }

    /// The bound URI, or the resolved self link of an embedded document.
    pub fn uri(&self) -> Option<&str> {
        match &self.target {
            Target::Uri(uri) => Some(uri),
            Target::Embedded { uri, .. } => uri.as_deref(),
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.target, Target::Embedded { .. })
    }

    /// The link to the bound URI. Only meaningful when [`uri`](Self::uri) is `Some`;
    /// a proxy rendered as a server resource is never linked otherwise.
    pub fn create_link(&self) -> Link {
        match &self.target {
            Target::Uri(uri) => Link::new(uri.as_str()),
            Target::Embedded { document, uri } => {
                let link = document.self_link().cloned().unwrap_or_default();
                match uri {
                    Some(uri) => link.with_href(uri.as_str()),
                    None => link,
                }
            }
        }
    }

    /// The complete document this proxy is bound to.
    pub async fn document(&self) -> Result<Arc<HalResource>> {
        match &self.target {
            Target::Embedded { document, .. } => Ok(document.clone()),
            Target::Uri(uri) => self.factory.loader.load(uri).await,
        }
    }

    /// Decodes the resource state through the declared state method.
    pub fn state<T, S>(&self, method: &str) -> S
    where
        T: DeserializeOwned + Send + 'static,
        S: FromSequence<T>,
    {
        S::from_sequence(self.state_sequence(method), method)
    }

    /// The raw document through the declared representation method.
    pub fn representation<S>(&self, method: &str) -> S
    where
        S: FromSequence<HalResource>,
    {
        let sequence = match self.method(method, MethodRole::Representation) {
            Ok(_) => {
                let navigation = self.clone();
                stream::once(async move {
                    navigation.document().await.map(|d| d.as_ref().clone())
                })
                .boxed()
            }
            Err(e) => failed(e),
        };
        S::from_sequence(sequence, method)
    }

    /// Follows a related-resource method without parameters.
    pub fn related<P, S>(&self, method: &str) -> S
    where
        P: RemoteResource,
        S: FromSequence<P>,
    {
        self.related_proxies(method, None)
    }

    /// Follows a parameterized related-resource method.
    pub fn related_with<P, S>(&self, method: &str, args: TemplateArgs) -> S
    where
        P: RemoteResource,
        S: FromSequence<P>,
    {
        self.related_proxies(method, Some(args))
    }

    fn related_proxies<P, S>(&self, method: &str, args: Option<TemplateArgs>) -> S
    where
        P: RemoteResource,
        S: FromSequence<P>,
    {
        let sequence = match self.typed_related_method::<P>(method, args.as_ref()) {
            Ok((descriptor, variables)) => {
                let navigation = self.clone();
                stream::once(async move { navigation.related_targets(&descriptor, variables).await })
                    .map_ok(|targets| stream::iter(targets.into_iter().map(Ok::<_, HalError>)))
                    .try_flatten()
                    .map_ok(P::from_navigation)
                    .boxed()
            }
            Err(e) => failed(e),
        };
        S::from_sequence(sequence, method)
    }

    fn method(&self, name: &str, role: MethodRole) -> Result<MethodDescriptor> {
        match self.descriptor.method(name) {
            Some(method) if method.role() == role => Ok(method.clone()),
            _ => Err(HalError::developer(format!(
                "{} has no {role:?} method named {name}",
                self.descriptor.interface()
            ))),
        }
    }

    /// Validates the call and builds the template variables from the arguments.
    fn typed_related_method<P: RemoteResource>(
        &self,
        name: &str,
        args: Option<&TemplateArgs>,
    ) -> Result<(MethodDescriptor, Option<Map<String, Value>>)> {
        let method = self.method(name, MethodRole::Related)?;
        let target = target_interface(&method)?;
        let expected = target().name();
        let requested = P::declaration().name();
        if expected != requested {
            return Err(HalError::developer(format!(
                "{} emits {expected}, not {requested}",
                method.qualified_name()
            )));
        }

        let variables = match args {
            None if method.is_templated() => {
                return Err(HalError::developer(format!(
                    "{} requires template arguments",
                    method.qualified_name()
                )))
            }
            None => None,
            Some(args) => Some(template_variables(&method, args)?),
        };
        Ok((method, variables))
    }

    async fn related_targets(
        &self,
        method: &MethodDescriptor,
        variables: Option<Map<String, Value>>,
    ) -> Result<Vec<Navigation>> {
        let interface = target_interface(method)?;
        let document = self.document().await?;
        let relation = method.relation();
        let base = self.uri().map(str::to_string);

        if method.is_templated() {
            let variables = variables.unwrap_or_default();
            return document
                .links(relation)
                .iter()
                .map(|link| {
                    let href = UriTemplate::parse(link.href())
                        .bind_all(&variables)
                        .expand_partial();
                    let uri = resolve(base.as_deref(), &href);
                    debug!(relation, uri = %uri, "Expanded link template");
                    self.factory.navigation(interface, Target::Uri(uri))
                })
                .collect();
        }

        let embedded = document.embedded(relation);
        if !embedded.is_empty() {
            debug!(relation, count = embedded.len(), "Using embedded resources");
            return embedded
                .iter()
                .map(|doc| {
                    let uri = doc.self_link().map(|l| resolve(base.as_deref(), l.href()));
                    let target = Target::Embedded {
                        document: Arc::new(doc.clone()),
                        uri,
                    };
                    self.factory.navigation(interface, target)
                })
                .collect();
        }

        document
            .links(relation)
            .iter()
            .filter(|link| !link.is_templated())
            .map(|link| {
                let uri = resolve(base.as_deref(), link.href());
                self.factory.navigation(interface, Target::Uri(uri))
            })
            .collect()
    }

    fn state_sequence<T>(&self, method: &str) -> HalStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let descriptor = match self.method(method, MethodRole::State) {
            Ok(descriptor) => descriptor,
            Err(e) => return failed(e),
        };
        let navigation = self.clone();
        stream::once(async move { navigation.decode_state::<T>(&descriptor).await })
            .filter_map(|result| future::ready(result.transpose()))
            .boxed()
    }

    /// `Ok(None)` for an empty state of an optional state method.
    async fn decode_state<T: DeserializeOwned>(
        &self,
        method: &MethodDescriptor,
    ) -> Result<Option<T>> {
        let document = self.document().await?;
        if document.state().is_empty() && method.cardinality() != declaration::Cardinality::One {
            return Ok(None);
        }
        serde_json::from_value(document.state_value())
            .map(Some)
            .map_err(|e| {
                let uri = self.uri().unwrap_or_default();
                ClientError::new(
                    format!("Failed to decode the state of {uri}: {e}"),
                    uri,
                )
                .with_cause(Arc::new(e))
                .into()
            })
    }

    fn raw_related(&self, method: &MethodDescriptor) -> HalStream<Arc<dyn ResourceImpl>> {
        let navigation = self.clone();
        let method = method.clone();
        stream::once(async move {
            let variables = method.is_templated().then(Map::new);
            navigation.related_targets(&method, variables).await
        })
        .map_ok(|targets| {
            stream::iter(
                targets
                    .into_iter()
                    .map(|t| Ok(Arc::new(t) as Arc<dyn ResourceImpl>)),
            )
        })
        .try_flatten()
        .boxed()
    }
}

impl LinkableResource for Navigation {
    fn create_link(&self) -> Link {
        Navigation::create_link(self)
    }
}

/// A proxy can be rendered as a server-side resource: it forwards its state and
/// relations from the upstream document and links to the upstream URI.
impl ResourceImpl for Navigation {
    fn interfaces(&self) -> Vec<InterfaceFn> {
        vec![self.interface]
    }

    fn invoke(self: Arc<Self>, method: &MethodDescriptor) -> Result<MethodOutput> {
        match method.role() {
            MethodRole::State => {
                let sequence = self.state_sequence::<Value>(method.name());
                Ok(MethodOutput::State(sequence))
            }
            MethodRole::Representation => {
                let navigation = self.clone();
                Ok(MethodOutput::Representation(
                    stream::once(async move {
                        navigation.document().await.map(|d| d.as_ref().clone())
                    })
                    .boxed(),
                ))
            }
            MethodRole::Related => Ok(MethodOutput::Related(self.raw_related(method))),
            role => Err(HalError::developer(format!(
                "{} cannot be invoked as {role:?}",
                method.qualified_name()
            ))),
        }
    }

    fn as_linkable(&self) -> Option<&dyn LinkableResource> {
        self.uri().map(|_| self as &dyn LinkableResource)
    }

    /// An embedded document without a self link has nothing to link to, so it
    /// is embedded again instead.
    fn as_embeddable(&self) -> Option<&dyn EmbeddableResource> {
        match self.uri() {
            Some(_) => None,
            None => Some(self),
        }
    }
}

impl EmbeddableResource for Navigation {
    fn is_linked_when_embedded(&self) -> bool {
        false
    }
}

fn failed<T: Send + 'static>(error: HalError) -> HalStream<T> {
    stream::once(future::ready(Err(error))).boxed()
}

fn target_interface(method: &MethodDescriptor) -> Result<InterfaceFn> {
    match method.item() {
        ItemType::Resource(interface) => Ok(interface),
        ItemType::LinkableResource => Ok(declaration::linkable_resource),
        other => Err(HalError::developer(format!(
            "{} emits {other:?}, which is not a resource",
            method.qualified_name()
        ))),
    }
}

fn template_variables(method: &MethodDescriptor, args: &TemplateArgs) -> Result<Map<String, Value>> {
    if args.len() != method.parameters().len() {
        return Err(HalError::developer(format!(
            "{} takes {} template arguments, got {}",
            method.qualified_name(),
            method.parameters().len(),
            args.len()
        )));
    }

    let mut variables = Map::new();
    for ((name, parameter), value) in method.parameters().iter().zip(&args.values) {
        let value = value.clone().map_err(|e| {
            HalError::developer(format!(
                "argument '{name}' of {} cannot be serialized: {e}",
                method.qualified_name()
            ))
        })?;
        match parameter {
            TemplateParameter::Variable(variable) => {
                variables.insert(variable.clone(), value);
            }
            TemplateParameter::Aggregate => match value {
                Value::Object(fields) => variables.extend(fields),
                Value::Null => {}
                other => {
                    return Err(HalError::developer(format!(
                        "argument '{name}' of {} must be an object of template variables, got {other}",
                        method.qualified_name()
                    )))
                }
            },
        }
    }
    Ok(variables)
}

/// Resolves `href` against the URI of the document it was found in.
///
/// Templates are never passed through the URL parser, which would percent-encode
/// their braces; a root-relative template is prefixed with the base origin.
fn resolve(base: Option<&str>, href: &str) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    let Some(base) = base.and_then(|b| Url::parse(b).ok()) else {
        return href.to_string();
    };
    if uri_template::has_expressions(href) {
        return match href.strip_prefix('/') {
            Some(path) => format!("{}/{path}", base.origin().ascii_serialization()),
            None => href.to_string(),
        };
    }
    base.join(href)
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_hrefs() {
        let base = Some("http://catalog.test/items?page=2");
        assert_eq!(resolve(base, "/items/1"), "http://catalog.test/items/1");
        assert_eq!(resolve(base, "3"), "http://catalog.test/3");
        assert_eq!(resolve(base, "http://other.test/x"), "http://other.test/x");
        assert_eq!(
            resolve(base, "/items/{id}{?q}"),
            "http://catalog.test/items/{id}{?q}"
        );
        assert_eq!(resolve(None, "/items/1"), "/items/1");
    }

    #[test]
    fn test_template_args_map_to_declared_variables() {
        use crate::annotation::CompositeAnnotationSupport;
        use crate::declaration::{Cardinality, MethodDeclaration, ParameterDeclaration};

        fn search() -> InterfaceDeclaration {
            InterfaceDeclaration::hal_api("Search").method(
                MethodDeclaration::related("find", "item", Cardinality::Many, ItemType::Resource(search))
                    .param(ParameterDeclaration::variable("query", "q"))
                    .param(ParameterDeclaration::variables("filter")),
            )
        }

        let registry = TypeRegistry::new(Arc::new(CompositeAnnotationSupport::with_default_strategies()));
        let descriptor = registry.describe(search).unwrap();
        let method = descriptor.method("find").unwrap();

        #[derive(Serialize)]
        struct Filter {
            color: &'static str,
            size: Option<u32>,
        }

        let args = TemplateArgs::new()
            .arg("lamp")
            .arg(Filter { color: "red", size: None });
        let variables = template_variables(method, &args).unwrap();
        assert_eq!(variables["q"], Value::from("lamp"));
        assert_eq!(variables["color"], Value::from("red"));
        assert_eq!(variables["size"], Value::Null);

        let too_few = TemplateArgs::new().arg("lamp");
        assert!(template_variables(method, &too_few).is_err());
    }
}
