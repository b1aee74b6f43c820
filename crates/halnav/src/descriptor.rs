//! # Type Descriptor Registry
//!
//! The registry turns an [`InterfaceDeclaration`] into a validated, immutable
//! [`ResourceDescriptor`] that tells the renderer and the navigation proxies what
//! every declared method is for.
//!
//! ## Method Roles
//!
//! | Role | Recognized by | At most |
//! |------|---------------|---------|
//! | [`MethodRole::State`] | `ResourceState` | one per interface |
//! | [`MethodRole::Representation`] | `ResourceRepresentation` | one, exclusive with state |
//! | [`MethodRole::Link`] | `ResourceLink` | one per interface |
//! | [`MethodRole::Related`] | `Related("relation")` | any number |
//! | [`MethodRole::Delegate`] | nothing, but has a default implementation | any number |
//!
//! A method no strategy recognizes is only acceptable if it has a default
//! implementation; otherwise the whole interface is rejected.
//!
//! ## Ordering
//!
//! Related-resource methods are reported sorted by relation name. The sort is
//! stable, so two methods following the same relation keep their declaration order.
//!
//! ## Memoization
//!
//! Descriptors are computed once per interface name and shared through an `Arc`
//! for the lifetime of the registry (normally the lifetime of the process).

use crate::annotation::{AnnotationSupport, TemplateParameter};
use crate::declaration::{Cardinality, InterfaceDeclaration, InterfaceFn, ItemType, MethodDeclaration};
use crate::error::{HalError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodRole {
    State,
    Representation,
    Link,
    Related,
    Delegate,
}

/// A classified method of a resource interface.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    interface: &'static str,
    name: &'static str,
    role: MethodRole,
    relation: Option<String>,
    cardinality: Cardinality,
    item: ItemType,
    parameters: Vec<(&'static str, TemplateParameter)>,
}

impl MethodDescriptor {
    pub fn interface(&self) -> &'static str {
        self.interface
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn role(&self) -> MethodRole {
        self.role
    }

    /// The followed relation; empty for anything but related-resource methods.
    pub fn relation(&self) -> &str {
        self.relation.as_deref().unwrap_or_default()
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn item(&self) -> ItemType {
        self.item
    }

    /// Parameter names and the template variables they feed, in declaration order.
    pub fn parameters(&self) -> &[(&'static str, TemplateParameter)] {
        &self.parameters
    }

    /// Whether the method takes template arguments (and therefore yields link templates).
    pub fn is_templated(&self) -> bool {
        !self.parameters.is_empty()
    }

    /// `Interface#method`, used in logs, metrics and error messages.
    pub fn qualified_name(&self) -> String {
        format!("{}#{}", self.interface, self.name)
    }
}

/// The validated description of one resource interface.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    interface: &'static str,
    content_type: Option<String>,
    entry_point: bool,
    state: Option<MethodDescriptor>,
    representation: Option<MethodDescriptor>,
    link: Option<MethodDescriptor>,
    related: Vec<MethodDescriptor>,
    delegates: Vec<&'static str>,
}

impl ResourceDescriptor {
    pub fn interface(&self) -> &'static str {
        self.interface
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn is_entry_point(&self) -> bool {
        self.entry_point
    }

    pub fn state(&self) -> Option<&MethodDescriptor> {
        self.state.as_ref()
    }

    pub fn representation(&self) -> Option<&MethodDescriptor> {
        self.representation.as_ref()
    }

    pub fn link(&self) -> Option<&MethodDescriptor> {
        self.link.as_ref()
    }

    /// Related-resource methods, sorted by relation name.
    pub fn related(&self) -> &[MethodDescriptor] {
        &self.related
    }

    /// Names of plain methods that carry no hypermedia role.
    pub fn delegates(&self) -> &[&'static str] {
        &self.delegates
    }

    /// Looks up any classified method by name.
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.state
            .iter()
            .chain(self.representation.iter())
            .chain(self.link.iter())
            .chain(self.related.iter())
            .find(|m| m.name == name)
    }
}

/// Memoizing registry of resource descriptors, keyed by declaration function.
pub struct TypeRegistry {
    annotations: Arc<dyn AnnotationSupport>,
    descriptors: Mutex<HashMap<usize, Arc<ResourceDescriptor>>>,
}

impl TypeRegistry {
    pub fn new(annotations: Arc<dyn AnnotationSupport>) -> Self {
        Self {
            annotations,
            descriptors: Mutex::new(HashMap::new()),
        }
    }

    pub fn annotations(&self) -> &Arc<dyn AnnotationSupport> {
        &self.annotations
    }

    /// Returns the descriptor of an interface, computing and caching it on first use.
    pub fn describe(&self, interface: InterfaceFn) -> Result<Arc<ResourceDescriptor>> {
        let key = interface as usize;
        if let Some(descriptor) = self.cached(key) {
            return Ok(descriptor);
        }

        let declaration = interface();
        let descriptor = Arc::new(self.build(&declaration)?);
        debug!(
            interface = descriptor.interface,
            related = descriptor.related.len(),
            "Described resource interface"
        );

        let mut descriptors = self
            .descriptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(descriptors
            .entry(key)
            .or_insert(descriptor)
            .clone())
    }

    /// Picks the interface to render for an implementation of several interfaces.
    ///
    /// A single resource interface is used as is. With several, the one marked as
    /// entry point wins; anything else is ambiguous.
    pub fn describe_implementation(
        &self,
        interfaces: &[InterfaceFn],
    ) -> Result<Arc<ResourceDescriptor>> {
        let declarations: Vec<(InterfaceFn, InterfaceDeclaration)> = interfaces
            .iter()
            .map(|f| (*f, f()))
            .filter(|(_, d)| self.annotations.is_hal_api_interface(d))
            .collect();

        match declarations.as_slice() {
            [] => Err(HalError::developer(
                "the resource implements no HAL API interface",
            )),
            [(interface, _)] => self.describe(*interface),
            several => {
                let entry_points: Vec<_> = several
                    .iter()
                    .filter(|(_, d)| self.annotations.is_entry_point(d))
                    .collect();
                match entry_points.as_slice() {
                    [(interface, _)] => self.describe(*interface),
                    _ => {
                        let names: Vec<_> = several.iter().map(|(_, d)| d.name()).collect();
                        Err(HalError::developer(format!(
                            "the resource implements several HAL API interfaces ({}) and exactly one must be an entry point",
                            names.join(", ")
                        )))
                    }
                }
            }
        }
    }

    fn cached(&self, key: usize) -> Option<Arc<ResourceDescriptor>> {
        self.descriptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    fn build(&self, declaration: &InterfaceDeclaration) -> Result<ResourceDescriptor> {
        let support = self.annotations.as_ref();
        let interface = declaration.name();

        if !support.is_hal_api_interface(declaration) {
            return Err(HalError::developer(format!(
                "{interface} is not annotated as a HAL API interface"
            )));
        }

        let mut descriptor = ResourceDescriptor {
            interface,
            content_type: support.content_type(declaration),
            entry_point: support.is_entry_point(declaration),
            state: None,
            representation: None,
            link: None,
            related: Vec::new(),
            delegates: Vec::new(),
        };

        for method in declaration.methods() {
            let Some(role) = self.classify(interface, method)? else {
                descriptor.delegates.push(method.name());
                continue;
            };
            let classified = self.method_descriptor(interface, method, role)?;
            match role {
                MethodRole::State | MethodRole::Representation => {
                    if descriptor.state.is_some() || descriptor.representation.is_some() {
                        return Err(HalError::developer(format!(
                            "{interface} declares more than one state or representation method"
                        )));
                    }
                    if classified.cardinality == Cardinality::Many {
                        return Err(HalError::developer(format!(
                            "{} must not emit more than one state value",
                            classified.qualified_name()
                        )));
                    }
                    if role == MethodRole::State {
                        descriptor.state = Some(classified);
                    } else {
                        descriptor.representation = Some(classified);
                    }
                }
                MethodRole::Link => {
                    if descriptor.link.is_some() {
                        return Err(HalError::developer(format!(
                            "{interface} declares more than one link method"
                        )));
                    }
                    descriptor.link = Some(classified);
                }
                MethodRole::Related => descriptor.related.push(classified),
                MethodRole::Delegate => descriptor.delegates.push(method.name()),
            }
        }

        descriptor
            .related
            .sort_by(|a, b| a.relation().cmp(b.relation()));
        Ok(descriptor)
    }

    /// `Ok(None)` means a plain delegate method.
    fn classify(
        &self,
        interface: &str,
        method: &MethodDeclaration,
    ) -> Result<Option<MethodRole>> {
        let support = self.annotations.as_ref();
        let mut roles = Vec::new();
        if support.is_resource_state_method(method) {
            roles.push(MethodRole::State);
        }
        if support.is_resource_representation_method(method) {
            roles.push(MethodRole::Representation);
        }
        if support.is_resource_link_method(method) {
            roles.push(MethodRole::Link);
        }
        if support.related_relation(method).is_some() {
            roles.push(MethodRole::Related);
        }

        match roles.as_slice() {
            [] if method.has_default() => Ok(None),
            [] => Err(HalError::developer(format!(
                "{interface}#{} is not recognized by any annotation strategy and has no default implementation",
                method.name()
            ))),
            [role] => Ok(Some(*role)),
            _ => Err(HalError::developer(format!(
                "{interface}#{} carries more than one hypermedia role",
                method.name()
            ))),
        }
    }

    fn method_descriptor(
        &self,
        interface: &'static str,
        method: &MethodDeclaration,
        role: MethodRole,
    ) -> Result<MethodDescriptor> {
        let support = self.annotations.as_ref();
        let qualified = format!("{interface}#{}", method.name());

        let relation = if role == MethodRole::Related {
            let relation = support.related_relation(method).unwrap_or_default();
            if relation.trim().is_empty() {
                return Err(HalError::developer(format!(
                    "{qualified} has a blank relation name"
                )));
            }
            let item = method.returns().item;
            let is_resource = match item {
                ItemType::Resource(target) => support.is_hal_api_interface(&target()),
                ItemType::LinkableResource => true,
                _ => false,
            };
            if !is_resource {
                return Err(HalError::developer(format!(
                    "{qualified} must emit a HAL API interface or a linkable resource, found {item:?}"
                )));
            }
            Some(relation)
        } else {
            None
        };

        let mut parameters = Vec::with_capacity(method.parameters().len());
        for parameter in method.parameters() {
            let Some(template) = support.template_parameter(parameter) else {
                return Err(HalError::developer(format!(
                    "parameter '{}' of {qualified} is not annotated as a template variable",
                    parameter.name()
                )));
            };
            parameters.push((parameter.name(), template));
        }
        if !parameters.is_empty() && role != MethodRole::Related {
            return Err(HalError::developer(format!(
                "{qualified} takes parameters but only related-resource methods may"
            )));
        }

        Ok(MethodDescriptor {
            interface,
            name: method.name(),
            role,
            relation,
            cardinality: method.returns().cardinality,
            item: method.returns().item,
            parameters,
        })
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let described = self
            .descriptors
            .lock()
            .map(|d| d.len())
            .unwrap_or_default();
        f.debug_struct("TypeRegistry")
            .field("annotations", &self.annotations.name())
            .field("described", &described)
            .finish()
    }
}
