//! # Annotation Recognition
//!
//! Declarations carry free-form [`Annotation`]s. Which annotations mean "this is a
//! state accessor" or "this method follows relation X" is decided by pluggable
//! [`AnnotationSupport`] strategies, so a hosting integration can bring its own
//! vocabulary without touching the descriptor logic.
//!
//! Strategies are combined with [`CompositeAnnotationSupport`], which consults
//! every registered strategy in registration order: predicates hold if any
//! strategy says so, extractors return the first strategy's answer.

use crate::declaration::{InterfaceDeclaration, MethodDeclaration, ParameterDeclaration};
use std::sync::Arc;
use tracing::debug;

/// Annotation names understood by [`DefaultAnnotationSupport`].
pub mod vocabulary {
    pub const HAL_API_INTERFACE: &str = "HalApiInterface";
    pub const ENTRY_POINT: &str = "EntryPoint";
    pub const RESOURCE_STATE: &str = "ResourceState";
    pub const RESOURCE_REPRESENTATION: &str = "ResourceRepresentation";
    pub const RESOURCE_LINK: &str = "ResourceLink";
    pub const RELATED: &str = "Related";
    pub const TEMPLATE_VARIABLE: &str = "TemplateVariable";
    pub const TEMPLATE_VARIABLES: &str = "TemplateVariables";
}

/// A named marker attached to an interface, method or parameter, with an optional value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    name: &'static str,
    value: Option<String>,
}

impl Annotation {
    pub fn marker(name: &'static str) -> Self {
        Self { name, value: None }
    }

    pub fn with_value(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: Some(value.into()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

fn find<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.name() == name)
}

/// How a method parameter feeds a URI template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateParameter {
    /// The argument is the value of one named variable.
    Variable(String),
    /// The argument is an object whose fields are variables.
    Aggregate,
}

/// Strategy recognizing the roles of declared interfaces, methods and parameters.
pub trait AnnotationSupport: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_hal_api_interface(&self, interface: &InterfaceDeclaration) -> bool;

    fn content_type(&self, interface: &InterfaceDeclaration) -> Option<String>;

    fn is_entry_point(&self, interface: &InterfaceDeclaration) -> bool;

    fn is_resource_state_method(&self, method: &MethodDeclaration) -> bool;

    fn is_resource_representation_method(&self, method: &MethodDeclaration) -> bool;

    fn is_resource_link_method(&self, method: &MethodDeclaration) -> bool;

    /// The relation followed by a related-resource method, if it is one.
    fn related_relation(&self, method: &MethodDeclaration) -> Option<String>;

    fn template_parameter(&self, parameter: &ParameterDeclaration) -> Option<TemplateParameter>;
}

/// Recognizes the built-in [`vocabulary`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAnnotationSupport;

impl AnnotationSupport for DefaultAnnotationSupport {
    fn name(&self) -> &'static str {
        "default"
    }

    fn is_hal_api_interface(&self, interface: &InterfaceDeclaration) -> bool {
        find(interface.annotations(), vocabulary::HAL_API_INTERFACE).is_some()
    }

    fn content_type(&self, interface: &InterfaceDeclaration) -> Option<String> {
        find(interface.annotations(), vocabulary::HAL_API_INTERFACE)
            .and_then(Annotation::value)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn is_entry_point(&self, interface: &InterfaceDeclaration) -> bool {
        find(interface.annotations(), vocabulary::ENTRY_POINT).is_some()
    }

    fn is_resource_state_method(&self, method: &MethodDeclaration) -> bool {
        find(method.annotations(), vocabulary::RESOURCE_STATE).is_some()
    }

    fn is_resource_representation_method(&self, method: &MethodDeclaration) -> bool {
        find(method.annotations(), vocabulary::RESOURCE_REPRESENTATION).is_some()
    }

    fn is_resource_link_method(&self, method: &MethodDeclaration) -> bool {
        find(method.annotations(), vocabulary::RESOURCE_LINK).is_some()
    }

    fn related_relation(&self, method: &MethodDeclaration) -> Option<String> {
        find(method.annotations(), vocabulary::RELATED)
            .map(|a| a.value().unwrap_or_default().to_string())
    }

    fn template_parameter(&self, parameter: &ParameterDeclaration) -> Option<TemplateParameter> {
        if let Some(variable) = find(parameter.annotations(), vocabulary::TEMPLATE_VARIABLE) {
            let name = variable.value().unwrap_or(parameter.name());
            return Some(TemplateParameter::Variable(name.to_string()));
        }
        find(parameter.annotations(), vocabulary::TEMPLATE_VARIABLES)
            .map(|_| TemplateParameter::Aggregate)
    }
}

/// Consults several strategies in registration order.
#[derive(Clone, Default)]
pub struct CompositeAnnotationSupport {
    strategies: Vec<Arc<dyn AnnotationSupport>>,
}

impl CompositeAnnotationSupport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A composite holding only the [`DefaultAnnotationSupport`].
    pub fn with_default_strategies() -> Self {
        let mut composite = Self::new();
        composite.register(Arc::new(DefaultAnnotationSupport));
        composite
    }

    pub fn register(&mut self, strategy: Arc<dyn AnnotationSupport>) {
        debug!(strategy = strategy.name(), "Registered annotation support");
        self.strategies.push(strategy);
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl AnnotationSupport for CompositeAnnotationSupport {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn is_hal_api_interface(&self, interface: &InterfaceDeclaration) -> bool {
        self.strategies
            .iter()
            .any(|s| s.is_hal_api_interface(interface))
    }

    fn content_type(&self, interface: &InterfaceDeclaration) -> Option<String> {
        self.strategies.iter().find_map(|s| s.content_type(interface))
    }

    fn is_entry_point(&self, interface: &InterfaceDeclaration) -> bool {
        self.strategies.iter().any(|s| s.is_entry_point(interface))
    }

    fn is_resource_state_method(&self, method: &MethodDeclaration) -> bool {
        self.strategies
            .iter()
            .any(|s| s.is_resource_state_method(method))
    }

    fn is_resource_representation_method(&self, method: &MethodDeclaration) -> bool {
        self.strategies
            .iter()
            .any(|s| s.is_resource_representation_method(method))
    }

    fn is_resource_link_method(&self, method: &MethodDeclaration) -> bool {
        self.strategies
            .iter()
            .any(|s| s.is_resource_link_method(method))
    }

    fn related_relation(&self, method: &MethodDeclaration) -> Option<String> {
        self.strategies.iter().find_map(|s| s.related_relation(method))
    }

    fn template_parameter(&self, parameter: &ParameterDeclaration) -> Option<TemplateParameter> {
        self.strategies
            .iter()
            .find_map(|s| s.template_parameter(parameter))
    }
}
