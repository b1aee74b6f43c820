//! # Interface Declarations
//!
//! Rust has no runtime reflection, so every resource interface describes itself
//! once with an explicit [`InterfaceDeclaration`]: its methods, their parameters,
//! what they return and the annotations attached to each of them. The
//! [`TypeRegistry`](crate::descriptor::TypeRegistry) turns a declaration into a
//! validated [`ResourceDescriptor`](crate::descriptor::ResourceDescriptor).
//!
//! Declarations are usually written as an associated function next to the trait
//! they describe:
//!
//! ```rust
//! use halnav::declaration::{Cardinality, InterfaceDeclaration, ItemType, MethodDeclaration};
//!
//! fn item_declaration() -> InterfaceDeclaration {
//!     InterfaceDeclaration::hal_api("Item")
//!         .method(MethodDeclaration::state("state", Cardinality::One, "ItemState"))
//!         .method(MethodDeclaration::link("create_link"))
//!         .method(MethodDeclaration::related(
//!             "children",
//!             "item",
//!             Cardinality::Many,
//!             ItemType::Resource(item_declaration),
//!         ))
//! }
//!
//! let declaration = item_declaration();
//! assert_eq!(declaration.name(), "Item");
//! assert_eq!(declaration.methods().len(), 3);
//! ```
//!
//! Related item types are referenced through a function pointer ([`InterfaceFn`]),
//! which lets an interface refer to itself or to interfaces declared later.

use crate::annotation::{vocabulary, Annotation};

/// Lazily produces the declaration of an interface.
pub type InterfaceFn = fn() -> InterfaceDeclaration;

/// How many values a method produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one value; an empty result is a developer error.
    One,
    /// Zero or one value.
    Optional,
    /// Any number of values.
    Many,
}

/// The element type a method produces.
#[derive(Debug, Clone, Copy)]
pub enum ItemType {
    /// Another declared resource interface.
    Resource(InterfaceFn),
    /// Any resource that can only be linked (no declared interface).
    LinkableResource,
    /// A plain serializable state value, named for diagnostics.
    State(&'static str),
    /// A [`Link`](crate::link::Link).
    Link,
    /// A complete [`HalResource`](crate::hal::HalResource).
    Hal,
}

/// The declared return shape of a method.
#[derive(Debug, Clone, Copy)]
pub struct ReturnDeclaration {
    pub cardinality: Cardinality,
    pub item: ItemType,
}

#[derive(Debug, Clone)]
pub struct ParameterDeclaration {
    name: &'static str,
    annotations: Vec<Annotation>,
}

impl ParameterDeclaration {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            annotations: Vec::new(),
        }
    }

    /// A parameter bound to a single template variable.
    pub fn variable(name: &'static str, variable: &str) -> Self {
        Self::new(name).annotated(Annotation::with_value(
            vocabulary::TEMPLATE_VARIABLE,
            variable,
        ))
    }

    /// A parameter object whose fields are template variables.
    pub fn variables(name: &'static str) -> Self {
        Self::new(name).annotated(Annotation::marker(vocabulary::TEMPLATE_VARIABLES))
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

#[derive(Debug, Clone)]
pub struct MethodDeclaration {
    name: &'static str,
    annotations: Vec<Annotation>,
    parameters: Vec<ParameterDeclaration>,
    returns: ReturnDeclaration,
    has_default: bool,
}

impl MethodDeclaration {
    pub fn new(name: &'static str, cardinality: Cardinality, item: ItemType) -> Self {
        Self {
            name,
            annotations: Vec::new(),
            parameters: Vec::new(),
            returns: ReturnDeclaration { cardinality, item },
            has_default: false,
        }
    }

    pub fn state(name: &'static str, cardinality: Cardinality, type_name: &'static str) -> Self {
        Self::new(name, cardinality, ItemType::State(type_name))
            .annotated(Annotation::marker(vocabulary::RESOURCE_STATE))
    }

    pub fn representation(name: &'static str) -> Self {
        Self::new(name, Cardinality::One, ItemType::Hal)
            .annotated(Annotation::marker(vocabulary::RESOURCE_REPRESENTATION))
    }

    pub fn link(name: &'static str) -> Self {
        Self::new(name, Cardinality::One, ItemType::Link)
            .annotated(Annotation::marker(vocabulary::RESOURCE_LINK))
    }

    pub fn related(
        name: &'static str,
        relation: &str,
        cardinality: Cardinality,
        item: ItemType,
    ) -> Self {
        Self::new(name, cardinality, item)
            .annotated(Annotation::with_value(vocabulary::RELATED, relation))
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn param(mut self, parameter: ParameterDeclaration) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Marks the method as having a default implementation in its trait.
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn parameters(&self) -> &[ParameterDeclaration] {
        &self.parameters
    }

    pub fn returns(&self) -> ReturnDeclaration {
        self.returns
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceDeclaration {
    name: &'static str,
    annotations: Vec<Annotation>,
    methods: Vec<MethodDeclaration>,
}

impl InterfaceDeclaration {
    /// A plain, unannotated declaration.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            annotations: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// A declaration annotated as a HAL API interface.
    pub fn hal_api(name: &'static str) -> Self {
        Self::new(name).annotated(Annotation::marker(vocabulary::HAL_API_INTERFACE))
    }

    /// Sets the content type carried by the `HalApiInterface` annotation.
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        for annotation in &mut self.annotations {
            if annotation.name() == vocabulary::HAL_API_INTERFACE {
                *annotation = Annotation::with_value(vocabulary::HAL_API_INTERFACE, content_type);
                return self;
            }
        }
        self.annotated(Annotation::with_value(
            vocabulary::HAL_API_INTERFACE,
            content_type,
        ))
    }

    /// Marks the interface as the one to render when an implementation has several.
    pub fn entry_point(self) -> Self {
        self.annotated(Annotation::marker(vocabulary::ENTRY_POINT))
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn method(mut self, method: MethodDeclaration) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn methods(&self) -> &[MethodDeclaration] {
        &self.methods
    }
}

/// Declaration of the generic "linkable resource" marker interface: a resource
/// known only by its link.
pub fn linkable_resource() -> InterfaceDeclaration {
    InterfaceDeclaration::hal_api("LinkableResource")
}
