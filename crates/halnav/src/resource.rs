//! # Server-Side Resources
//!
//! A server-side resource is any type implementing [`ResourceImpl`]: it names the
//! declared interfaces it implements and answers method invocations with a
//! [`MethodOutput`]. Capabilities are opt-in through [`LinkableResource`] and
//! [`EmbeddableResource`].
//!
//! ```rust
//! use halnav::declaration::{Cardinality, InterfaceDeclaration, InterfaceFn, MethodDeclaration};
//! use halnav::descriptor::MethodDescriptor;
//! use halnav::link::Link;
//! use halnav::resource::{LinkableResource, MethodOutput, ResourceImpl};
//! use halnav::{HalError, Result};
//! use serde::Serialize;
//! use std::sync::Arc;
//!
//! #[derive(Serialize)]
//! struct Greeting { text: String }
//!
//! fn greeting() -> InterfaceDeclaration {
//!     InterfaceDeclaration::hal_api("Greeting")
//!         .method(MethodDeclaration::state("state", Cardinality::One, "Greeting"))
//! }
//!
//! struct Hello;
//!
//! impl LinkableResource for Hello {
//!     fn create_link(&self) -> Link { Link::new("/hello") }
//! }
//!
//! impl ResourceImpl for Hello {
//!     fn interfaces(&self) -> Vec<InterfaceFn> { vec![greeting] }
//!
//!     fn invoke(self: Arc<Self>, method: &MethodDescriptor) -> Result<MethodOutput> {
//!         match method.name() {
//!             "state" => Ok(MethodOutput::state(Ok::<_, HalError>(Greeting { text: "hi".into() }))),
//!             other => Err(HalError::developer(format!("unknown method {other}"))),
//!         }
//!     }
//!
//!     fn as_linkable(&self) -> Option<&dyn LinkableResource> { Some(self) }
//! }
//! ```

use crate::declaration::InterfaceFn;
use crate::descriptor::MethodDescriptor;
use crate::error::{HalError, Result};
use crate::hal::HalResource;
use crate::link::Link;
use crate::shape::{HalStream, IntoSequence};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// A resource that can produce a link to itself.
pub trait LinkableResource: Send + Sync {
    fn create_link(&self) -> Link;
}

/// A resource that may be inlined into the document that relates to it.
pub trait EmbeddableResource: Send + Sync {
    fn is_embedded(&self) -> bool {
        true
    }

    /// Whether an embedded resource is also listed under `_links`.
    fn is_linked_when_embedded(&self) -> bool {
        true
    }
}

/// A server-side implementation of one or more declared resource interfaces.
pub trait ResourceImpl: Send + Sync + 'static {
    /// The declared interfaces this type implements.
    fn interfaces(&self) -> Vec<InterfaceFn>;

    /// Invokes a state, representation or related-resource method.
    fn invoke(self: Arc<Self>, method: &MethodDescriptor) -> Result<MethodOutput>;

    fn as_linkable(&self) -> Option<&dyn LinkableResource> {
        None
    }

    fn as_embeddable(&self) -> Option<&dyn EmbeddableResource> {
        None
    }
}

/// What an invoked method produced, already converted to the canonical sequence.
pub enum MethodOutput {
    State(HalStream<Value>),
    Representation(HalStream<HalResource>),
    Related(HalStream<Arc<dyn ResourceImpl>>),
}

impl MethodOutput {
    pub fn state<T, S>(shape: S) -> Self
    where
        T: Serialize + Send + 'static,
        S: IntoSequence<T>,
    {
        MethodOutput::State(
            shape
                .into_sequence()
                .map(|result| {
                    result.and_then(|state| {
                        serde_json::to_value(&state).map_err(|e| {
                            HalError::developer(format!("failed to serialize resource state: {e}"))
                        })
                    })
                })
                .boxed(),
        )
    }

    pub fn representation<S>(shape: S) -> Self
    where
        S: IntoSequence<HalResource>,
    {
        MethodOutput::Representation(shape.into_sequence())
    }

    pub fn related<R, S>(shape: S) -> Self
    where
        R: IntoResource + Send + 'static,
        S: IntoSequence<R>,
    {
        MethodOutput::Related(
            shape
                .into_sequence()
                .map_ok(IntoResource::into_resource)
                .boxed(),
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MethodOutput::State(_) => "state",
            MethodOutput::Representation(_) => "representation",
            MethodOutput::Related(_) => "related",
        }
    }
}

/// Conversion into a shared, type-erased resource.
pub trait IntoResource {
    fn into_resource(self) -> Arc<dyn ResourceImpl>;
}

impl<R: ResourceImpl> IntoResource for R {
    fn into_resource(self) -> Arc<dyn ResourceImpl> {
        Arc::new(self)
    }
}

impl IntoResource for Arc<dyn ResourceImpl> {
    fn into_resource(self) -> Arc<dyn ResourceImpl> {
        self
    }
}
