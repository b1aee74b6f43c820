//! # Resource Renderer
//!
//! Renders a server-side [`ResourceImpl`] into a [`HalResource`] without blocking.
//!
//! ## Algorithm
//!
//! 1. Pick the described interface of the implementation (the entry point if it
//!    implements several).
//! 2. Start the state (or representation) method and every related-resource method
//!    at once. Relations are independent: a slow relation never holds back another.
//! 3. Classify every emitted related resource:
//!
//! | Related resource | Method has parameters | Result |
//! |------------------|-----------------------|--------|
//! | linkable | yes | link only |
//! | embeddable, `is_embedded()` | no | embedded document, plus a link if `is_linked_when_embedded()` and linkable |
//! | linkable, not embedded | no | link only |
//! | neither | any | developer error |
//!
//! 4. A relation must emit as many items as its method's cardinality allows.
//!    Embedded resources are rendered recursively. Up to `concurrency` items of one
//!    relation are processed at once, and results keep emission order.
//! 5. Assemble state, self link and relations. Any failure fails the whole render;
//!    siblings still in flight are dropped.

use crate::descriptor::{MethodDescriptor, ResourceDescriptor, TypeRegistry};
use crate::declaration::Cardinality;
use crate::error::{HalError, Result};
use crate::hal::{HalResource, SELF};
use crate::link::Link;
use crate::metrics::RequestMetricsCollector;
use crate::resource::{LinkableResource, MethodOutput, ResourceImpl};
use crate::shape::{FromSequence, HalStream, Maybe, Single};
use futures::future::{self, try_join_all, BoxFuture, FutureExt};
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Default number of items of one relation processed concurrently.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// The outcome of one related resource.
struct RelatedItem {
    link: Option<Link>,
    embedded: Option<HalResource>,
}

#[derive(Clone)]
pub struct AsyncResourceRenderer {
    registry: Arc<TypeRegistry>,
    metrics: Arc<RequestMetricsCollector>,
    concurrency: usize,
}

impl AsyncResourceRenderer {
    pub fn new(registry: Arc<TypeRegistry>, metrics: Arc<RequestMetricsCollector>) -> Self {
        Self {
            registry,
            metrics,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bounds how many items of one relation are processed at once (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn render(&self, resource: Arc<dyn ResourceImpl>) -> BoxFuture<'static, Result<HalResource>> {
        let renderer = self.clone();
        async move { renderer.render_resource(resource).await }.boxed()
    }

    async fn render_resource(&self, resource: Arc<dyn ResourceImpl>) -> Result<HalResource> {
        let descriptor = self.registry.describe_implementation(&resource.interfaces())?;

        let state = self.render_state(&resource, &descriptor);
        let relations = try_join_all(
            descriptor
                .related()
                .iter()
                .map(|method| self.render_relation(&resource, method)),
        );
        let (mut document, relations) = futures::try_join!(state, relations)?;

        if document.self_link().is_none() {
            if let Some(linkable) = resource.as_linkable() {
                document.set_link(SELF, linkable.create_link());
            }
        }
        for (relation, items) in relations {
            for item in items {
                if let Some(link) = item.link {
                    document.add_link(relation, link);
                }
                if let Some(embedded) = item.embedded {
                    document.add_embedded(relation, embedded);
                }
            }
        }
        Ok(document)
    }

    async fn render_state(
        &self,
        resource: &Arc<dyn ResourceImpl>,
        descriptor: &ResourceDescriptor,
    ) -> Result<HalResource> {
        let started = Instant::now();
        let document = if let Some(method) = descriptor.state() {
            let MethodOutput::State(values) = resource.clone().invoke(method)? else {
                return Err(unexpected_output(method, "state"));
            };
            match first_value(values, method).await? {
                Some(state) => HalResource::from_state(state)?,
                None => HalResource::new(),
            }
        } else if let Some(method) = descriptor.representation() {
            let MethodOutput::Representation(documents) = resource.clone().invoke(method)? else {
                return Err(unexpected_output(method, "representation"));
            };
            first_value(documents, method).await?.unwrap_or_default()
        } else {
            return Ok(HalResource::new());
        };

        self.metrics.on_method_invocation_finished(
            "state",
            descriptor.interface(),
            started.elapsed(),
        );
        Ok(document)
    }

    async fn render_relation<'a>(
        &self,
        resource: &Arc<dyn ResourceImpl>,
        method: &'a MethodDescriptor,
    ) -> Result<(&'a str, Vec<RelatedItem>)> {
        let started = Instant::now();
        let MethodOutput::Related(items) = resource.clone().invoke(method)? else {
            return Err(unexpected_output(method, "related"));
        };

        let link_only = method.is_templated();
        let rendered: Vec<RelatedItem> = items
            .map(|item| match item {
                Ok(item) => self.render_item(item, method, link_only),
                Err(e) => future::ready(Err(e)).boxed(),
            })
            .buffered(self.concurrency)
            .boxed()
            .try_collect()
            .await?;
        check_cardinality(method, rendered.len())?;

        debug!(
            resource = method.interface(),
            relation = method.relation(),
            items = rendered.len(),
            "Rendered relation"
        );
        self.metrics.on_method_invocation_finished(
            "related",
            method.qualified_name(),
            started.elapsed(),
        );
        Ok((method.relation(), rendered))
    }

    fn render_item(
        &self,
        item: Arc<dyn ResourceImpl>,
        method: &MethodDescriptor,
        link_only: bool,
    ) -> BoxFuture<'static, Result<RelatedItem>> {
        let link = item.as_linkable().map(LinkableResource::create_link);

        if !link_only {
            if let Some(embeddable) = item.as_embeddable().filter(|e| e.is_embedded()) {
                let link = if embeddable.is_linked_when_embedded() {
                    link
                } else {
                    None
                };
                let embedded = self.render(item.clone());
                return async move {
                    Ok(RelatedItem {
                        link,
                        embedded: Some(embedded.await?),
                    })
                }
                .boxed();
            }
        }

        let result = match link {
            Some(link) => Ok(RelatedItem {
                link: Some(link),
                embedded: None,
            }),
            None => Err(HalError::developer(format!(
                "{} emitted a resource that is neither linkable nor embedded",
                method.qualified_name()
            ))),
        };
        future::ready(result).boxed()
    }
}

/// Takes the single value a state or representation method emits.
async fn first_value<T: Send + 'static>(
    values: HalStream<T>,
    method: &MethodDescriptor,
) -> Result<Option<T>> {
    let name = method.qualified_name();
    if method.cardinality() == Cardinality::One {
        Single::from_sequence(values, &name).await.map(Some)
    } else {
        Maybe::from_sequence(values, &name).await
    }
}

/// Holds a relation to the number of items its method declares.
fn check_cardinality(method: &MethodDescriptor, count: usize) -> Result<()> {
    let expected = match method.cardinality() {
        Cardinality::One if count != 1 => "exactly one",
        Cardinality::Optional if count > 1 => "at most one",
        _ => return Ok(()),
    };
    Err(HalError::developer(format!(
        "{} must emit {expected} related resource, emitted {count}",
        method.qualified_name()
    )))
}

fn unexpected_output(method: &MethodDescriptor, expected: &str) -> HalError {
    HalError::developer(format!(
        "{} must produce {expected} output",
        method.qualified_name()
    ))
}
