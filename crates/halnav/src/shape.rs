//! # Async Shape Adapter
//!
//! Resource methods return values in one of a few public shapes, while the
//! renderer and the navigation proxies only deal with one canonical, ordered,
//! lazy sequence: [`HalStream`].
//!
//! | Shape | Cardinality | Rust type |
//! |-------|-------------|-----------|
//! | [`Single`] | exactly one | future of `T` |
//! | [`Maybe`] | zero or one | future of `Option<T>` |
//! | [`Many`] | zero or more | stream of `T` |
//! | `Result<T, HalError>` | exactly one, already resolved | |
//! | `Option<T>` | zero or one, already resolved | |
//! | `Vec<T>` | zero or more, already resolved | |
//!
//! Conversions go through two traits, [`IntoSequence`] and [`FromSequence`].
//! Both are public extension points: implementing them for another type (a
//! channel receiver, a platform future, ...) makes it usable as a resource method
//! return value without the engine knowing about it.
//!
//! Converting an empty sequence into a [`Single`] fails with a
//! [`HalError::Developer`] naming the method that emitted nothing.

use crate::error::{HalError, Result};
use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The canonical internal sequence: ordered, lazy, possibly failing.
pub type HalStream<T> = BoxStream<'static, Result<T>>;

/// Converts a public shape into the canonical sequence.
pub trait IntoSequence<T>: Send + 'static {
    fn into_sequence(self) -> HalStream<T>;
}

/// Builds a public shape from the canonical sequence.
///
/// `method` names the method the sequence was produced for, for error messages.
pub trait FromSequence<T>: Sized {
    fn from_sequence(sequence: HalStream<T>, method: &str) -> Self;
}

/// Exactly one value, resolved asynchronously.
pub struct Single<T>(BoxFuture<'static, Result<T>>);

impl<T: Send + 'static> Single<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Single(future.boxed())
    }

    pub fn ready(value: T) -> Self {
        Single(future::ready(Ok(value)).boxed())
    }

    pub fn failed(error: HalError) -> Self {
        Single(future::ready(Err(error)).boxed())
    }
}

impl<T> Future for Single<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().0.poll_unpin(cx)
    }
}

/// Zero or one value, resolved asynchronously.
pub struct Maybe<T>(BoxFuture<'static, Result<Option<T>>>);

impl<T: Send + 'static> Maybe<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<Option<T>>> + Send + 'static,
    {
        Maybe(future.boxed())
    }

    pub fn ready(value: Option<T>) -> Self {
        Maybe(future::ready(Ok(value)).boxed())
    }

    pub fn empty() -> Self {
        Self::ready(None)
    }

    pub fn failed(error: HalError) -> Self {
        Maybe(future::ready(Err(error)).boxed())
    }
}

impl<T> Future for Maybe<T> {
    type Output = Result<Option<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().0.poll_unpin(cx)
    }
}

/// Any number of values, emitted asynchronously in order.
pub struct Many<T>(HalStream<T>);

impl<T: Send + 'static> Many<T> {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Many(stream.boxed())
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        Many(stream::iter(values.into_iter().map(Ok)).boxed())
    }

    pub fn empty() -> Self {
        Many(stream::empty().boxed())
    }

    pub fn failed(error: HalError) -> Self {
        Many(stream::once(future::ready(Err(error))).boxed())
    }

    /// Collects every value, failing on the first error.
    pub async fn collect_all(self) -> Result<Vec<T>> {
        self.0.try_collect().await
    }
}

impl<T> Stream for Many<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().0.poll_next_unpin(cx)
    }
}

impl<T: Send + 'static> IntoSequence<T> for Single<T> {
    fn into_sequence(self) -> HalStream<T> {
        stream::once(self.0).boxed()
    }
}

impl<T: Send + 'static> IntoSequence<T> for Maybe<T> {
    fn into_sequence(self) -> HalStream<T> {
        stream::once(self.0)
            .filter_map(|result| future::ready(result.transpose()))
            .boxed()
    }
}

impl<T: Send + 'static> IntoSequence<T> for Many<T> {
    fn into_sequence(self) -> HalStream<T> {
        self.0
    }
}

impl<T: Send + 'static> IntoSequence<T> for Result<T> {
    fn into_sequence(self) -> HalStream<T> {
        stream::once(future::ready(self)).boxed()
    }
}

impl<T: Send + 'static> IntoSequence<T> for Option<T> {
    fn into_sequence(self) -> HalStream<T> {
        stream::iter(self.map(Ok)).boxed()
    }
}

impl<T: Send + 'static> IntoSequence<T> for Vec<T> {
    fn into_sequence(self) -> HalStream<T> {
        stream::iter(self.into_iter().map(Ok)).boxed()
    }
}

impl<T: Send + 'static> FromSequence<T> for Single<T> {
    fn from_sequence(mut sequence: HalStream<T>, method: &str) -> Self {
        let method = method.to_string();
        Single::new(async move {
            match sequence.next().await {
                Some(result) => result,
                None => Err(HalError::developer(format!(
                    "{method} must emit exactly one value but emitted none"
                ))),
            }
        })
    }
}

impl<T: Send + 'static> FromSequence<T> for Maybe<T> {
    fn from_sequence(mut sequence: HalStream<T>, _method: &str) -> Self {
        Maybe::new(async move { sequence.next().await.transpose() })
    }
}

impl<T: Send + 'static> FromSequence<T> for Many<T> {
    fn from_sequence(sequence: HalStream<T>, _method: &str) -> Self {
        Many(sequence)
    }
}
