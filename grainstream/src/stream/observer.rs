/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::common::HandlerFuture;
use crate::stream::{StreamError, StreamId};
use crate::traits::StreamItem;

/// Position of an item within its stream, assigned at publish time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceToken(pub(crate) u64);

impl SequenceToken {
    /// The raw sequence number. The first item published on a stream is `1`.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Values a publisher attaches to one publish call.
///
/// Passed explicitly with the item to every subscriber instead of living in
/// ambient per-call state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishContext {
    correlation_id: Option<Uuid>,
    values: BTreeMap<String, String>,
}

impl PublishContext {
    /// Adds (or replaces) a key/value pair.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Looks up a value.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The correlation id, if one was set.
    pub fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }

    /// All values in key order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Metadata delivered alongside each item.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Stream the item was published on.
    pub stream: StreamId,
    /// Per-stream sequence of this publish.
    pub sequence: SequenceToken,
    /// Context supplied by the publisher, shared by all subscribers.
    pub context: Arc<PublishContext>,
}

/// Receives the items, errors and completion of one subscription.
///
/// Callbacks for one subscription are never invoked concurrently and arrive in
/// publish order.
#[async_trait]
pub trait StreamObserver<T: StreamItem + Clone>: Send + Sync + 'static {
    /// Handles one item. An error is routed to [`on_error`](StreamObserver::on_error).
    async fn on_next(&self, item: T, delivery: &Delivery) -> anyhow::Result<()>;

    /// Handles a failure concerning this subscription. Errors returned here are
    /// logged and dropped.
    async fn on_error(&self, error: StreamError) -> anyhow::Result<()> {
        warn!(error = %error, "unhandled stream error");
        Ok(())
    }

    /// Called once when the stream completes.
    async fn on_completed(&self, _stream: &StreamId) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A [`StreamObserver`] assembled from three closures.
pub struct FnObserver<T, N, E, C> {
    on_next: N,
    on_error: E,
    on_completed: C,
    _item: PhantomData<fn(T)>,
}

impl<T, N, E, C> FnObserver<T, N, E, C>
where
    T: StreamItem + Clone,
    N: Fn(T, Delivery) -> HandlerFuture + Send + Sync + 'static,
    E: Fn(StreamError) -> HandlerFuture + Send + Sync + 'static,
    C: Fn() -> HandlerFuture + Send + Sync + 'static,
{
    /// Wraps the three callbacks.
    pub fn new(on_next: N, on_error: E, on_completed: C) -> Self {
        Self {
            on_next,
            on_error,
            on_completed,
            _item: PhantomData,
        }
    }
}

#[async_trait]
impl<T, N, E, C> StreamObserver<T> for FnObserver<T, N, E, C>
where
    T: StreamItem + Clone,
    N: Fn(T, Delivery) -> HandlerFuture + Send + Sync + 'static,
    E: Fn(StreamError) -> HandlerFuture + Send + Sync + 'static,
    C: Fn() -> HandlerFuture + Send + Sync + 'static,
{
    async fn on_next(&self, item: T, delivery: &Delivery) -> anyhow::Result<()> {
        (self.on_next)(item, delivery.clone()).await
    }

    async fn on_error(&self, error: StreamError) -> anyhow::Result<()> {
        (self.on_error)(error).await
    }

    async fn on_completed(&self, _stream: &StreamId) -> anyhow::Result<()> {
        (self.on_completed)().await
    }
}

/// Object-safe observer over type-erased items, as stored by the registry.
#[async_trait]
pub(crate) trait ErasedObserver: Send + Sync {
    async fn on_next(&self, item: Arc<dyn StreamItem>, delivery: &Delivery) -> anyhow::Result<()>;
    async fn on_error(&self, error: StreamError) -> anyhow::Result<()>;
    async fn on_completed(&self, stream: &StreamId) -> anyhow::Result<()>;
}

/// Adapts a typed observer to [`ErasedObserver`] by downcasting each item.
pub(crate) struct TypedObserver<T, O> {
    inner: O,
    _item: PhantomData<fn(T)>,
}

impl<T, O> TypedObserver<T, O>
where
    T: StreamItem + Clone,
    O: StreamObserver<T>,
{
    pub(crate) fn erase(inner: O) -> Arc<dyn ErasedObserver> {
        Arc::new(Self {
            inner,
            _item: PhantomData,
        })
    }
}

#[async_trait]
impl<T, O> ErasedObserver for TypedObserver<T, O>
where
    T: StreamItem + Clone,
    O: StreamObserver<T>,
{
    async fn on_next(&self, item: Arc<dyn StreamItem>, delivery: &Delivery) -> anyhow::Result<()> {
        let item = downcast_item::<T>(item.as_ref())?;
        self.inner.on_next(item, delivery).await
    }

    async fn on_error(&self, error: StreamError) -> anyhow::Result<()> {
        self.inner.on_error(error).await
    }

    async fn on_completed(&self, stream: &StreamId) -> anyhow::Result<()> {
        self.inner.on_completed(stream).await
    }
}

fn downcast_item<T: StreamItem + Clone>(item: &dyn StreamItem) -> Result<T, StreamError> {
    item.as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| StreamError::ItemTypeMismatch {
            expected: std::any::type_name::<T>(),
            found: item.type_name(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_values_are_ordered() {
        let ctx = PublishContext::default()
            .with_value("zeta", "1")
            .with_value("alpha", "2")
            .with_value("zeta", "3");
        let values: Vec<_> = ctx.values().collect();
        assert_eq!(values, vec![("alpha", "2"), ("zeta", "3")]);
        assert_eq!(ctx.value("zeta"), Some("3"));
        assert_eq!(ctx.correlation_id(), None);
    }

    #[test]
    fn mismatched_payload_is_reported() {
        let item: Arc<dyn StreamItem> = Arc::new(String::from("not a number"));
        let err = downcast_item::<i64>(item.as_ref()).unwrap_err();
        assert_eq!(
            err,
            StreamError::ItemTypeMismatch {
                expected: "i64",
                found: "alloc::string::String",
            }
        );
    }

    #[test]
    fn matching_payload_is_cloned_out() {
        let item: Arc<dyn StreamItem> = Arc::new(42_i64);
        assert_eq!(downcast_item::<i64>(item.as_ref()).unwrap(), 42);
    }
}
