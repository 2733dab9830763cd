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
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::common::HandlerFuture;
use crate::stream::observer::{FnObserver, TypedObserver};
use crate::stream::{
    Delivery, DeliveryReport, PubSubRegistry, PublishContext, StreamError, StreamId,
    StreamObserver, SubscriberRef, SubscriptionHandle,
};
use crate::traits::StreamItem;

/// Entry point to the streams of one named provider, bound to a caller.
///
/// Obtained from [`GrainRuntime::stream_provider`](crate::common::GrainRuntime::stream_provider)
/// (the caller is the runtime's client) or from
/// [`GrainContext::stream_provider`](crate::grain::GrainContext::stream_provider)
/// (the caller is the grain). Subscriptions made through it are owned by that
/// caller.
#[derive(Clone)]
pub struct StreamProvider {
    registry: Arc<PubSubRegistry>,
    caller: SubscriberRef,
}

impl StreamProvider {
    pub(crate) fn new(registry: Arc<PubSubRegistry>, caller: SubscriberRef) -> Self {
        Self { registry, caller }
    }

    /// The provider name.
    pub fn name(&self) -> &str {
        self.registry.provider()
    }

    /// The registry behind this provider, for introspection and standalone
    /// implicit resolution.
    pub fn registry(&self) -> &Arc<PubSubRegistry> {
        &self.registry
    }

    /// Who subscriptions made through this provider belong to.
    pub fn caller(&self) -> SubscriberRef {
        self.caller
    }

    /// Returns a typed handle to the stream `(key, namespace)`.
    ///
    /// Allocates no registry state; two calls with the same arguments address
    /// the same stream.
    pub fn get_stream<T: StreamItem + Clone>(
        &self,
        key: Uuid,
        namespace: impl Into<String>,
    ) -> StreamHandle<T> {
        StreamHandle {
            stream: StreamId::new(key, namespace),
            registry: Arc::clone(&self.registry),
            caller: self.caller,
            _item: PhantomData,
        }
    }
}

impl fmt::Debug for StreamProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamProvider")
            .field("name", &self.name())
            .field("caller", &self.caller)
            .finish()
    }
}

/// A typed handle to one stream.
pub struct StreamHandle<T> {
    stream: StreamId,
    registry: Arc<PubSubRegistry>,
    caller: SubscriberRef,
    _item: PhantomData<fn(T)>,
}

impl<T: StreamItem + Clone> StreamHandle<T> {
    /// The stream identity.
    pub fn stream_id(&self) -> &StreamId {
        &self.stream
    }

    /// Publishes `item` and waits until every subscriber has handled it.
    ///
    /// # Errors
    ///
    /// [`StreamError::StreamClosed`] if the stream has been completed.
    pub async fn on_next(&self, item: T) -> Result<DeliveryReport, StreamError> {
        self.on_next_with(item, PublishContext::default()).await
    }

    /// Publishes `item` together with a [`PublishContext`].
    ///
    /// # Errors
    ///
    /// [`StreamError::StreamClosed`] if the stream has been completed.
    pub async fn on_next_with(
        &self,
        item: T,
        context: PublishContext,
    ) -> Result<DeliveryReport, StreamError> {
        self.registry.publish(&self.stream, Arc::new(item), context).await
    }

    /// Subscribes `observer` on behalf of the caller.
    ///
    /// # Errors
    ///
    /// [`StreamError::DuplicateSubscription`], [`StreamError::StreamClosed`] or
    /// [`StreamError::Store`].
    pub async fn subscribe<O>(&self, observer: O) -> Result<SubscriptionHandle, StreamError>
    where
        O: StreamObserver<T>,
    {
        self.registry
            .subscribe(&self.stream, self.caller, TypedObserver::erase(observer))
            .await
    }

    /// Subscribes with three callbacks. Each returns a
    /// [`HandlerFuture`], usually built with [`Reply`](crate::common::Reply).
    ///
    /// # Errors
    ///
    /// Same as [`subscribe`](Self::subscribe).
    pub async fn subscribe_with<N, E, C>(
        &self,
        on_next: N,
        on_error: E,
        on_completed: C,
    ) -> Result<SubscriptionHandle, StreamError>
    where
        N: Fn(T, Delivery) -> HandlerFuture + Send + Sync + 'static,
        E: Fn(StreamError) -> HandlerFuture + Send + Sync + 'static,
        C: Fn() -> HandlerFuture + Send + Sync + 'static,
    {
        self.subscribe(FnObserver::new(on_next, on_error, on_completed))
            .await
    }

    /// Handles of the caller's active subscriptions on this stream.
    pub fn subscription_handles(&self) -> Vec<SubscriptionHandle> {
        self.registry.subscription_handles(&self.stream, self.caller)
    }

    /// Completes the stream. Returns how many subscribers were notified.
    pub async fn complete(&self) -> usize {
        self.registry.complete(&self.stream).await
    }
}

impl<T> Clone for StreamHandle<T> {
    fn clone(&self) -> Self {
        Self {
            stream: self.stream.clone(),
            registry: Arc::clone(&self.registry),
            caller: self.caller,
            _item: PhantomData,
        }
    }
}

impl<T> fmt::Debug for StreamHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("stream", &self.stream)
            .field("provider", &self.registry.provider())
            .field("item", &std::any::type_name::<T>())
            .finish()
    }
}
