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
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use static_assertions::assert_impl_all;
use uuid::Uuid;

use crate::grain::GrainId;
use crate::stream::observer::ErasedObserver;
use crate::stream::{PubSubRegistry, StreamId};

/// Who owns a subscription: a grain, or the runtime's client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubscriberRef {
    /// A grain activation, identified by kind and key.
    Grain(GrainId),
    /// Code running outside any grain; one id per runtime.
    Client(Uuid),
}

impl fmt::Display for SubscriberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grain(id) => write!(f, "grain {id}"),
            Self::Client(id) => write!(f, "client {id}"),
        }
    }
}

/// Opaque identifier of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered subscriber as held by a stream entry.
pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) subscriber: SubscriberRef,
    pub(crate) observer: Arc<dyn ErasedObserver>,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        subscriber: SubscriberRef,
        observer: Arc<dyn ErasedObserver>,
    ) -> Self {
        Self {
            id,
            subscriber,
            observer,
            active: AtomicBool::new(true),
        }
    }

    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Removal is terminal.
    #[inline]
    pub(crate) fn remove(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("subscriber", &self.subscriber)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// A capability to cancel one subscription.
///
/// The registry owns the subscription itself; the handle only remembers where
/// it lives. Unsubscribing is idempotent and also succeeds for handles the
/// registry no longer knows.
#[derive(Clone)]
pub struct SubscriptionHandle {
    pub(crate) id: SubscriptionId,
    pub(crate) stream: StreamId,
    pub(crate) subscriber: SubscriberRef,
    pub(crate) registry: Arc<PubSubRegistry>,
}

assert_impl_all!(SubscriptionHandle: Send, Sync);

impl SubscriptionHandle {
    /// The subscription id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The stream this subscription is attached to.
    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    /// The subscriber that owns the subscription.
    pub fn subscriber(&self) -> SubscriberRef {
        self.subscriber
    }

    /// Name of the provider the subscription was made through.
    pub fn provider(&self) -> &str {
        self.registry.provider()
    }

    /// Removes the subscription. Publishes that start after this returns no
    /// longer reach it.
    pub async fn unsubscribe(&self) {
        self.registry.unsubscribe(&self.stream, self.id).await;
    }
}

impl PartialEq for SubscriptionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubscriptionHandle {}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("stream", &self.stream)
            .field("subscriber", &self.subscriber)
            .field("provider", &self.registry.provider())
            .finish()
    }
}
