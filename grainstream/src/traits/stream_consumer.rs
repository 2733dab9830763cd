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
use async_trait::async_trait;
use tracing::{trace, warn};

use crate::stream::{Delivery, StreamError, StreamId, SubscriptionHandle};
use crate::traits::{Grain, StreamItem};

/// A grain that consumes items from streams on its own turn.
///
/// Implicit subscriptions route every callback here; explicit subscriptions
/// made from inside a grain usually do the same through a small observer
/// holding a [`GrainRef`](crate::grain::GrainRef).
#[async_trait]
pub trait StreamConsumer: Grain {
    /// Payload type expected on the consumed streams.
    type Item: StreamItem + Clone;

    /// Handles one delivered item. An error is routed back to
    /// [`on_error`](StreamConsumer::on_error) for this subscription only.
    async fn on_next(&mut self, item: Self::Item, delivery: &Delivery) -> anyhow::Result<()>;

    /// Handles a failure reported for one of this grain's subscriptions.
    async fn on_error(&mut self, error: StreamError) {
        warn!(grain = Self::KIND, error = %error, "stream error");
    }

    /// Called once when a subscribed stream completes.
    async fn on_completed(&mut self, stream: &StreamId) {
        trace!(grain = Self::KIND, stream = %stream, "stream completed");
    }

    /// Receives the handle of a subscription the runtime created on this grain's
    /// behalf (implicit subscriptions).
    async fn on_subscribed(&mut self, handle: SubscriptionHandle) {
        trace!(grain = Self::KIND, subscription = %handle.id(), "subscribed");
    }
}

/// A [`StreamConsumer`] statically bound to one or more namespaces.
///
/// The first publish to `(key, namespace)` for any declared namespace activates
/// the grain with that `key` and subscribes it before the item is delivered.
/// Usually implemented with the
/// [`implicit_subscription`](grainstream_macro::implicit_subscription) attribute.
pub trait ImplicitSubscriber: StreamConsumer {
    /// Namespaces this grain type auto-subscribes to.
    const NAMESPACES: &'static [&'static str];
}
