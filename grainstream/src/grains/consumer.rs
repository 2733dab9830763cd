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
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::grain::{GrainContext, GrainRef};
use crate::stream::{Delivery, StreamError, StreamId, StreamObserver, SubscriptionHandle};
use crate::traits::Grain;

/// Whether a consumer currently holds a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    NotSubscribed,
    Subscribed,
}

/// Counts the `u64` items delivered on one explicitly subscribed stream.
///
/// Items arrive through a [`CountingObserver`], which takes the grain's turn
/// for every callback.
#[derive(Debug)]
pub struct ConsumerGrain {
    context: GrainContext,
    consumed: u64,
    handle: Option<SubscriptionHandle>,
}

impl ConsumerGrain {
    /// Subscribes to `(key, namespace)` on `provider`. A previous subscription is
    /// removed first so no item is counted twice.
    ///
    /// # Errors
    ///
    /// Fails if the provider is unknown or the subscription is rejected.
    pub async fn become_consumer(
        &mut self,
        key: Uuid,
        namespace: &str,
        provider: &str,
    ) -> anyhow::Result<()> {
        self.stop_consuming().await;
        let stream = self
            .context
            .stream_provider(provider)?
            .get_stream::<u64>(key, namespace);
        let observer = CountingObserver {
            grain: self.context.self_ref::<Self>(),
        };
        let handle = stream.subscribe(observer).await?;
        info!(grain = %self.context.id(), subscription = %handle.id(), "became consumer");
        self.handle = Some(handle);
        Ok(())
    }

    /// Unsubscribes if subscribed.
    pub async fn stop_consuming(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.unsubscribe().await;
            debug!(grain = %self.context.id(), consumed = self.consumed, "stopped consuming");
        }
    }

    pub fn get_number_consumed(&self) -> u64 {
        self.consumed
    }

    pub fn state(&self) -> ConsumerState {
        if self.handle.is_some() {
            ConsumerState::Subscribed
        } else {
            ConsumerState::NotSubscribed
        }
    }
}

#[async_trait]
impl Grain for ConsumerGrain {
    const KIND: &'static str = "consumer";

    fn create(context: GrainContext) -> Self {
        Self {
            context,
            consumed: 0,
            handle: None,
        }
    }

    async fn on_activate(&mut self) -> anyhow::Result<()> {
        debug!(grain = %self.context.id(), "OnActivate");
        Ok(())
    }

    async fn on_deactivate(&mut self) {
        debug!(grain = %self.context.id(), "OnDeactivate");
    }
}

/// Routes deliveries onto the owning [`ConsumerGrain`].
struct CountingObserver {
    grain: GrainRef<ConsumerGrain>,
}

#[async_trait]
impl StreamObserver<u64> for CountingObserver {
    async fn on_next(&self, item: u64, delivery: &Delivery) -> anyhow::Result<()> {
        let mut grain = self.grain.turn().await?;
        grain.consumed += 1;
        trace!(grain = %self.grain.id(), item, sequence = %delivery.sequence, "consumed");
        Ok(())
    }

    async fn on_error(&self, error: StreamError) -> anyhow::Result<()> {
        info!(grain = %self.grain.id(), error = %error, "OnError");
        Ok(())
    }

    async fn on_completed(&self, stream: &StreamId) -> anyhow::Result<()> {
        info!(grain = %self.grain.id(), stream = %stream, "OnCompleted");
        Ok(())
    }
}
