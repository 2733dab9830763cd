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

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::common::Reply;
use crate::grain::GrainContext;
use crate::stream::{PublishContext, SequenceToken, SubscriptionHandle};
use crate::traits::Grain;

/// Like [`ConsumerGrain`](super::ConsumerGrain), but subscribes with three
/// closures and remembers what the last delivery carried.
#[derive(Debug)]
pub struct InlineConsumerGrain {
    context: GrainContext,
    consumed: u64,
    last_sequence: Option<SequenceToken>,
    last_context: Option<Arc<PublishContext>>,
    handle: Option<SubscriptionHandle>,
}

impl InlineConsumerGrain {
    /// Subscribes to `(key, namespace)` on `provider`, replacing any previous
    /// subscription.
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
        let grain = self.context.self_ref::<Self>();
        let on_error_id = grain.id();
        let on_completed_id = grain.id();

        let handle = stream
            .subscribe_with(
                move |item, delivery| {
                    let grain = grain.clone();
                    Reply::pending(async move {
                        let mut turn = grain.turn().await?;
                        trace!(grain = %grain.id(), item, sequence = %delivery.sequence, "OnNext");
                        turn.consumed += 1;
                        turn.last_sequence = Some(delivery.sequence);
                        turn.last_context = Some(delivery.context);
                        Ok(())
                    })
                },
                move |error| {
                    info!(grain = %on_error_id, error = %error, "OnError");
                    Reply::ok()
                },
                move || {
                    info!(grain = %on_completed_id, "OnCompleted");
                    Reply::ok()
                },
            )
            .await?;
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

    /// Sequence token of the most recent delivery.
    pub fn last_sequence(&self) -> Option<SequenceToken> {
        self.last_sequence
    }

    /// Publish context of the most recent delivery.
    pub fn last_context(&self) -> Option<&PublishContext> {
        self.last_context.as_deref()
    }
}

#[async_trait]
impl Grain for InlineConsumerGrain {
    const KIND: &'static str = "inline-consumer";

    fn create(context: GrainContext) -> Self {
        Self {
            context,
            consumed: 0,
            last_sequence: None,
            last_context: None,
            handle: None,
        }
    }

    async fn on_deactivate(&mut self) {
        debug!(grain = %self.context.id(), "OnDeactivate");
    }
}
