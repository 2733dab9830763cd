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

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::grain::{GrainContext, TimerHandle};
use crate::stream::{PublishContext, StreamHandle};
use crate::traits::Grain;

/// Context key set on every item a [`ProducerGrain`] publishes.
pub const PRODUCER_CONTEXT_KEY: &str = "producer";

/// Lifecycle of a [`ProducerGrain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProducerState {
    #[default]
    Idle,
    Producing,
}

/// Publishes a monotonically increasing counter onto one `u64` stream.
///
/// `produce` publishes the current counter and only then increments it, so the
/// count reflects items the registry accepted.
#[derive(Debug)]
pub struct ProducerGrain {
    context: GrainContext,
    stream: Option<StreamHandle<u64>>,
    produced: u64,
    timer: Option<TimerHandle>,
}

impl ProducerGrain {
    /// Binds this producer to `(key, namespace)` on `provider`. Replaces any
    /// previous binding.
    ///
    /// # Errors
    ///
    /// Fails while producing, or if the provider is unknown.
    pub fn become_producer(&mut self, key: Uuid, namespace: &str, provider: &str) -> anyhow::Result<()> {
        if self.state() == ProducerState::Producing {
            bail!(
                "producer {} is producing; stop it before rebinding",
                self.context.id()
            );
        }
        let provider = self.context.stream_provider(provider)?;
        let stream = provider.get_stream::<u64>(key, namespace);
        info!(grain = %self.context.id(), stream = %stream.stream_id(), "became producer");
        self.stream = Some(stream);
        Ok(())
    }

    /// Starts the production timer. A running timer is replaced.
    ///
    /// # Errors
    ///
    /// Fails if the producer is not bound to a stream.
    pub fn start_periodic_producing(&mut self) -> anyhow::Result<()> {
        if self.stream.is_none() {
            bail!("producer {} is not bound to a stream", self.context.id());
        }
        let config = self.context.config();
        let (due, period) = (config.producer_due(), config.producer_period());
        let timer = self.context.register_timer::<Self>(due, period, tick)?;
        if let Some(previous) = self.timer.replace(timer) {
            previous.cancel();
        }
        debug!(grain = %self.context.id(), ?period, "started periodic producing");
        Ok(())
    }

    /// Stops the production timer. No-op when idle.
    pub fn stop_periodic_producing(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
            debug!(grain = %self.context.id(), produced = self.produced, "stopped periodic producing");
        }
    }

    /// Publishes the current counter, then increments it.
    ///
    /// # Errors
    ///
    /// Fails if the producer is unbound or the stream rejects the item.
    pub async fn produce(&mut self) -> anyhow::Result<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| anyhow!("producer {} is not bound to a stream", self.context.id()))?;
        let context = PublishContext::default()
            .with_value(PRODUCER_CONTEXT_KEY, self.context.key().to_string());
        let report = stream.on_next_with(self.produced, context).await?;
        self.produced += 1;
        trace!(
            grain = %self.context.id(),
            item = self.produced,
            delivered = report.delivered,
            "produced"
        );
        Ok(())
    }

    pub fn get_number_produced(&self) -> u64 {
        self.produced
    }

    pub fn clear_number_produced(&mut self) {
        self.produced = 0;
    }

    pub fn state(&self) -> ProducerState {
        match &self.timer {
            Some(timer) if !timer.is_cancelled() => ProducerState::Producing,
            _ => ProducerState::Idle,
        }
    }
}

fn tick(grain: &mut ProducerGrain) -> BoxFuture<'_, anyhow::Result<()>> {
    grain.produce().boxed()
}

#[async_trait]
impl Grain for ProducerGrain {
    const KIND: &'static str = "producer";

    fn create(context: GrainContext) -> Self {
        Self {
            context,
            stream: None,
            produced: 0,
            timer: None,
        }
    }

    async fn on_activate(&mut self) -> anyhow::Result<()> {
        debug!(grain = %self.context.id(), "OnActivate");
        Ok(())
    }

    async fn on_deactivate(&mut self) {
        self.stop_periodic_producing();
        debug!(grain = %self.context.id(), "OnDeactivate");
    }
}
