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

use std::collections::HashMap;

use async_trait::async_trait;
use grainstream_macro::implicit_subscription;
use tracing::{debug, trace, warn};

use crate::grain::GrainContext;
use crate::grains::Signature;
use crate::stream::{Delivery, StreamError, StreamId, SubscriptionHandle};
use crate::traits::{Grain, ImplicitSubscriber, StreamConsumer};

/// Implicitly subscribed to every `BRC*-in` stream keyed by its own key.
///
/// Keeps every handle it holds, grouped by namespace, so a namespace can be
/// dropped without touching the others. The same namespace may be subscribed
/// through several providers.
#[implicit_subscription(
    "BRC0-in", "BRC1-in", "BRC2-in", "BRC3-in", "BRC4-in", "BRC5-in", "BRC6-in", "BRC7-in",
    "BRC8-in"
)]
#[derive(Debug)]
pub struct EaterGrain {
    context: GrainContext,
    counter: u64,
    by_namespace: HashMap<String, u64>,
    handles: HashMap<String, Vec<SubscriptionHandle>>,
}

impl EaterGrain {
    pub fn get_count_of_received_stream_messages(&self) -> u64 {
        self.counter
    }

    /// Items received on `namespace` since activation.
    pub fn received_by_namespace(&self, namespace: &str) -> u64 {
        self.by_namespace.get(namespace).copied().unwrap_or_default()
    }

    /// Namespaces this activation holds a subscription handle for, sorted.
    pub fn subscribed_namespaces(&self) -> Vec<&str> {
        let mut namespaces: Vec<&str> = self.handles.keys().map(String::as_str).collect();
        namespaces.sort_unstable();
        namespaces
    }

    /// Handles held for `namespace`, one per provider it was subscribed through.
    pub fn handles_for(&self, namespace: &str) -> &[SubscriptionHandle] {
        self.handles.get(namespace).map(Vec::as_slice).unwrap_or_default()
    }

    /// Drops every subscription on `namespace`, whichever provider it came
    /// through. Later publishes there no longer reach this grain. Returns
    /// whether a subscription was held.
    pub async fn unsubscribe_namespace(&mut self, namespace: &str) -> bool {
        let Some(handles) = self.handles.remove(namespace) else {
            return false;
        };
        for handle in &handles {
            handle.unsubscribe().await;
        }
        debug!(grain = %self.context.id(), namespace, dropped = handles.len(), "unsubscribed namespace");
        !handles.is_empty()
    }

    fn remember(&mut self, handle: SubscriptionHandle) {
        let held = self
            .handles
            .entry(handle.stream().namespace().to_string())
            .or_default();
        if !held.contains(&handle) {
            held.push(handle);
        }
    }
}

#[async_trait]
impl Grain for EaterGrain {
    const KIND: &'static str = "eater";

    fn create(context: GrainContext) -> Self {
        Self {
            context,
            counter: 0,
            by_namespace: HashMap::new(),
            handles: HashMap::new(),
        }
    }

    async fn on_activate(&mut self) -> anyhow::Result<()> {
        debug!(grain = %self.context.id(), "OnActivate");
        // Subscriptions outlive activations; pick up the ones already registered.
        for provider in self.context.stream_providers()? {
            for &namespace in <Self as ImplicitSubscriber>::NAMESPACES {
                let stream = provider.get_stream::<Signature>(self.context.key(), namespace);
                for handle in stream.subscription_handles() {
                    self.remember(handle);
                }
            }
        }
        Ok(())
    }

    async fn on_deactivate(&mut self) {
        debug!(grain = %self.context.id(), counter = self.counter, "OnDeactivate");
    }
}

#[async_trait]
impl StreamConsumer for EaterGrain {
    type Item = Signature;

    async fn on_next(&mut self, item: Signature, delivery: &Delivery) -> anyhow::Result<()> {
        trace!(grain = %self.context.id(), identifier = %item.header().identifier, "received");
        self.counter += 1;
        *self
            .by_namespace
            .entry(delivery.stream.namespace().to_string())
            .or_default() += 1;
        Ok(())
    }

    async fn on_error(&mut self, error: StreamError) {
        warn!(grain = %self.context.id(), error = %error, "failed");
    }

    async fn on_completed(&mut self, stream: &StreamId) {
        warn!(grain = %self.context.id(), stream = %stream, "completed");
    }

    async fn on_subscribed(&mut self, handle: SubscriptionHandle) {
        self.remember(handle);
    }
}
