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
use std::fmt::Debug;

use async_trait::async_trait;
use dashmap::DashMap;
use derive_new::new;
use tracing::trace;

use crate::stream::{StreamId, SubscriberRef, SubscriptionId};

/// A registration as mirrored into the subscription store.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    /// Subscription id.
    pub id: SubscriptionId,
    /// Provider the subscription belongs to.
    pub provider: String,
    /// Stream the subscription is attached to.
    pub stream: StreamId,
    /// Owner of the subscription.
    pub subscriber: SubscriberRef,
}

/// Key-value storage for subscription state.
///
/// The registry writes every registration here and removes it on unsubscribe.
/// Durability is the implementation's concern; the default
/// [`MemoryPubSubStore`] keeps records for the lifetime of the runtime.
#[async_trait]
pub trait PubSubStore: Send + Sync + Debug {
    /// Persists a new registration.
    async fn write(&self, record: SubscriptionRecord) -> anyhow::Result<()>;

    /// Removes a registration. Removing an unknown id is not an error.
    async fn remove(&self, id: SubscriptionId) -> anyhow::Result<()>;

    /// Reads all registrations of `stream` under `provider`.
    async fn read(&self, provider: &str, stream: &StreamId) -> anyhow::Result<Vec<SubscriptionRecord>>;
}

/// In-memory [`PubSubStore`].
#[derive(Debug, Default)]
pub struct MemoryPubSubStore {
    records: DashMap<SubscriptionId, SubscriptionRecord>,
}

impl MemoryPubSubStore {
    /// Number of stored registrations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no registration is stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PubSubStore for MemoryPubSubStore {
    async fn write(&self, record: SubscriptionRecord) -> anyhow::Result<()> {
        trace!(subscription = %record.id, stream = %record.stream, "store write");
        self.records.insert(record.id, record);
        Ok(())
    }

    async fn remove(&self, id: SubscriptionId) -> anyhow::Result<()> {
        trace!(subscription = %id, "store remove");
        self.records.remove(&id);
        Ok(())
    }

    async fn read(&self, provider: &str, stream: &StreamId) -> anyhow::Result<Vec<SubscriptionRecord>> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|r| r.provider == provider && &r.stream == stream)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}
