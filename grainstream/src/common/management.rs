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

use crate::common::GrainRuntime;
use crate::grain::GrainId;
use crate::stream::{EntrySnapshot, StreamError, StreamId, SubscriptionRecord};

/// Activation count for one grain kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrainStatistic {
    /// Grain kind tag.
    pub kind: &'static str,
    /// Number of live activations.
    pub activations: usize,
}

impl fmt::Display for GrainStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.activations)
    }
}

/// Read-only diagnostics over a runtime, for operator tooling.
///
/// Every call takes a snapshot; none of them block publishers for longer than
/// the per-entry state lock.
#[derive(Debug, Clone)]
pub struct ManagementIntrospection {
    runtime: GrainRuntime,
}

impl ManagementIntrospection {
    pub(crate) fn new(runtime: GrainRuntime) -> Self {
        Self { runtime }
    }

    /// All registry entries across all providers, ordered by provider then stream.
    pub fn list_entries(&self) -> Vec<EntrySnapshot> {
        let mut entries: Vec<EntrySnapshot> = self
            .runtime
            .registries()
            .flat_map(|registry| registry.entry_snapshots())
            .collect();
        entries.sort();
        entries
    }

    /// Live activation counts per grain kind, ordered by kind.
    pub fn grain_statistics(&self) -> Vec<GrainStatistic> {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for id in self.runtime.activation_ids() {
            *counts.entry(id.kind()).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(kind, activations)| GrainStatistic { kind, activations })
            .collect()
    }

    /// Ids of all live activations, sorted.
    pub fn activations(&self) -> Vec<GrainId> {
        let mut ids = self.runtime.activation_ids();
        ids.sort();
        ids
    }

    /// Subscription records the store holds for `stream` under `provider`.
    ///
    /// # Errors
    ///
    /// [`StreamError::Store`] if the store cannot be read.
    pub async fn stored_subscriptions(
        &self,
        provider: &str,
        stream: &StreamId,
    ) -> Result<Vec<SubscriptionRecord>, StreamError> {
        self.runtime
            .store()
            .read(provider, stream)
            .await
            .map_err(|err| StreamError::Store(format!("{err:#}")))
    }
}
