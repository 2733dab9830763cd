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

use tracing::trace;

use crate::common::{GrainRuntime, StreamsConfig, CONFIG};
use crate::stream::implicit::ImplicitSubscriptionTable;
use crate::stream::{MemoryPubSubStore, PubSubStore};
use crate::traits::ImplicitSubscriber;

/// Builder and entry point for a Grainstream runtime.
///
/// ```rust,ignore
/// use grainstream::prelude::*;
///
/// let runtime = GrainApp::new()
///     .with_stream_provider("NCI-BRC")
///     .with_implicit_subscriber::<EaterGrain>()
///     .launch_async()
///     .await;
/// ```
///
/// Without [`with_config`](GrainApp::with_config) the runtime uses the global
/// [`CONFIG`], loaded from the XDG configuration directory. The configured
/// default provider is always registered.
#[derive(Debug, Default)]
pub struct GrainApp {
    config: Option<StreamsConfig>,
    providers: Vec<String>,
    implicit: ImplicitSubscriptionTable,
    store: Option<Arc<dyn PubSubStore>>,
}

impl GrainApp {
    /// A builder with no extra providers, declarations or store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `config` instead of the global configuration.
    #[must_use]
    pub fn with_config(mut self, config: StreamsConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Registers an additional stream provider.
    #[must_use]
    pub fn with_stream_provider(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.providers.contains(&name) {
            self.providers.push(name);
        }
        self
    }

    /// Adds the implicit subscriptions declared by `G`.
    #[must_use]
    pub fn with_implicit_subscriber<G: ImplicitSubscriber>(mut self) -> Self {
        self.implicit.declare::<G>();
        self
    }

    /// Uses `store` for subscription records instead of an in-memory store.
    #[must_use]
    pub fn with_pubsub_store(mut self, store: Arc<dyn PubSubStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the runtime and starts its background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn launch_async(self) -> GrainRuntime {
        trace!("Starting Grainstream runtime");
        let config = self.config.unwrap_or_else(|| CONFIG.clone());
        trace!("Configuration: {:?}", config);

        let mut providers = self.providers;
        if !providers.contains(&config.defaults.stream_provider) {
            providers.push(config.defaults.stream_provider.clone());
        }
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryPubSubStore::default()));
        let collect = config.collection.enabled;

        let runtime = GrainRuntime::assemble(config, providers, self.implicit, store);
        if collect {
            runtime.spawn_idle_collector();
        }
        trace!("Grainstream runtime ready");
        runtime
    }
}
