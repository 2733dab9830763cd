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
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::common::{GrainRuntime, StreamsConfig, WeakRuntime};
use crate::grain::activation::Activation;
use crate::grain::timer::{self, TimerCallback, TimerHandle};
use crate::grain::{GrainId, GrainRef};
use crate::stream::{StreamError, StreamProvider, SubscriberRef};
use crate::traits::Grain;

/// What a grain knows about itself and its runtime.
///
/// Handed to [`Grain::create`] and usually stored in the grain.
pub struct GrainContext {
    id: GrainId,
    runtime: WeakRuntime,
    config: Arc<StreamsConfig>,
    token: CancellationToken,
    activation: Weak<dyn Any + Send + Sync>,
}

impl GrainContext {
    pub(crate) fn new(
        id: GrainId,
        runtime: WeakRuntime,
        config: Arc<StreamsConfig>,
        token: CancellationToken,
        activation: Weak<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            id,
            runtime,
            config,
            token,
            activation,
        }
    }

    /// This grain's identity.
    pub fn id(&self) -> GrainId {
        self.id
    }

    /// This grain's key.
    pub fn key(&self) -> Uuid {
        self.id.key()
    }

    /// Configuration of the hosting runtime.
    pub fn config(&self) -> &StreamsConfig {
        &self.config
    }

    /// True once the activation has started deactivating.
    pub fn is_deactivating(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The stream provider `name`, bound to this grain as subscriber.
    ///
    /// # Errors
    ///
    /// [`StreamError::UnknownProvider`] or [`StreamError::RuntimeUnavailable`].
    pub fn stream_provider(&self, name: &str) -> Result<StreamProvider, StreamError> {
        self.runtime()?
            .provider_for(name, SubscriberRef::Grain(self.id))
    }

    /// The configured default stream provider, bound to this grain.
    ///
    /// # Errors
    ///
    /// [`StreamError::RuntimeUnavailable`] if the runtime is gone.
    pub fn default_stream_provider(&self) -> Result<StreamProvider, StreamError> {
        self.stream_provider(&self.config.defaults.stream_provider)
    }

    /// Every provider of the hosting runtime, bound to this grain, in name order.
    ///
    /// # Errors
    ///
    /// [`StreamError::RuntimeUnavailable`] if the runtime is gone.
    pub fn stream_providers(&self) -> Result<Vec<StreamProvider>, StreamError> {
        let runtime = self.runtime()?;
        runtime
            .provider_names()
            .into_iter()
            .map(|name| runtime.provider_for(name, SubscriberRef::Grain(self.id)))
            .collect()
    }

    /// A reference to another grain.
    pub fn grain<H: Grain>(&self, key: Uuid) -> GrainRef<H> {
        GrainRef::new(GrainId::of::<H>(key), self.runtime.clone())
    }

    /// A reference to this grain, for observers that route back to it.
    pub fn self_ref<G: Grain>(&self) -> GrainRef<G> {
        debug_assert_eq!(G::KIND, self.id.kind());
        GrainRef::new(self.id, self.runtime.clone())
    }

    /// Registers a timer that runs `callback` on this grain's turn, first after
    /// `due` and then `period` after each completed tick.
    ///
    /// The timer stops when the handle is dropped or cancelled, and when the
    /// grain deactivates.
    ///
    /// # Errors
    ///
    /// Fails if the activation is gone or `G` is not this grain's type.
    pub fn register_timer<G: Grain>(
        &self,
        due: Duration,
        period: Duration,
        callback: TimerCallback<G>,
    ) -> anyhow::Result<TimerHandle> {
        let activation = self
            .activation
            .upgrade()
            .ok_or_else(|| anyhow!("grain {} is no longer active", self.id))?
            .downcast::<Activation<G>>()
            .map_err(|_| anyhow!("timer callback does not match grain {}", self.id))?;
        Ok(timer::start(
            Arc::downgrade(&activation),
            self.token.child_token(),
            due,
            period,
            callback,
        ))
    }

    fn runtime(&self) -> Result<GrainRuntime, StreamError> {
        self.runtime.upgrade().ok_or(StreamError::RuntimeUnavailable)
    }
}

impl fmt::Debug for GrainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrainContext")
            .field("id", &self.id)
            .field("deactivating", &self.is_deactivating())
            .finish_non_exhaustive()
    }
}
