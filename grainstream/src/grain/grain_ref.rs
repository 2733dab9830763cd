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
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tokio::sync::OwnedMappedMutexGuard;
use uuid::Uuid;

use crate::common::WeakRuntime;
use crate::grain::activation::Activation;
use crate::grain::GrainId;
use crate::stream::StreamError;
use crate::traits::Grain;

/// A reference to a grain that may or may not be active.
///
/// Creating a reference never activates anything; the grain is activated by the
/// first [`turn`](GrainRef::turn). References hold the runtime weakly and stop
/// working once it is dropped.
pub struct GrainRef<G> {
    id: GrainId,
    runtime: WeakRuntime,
    _grain: PhantomData<fn() -> G>,
}

impl<G: Grain> GrainRef<G> {
    pub(crate) fn new(id: GrainId, runtime: WeakRuntime) -> Self {
        Self {
            id,
            runtime,
            _grain: PhantomData,
        }
    }

    /// The grain's identity.
    pub fn id(&self) -> GrainId {
        self.id
    }

    /// The grain's key.
    pub fn key(&self) -> Uuid {
        self.id.key()
    }

    /// Waits for exclusive access to the grain, activating it if needed.
    ///
    /// The returned [`GrainTurn`] dereferences to the instance; the turn ends
    /// when it is dropped. Do not request a turn on a grain from inside its own
    /// turn.
    ///
    /// # Errors
    ///
    /// Fails if the runtime is gone or shut down, or if activation fails.
    pub async fn turn(&self) -> anyhow::Result<GrainTurn<G>> {
        let runtime = self
            .runtime
            .upgrade()
            .ok_or(StreamError::RuntimeUnavailable)?;
        runtime.turn::<G>(self.id).await
    }

    /// Deactivates the grain if it is active. Returns whether it was.
    pub async fn deactivate(&self) -> bool {
        match self.runtime.upgrade() {
            Some(runtime) => runtime.deactivate(self.id).await,
            None => false,
        }
    }
}

impl<G> Clone for GrainRef<G> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            runtime: self.runtime.clone(),
            _grain: PhantomData,
        }
    }
}

impl<G> PartialEq for GrainRef<G> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<G> fmt::Debug for GrainRef<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GrainRef").field(&self.id).finish()
    }
}

/// Exclusive access to an active grain for the duration of one turn.
pub struct GrainTurn<G: Grain> {
    guard: OwnedMappedMutexGuard<Option<G>, G>,
    activation: Arc<Activation<G>>,
}

impl<G: Grain> GrainTurn<G> {
    pub(crate) fn new(
        guard: OwnedMappedMutexGuard<Option<G>, G>,
        activation: Arc<Activation<G>>,
    ) -> Self {
        Self { guard, activation }
    }
}

impl<G: Grain> Deref for GrainTurn<G> {
    type Target = G;

    fn deref(&self) -> &G {
        &self.guard
    }
}

impl<G: Grain> DerefMut for GrainTurn<G> {
    fn deref_mut(&mut self) -> &mut G {
        &mut self.guard
    }
}

impl<G: Grain> Drop for GrainTurn<G> {
    fn drop(&mut self) {
        self.activation.touch();
    }
}
