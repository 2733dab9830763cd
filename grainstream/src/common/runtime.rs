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
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::{anyhow, Context};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::common::{ManagementIntrospection, StreamsConfig};
use crate::grain::activation::{Activation, ActivationSlot};
use crate::grain::{GrainContext, GrainId, GrainRef, GrainTurn};
use crate::stream::implicit::{ImplicitSubscriptionResolver, ImplicitSubscriptionTable};
use crate::stream::{PubSubRegistry, PubSubStore, StreamError, StreamProvider, SubscriberRef};
use crate::traits::Grain;

/// A running Grainstream runtime.
///
/// Hosts the activation directory, one [`PubSubRegistry`] per stream provider
/// and the implicit declaration table. Cheap to clone; every clone refers to the
/// same runtime. Built by [`GrainApp`](crate::common::GrainApp).
#[derive(Clone)]
pub struct GrainRuntime(pub(crate) Arc<RuntimeInner>);

/// A non-owning runtime reference held by grain references, contexts and
/// resolvers.
#[derive(Clone, Default)]
pub(crate) struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<GrainRuntime> {
        self.0.upgrade().map(GrainRuntime)
    }
}

pub(crate) struct RuntimeInner {
    /// Live activations keyed by grain id.
    activations: DashMap<GrainId, Arc<dyn ActivationSlot>>,
    /// One registry per stream provider name.
    registries: HashMap<String, Arc<PubSubRegistry>>,
    implicit: Arc<ImplicitSubscriptionTable>,
    /// Root of every activation and timer token.
    cancellation_token: CancellationToken,
    config: Arc<StreamsConfig>,
    client_id: Uuid,
    store: Arc<dyn PubSubStore>,
    serials: AtomicU64,
}

impl GrainRuntime {
    /// Builds the runtime and its registries. Resolvers get a weak handle back
    /// to the runtime so that implicit subscribers can be activated.
    pub(crate) fn assemble(
        config: StreamsConfig,
        providers: Vec<String>,
        implicit: ImplicitSubscriptionTable,
        store: Arc<dyn PubSubStore>,
    ) -> Self {
        let implicit = Arc::new(implicit);
        let inner = Arc::new_cyclic(|weak: &Weak<RuntimeInner>| {
            let registries = providers
                .into_iter()
                .map(|name| {
                    let resolver = ImplicitSubscriptionResolver::new(
                        Arc::clone(&implicit),
                        WeakRuntime(weak.clone()),
                    );
                    let registry = PubSubRegistry::new(name.clone(), resolver, Arc::clone(&store));
                    (name, Arc::new(registry))
                })
                .collect();
            RuntimeInner {
                activations: DashMap::new(),
                registries,
                implicit,
                cancellation_token: CancellationToken::new(),
                config: Arc::new(config),
                client_id: Uuid::new_v4(),
                store,
                serials: AtomicU64::new(0),
            }
        });
        Self(inner)
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Arc::downgrade(&self.0))
    }

    /// A reference to the grain of type `G` with `key`. Does not activate it.
    pub fn grain<G: Grain>(&self, key: Uuid) -> GrainRef<G> {
        GrainRef::new(GrainId::of::<G>(key), self.downgrade())
    }

    /// The stream provider `name`, bound to this runtime's client id.
    ///
    /// # Errors
    ///
    /// [`StreamError::UnknownProvider`] if no provider has that name.
    pub fn stream_provider(&self, name: &str) -> Result<StreamProvider, StreamError> {
        self.provider_for(name, SubscriberRef::Client(self.0.client_id))
    }

    /// The configured default stream provider, bound to the client id.
    ///
    /// # Errors
    ///
    /// Never fails for a runtime built by `GrainApp`, which always registers
    /// the default provider.
    pub fn default_stream_provider(&self) -> Result<StreamProvider, StreamError> {
        self.stream_provider(&self.0.config.defaults.stream_provider)
    }

    pub(crate) fn provider_for(
        &self,
        name: &str,
        caller: SubscriberRef,
    ) -> Result<StreamProvider, StreamError> {
        let registry = self
            .0
            .registries
            .get(name)
            .ok_or_else(|| StreamError::UnknownProvider(name.to_string()))?;
        Ok(StreamProvider::new(Arc::clone(registry), caller))
    }

    pub(crate) fn registries(&self) -> impl Iterator<Item = &Arc<PubSubRegistry>> {
        self.0.registries.values()
    }

    /// Names of all registered stream providers, sorted.
    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.registries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The implicit declaration table.
    pub fn implicit_declarations(&self) -> &ImplicitSubscriptionTable {
        &self.0.implicit
    }

    /// The subscription store shared by all providers.
    pub fn store(&self) -> Arc<dyn PubSubStore> {
        Arc::clone(&self.0.store)
    }

    /// The runtime configuration.
    pub fn config(&self) -> &StreamsConfig {
        &self.0.config
    }

    /// Subscriber id used for subscriptions made outside any grain.
    pub fn client_id(&self) -> Uuid {
        self.0.client_id
    }

    /// Read-only introspection over registries and activations.
    pub fn management(&self) -> ManagementIntrospection {
        ManagementIntrospection::new(self.clone())
    }

    /// Whether `id` currently has an activation.
    pub fn is_active(&self, id: GrainId) -> bool {
        self.0.activations.contains_key(&id)
    }

    pub(crate) fn activation_ids(&self) -> Vec<GrainId> {
        self.0.activations.iter().map(|slot| *slot.key()).collect()
    }

    /// True after [`shutdown_all`](Self::shutdown_all).
    pub fn is_shut_down(&self) -> bool {
        self.0.cancellation_token.is_cancelled()
    }

    /// Grants the turn of grain `id`, activating it first if needed.
    ///
    /// Exactly one caller creates a missing activation; it inserts the slot with
    /// the instance lock already held, so every concurrent caller queues on that
    /// lock. A caller that wins the lock after the activation was discarded or
    /// deactivated starts over.
    pub(crate) async fn turn<G: Grain>(&self, id: GrainId) -> anyhow::Result<GrainTurn<G>> {
        loop {
            if self.is_shut_down() {
                return Err(StreamError::RuntimeUnavailable.into());
            }

            let (activation, fresh) = self.slot_for::<G>(id)?;
            let guard = match fresh {
                Some(mut guard) => match self.activate(&activation).await {
                    Ok(grain) => {
                        *guard = Some(grain);
                        guard
                    }
                    Err(err) => {
                        self.discard(&activation);
                        return Err(err);
                    }
                },
                None => Arc::clone(&activation.cell).lock_owned().await,
            };

            if activation.token.is_cancelled() {
                trace!(grain = %id, "activation is deactivating, retrying");
                continue;
            }

            match OwnedMutexGuard::try_map(guard, |slot| slot.as_mut()) {
                Ok(instance) => {
                    activation.touch();
                    return Ok(GrainTurn::new(instance, activation));
                }
                Err(_) => trace!(grain = %id, "activation discarded, retrying"),
            }
        }
    }

    /// Looks up the activation of `id`, inserting a new, locked one if missing.
    #[allow(clippy::type_complexity)]
    fn slot_for<G: Grain>(
        &self,
        id: GrainId,
    ) -> anyhow::Result<(Arc<Activation<G>>, Option<OwnedMutexGuard<Option<G>>>)> {
        match self.0.activations.entry(id) {
            Entry::Occupied(slot) => {
                let activation = Arc::clone(slot.get())
                    .into_any()
                    .downcast::<Activation<G>>()
                    .map_err(|_| anyhow!("grain kind {} is used by more than one type", id.kind()))?;
                Ok((activation, None))
            }
            Entry::Vacant(slot) => {
                let serial = self.0.serials.fetch_add(1, Ordering::Relaxed);
                let activation = Arc::new(Activation::<G>::new(
                    id,
                    serial,
                    self.0.cancellation_token.child_token(),
                ));
                let guard = Arc::clone(&activation.cell).try_lock_owned()?;
                let erased: Arc<dyn ActivationSlot> = activation.clone();
                slot.insert(erased);
                Ok((activation, Some(guard)))
            }
        }
    }

    async fn activate<G: Grain>(&self, activation: &Arc<Activation<G>>) -> anyhow::Result<G> {
        let erased: Arc<dyn Any + Send + Sync> = activation.clone();
        let context = GrainContext::new(
            activation.id,
            self.downgrade(),
            Arc::clone(&self.0.config),
            activation.token.clone(),
            Arc::downgrade(&erased),
        );
        let mut grain = G::create(context);
        grain
            .on_activate()
            .await
            .with_context(|| format!("activation of {} failed", activation.id))?;
        debug!(grain = %activation.id, "activated");
        Ok(grain)
    }

    fn discard<G: Grain>(&self, activation: &Activation<G>) {
        self.0
            .activations
            .remove_if(&activation.id, |_, slot| slot.serial() == activation.serial);
        activation.token.cancel();
    }

    /// Deactivates grain `id`: stops its timers, waits for its current turn and
    /// runs `on_deactivate`. Returns `false` if it was not active.
    ///
    /// Must not be called from inside that grain's own turn.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: GrainId) -> bool {
        let Some((_, slot)) = self.0.activations.remove(&id) else {
            return false;
        };
        slot.deactivate(self.0.config.deactivation_timeout()).await;
        true
    }

    /// Deactivates every activation that has been idle for at least `age` and
    /// is not in a turn. Returns how many were deactivated.
    pub async fn deactivate_idle(&self, age: Duration) -> usize {
        let idle: Vec<GrainId> = self
            .0
            .activations
            .iter()
            .filter(|slot| !slot.is_busy() && slot.idle_for() >= age)
            .map(|slot| *slot.key())
            .collect();
        let mut collected = 0;
        for id in idle {
            if self.deactivate(id).await {
                collected += 1;
            }
        }
        collected
    }

    /// Stops accepting turns, then deactivates every grain.
    ///
    /// # Errors
    ///
    /// Fails if deactivation does not finish within the configured system
    /// shutdown timeout.
    #[instrument(skip(self))]
    pub async fn shutdown_all(&self) -> anyhow::Result<()> {
        self.0.cancellation_token.cancel();
        let timeout = self.0.config.system_shutdown_timeout();
        let ids = self.activation_ids();
        debug!(activations = ids.len(), "shutting down");
        tokio::time::timeout(timeout, join_all(ids.into_iter().map(|id| self.deactivate(id))))
            .await
            .map_err(|_| anyhow!("shutdown did not finish within {timeout:?}"))?;
        Ok(())
    }

    /// Runs [`deactivate_idle`](Self::deactivate_idle) on the configured sweep
    /// interval until shutdown.
    pub(crate) fn spawn_idle_collector(&self) {
        let runtime = self.downgrade();
        let token = self.0.cancellation_token.clone();
        let interval = self.0.config.sweep_interval().max(Duration::from_millis(1));
        let age = self.0.config.idle_age();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(runtime) = runtime.upgrade() else {
                    break;
                };
                let collected = runtime.deactivate_idle(age).await;
                if collected > 0 {
                    debug!(collected, "idle activations collected");
                }
            }
            trace!("idle collector stopped");
        });
    }
}

impl fmt::Debug for GrainRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrainRuntime")
            .field("client_id", &self.0.client_id)
            .field("providers", &self.provider_names())
            .field("activations", &self.0.activations.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl fmt::Debug for WeakRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakRuntime")
    }
}
