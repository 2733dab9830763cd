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
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::common::{GrainRuntime, WeakRuntime};
use crate::grain::{GrainId, GrainRef};
use crate::stream::observer::TypedObserver;
use crate::stream::registry::StreamEntry;
use crate::stream::{
    Delivery, PubSubRegistry, StreamError, StreamId, StreamObserver, SubscriberRef,
};
use crate::traits::{ImplicitSubscriber, StreamConsumer};

/// One `(grain kind, namespace)` pairing.
#[derive(Clone)]
pub struct ImplicitDeclaration {
    kind: &'static str,
    namespace: &'static str,
    binding: Arc<dyn ImplicitBinding>,
}

impl ImplicitDeclaration {
    /// Grain kind that auto-subscribes.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Namespace it subscribes to.
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }
}

impl fmt::Debug for ImplicitDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplicitDeclaration")
            .field("kind", &self.kind)
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// Process-wide table of implicit declarations, indexed by namespace.
///
/// Built once while the runtime is assembled and read-only afterwards.
#[derive(Clone, Default)]
pub struct ImplicitSubscriptionTable {
    by_namespace: HashMap<&'static str, Vec<ImplicitDeclaration>>,
}

impl ImplicitSubscriptionTable {
    /// Adds the declarations of `G`. Declaring the same type twice has no effect.
    pub(crate) fn declare<G: ImplicitSubscriber>(&mut self) {
        let binding: Arc<dyn ImplicitBinding> = Arc::new(GrainBinding::<G>(PhantomData));
        for &namespace in G::NAMESPACES {
            let declarations = self.by_namespace.entry(namespace).or_default();
            if declarations.iter().any(|d| d.kind == G::KIND) {
                continue;
            }
            declarations.push(ImplicitDeclaration {
                kind: G::KIND,
                namespace,
                binding: Arc::clone(&binding),
            });
        }
    }

    /// Declarations whose namespace equals `namespace`, in declaration order.
    pub fn matching(&self, namespace: &str) -> &[ImplicitDeclaration] {
        self.by_namespace
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// True if any grain type auto-subscribes to `namespace`.
    pub fn has_declarations_for(&self, namespace: &str) -> bool {
        self.by_namespace.contains_key(namespace)
    }

    /// Namespaces declared by grain kind `kind`, sorted.
    pub fn namespaces_of(&self, kind: &str) -> Vec<&'static str> {
        let mut namespaces: Vec<_> = self
            .by_namespace
            .values()
            .flatten()
            .filter(|d| d.kind == kind)
            .map(|d| d.namespace)
            .collect();
        namespaces.sort_unstable();
        namespaces
    }

    /// Total number of declarations.
    pub fn len(&self) -> usize {
        self.by_namespace.values().map(Vec::len).sum()
    }

    /// True when nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.by_namespace.is_empty()
    }
}

impl fmt::Debug for ImplicitSubscriptionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.by_namespace.iter().map(|(namespace, declarations)| {
                (
                    namespace,
                    declarations.iter().map(|d| d.kind).collect::<Vec<_>>(),
                )
            }))
            .finish()
    }
}

/// Activates one grain type and subscribes it to a stream.
#[async_trait]
pub(crate) trait ImplicitBinding: Send + Sync {
    async fn bind(
        &self,
        runtime: &GrainRuntime,
        registry: &Arc<PubSubRegistry>,
        stream: &StreamId,
    ) -> anyhow::Result<()>;
}

struct GrainBinding<G>(PhantomData<fn() -> G>);

#[async_trait]
impl<G: ImplicitSubscriber> ImplicitBinding for GrainBinding<G> {
    async fn bind(
        &self,
        runtime: &GrainRuntime,
        registry: &Arc<PubSubRegistry>,
        stream: &StreamId,
    ) -> anyhow::Result<()> {
        let grain = runtime.grain::<G>(stream.key());
        let mut turn = grain.turn().await?;
        let observer = TypedObserver::erase(GrainObserver {
            grain: grain.clone(),
        });
        match registry
            .subscribe(stream, SubscriberRef::Grain(grain.id()), observer)
            .await
        {
            Ok(handle) => {
                turn.on_subscribed(handle).await;
                Ok(())
            }
            // The grain subscribed itself while activating.
            Err(StreamError::DuplicateSubscription { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Routes every callback of a subscription onto the consuming grain's turn.
pub(crate) struct GrainObserver<G> {
    grain: GrainRef<G>,
}

#[async_trait]
impl<G: StreamConsumer> StreamObserver<G::Item> for GrainObserver<G> {
    async fn on_next(&self, item: G::Item, delivery: &Delivery) -> anyhow::Result<()> {
        let mut turn = self.grain.turn().await?;
        turn.on_next(item, delivery).await
    }

    async fn on_error(&self, error: StreamError) -> anyhow::Result<()> {
        let mut turn = self.grain.turn().await?;
        turn.on_error(error).await;
        Ok(())
    }

    async fn on_completed(&self, stream: &StreamId) -> anyhow::Result<()> {
        let mut turn = self.grain.turn().await?;
        turn.on_completed(stream).await;
        Ok(())
    }
}

/// Outcome of resolving the implicit subscribers of one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Grains activated and subscribed by this resolution.
    pub activated: Vec<GrainId>,
    /// Grains that could not be bound, with the reason. They are retried on
    /// the next publish.
    pub unresolved: Vec<(GrainId, String)>,
}

impl Resolution {
    /// True when nothing was activated and nothing failed.
    pub fn is_empty(&self) -> bool {
        self.activated.is_empty() && self.unresolved.is_empty()
    }
}

/// Makes sure every implicit subscriber of a stream is activated and subscribed
/// exactly once per registry entry.
pub(crate) struct ImplicitSubscriptionResolver {
    table: Arc<ImplicitSubscriptionTable>,
    runtime: WeakRuntime,
}

impl ImplicitSubscriptionResolver {
    pub(crate) fn new(table: Arc<ImplicitSubscriptionTable>, runtime: WeakRuntime) -> Self {
        Self { table, runtime }
    }

    pub(crate) fn table(&self) -> &ImplicitSubscriptionTable {
        &self.table
    }

    /// Resolves the declarations matching `entry`'s namespace.
    ///
    /// Must run under the entry's fan-out lock; that lock is what makes
    /// concurrent publishes agree on a single activation. A kind is recorded as
    /// resolved once its grain is subscribed, so a later unsubscribe is not
    /// undone by the next publish. Failed bindings are reported in
    /// [`Resolution::unresolved`] and retried on the next publish.
    pub(crate) async fn resolve(
        &self,
        registry: &Arc<PubSubRegistry>,
        entry: &StreamEntry,
    ) -> Resolution {
        let stream = entry.stream();
        let mut resolution = Resolution::default();
        for declaration in self.table.matching(stream.namespace()) {
            if entry.is_resolved(declaration.kind) {
                continue;
            }
            let grain = GrainId::new(declaration.kind, stream.key());
            if entry.has_subscriber(SubscriberRef::Grain(grain)) {
                entry.mark_resolved(declaration.kind);
                continue;
            }
            let Some(runtime) = self.runtime.upgrade() else {
                warn!(stream = %stream, grain = %grain, "runtime gone, implicit subscription skipped");
                resolution
                    .unresolved
                    .push((grain, StreamError::RuntimeUnavailable.to_string()));
                continue;
            };
            match declaration.binding.bind(&runtime, registry, stream).await {
                Ok(()) => {
                    entry.mark_resolved(declaration.kind);
                    debug!(stream = %stream, grain = %grain, "implicit subscriber activated");
                    resolution.activated.push(grain);
                }
                Err(err) => {
                    warn!(stream = %stream, grain = %grain, error = %err, "implicit subscription failed");
                    resolution.unresolved.push((grain, format!("{err:#}")));
                }
            }
        }
        if !resolution.is_empty() {
            trace!(
                stream = %stream,
                activated = resolution.activated.len(),
                unresolved = resolution.unresolved.len(),
                "implicit resolution done"
            );
        }
        resolution
    }
}
