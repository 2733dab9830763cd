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
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, error, instrument, trace, warn};

use crate::grain::GrainId;
use crate::stream::implicit::{ImplicitSubscriptionResolver, Resolution};
use crate::stream::observer::ErasedObserver;
use crate::stream::subscription::Subscription;
use crate::stream::{
    Delivery, PubSubStore, PublishContext, SequenceToken, StreamError, StreamId, SubscriberRef,
    SubscriptionHandle, SubscriptionId, SubscriptionRecord,
};
use crate::traits::StreamItem;

/// Maps each stream of one provider to its ordered subscriber list.
///
/// Every mutating operation works under a critical section of the affected
/// entry only, so traffic on different streams never contends:
///
/// * subscriber bookkeeping (`subscribe`, `unsubscribe`) takes the entry's short
///   synchronous state lock;
/// * `publish` and `complete` additionally hold the entry's fan-out lock for the
///   whole delivery, which serializes publishes per stream and gives every
///   subscriber its items in publish order.
///
/// Subscribe and unsubscribe never wait for an in-flight fan-out, so a
/// subscriber may cancel its own subscription from inside a callback.
pub struct PubSubRegistry {
    provider: String,
    entries: DashMap<StreamId, Arc<StreamEntry>>,
    resolver: ImplicitSubscriptionResolver,
    store: Arc<dyn PubSubStore>,
}

/// Outcome of one publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Stream the item was published on.
    pub stream: StreamId,
    /// Sequence assigned to the item; `None` when the stream had no entry.
    pub sequence: Option<SequenceToken>,
    /// Subscribers whose `on_next` succeeded.
    pub delivered: usize,
    /// Subscribers whose `on_next` failed and were notified through `on_error`.
    pub failed: usize,
    /// Implicit subscribers activated by this publish.
    pub activated: Vec<GrainId>,
    /// Implicit subscribers that could not be activated or subscribed, with
    /// the reason. The item did not reach them.
    pub unresolved: Vec<(GrainId, String)>,
}

impl DeliveryReport {
    fn unrouted(stream: StreamId) -> Self {
        Self {
            stream,
            sequence: None,
            delivered: 0,
            failed: 0,
            activated: Vec::new(),
            unresolved: Vec::new(),
        }
    }
}

/// A point-in-time view of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntrySnapshot {
    /// Provider owning the entry.
    pub provider: String,
    /// Stream identity.
    pub stream: StreamId,
    /// Number of active subscribers.
    pub subscriber_count: usize,
    /// Whether the stream has been completed.
    pub closed: bool,
}

impl fmt::Display for EntrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.stream.key(),
            self.provider,
            self.stream.namespace()
        )
    }
}

pub(crate) struct StreamEntry {
    stream: StreamId,
    state: Mutex<EntryState>,
    /// Held for a whole publish or completion; guards the sequence counter.
    fan_out: tokio::sync::Mutex<u64>,
}

#[derive(Default)]
struct EntryState {
    subscribers: Vec<Arc<Subscription>>,
    closed: bool,
    /// Grain kinds whose implicit subscription has been resolved on this entry.
    resolved: HashSet<&'static str>,
}

impl StreamEntry {
    fn new(stream: StreamId) -> Self {
        Self {
            stream,
            state: Mutex::new(EntryState::default()),
            fan_out: tokio::sync::Mutex::new(0),
        }
    }

    pub(crate) fn stream(&self) -> &StreamId {
        &self.stream
    }

    fn attach(&self, subscription: Subscription) -> Result<(), StreamError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(StreamError::StreamClosed(self.stream.clone()));
        }
        if state
            .subscribers
            .iter()
            .any(|s| s.subscriber == subscription.subscriber)
        {
            return Err(StreamError::DuplicateSubscription {
                stream: self.stream.clone(),
                subscriber: subscription.subscriber,
            });
        }
        state.subscribers.push(Arc::new(subscription));
        Ok(())
    }

    fn detach(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state.subscribers.iter().position(|s| s.id == id) else {
            return false;
        };
        let subscription = state.subscribers.remove(index);
        subscription.remove();
        true
    }

    fn active_subscribers(&self) -> Vec<Arc<Subscription>> {
        self.state.lock().subscribers.clone()
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Marks the entry closed, returning the subscribers to notify. `None` if it
    /// was already closed.
    fn close(&self) -> Option<Vec<Arc<Subscription>>> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.closed = true;
        Some(state.subscribers.clone())
    }

    fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    fn subscriptions_of(&self, subscriber: SubscriberRef) -> Vec<SubscriptionId> {
        self.state
            .lock()
            .subscribers
            .iter()
            .filter(|s| s.subscriber == subscriber)
            .map(|s| s.id)
            .collect()
    }

    pub(crate) fn has_subscriber(&self, subscriber: SubscriberRef) -> bool {
        self.state
            .lock()
            .subscribers
            .iter()
            .any(|s| s.subscriber == subscriber)
    }

    pub(crate) fn is_resolved(&self, kind: &'static str) -> bool {
        self.state.lock().resolved.contains(kind)
    }

    pub(crate) fn mark_resolved(&self, kind: &'static str) {
        self.state.lock().resolved.insert(kind);
    }

    fn is_prunable(&self) -> bool {
        let state = self.state.lock();
        state.subscribers.is_empty() && !state.closed && state.resolved.is_empty()
    }
}

impl PubSubRegistry {
    pub(crate) fn new(
        provider: impl Into<String>,
        resolver: ImplicitSubscriptionResolver,
        store: Arc<dyn PubSubStore>,
    ) -> Self {
        Self {
            provider: provider.into(),
            entries: DashMap::new(),
            resolver,
            store,
        }
    }

    /// Name of the provider this registry serves.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Registers `observer` for `subscriber` on `stream`, creating the entry if
    /// needed.
    ///
    /// # Errors
    ///
    /// * [`StreamError::StreamClosed`] if the stream has been completed.
    /// * [`StreamError::DuplicateSubscription`] if `subscriber` is already active
    ///   on the stream.
    /// * [`StreamError::Store`] if the store rejects the record; the registration
    ///   is rolled back.
    #[instrument(level = "debug", skip(self, observer), fields(provider = %self.provider, stream = %stream))]
    pub(crate) async fn subscribe(
        self: &Arc<Self>,
        stream: &StreamId,
        subscriber: SubscriberRef,
        observer: Arc<dyn ErasedObserver>,
    ) -> Result<SubscriptionHandle, StreamError> {
        let id = SubscriptionId::new();
        self.attach(stream, Subscription::new(id, subscriber, observer))?;

        let record = SubscriptionRecord::new(id, self.provider.clone(), stream.clone(), subscriber);
        if let Err(err) = self.store.write(record).await {
            self.detach(stream, id);
            return Err(StreamError::Store(format!("{err:#}")));
        }

        debug!(subscription = %id, subscriber = %subscriber, "subscribed");
        Ok(SubscriptionHandle {
            id,
            stream: stream.clone(),
            subscriber,
            registry: Arc::clone(self),
        })
    }

    /// Removes a subscription. Unknown or already removed ids are ignored.
    #[instrument(level = "debug", skip(self), fields(provider = %self.provider, stream = %stream))]
    pub(crate) async fn unsubscribe(&self, stream: &StreamId, id: SubscriptionId) {
        if !self.detach(stream, id) {
            trace!("{}", StreamError::UnknownHandle(id));
            return;
        }
        if let Err(err) = self.store.remove(id).await {
            warn!(subscription = %id, error = %err, "failed to remove subscription record");
        }
        debug!(subscription = %id, "unsubscribed");
    }

    /// Publishes `item` to every active subscriber of `stream`, in registration
    /// order, and returns once every handler has run.
    ///
    /// Matching implicit subscribers are activated and subscribed first. A
    /// stream with neither an entry nor a matching implicit declaration yields an
    /// empty report.
    ///
    /// # Errors
    ///
    /// [`StreamError::StreamClosed`] if the stream has been completed. Handler
    /// failures are never returned here.
    #[instrument(level = "trace", skip(self, item, context), fields(provider = %self.provider, stream = %stream))]
    pub(crate) async fn publish(
        self: &Arc<Self>,
        stream: &StreamId,
        item: Arc<dyn StreamItem>,
        context: PublishContext,
    ) -> Result<DeliveryReport, StreamError> {
        let Some(entry) = self.entry_for_publish(stream) else {
            trace!("no subscribers, item dropped");
            return Ok(DeliveryReport::unrouted(stream.clone()));
        };

        let mut sequence = entry.fan_out.lock().await;
        if entry.is_closed() {
            return Err(StreamError::StreamClosed(stream.clone()));
        }

        let resolution = self.resolver.resolve(self, &entry).await;

        *sequence += 1;
        let delivery = Delivery {
            stream: stream.clone(),
            sequence: SequenceToken(*sequence),
            context: Arc::new(context),
        };

        let mut report = DeliveryReport {
            stream: stream.clone(),
            sequence: Some(delivery.sequence),
            delivered: 0,
            failed: 0,
            activated: resolution.activated,
            unresolved: resolution.unresolved,
        };

        for subscription in entry.active_subscribers() {
            // Removed after the snapshot was taken.
            if !subscription.is_active() {
                continue;
            }
            let outcome = guarded(
                subscription.id,
                subscription.observer.on_next(Arc::clone(&item), &delivery),
            )
            .await;
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    notify_error(&subscription, err).await;
                }
            }
        }

        trace!(
            sequence = %delivery.sequence,
            delivered = report.delivered,
            failed = report.failed,
            unresolved = report.unresolved.len(),
            "published"
        );
        Ok(report)
    }

    /// Completes `stream`: every active subscriber receives `on_completed` once
    /// and later subscribes or publishes fail with [`StreamError::StreamClosed`].
    ///
    /// Returns the number of subscribers notified; completing an already
    /// completed stream notifies nobody.
    #[instrument(level = "debug", skip(self), fields(provider = %self.provider, stream = %stream))]
    pub(crate) async fn complete(&self, stream: &StreamId) -> usize {
        let entry = self.entry_or_create(stream);
        let _fan_out = entry.fan_out.lock().await;
        let Some(subscribers) = entry.close() else {
            trace!("stream already closed");
            return 0;
        };

        let mut notified = 0;
        for subscription in subscribers {
            if !subscription.is_active() {
                continue;
            }
            notified += 1;
            if let Err(err) =
                guarded(subscription.id, subscription.observer.on_completed(stream)).await
            {
                notify_error(&subscription, err).await;
            }
        }
        debug!(notified, "stream completed");
        notified
    }

    /// Runs implicit resolution for `stream` without publishing.
    ///
    /// Returns the grains activated by this call and those that failed; an
    /// already resolved stream yields an empty [`Resolution`].
    #[instrument(level = "debug", skip(self), fields(provider = %self.provider, stream = %stream))]
    pub async fn resolve_implicit(self: &Arc<Self>, stream: &StreamId) -> Resolution {
        let Some(entry) = self.entry_for_publish(stream) else {
            return Resolution::default();
        };
        let _fan_out = entry.fan_out.lock().await;
        if entry.is_closed() {
            return Resolution::default();
        }
        self.resolver.resolve(self, &entry).await
    }

    /// Snapshot of `(stream, subscriber count)` for every entry, ordered by stream.
    pub fn list_entries(&self) -> Vec<(StreamId, usize)> {
        self.entry_snapshots()
            .into_iter()
            .map(|snapshot| (snapshot.stream, snapshot.subscriber_count))
            .collect()
    }

    /// Detailed snapshot of every entry, ordered by stream.
    pub fn entry_snapshots(&self) -> Vec<EntrySnapshot> {
        let entries: Vec<Arc<StreamEntry>> =
            self.entries.iter().map(|e| Arc::clone(e.value())).collect();
        let mut snapshots: Vec<EntrySnapshot> = entries
            .iter()
            .map(|entry| EntrySnapshot {
                provider: self.provider.clone(),
                stream: entry.stream.clone(),
                subscriber_count: entry.subscriber_count(),
                closed: entry.is_closed(),
            })
            .collect();
        snapshots.sort();
        snapshots
    }

    /// Number of active subscribers on `stream`.
    pub fn subscriber_count(&self, stream: &StreamId) -> usize {
        self.entries
            .get(stream)
            .map_or(0, |entry| entry.subscriber_count())
    }

    /// Handles of every active subscription `subscriber` holds on `stream`.
    pub(crate) fn subscription_handles(
        self: &Arc<Self>,
        stream: &StreamId,
        subscriber: SubscriberRef,
    ) -> Vec<SubscriptionHandle> {
        let ids = self
            .entries
            .get(stream)
            .map(|entry| entry.subscriptions_of(subscriber))
            .unwrap_or_default();
        ids.into_iter()
            .map(|id| SubscriptionHandle {
                id,
                stream: stream.clone(),
                subscriber,
                registry: Arc::clone(self),
            })
            .collect()
    }

    /// Appends while holding the map shard, so a concurrent prune cannot drop the
    /// entry between lookup and insertion.
    fn attach(&self, stream: &StreamId, subscription: Subscription) -> Result<(), StreamError> {
        let entry = self
            .entries
            .entry(stream.clone())
            .or_insert_with(|| Arc::new(StreamEntry::new(stream.clone())));
        entry.attach(subscription)
    }

    fn detach(&self, stream: &StreamId, id: SubscriptionId) -> bool {
        let removed = self
            .entries
            .get(stream)
            .is_some_and(|entry| entry.detach(id));
        // Entries an implicit declaration can still reach are kept.
        let prunable =
            removed && !self.resolver.table().has_declarations_for(stream.namespace());
        if prunable
            && self
                .entries
                .remove_if(stream, |_, entry| entry.is_prunable())
                .is_some()
        {
            trace!(stream = %stream, "pruned empty entry");
        }
        removed
    }

    fn entry_or_create(&self, stream: &StreamId) -> Arc<StreamEntry> {
        let entry = self
            .entries
            .entry(stream.clone())
            .or_insert_with(|| Arc::new(StreamEntry::new(stream.clone())));
        Arc::clone(entry.value())
    }

    /// Existing entry, or a new one when an implicit declaration matches.
    fn entry_for_publish(&self, stream: &StreamId) -> Option<Arc<StreamEntry>> {
        if let Some(entry) = self.entries.get(stream) {
            return Some(Arc::clone(entry.value()));
        }
        if self.resolver.table().has_declarations_for(stream.namespace()) {
            return Some(self.entry_or_create(stream));
        }
        None
    }
}

impl fmt::Debug for PubSubRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSubRegistry")
            .field("provider", &self.provider)
            .field("entries", &self.entries.len())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Runs one subscriber callback, turning errors and panics into
/// [`StreamError`]s attributed to `subscription`.
async fn guarded<F>(subscription: SubscriptionId, callback: F) -> Result<(), StreamError>
where
    F: Future<Output = anyhow::Result<()>>,
{
    match AssertUnwindSafe(callback).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(match err.downcast::<StreamError>() {
            Ok(mismatch @ StreamError::ItemTypeMismatch { .. }) => mismatch,
            Ok(other) => StreamError::SubscriberHandlerFailure {
                subscription,
                reason: other.to_string(),
            },
            Err(err) => StreamError::SubscriberHandlerFailure {
                subscription,
                reason: format!("{err:#}"),
            },
        }),
        Err(panic) => Err(StreamError::SubscriberHandlerFailure {
            subscription,
            reason: panic_reason(panic.as_ref()),
        }),
    }
}

async fn notify_error(subscription: &Subscription, err: StreamError) {
    warn!(subscription = %subscription.id, error = %err, "subscriber handler failed");
    if let Err(nested) = guarded(subscription.id, subscription.observer.on_error(err)).await {
        error!(
            subscription = %subscription.id,
            error = %nested,
            "error handler failed, dropping"
        );
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::common::WeakRuntime;
    use crate::stream::implicit::ImplicitSubscriptionTable;
    use crate::stream::observer::TypedObserver;
    use crate::stream::{MemoryPubSubStore, StreamObserver};

    #[derive(Default)]
    struct Recorder {
        items: Mutex<Vec<i64>>,
        errors: Mutex<Vec<StreamError>>,
        completions: Mutex<usize>,
        fail_on: Option<i64>,
    }

    #[async_trait]
    impl StreamObserver<i64> for Arc<Recorder> {
        async fn on_next(&self, item: i64, _delivery: &Delivery) -> anyhow::Result<()> {
            if self.fail_on == Some(item) {
                anyhow::bail!("refusing {item}");
            }
            self.items.lock().push(item);
            Ok(())
        }

        async fn on_error(&self, error: StreamError) -> anyhow::Result<()> {
            self.errors.lock().push(error);
            Ok(())
        }

        async fn on_completed(&self, _stream: &StreamId) -> anyhow::Result<()> {
            *self.completions.lock() += 1;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct RejectingStore;

    #[async_trait]
    impl PubSubStore for RejectingStore {
        async fn write(&self, _record: SubscriptionRecord) -> anyhow::Result<()> {
            anyhow::bail!("read-only")
        }

        async fn remove(&self, _id: SubscriptionId) -> anyhow::Result<()> {
            Ok(())
        }

        async fn read(
            &self,
            _provider: &str,
            _stream: &StreamId,
        ) -> anyhow::Result<Vec<SubscriptionRecord>> {
            Ok(Vec::new())
        }
    }

    fn registry_with(store: Arc<dyn PubSubStore>) -> Arc<PubSubRegistry> {
        let resolver = ImplicitSubscriptionResolver::new(
            Arc::new(ImplicitSubscriptionTable::default()),
            WeakRuntime::default(),
        );
        Arc::new(PubSubRegistry::new("test", resolver, store))
    }

    fn registry() -> Arc<PubSubRegistry> {
        registry_with(Arc::new(MemoryPubSubStore::default()))
    }

    fn client() -> SubscriberRef {
        SubscriberRef::Client(Uuid::new_v4())
    }

    async fn publish(registry: &Arc<PubSubRegistry>, stream: &StreamId, value: i64) -> DeliveryReport {
        registry
            .publish(stream, Arc::new(value), PublishContext::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let registry = registry();
        let stream = StreamId::new(Uuid::new_v4(), "ns");
        let recorder = Arc::new(Recorder::default());
        registry
            .subscribe(&stream, client(), TypedObserver::erase(recorder.clone()))
            .await
            .unwrap();

        for value in 0..100 {
            let report = publish(&registry, &stream, value).await;
            assert_eq!(report.sequence, Some(SequenceToken(value as u64 + 1)));
            assert_eq!(report.delivered, 1);
        }
        assert_eq!(*recorder.items.lock(), (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn rejects_duplicate_subscriber() {
        let registry = registry();
        let stream = StreamId::new(Uuid::new_v4(), "ns");
        let subscriber = client();
        let first = Arc::new(Recorder::default());
        registry
            .subscribe(&stream, subscriber, TypedObserver::erase(first))
            .await
            .unwrap();

        let err = registry
            .subscribe(&stream, subscriber, TypedObserver::erase(Arc::new(Recorder::default())))
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::DuplicateSubscription { .. }));
        assert_eq!(registry.subscriber_count(&stream), 1);
    }

    #[tokio::test]
    async fn handler_failure_does_not_stop_fan_out() {
        let registry = registry();
        let stream = StreamId::new(Uuid::new_v4(), "ns");
        let failing = Arc::new(Recorder {
            fail_on: Some(1),
            ..Recorder::default()
        });
        let healthy = Arc::new(Recorder::default());
        registry
            .subscribe(&stream, client(), TypedObserver::erase(failing.clone()))
            .await
            .unwrap();
        registry
            .subscribe(&stream, client(), TypedObserver::erase(healthy.clone()))
            .await
            .unwrap();

        for value in 0..3 {
            publish(&registry, &stream, value).await;
        }
        assert_eq!(*failing.items.lock(), vec![0, 2]);
        assert_eq!(*healthy.items.lock(), vec![0, 1, 2]);
        let errors = failing.errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], StreamError::SubscriberHandlerFailure { .. }));
        assert!(healthy.errors.lock().is_empty());
    }

    #[tokio::test]
    async fn wrong_payload_type_routes_mismatch_to_on_error() {
        let registry = registry();
        let stream = StreamId::new(Uuid::new_v4(), "ns");
        let recorder = Arc::new(Recorder::default());
        registry
            .subscribe(&stream, client(), TypedObserver::erase(recorder.clone()))
            .await
            .unwrap();

        let report = registry
            .publish(&stream, Arc::new("text"), PublishContext::default())
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert!(matches!(
            recorder.errors.lock()[0],
            StreamError::ItemTypeMismatch { expected: "i64", .. }
        ));
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_prunes() {
        let registry = registry();
        let stream = StreamId::new(Uuid::new_v4(), "ns");
        let recorder = Arc::new(Recorder::default());
        let handle = registry
            .subscribe(&stream, client(), TypedObserver::erase(recorder.clone()))
            .await
            .unwrap();

        handle.unsubscribe().await;
        handle.unsubscribe().await;
        assert!(registry.list_entries().is_empty());

        let report = publish(&registry, &stream, 5).await;
        assert_eq!(report.delivered, 0);
        assert!(recorder.items.lock().is_empty());
    }

    #[tokio::test]
    async fn completed_stream_rejects_work() {
        let registry = registry();
        let stream = StreamId::new(Uuid::new_v4(), "ns");
        let recorder = Arc::new(Recorder::default());
        registry
            .subscribe(&stream, client(), TypedObserver::erase(recorder.clone()))
            .await
            .unwrap();

        assert_eq!(registry.complete(&stream).await, 1);
        assert_eq!(registry.complete(&stream).await, 0);
        assert_eq!(*recorder.completions.lock(), 1);

        let err = registry
            .publish(&stream, Arc::new(1_i64), PublishContext::default())
            .await
            .unwrap_err();
        assert_eq!(err, StreamError::StreamClosed(stream.clone()));
        let err = registry
            .subscribe(&stream, client(), TypedObserver::erase(Arc::new(Recorder::default())))
            .await
            .unwrap_err();
        assert_eq!(err, StreamError::StreamClosed(stream.clone()));

        let snapshots = registry.entry_snapshots();
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].closed);
    }

    #[tokio::test]
    async fn store_failure_rolls_back_registration() {
        let registry = registry_with(Arc::new(RejectingStore));
        let stream = StreamId::new(Uuid::new_v4(), "ns");
        let err = registry
            .subscribe(&stream, client(), TypedObserver::erase(Arc::new(Recorder::default())))
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::Store(_)));
        assert_eq!(registry.subscriber_count(&stream), 0);
        assert!(registry.list_entries().is_empty());
    }

    #[test]
    fn snapshot_displays_key_provider_namespace() {
        let key = Uuid::nil();
        let snapshot = EntrySnapshot {
            provider: "SMSProvider".into(),
            stream: StreamId::new(key, "SampleStreamNamespace"),
            subscriber_count: 2,
            closed: false,
        };
        assert_eq!(
            snapshot.to_string(),
            format!("{key} SMSProvider SampleStreamNamespace")
        );
    }
}
