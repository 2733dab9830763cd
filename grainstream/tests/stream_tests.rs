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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::*;

use grainstream::grains::Signature;
use grainstream::prelude::*;
use grainstream_test::prelude::*;

use crate::setup::*;

mod setup;

async fn launch() -> GrainRuntime {
    GrainApp::new()
        .with_config(test_config())
        .with_stream_provider(BRC_PROVIDER)
        .launch_async()
        .await
}

#[grain_test]
async fn test_items_arrive_in_publish_order() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    let provider = runtime.default_stream_provider()?;
    let stream = provider.get_stream::<i64>(Uuid::new_v4(), "SampleStreamNamespace");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _handle = stream
        .subscribe_with(
            move |item, delivery| {
                sink.lock().push((item, delivery.sequence.get()));
                Reply::ok()
            },
            |_| Reply::ok(),
            || Reply::ok(),
        )
        .await?;

    for i in 0..1000 {
        let report = stream.on_next(i).await?;
        assert_eq!(report.delivered, 1);
    }

    let seen = seen.lock();
    assert_eq!(seen.len(), 1000);
    for (index, (item, sequence)) in seen.iter().enumerate() {
        assert_eq!(*item, index as i64);
        assert_eq!(*sequence, index as u64 + 1);
    }
    runtime.shutdown_all().await?;
    Ok(())
}

#[grain_test]
async fn test_subclass_payloads_keep_their_shape() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    let provider = runtime.stream_provider(BRC_PROVIDER)?;
    let stream = provider.get_stream::<Signature>(Uuid::new_v4(), "SampleStreamNamespace");

    let wanted_first = 1000;
    let wanted_second = 1000;
    let received = Arc::new(AtomicUsize::new(0));
    let out_of_place = Arc::new(AtomicUsize::new(0));

    let counter = received.clone();
    let misplaced = out_of_place.clone();
    let _handle = stream
        .subscribe_with(
            move |item: Signature, _| {
                let position = counter.fetch_add(1, Ordering::SeqCst);
                if (position < wanted_first) != item.is_first() {
                    misplaced.fetch_add(1, Ordering::SeqCst);
                }
                Reply::ok()
            },
            |error| {
                error!("{error}");
                Reply::ok()
            },
            || Reply::ok(),
        )
        .await?;

    for _ in 0..wanted_first {
        stream.on_next(first_simple()).await?;
    }
    for _ in 0..wanted_second {
        stream.on_next(second_simple()).await?;
    }

    assert_eq!(received.load(Ordering::SeqCst), wanted_first + wanted_second);
    assert_eq!(out_of_place.load(Ordering::SeqCst), 0);
    runtime.shutdown_all().await?;
    Ok(())
}

#[grain_test]
async fn test_same_caller_cannot_subscribe_twice() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    let stream = runtime
        .default_stream_provider()?
        .get_stream::<i64>(Uuid::new_v4(), "duplicates");

    let _first = stream
        .subscribe_with(|_, _| Reply::ok(), |_| Reply::ok(), || Reply::ok())
        .await?;
    let second = stream
        .subscribe_with(|_, _| Reply::ok(), |_| Reply::ok(), || Reply::ok())
        .await;

    match second {
        Err(StreamError::DuplicateSubscription { stream: id, subscriber }) => {
            assert_eq!(&id, stream.stream_id());
            assert_eq!(subscriber, SubscriberRef::Client(runtime.client_id()));
        }
        other => panic!("expected DuplicateSubscription, got {other:?}"),
    }
    assert_eq!(stream.subscription_handles().len(), 1);
    Ok(())
}

#[grain_test]
async fn test_unsubscribe_is_idempotent() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    let stream = runtime
        .default_stream_provider()?
        .get_stream::<i64>(Uuid::new_v4(), "unsubscribe");

    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let handle = stream
        .subscribe_with(
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Reply::ok()
            },
            |_| Reply::ok(),
            || Reply::ok(),
        )
        .await?;

    stream.on_next(1).await?;
    handle.unsubscribe().await;
    handle.unsubscribe().await;

    let report = stream.on_next(2).await?;
    assert_eq!(report.delivered, 0);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // The caller may subscribe again once the old handle is gone.
    let again = stream
        .subscribe_with(|_, _| Reply::ok(), |_| Reply::ok(), || Reply::ok())
        .await?;
    assert_ne!(again.id(), handle.id());
    Ok(())
}

#[grain_test]
async fn test_publish_without_subscribers_is_a_no_op() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    let stream = runtime
        .default_stream_provider()?
        .get_stream::<i64>(Uuid::new_v4(), "nobody-listens");

    let report = stream.on_next(7).await?;
    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed, 0);
    assert!(report.sequence.is_none());
    assert!(runtime.management().list_entries().is_empty());
    Ok(())
}

#[grain_test]
async fn test_failing_handler_does_not_block_other_subscribers() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    let key = Uuid::new_v4();

    let failing = runtime.default_stream_provider()?.get_stream::<i64>(key, "isolation");
    let errors = Arc::new(AtomicUsize::new(0));
    let error_counter = errors.clone();
    let _failing_handle = failing
        .subscribe_with(
            |item, _| Reply::err(anyhow::anyhow!("refusing item {item}")),
            move |error| {
                assert!(matches!(error, StreamError::SubscriberHandlerFailure { .. }));
                error_counter.fetch_add(1, Ordering::SeqCst);
                Reply::ok()
            },
            || Reply::ok(),
        )
        .await?;

    // A second subscriber on the same stream needs a distinct caller: a grain.
    let consumer = runtime.grain::<grainstream::grains::ConsumerGrain>(Uuid::new_v4());
    consumer
        .turn()
        .await?
        .become_consumer(key, "isolation", "SMSProvider")
        .await?;

    for i in 0..10 {
        let report = failing.on_next(i).await?;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
    }

    assert_eq!(errors.load(Ordering::SeqCst), 10);
    assert_eq!(consumer.turn().await?.get_number_consumed(), 10);
    runtime.shutdown_all().await?;
    Ok(())
}

#[grain_test]
async fn test_publish_context_reaches_subscribers() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    let stream = runtime
        .default_stream_provider()?
        .get_stream::<i64>(Uuid::new_v4(), "context");

    let correlation = Uuid::new_v4();
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let _handle = stream
        .subscribe_with(
            move |_, delivery| {
                *sink.lock() = Some(delivery.context.clone());
                Reply::ok()
            },
            |_| Reply::ok(),
            || Reply::ok(),
        )
        .await?;

    let context = PublishContext::default()
        .with_value("RequestContextField", "JustAString")
        .with_correlation_id(correlation);
    stream.on_next_with(1, context).await?;

    let seen = seen.lock().clone().expect("no delivery recorded");
    assert_eq!(seen.value("RequestContextField"), Some("JustAString"));
    assert_eq!(seen.correlation_id(), Some(correlation));
    Ok(())
}

#[grain_test]
async fn test_completed_stream_rejects_publish_and_subscribe() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    let key = Uuid::new_v4();
    let stream = runtime.default_stream_provider()?.get_stream::<i64>(key, "completion");

    let completed = Arc::new(AtomicUsize::new(0));
    let counter = completed.clone();
    let _client = stream
        .subscribe_with(
            |_, _| Reply::ok(),
            |_| Reply::ok(),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Reply::ok()
            },
        )
        .await?;
    let consumer = runtime.grain::<grainstream::grains::InlineConsumerGrain>(Uuid::new_v4());
    consumer
        .turn()
        .await?
        .become_consumer(key, "completion", "SMSProvider")
        .await?;

    stream.on_next(1).await?;
    assert_eq!(stream.complete().await, 2);
    assert_eq!(completed.load(Ordering::SeqCst), 1);

    assert!(matches!(
        stream.on_next(2).await,
        Err(StreamError::StreamClosed(_))
    ));
    let late = runtime
        .stream_provider(BRC_PROVIDER)?
        .get_stream::<i64>(key, "completion");
    // Another provider has its own registry and is unaffected.
    assert_eq!(late.on_next(3).await?.delivered, 0);

    let resubscribe = stream
        .subscribe_with(|_, _| Reply::ok(), |_| Reply::ok(), || Reply::ok())
        .await;
    assert!(matches!(resubscribe, Err(StreamError::StreamClosed(_))));

    assert_eq!(stream.complete().await, 0);
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(consumer.turn().await?.get_number_consumed(), 1);
    Ok(())
}

#[grain_test]
async fn test_completing_an_unknown_stream_closes_it() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    let stream = runtime
        .default_stream_provider()?
        .get_stream::<i64>(Uuid::new_v4(), "never-used");

    assert_eq!(stream.complete().await, 0);
    assert!(matches!(
        stream.on_next(1).await,
        Err(StreamError::StreamClosed(_))
    ));
    let entries = runtime.management().list_entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].closed);
    Ok(())
}

#[grain_test]
async fn test_unknown_provider_is_reported() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    match runtime.stream_provider("NCI-PCC") {
        Err(StreamError::UnknownProvider(name)) => assert_eq!(name, "NCI-PCC"),
        other => panic!("expected UnknownProvider, got {other:?}"),
    }
    assert_eq!(runtime.provider_names(), vec![BRC_PROVIDER, "SMSProvider"]);
    Ok(())
}

#[grain_test]
async fn test_subscriptions_are_mirrored_in_the_store() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    let provider = runtime.default_stream_provider()?;
    let stream = provider.get_stream::<i64>(Uuid::new_v4(), "store");

    let handle = stream
        .subscribe_with(|_, _| Reply::ok(), |_| Reply::ok(), || Reply::ok())
        .await?;
    let records = runtime
        .management()
        .stored_subscriptions(provider.name(), stream.stream_id())
        .await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, handle.id());
    assert_eq!(records[0].subscriber, SubscriberRef::Client(runtime.client_id()));

    handle.unsubscribe().await;
    let records = runtime
        .management()
        .stored_subscriptions(provider.name(), stream.stream_id())
        .await?;
    assert!(records.is_empty());
    Ok(())
}

#[grain_test]
async fn test_wrong_item_type_is_routed_to_on_error() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch().await;
    let key = Uuid::new_v4();
    let provider = runtime.default_stream_provider()?;

    let mismatches = Arc::new(AtomicUsize::new(0));
    let counter = mismatches.clone();
    let _handle = provider
        .get_stream::<i64>(key, "typed")
        .subscribe_with(
            |_, _| Reply::ok(),
            move |error| {
                if matches!(error, StreamError::ItemTypeMismatch { .. }) {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                Reply::ok()
            },
            || Reply::ok(),
        )
        .await?;

    let report = provider
        .get_stream::<String>(key, "typed")
        .on_next("not a number".to_string())
        .await?;
    assert_eq!(report.failed, 1);
    assert_eq!(mismatches.load(Ordering::SeqCst), 1);
    Ok(())
}
