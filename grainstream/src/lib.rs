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

#![forbid(unsafe_code)]

//! # Grainstream
//!
//! A lightweight pub/sub streaming core for virtual actors ("grains"), built on
//! top of Tokio. Grains are addressable by `(kind, key)`, activated on demand and
//! run one turn at a time. They publish items onto named streams and consume
//! them through explicit or implicit subscriptions.
//!
//! ## Key Concepts
//!
//! - **Grains (`Grain`)**: Units of state reached through a `GrainRef`; the
//!   runtime activates at most one instance per id and serializes its turns.
//! - **Streams (`StreamId`)**: Ordered channels identified by `(key, namespace)`
//!   and reached through a named `StreamProvider`.
//! - **Registry (`PubSubRegistry`)**: Maps every stream to its ordered
//!   subscriber list and fans each publish out to all of them, isolating
//!   failing subscribers.
//! - **Implicit subscriptions (`ImplicitSubscriber`)**: A grain type bound to
//!   namespaces is activated and subscribed on the first publish to a matching stream.
//! - **Runtime (`GrainRuntime`)**: Hosts activations, providers, timers, idle
//!   collection and shutdown. Built with `GrainApp`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use grainstream::prelude::*;
//!
//! let runtime = GrainApp::new().launch_async().await;
//! let provider = runtime.default_stream_provider()?;
//! let stream = provider.get_stream::<i64>(Uuid::new_v4(), "numbers");
//! let handle = stream
//!     .subscribe_with(
//!         |item, _delivery| Reply::pending(async move {
//!             println!("got {item}");
//!             Ok(())
//!         }),
//!         |_error| Reply::ok(),
//!         || Reply::ok(),
//!     )
//!     .await?;
//! stream.on_next(42).await?;
//! handle.unsubscribe().await;
//! runtime.shutdown_all().await?;
//! ```

// Lets the attribute macros name `::grainstream` from inside this crate too.
extern crate self as grainstream;

/// Runtime assembly, configuration and introspection.
pub(crate) mod common;

/// Grain identity, references, activations and timers.
pub(crate) mod grain;

/// Stream identity, registry, providers and subscriptions.
pub(crate) mod stream;

/// Core traits for payloads and grains.
pub(crate) mod traits;

/// Reference grains and sample payloads.
pub mod grains;

/// Configuration types and the global configuration.
pub mod config {
    pub use crate::common::config::{
        CollectionConfig, DefaultsConfig, ProducerConfig, StreamsConfig, TimeoutConfig, CONFIG,
    };
}

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `grainstream-macro`)
/// *   [`grainstream_macro::stream_item`]: Attribute macro for stream payload types.
/// *   [`grainstream_macro::implicit_subscription`]: Binds a consumer grain to namespaces.
///
/// ## External Crates
/// *   [`async_trait::async_trait`](https://docs.rs/async-trait/latest/async_trait/attr.async_trait.html): The macro for defining async functions in traits.
/// *   [`uuid::Uuid`]: Keys for grains and streams.
///
/// ## Core Types
/// *   [`crate::common::GrainApp`]: Entry point for building a runtime.
/// *   [`crate::common::GrainRuntime`]: The running runtime.
/// *   [`crate::common::ManagementIntrospection`]: Read-only diagnostics.
/// *   [`crate::common::Reply`]: Helpers for closure callback return values.
/// *   [`crate::grain::GrainRef`]: Lazy reference to a grain.
/// *   [`crate::stream::StreamProvider`] and [`crate::stream::StreamHandle`]: Publish and subscribe.
/// *   [`crate::stream::SubscriptionHandle`]: Capability to unsubscribe.
/// *   [`crate::traits::Grain`], [`crate::traits::StreamConsumer`],
///     [`crate::traits::ImplicitSubscriber`], [`crate::traits::StreamItem`].
pub mod prelude {
    // Macros from grainstream-macro
    pub use grainstream_macro::*;

    // External crate re-exports
    pub use async_trait::async_trait;
    pub use uuid::Uuid;

    // Core types
    pub use crate::common::{
        GrainApp, GrainRuntime, GrainStatistic, HandlerFuture, ManagementIntrospection, Reply,
        StreamsConfig,
    };
    pub use crate::grain::{GrainContext, GrainId, GrainRef, GrainTurn, TimerCallback, TimerHandle};
    pub use crate::stream::{
        Delivery, DeliveryReport, EntrySnapshot, FnObserver, ImplicitDeclaration,
        ImplicitSubscriptionTable, MemoryPubSubStore, PubSubRegistry, PubSubStore, PublishContext,
        Resolution, SequenceToken, StreamError, StreamHandle, StreamId, StreamObserver,
        StreamProvider, SubscriberRef, SubscriptionHandle, SubscriptionId, SubscriptionRecord,
    };
    pub use crate::traits::{Grain, ImplicitSubscriber, StreamConsumer, StreamItem};
}
