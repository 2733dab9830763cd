//! Streams: identities, the pub/sub registry, providers and subscriptions.
//!
//! A caller obtains a [`StreamProvider`], asks it for a [`StreamHandle`] and
//! then publishes or subscribes. The provider hands all bookkeeping to the
//! provider's [`PubSubRegistry`]; implicit subscribers are resolved by the
//! registry right before fan-out.

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

pub use error::StreamError;
pub use id::StreamId;
pub use implicit::{ImplicitDeclaration, ImplicitSubscriptionTable, Resolution};
pub use observer::{Delivery, FnObserver, PublishContext, SequenceToken, StreamObserver};
pub use provider::{StreamHandle, StreamProvider};
pub use registry::{DeliveryReport, EntrySnapshot, PubSubRegistry};
pub use store::{MemoryPubSubStore, PubSubStore, SubscriptionRecord};
pub use subscription::{SubscriberRef, SubscriptionHandle, SubscriptionId};

mod error;
mod id;
pub(crate) mod implicit;
pub(crate) mod observer;
mod provider;
pub(crate) mod registry;
mod store;
pub(crate) mod subscription;
