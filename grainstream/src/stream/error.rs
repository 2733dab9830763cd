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

use crate::stream::{StreamId, SubscriberRef, SubscriptionId};

/// Errors reported by the pub/sub layer.
///
/// Structural errors (`DuplicateSubscription`, `StreamClosed`) are returned to the
/// caller of `subscribe`/`on_next`. Handler-level failures are routed to the
/// failing subscriber's `on_error` and never reach the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The subscriber already holds an active subscription on this stream.
    DuplicateSubscription {
        /// Stream the subscription was requested on.
        stream: StreamId,
        /// Subscriber that is already registered.
        subscriber: SubscriberRef,
    },
    /// The stream has been completed.
    StreamClosed(StreamId),
    /// A subscription id the registry does not know. Benign; only logged.
    UnknownHandle(SubscriptionId),
    /// A subscriber callback returned an error or panicked.
    SubscriberHandlerFailure {
        /// Subscription whose callback failed.
        subscription: SubscriptionId,
        /// Rendered cause.
        reason: String,
    },
    /// A typed handler received a payload of a different type.
    ItemTypeMismatch {
        /// Type the handler was written for.
        expected: &'static str,
        /// Type that was actually published.
        found: &'static str,
    },
    /// No stream provider is registered under this name.
    UnknownProvider(String),
    /// The subscription store rejected an operation.
    Store(String),
    /// The runtime has been shut down or dropped.
    RuntimeUnavailable,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSubscription { stream, subscriber } => {
                write!(f, "{subscriber} is already subscribed to {stream}")
            }
            Self::StreamClosed(stream) => write!(f, "stream {stream} is closed"),
            Self::UnknownHandle(id) => write!(f, "unknown subscription handle {id}"),
            Self::SubscriberHandlerFailure {
                subscription,
                reason,
            } => write!(f, "handler of subscription {subscription} failed: {reason}"),
            Self::ItemTypeMismatch { expected, found } => {
                write!(f, "expected item of type {expected}, found {found}")
            }
            Self::UnknownProvider(name) => write!(f, "no stream provider named {name}"),
            Self::Store(reason) => write!(f, "subscription store failure: {reason}"),
            Self::RuntimeUnavailable => write!(f, "grain runtime is no longer available"),
        }
    }
}

impl std::error::Error for StreamError {}
