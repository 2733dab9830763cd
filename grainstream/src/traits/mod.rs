//! Core traits implemented by stream payloads and grains.
//!
//! *   [`StreamItem`]: Marker trait for every payload that can travel on a stream.
//! *   [`Grain`]: An addressable unit of state activated on demand by the runtime.
//! *   [`StreamConsumer`]: A grain that receives stream items on its own turn.
//! *   [`ImplicitSubscriber`]: A consumer whose type is statically bound to one or
//!     more stream namespaces and is activated automatically on publish.

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

// --- Public Re-exports ---
pub use grain::Grain;
pub use stream_consumer::{ImplicitSubscriber, StreamConsumer};
pub use stream_item::StreamItem;

// --- Submodules ---

/// Defines the [`Grain`] trait and its lifecycle hooks.
mod grain;
/// Defines the [`StreamConsumer`] and [`ImplicitSubscriber`] traits.
mod stream_consumer;
/// Defines the [`StreamItem`] marker trait.
mod stream_item;
