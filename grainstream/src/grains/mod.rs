//! Reference grains exercising the streaming core.
//!
//! *   [`ProducerGrain`]: Publishes a counter onto a stream, on demand or from a timer.
//! *   [`ConsumerGrain`]: Counts items through an observer routed onto its turn.
//! *   [`InlineConsumerGrain`]: Counts items through three closures.
//! *   [`EaterGrain`]: Implicit subscriber to the `BRC0-in` .. `BRC8-in` namespaces.
//! *   [`Signature`]: Sample payload with two shapes sharing a common header.

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

pub use consumer::{ConsumerGrain, ConsumerState};
pub use eater::EaterGrain;
pub use inline_consumer::InlineConsumerGrain;
pub use producer::{ProducerGrain, ProducerState, PRODUCER_CONTEXT_KEY};
pub use signature::{Signature, SignatureHeader};

mod consumer;
mod eater;
mod inline_consumer;
mod producer;
mod signature;
