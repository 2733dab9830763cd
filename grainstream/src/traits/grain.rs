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
use async_trait::async_trait;

use crate::grain::GrainContext;

/// An addressable unit of state and behavior, activated on demand.
///
/// The runtime creates at most one live instance per `(KIND, key)` pair and runs
/// its methods one turn at a time: callers reach the instance only through
/// [`GrainRef::turn`](crate::grain::GrainRef::turn), which grants exclusive
/// access. State inside a grain therefore needs no locking of its own.
///
/// Lifecycle:
/// 1. [`create`](Grain::create) builds the instance from its [`GrainContext`].
/// 2. [`on_activate`](Grain::on_activate) runs once before any other turn. An error
///    discards the activation.
/// 3. [`on_deactivate`](Grain::on_deactivate) runs when the runtime collects the
///    activation. All timers registered through the context are already stopped.
#[async_trait]
pub trait Grain: Send + Sized + 'static {
    /// Type tag forming the first half of a [`GrainId`](crate::grain::GrainId).
    const KIND: &'static str;

    /// Builds a fresh instance for a new activation.
    fn create(context: GrainContext) -> Self;

    /// Activation hook; may re-establish subscriptions lost on a prior deactivation.
    async fn on_activate(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Deactivation hook; release resources here. Best effort.
    async fn on_deactivate(&mut self) {}
}
