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
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::grain::GrainId;
use crate::traits::Grain;

/// One live activation of a grain.
///
/// `cell` holds the instance; whoever holds its lock has the turn. The cell is
/// `None` while the instance is being created and after deactivation. `token`
/// is a child of the runtime's root token and parents every timer the grain
/// registers.
pub(crate) struct Activation<G> {
    pub(crate) id: GrainId,
    pub(crate) serial: u64,
    pub(crate) cell: Arc<tokio::sync::Mutex<Option<G>>>,
    pub(crate) token: CancellationToken,
    last_used: Mutex<Instant>,
}

impl<G: Grain> Activation<G> {
    pub(crate) fn new(id: GrainId, serial: u64, token: CancellationToken) -> Self {
        Self {
            id,
            serial,
            cell: Arc::new(tokio::sync::Mutex::new(None)),
            token,
            last_used: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }
}

/// Type-erased view of an [`Activation`] kept in the runtime's directory.
#[async_trait]
pub(crate) trait ActivationSlot: Send + Sync {
    fn serial(&self) -> u64;

    fn idle_for(&self) -> Duration;

    /// True while some caller holds the turn.
    fn is_busy(&self) -> bool;

    /// Stops timers, waits for the current turn, runs `on_deactivate` and drops
    /// the instance. Gives up after `timeout`.
    async fn deactivate(&self, timeout: Duration);

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

#[async_trait]
impl<G: Grain> ActivationSlot for Activation<G> {
    fn serial(&self) -> u64 {
        self.serial
    }

    fn idle_for(&self) -> Duration {
        self.last_used.lock().elapsed()
    }

    fn is_busy(&self) -> bool {
        self.cell.try_lock().is_err()
    }

    async fn deactivate(&self, timeout: Duration) {
        self.token.cancel();
        let id = self.id;
        let cell = Arc::clone(&self.cell);
        let teardown = async move {
            let mut slot = cell.lock_owned().await;
            if let Some(mut grain) = slot.take() {
                grain.on_deactivate().await;
                debug!(grain = %id, "deactivated");
            }
        };
        if tokio::time::timeout(timeout, teardown).await.is_err() {
            warn!(grain = %id, ?timeout, "deactivation timed out");
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
