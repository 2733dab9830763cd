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
use std::sync::Weak;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::grain::activation::Activation;
use crate::traits::Grain;

/// Callback invoked on each timer tick, on the grain's turn.
pub type TimerCallback<G> = for<'a> fn(&'a mut G) -> BoxFuture<'a, anyhow::Result<()>>;

/// Owns a running grain timer. Dropping the handle stops the timer.
#[must_use = "dropping a TimerHandle stops the timer"]
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    /// Stops the timer. A tick that is already waiting for the grain's turn
    /// will not run.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the timer has been stopped, either explicitly or because the
    /// grain was deactivated.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub(crate) fn start<G: Grain>(
    activation: Weak<Activation<G>>,
    token: CancellationToken,
    due: Duration,
    period: Duration,
    callback: TimerCallback<G>,
) -> TimerHandle {
    tokio::spawn(run(activation, token.clone(), due, period, callback));
    TimerHandle { token }
}

async fn run<G: Grain>(
    activation: Weak<Activation<G>>,
    token: CancellationToken,
    due: Duration,
    period: Duration,
    callback: TimerCallback<G>,
) {
    let mut next = Instant::now() + due;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = sleep_until(next) => {}
        }
        let Some(activation) = activation.upgrade() else {
            break;
        };
        let mut slot = activation.cell.clone().lock_owned().await;
        if token.is_cancelled() {
            break;
        }
        let Some(grain) = slot.as_mut() else {
            break;
        };
        activation.touch();
        if let Err(err) = callback(grain).await {
            warn!(grain = %activation.id, error = %err, "timer callback failed");
        }
        drop(slot);
        // Ticks never overlap; the period runs from the end of the callback.
        next = Instant::now() + period;
    }
    trace!("timer stopped");
}
