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

//! Test support for Grainstream.
//!
//! Provides the [`grain_test`](prelude::grain_test) attribute and [`wait_until`],
//! a polling helper for asserting on state that converges asynchronously
//! (for example, a consumer catching up with a producer).

use std::future::Future;
use std::time::Duration;

use tracing::trace;

/// Common imports for Grainstream tests.
pub mod prelude {
    pub use grainstream_test_macro::grain_test;

    pub use crate::wait_until;
}

/// Default pause between two evaluations of the predicate in [`wait_until`].
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Repeatedly evaluates `predicate` until it reports `true` or `timeout` elapses.
///
/// The predicate receives `last_try = true` on its final evaluation, letting it
/// assert (and produce a useful failure message) instead of just returning `false`.
///
/// # Errors
///
/// Returns the predicate's error if it fails, or an error if the predicate is
/// still `false` after the timeout.
pub async fn wait_until<F, Fut>(mut predicate: F, timeout: Duration) -> anyhow::Result<()>
where
    F: FnMut(bool) -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let last_try = tokio::time::Instant::now() + POLL_INTERVAL >= deadline;
        if predicate(last_try).await? {
            return Ok(());
        }
        if last_try {
            anyhow::bail!("condition not met within {timeout:?}");
        }
        trace!("condition not met yet, polling again");
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
