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

//! Helpers for building [`HandlerFuture`] return values.
//!
//! Closure callbacks passed to
//! [`StreamHandle::subscribe_with`](crate::stream::StreamHandle::subscribe_with)
//! return a boxed future. [`Reply`] builds one without the pinning boilerplate:
//!
//! ```ignore
//! stream.subscribe_with(
//!     move |item, _delivery| {
//!         seen.fetch_add(1, Ordering::SeqCst);
//!         Reply::ok()
//!     },
//!     |error| Reply::pending(async move {
//!         tracing::warn!(%error, "stream failed");
//!         Ok(())
//!     }),
//!     || Reply::ok(),
//! ).await?;
//! ```

use std::future::Future;

use crate::common::HandlerFuture;

/// Namespace for creating callback return values.
pub struct Reply;

impl Reply {
    /// A callback that completed successfully without async work.
    #[inline]
    pub fn ok() -> HandlerFuture {
        Box::pin(async { Ok(()) })
    }

    /// Wraps async work.
    #[inline]
    pub fn pending<F>(future: F) -> HandlerFuture
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Box::pin(future)
    }

    /// A callback that failed immediately.
    #[inline]
    pub fn err(error: impl Into<anyhow::Error>) -> HandlerFuture {
        let error = error.into();
        Box::pin(async move { Err(error) })
    }
}
