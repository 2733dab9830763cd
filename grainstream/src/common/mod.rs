//! Runtime assembly, configuration and shared helpers.
//!
//! # Key Re-exported Components:
//!
//! *   [`GrainApp`]: Builder and entry point for a runtime.
//! *   [`GrainRuntime`]: The running runtime: grain references, stream providers,
//!     deactivation and shutdown.
//! *   [`StreamsConfig`]: Configuration loaded from XDG-compliant locations.
//! *   [`ManagementIntrospection`]: Read-only diagnostics.
//! *   [`Reply`]: Helpers for closure callback return values.

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
pub use app::GrainApp;
pub use config::{StreamsConfig, CONFIG};
pub use management::{GrainStatistic, ManagementIntrospection};
pub use reply::Reply;
pub use runtime::GrainRuntime;
pub use types::*;

// --- Crate-Internal Re-exports ---
pub(crate) use runtime::WeakRuntime;

// --- Submodules ---

/// Defines the `GrainApp` builder.
mod app;
/// Defines the configuration system.
pub mod config;
/// Defines `ManagementIntrospection`.
mod management;
/// Defines the `Reply` helpers.
mod reply;
/// Defines `GrainRuntime` and its activation directory.
mod runtime;
/// Defines shared type aliases.
mod types;
