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

use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Configuration for a Grainstream runtime.
///
/// Loaded from `config.toml` in the `grainstream` XDG configuration directory.
/// Every section and field is optional; missing values take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamsConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Periodic production settings for the reference producer
    pub producer: ProducerConfig,
    /// Idle activation collection
    pub collection: CollectionConfig,
    /// Default provider and namespace names
    pub defaults: DefaultsConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound for `shutdown_all`, in milliseconds
    pub system_shutdown_timeout_ms: u64,
    /// Upper bound for a single grain deactivation, in milliseconds
    pub deactivation_timeout_ms: u64,
}

/// Timer settings used by `ProducerGrain`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Delay between two production ticks, in milliseconds
    pub period_ms: u64,
    /// Delay before the first tick, in milliseconds
    pub due_ms: u64,
}

/// Idle collection of grain activations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Run the background collector
    pub enabled: bool,
    /// Activations idle for longer than this are deactivated, in milliseconds
    pub idle_age_ms: u64,
    /// How often the collector sweeps, in milliseconds
    pub sweep_interval_ms: u64,
}

/// Default names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Provider that is always registered and used by grains by default
    pub stream_provider: String,
    /// Namespace used by the reference grains when none is given
    pub stream_namespace: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            system_shutdown_timeout_ms: 30_000,
            deactivation_timeout_ms: 10_000,
        }
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            period_ms: 10,
            due_ms: 0,
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_age_ms: 7_200_000,
            sweep_interval_ms: 60_000,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            stream_provider: "SMSProvider".to_string(),
            stream_namespace: "SampleStreamNamespace".to_string(),
        }
    }
}

impl StreamsConfig {
    /// System shutdown timeout as a `Duration`
    pub const fn system_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.system_shutdown_timeout_ms)
    }

    /// Per-grain deactivation timeout as a `Duration`
    pub const fn deactivation_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.deactivation_timeout_ms)
    }

    /// Producer tick period as a `Duration`
    pub const fn producer_period(&self) -> Duration {
        Duration::from_millis(self.producer.period_ms)
    }

    /// Delay before the first producer tick as a `Duration`
    pub const fn producer_due(&self) -> Duration {
        Duration::from_millis(self.producer.due_ms)
    }

    /// Idle age after which activations are collected
    pub const fn idle_age(&self) -> Duration {
        Duration::from_millis(self.collection.idle_age_ms)
    }

    /// Interval between two collector sweeps
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.collection.sweep_interval_ms)
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed documents.
    pub fn from_toml_str(document: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(document)?)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `grainstream/config.toml` under `$XDG_CONFIG_HOME` and then the
    /// `$XDG_CONFIG_DIRS` fallbacks. A missing file yields the defaults; an
    /// unreadable or malformed file is logged and also yields the defaults.
    pub fn load() -> Self {
        use tracing::{error, info};

        let xdg_dirs = match xdg::BaseDirectories::with_prefix("grainstream") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        let Some(path) = xdg_dirs.find_config_file("config.toml") else {
            info!("No configuration file found, using defaults");
            return Self::default();
        };

        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(&path) {
            Ok(document) => match Self::from_toml_str(&document) {
                Ok(config) => config,
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

lazy_static! {
    /// Global configuration instance loaded from XDG-compliant locations
    pub static ref CONFIG: StreamsConfig = StreamsConfig::load();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_setup() {
        let config = StreamsConfig::default();
        assert_eq!(config.producer_period(), Duration::from_millis(10));
        assert_eq!(config.producer_due(), Duration::ZERO);
        assert_eq!(config.defaults.stream_provider, "SMSProvider");
        assert_eq!(config.defaults.stream_namespace, "SampleStreamNamespace");
        assert!(config.collection.enabled);
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = StreamsConfig::from_toml_str(
            r#"
            [producer]
            period_ms = 25

            [defaults]
            stream_provider = "NCI-BRC"
            "#,
        )
        .unwrap();
        assert_eq!(config.producer.period_ms, 25);
        assert_eq!(config.producer.due_ms, 0);
        assert_eq!(config.defaults.stream_provider, "NCI-BRC");
        assert_eq!(config.defaults.stream_namespace, "SampleStreamNamespace");
        assert_eq!(config.timeouts, TimeoutConfig::default());
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(StreamsConfig::from_toml_str("[producer]\nperiod_ms = \"soon\"").is_err());
    }
}
