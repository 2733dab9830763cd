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

use std::fs;

use tempfile::TempDir;

use grainstream::config::{StreamsConfig, TimeoutConfig};
use grainstream::prelude::*;
use grainstream_test::prelude::*;

use crate::setup::*;

mod setup;

/// Everything that touches `XDG_CONFIG_HOME` lives in this one test, since the
/// environment is shared by all tests in the binary.
#[grain_test]
async fn test_configuration_is_loaded_from_xdg_config_home() -> anyhow::Result<()> {
    initialize_tracing();
    let temp_dir = TempDir::new()?;
    let config_dir = temp_dir.path().join("grainstream");
    fs::create_dir_all(&config_dir)?;
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());

    // No file yet: defaults.
    assert_eq!(StreamsConfig::load(), StreamsConfig::default());

    let config_content = r#"
        [producer]
        period_ms = 25

        [collection]
        enabled = false

        [defaults]
        stream_provider = "NCI-BRC"
    "#;
    fs::write(config_dir.join("config.toml"), config_content)?;

    let loaded = StreamsConfig::load();
    assert_eq!(loaded.producer.period_ms, 25);
    assert_eq!(loaded.producer.due_ms, 0);
    assert!(!loaded.collection.enabled);
    assert_eq!(loaded.defaults.stream_provider, "NCI-BRC");
    assert_eq!(loaded.timeouts, TimeoutConfig::default());

    // The global configuration is read on first use, which is here.
    let runtime = GrainApp::new().launch_async().await;
    assert_eq!(runtime.config().defaults.stream_provider, "NCI-BRC");
    assert_eq!(runtime.provider_names(), vec!["NCI-BRC"]);
    assert!(runtime.default_stream_provider().is_ok());

    // A malformed file falls back to the defaults.
    fs::write(config_dir.join("config.toml"), "[producer]\nperiod_ms = \"soon\"")?;
    assert_eq!(StreamsConfig::load(), StreamsConfig::default());

    runtime.shutdown_all().await?;
    temp_dir.close()?;
    Ok(())
}
