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

use grainstream::config::StreamsConfig;
use grainstream::grains::{Signature, SignatureHeader};

/// Provider every test runtime registers besides the default one.
pub const BRC_PROVIDER: &str = "NCI-BRC";

/// Defaults with the idle collector off, so activations only go away when a
/// test deactivates them.
pub fn test_config() -> StreamsConfig {
    let mut config = StreamsConfig::default();
    config.collection.enabled = false;
    config
}

pub fn first_simple() -> Signature {
    Signature::first(SignatureHeader::new("bill", "tom"), 10_000_000)
}

pub fn second_simple() -> Signature {
    Signature::second(SignatureHeader::new("bill", "tom"), 10)
}
