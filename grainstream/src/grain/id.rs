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
use std::fmt;

use uuid::Uuid;

use crate::traits::Grain;

/// Identity of a grain: its kind tag and its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrainId {
    kind: &'static str,
    key: Uuid,
}

impl GrainId {
    /// Creates an id from a kind tag and key.
    pub fn new(kind: &'static str, key: Uuid) -> Self {
        Self { kind, key }
    }

    /// The id of the grain of type `G` with `key`.
    pub fn of<G: Grain>(key: Uuid) -> Self {
        Self::new(G::KIND, key)
    }

    /// The kind tag.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The key.
    pub fn key(&self) -> Uuid {
        self.key
    }
}

impl fmt::Display for GrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.key)
    }
}
