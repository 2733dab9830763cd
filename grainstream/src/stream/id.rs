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

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a logical stream: an owner key plus a namespace.
///
/// Equality and hashing are by value. Ordering is by `(namespace, key)` so that
/// introspection listings group streams of the same namespace together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId {
    namespace: String,
    key: Uuid,
}

impl StreamId {
    /// Creates the identity of the stream `key` under `namespace`.
    pub fn new(key: Uuid, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key,
        }
    }

    /// The owner key.
    #[inline]
    pub fn key(&self) -> Uuid {
        self.key
    }

    /// The namespace string.
    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.key)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn equal_by_value() {
        let key = Uuid::new_v4();
        let a = StreamId::new(key, "BRC0-in");
        let b = StreamId::new(key, String::from("BRC0-in"));
        assert_eq!(a, b);

        let set: HashSet<_> = [a.clone(), b].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert_ne!(a, StreamId::new(key, "BRC1-in"));
    }

    #[test]
    fn orders_by_namespace_first() {
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);
        let mut ids = vec![
            StreamId::new(low, "b"),
            StreamId::new(high, "a"),
            StreamId::new(low, "a"),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                StreamId::new(low, "a"),
                StreamId::new(high, "a"),
                StreamId::new(low, "b"),
            ]
        );
    }

    #[test]
    fn displays_namespace_then_key() {
        let key = Uuid::nil();
        assert_eq!(
            StreamId::new(key, "SampleStreamNamespace").to_string(),
            "SampleStreamNamespace/00000000-0000-0000-0000-000000000000"
        );
    }
}
