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

use grainstream_macro::stream_item;
use uuid::Uuid;

/// Fields every [`Signature`] carries.
#[stream_item(serde)]
#[derive(PartialEq, Eq)]
pub struct SignatureHeader {
    pub identifier: Uuid,
    pub my_name: String,
    pub user_name: String,
}

impl SignatureHeader {
    /// A header with a fresh identifier.
    pub fn new(my_name: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            identifier: Uuid::new_v4(),
            my_name: my_name.into(),
            user_name: user_name.into(),
        }
    }
}

/// Sample payload published on the implicit `BRC*-in` namespaces.
#[stream_item(serde)]
#[derive(PartialEq, Eq)]
pub enum Signature {
    First {
        header: SignatureHeader,
        another_big_number: i64,
    },
    Second {
        header: SignatureHeader,
        big_number: i64,
    },
}

impl Signature {
    pub fn first(header: SignatureHeader, another_big_number: i64) -> Self {
        Self::First {
            header,
            another_big_number,
        }
    }

    pub fn second(header: SignatureHeader, big_number: i64) -> Self {
        Self::Second { header, big_number }
    }

    /// The shared header, whichever shape this is.
    pub fn header(&self) -> &SignatureHeader {
        match self {
            Self::First { header, .. } | Self::Second { header, .. } => header,
        }
    }

    pub fn is_first(&self) -> bool {
        matches!(self, Self::First { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StreamItem;

    #[test]
    fn header_is_shared_by_both_shapes() {
        let first = Signature::first(SignatureHeader::new("bill", "tom"), 10_000_000);
        let second = Signature::second(SignatureHeader::new("bill", "tom"), 10);
        assert!(first.is_first());
        assert!(!second.is_first());
        assert_eq!(first.header().my_name, second.header().my_name);
        assert_ne!(first.header().identifier, second.header().identifier);
    }

    #[test]
    fn travels_as_a_stream_item() {
        let item: Box<dyn StreamItem> =
            Box::new(Signature::second(SignatureHeader::new("bill", "tom"), 10));
        let item = item.as_ref();
        assert!(item.type_name().ends_with("Signature"));
        assert!(item.as_any().downcast_ref::<Signature>().is_some());
    }
}
