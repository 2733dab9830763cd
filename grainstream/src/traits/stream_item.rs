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
use std::any::Any;
use std::fmt::Debug;

use dyn_clone::DynClone;

/// A marker trait for payloads that can be published on a stream.
///
/// Items are carried through the registry as `Arc<dyn StreamItem>` and recovered
/// by subscribers through [`as_any`](StreamItem::as_any). Heterogeneous shapes on
/// one stream are expressed with an enum payload rather than an untyped value.
///
/// A blanket implementation covers every `Any + Send + Sync + Debug + DynClone`
/// type; the [`stream_item`](grainstream_macro::stream_item) attribute derives
/// what is missing.
pub trait StreamItem: DynClone + Any + Send + Sync + Debug {
    /// Returns the item as a dynamic [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The Rust type name of the concrete payload, used in mismatch reports.
    fn type_name(&self) -> &'static str;
}

dyn_clone::clone_trait_object!(StreamItem);

impl<T> StreamItem for T
where
    T: Any + Send + Sync + Debug + DynClone + 'static,
{
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Reading(u32);

    #[test]
    fn downcasts_through_trait_object() {
        let item: Box<dyn StreamItem> = Box::new(Reading(7));
        let payload: &dyn StreamItem = item.as_ref();
        assert_eq!(payload.as_any().downcast_ref::<Reading>(), Some(&Reading(7)));
        assert!(payload.type_name().ends_with("Reading"));
    }
}
