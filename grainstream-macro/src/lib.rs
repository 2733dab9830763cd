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

#![forbid(unsafe_code)]

//! Grainstream Macro Library
//!
//! Attribute macros for the Grainstream streaming runtime.
//!
//! # Stream Items
//!
//! The [`stream_item`] macro prepares a type for travelling on a stream:
//!
//! ```ignore
//! #[stream_item]
//! pub struct Tick(pub u64);
//!
//! // Payload that can also be persisted or sent elsewhere
//! #[stream_item(serde)]
//! pub struct Reading {
//!     pub value: f64,
//! }
//! ```
//!
//! # Implicit Subscriptions
//!
//! The [`implicit_subscription`] macro binds a consumer grain type to stream
//! namespaces:
//!
//! ```ignore
//! #[implicit_subscription("orders-in", "refunds-in")]
//! pub struct LedgerGrain { /* ... */ }
//! ```

use proc_macro::TokenStream;

use quote::quote;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, DeriveInput, LitStr, Token};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident(trait_name) {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// Configuration options parsed from `#[stream_item(...)]` attributes.
#[derive(Default)]
struct ItemConfig {
    /// Derive serde's `Serialize` and `Deserialize`.
    serde: bool,
}

impl ItemConfig {
    fn parse(attr: &TokenStream) -> Self {
        let mut config = Self::default();
        let attr_string = attr.to_string();
        for part in attr_string.split(',') {
            if part.trim() == "serde" {
                config.serde = true;
            }
        }
        config
    }
}

/// Derives what a type needs to be published on a Grainstream stream.
///
/// Expands to:
/// - `#[derive(Clone, Debug)]` (only the traits not already present)
/// - with `#[stream_item(serde)]`, also `serde::Serialize` and `serde::Deserialize`
/// - a compile-time assertion that the type is `Send + Sync + 'static`
///
/// Those bounds are what the blanket `StreamItem` implementation requires, so
/// the annotated type can be used with `StreamHandle<T>` directly.
///
/// **Note:** the `serde` option requires `serde` with the `derive` feature in
/// the consuming crate.
#[proc_macro_attribute]
pub fn stream_item(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = ItemConfig::parse(&attr);
    let input = parse_macro_input!(item as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let derives = {
        let mut traits = Vec::new();
        if !has_derive(&input, "Clone") {
            traits.push(quote!(Clone));
        }
        if !has_derive(&input, "Debug") {
            traits.push(quote!(Debug));
        }
        if config.serde {
            if !has_derive(&input, "Serialize") {
                traits.push(quote!(serde::Serialize));
            }
            if !has_derive(&input, "Deserialize") {
                traits.push(quote!(serde::Deserialize));
            }
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let assert_ident = quote::format_ident!("_AssertStreamItem_{}", name);

    let expanded = quote! {
        #derives
        #input

        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case, clippy::needless_lifetimes)]
        const _: () = {
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + Sync + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    };

    TokenStream::from(expanded)
}

/// Declares the stream namespaces a consumer grain implicitly subscribes to.
///
/// ```ignore
/// #[implicit_subscription("BRC0-in", "BRC1-in")]
/// pub struct EaterGrain { /* ... */ }
/// ```
///
/// Generates `impl ImplicitSubscriber for EaterGrain` with the listed
/// namespaces, deduplicated in declaration order. The type must also implement
/// `StreamConsumer`. Registering the type with
/// `GrainApp::with_implicit_subscriber::<EaterGrain>()` makes the runtime
/// activate and subscribe the grain keyed by the stream's key on the first
/// publish to any matching stream.
#[proc_macro_attribute]
pub fn implicit_subscription(attr: TokenStream, item: TokenStream) -> TokenStream {
    let namespaces =
        parse_macro_input!(attr with Punctuated::<LitStr, Token![,]>::parse_terminated);
    let input = parse_macro_input!(item as DeriveInput);

    if namespaces.is_empty() {
        return syn::Error::new_spanned(
            &input.ident,
            "implicit_subscription needs at least one namespace",
        )
        .to_compile_error()
        .into();
    }

    let mut seen = Vec::new();
    for namespace in &namespaces {
        let value = namespace.value();
        if value.is_empty() {
            return syn::Error::new_spanned(namespace, "namespace must not be empty")
                .to_compile_error()
                .into();
        }
        if !seen.contains(&value) {
            seen.push(value);
        }
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        #input

        impl #impl_generics ::grainstream::prelude::ImplicitSubscriber for #name #ty_generics #where_clause {
            const NAMESPACES: &'static [&'static str] = &[#(#seen),*];
        }
    };

    TokenStream::from(expanded)
}
