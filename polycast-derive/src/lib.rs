extern crate proc_macro;
mod native_fields;
mod utilities;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Implements `polycast::entity::NativeFields` for a struct with named fields.
///
/// Every field becomes a native field under its own name, read with `PropertyType::into_value`
/// and written with `PropertyType::from_value`. Field attributes:
/// * `#[native(skip)]` leaves the field out.
/// * `#[native(rename = "other")]` exposes the field under another name.
///
/// The struct attribute `#[native(default_child)]` makes clones of an entity backed by this
/// struct start from `Default::default()`.
#[proc_macro_derive(NativeFields, attributes(native))]
pub fn derive_native_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    native_fields::derive(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
