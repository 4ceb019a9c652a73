use proc_macro2::Ident;
use proc_macro_crate::{crate_name, FoundCrate};
use syn::punctuated::Punctuated;
use syn::{Path, Token};

/// Returns a path to an item within a crate, resolving whether the crate is "itself" or an external
/// dependency (possibly renamed).
///
/// The "itself" case resolves through the crate's own name rather than `crate::`, so that the path
/// also works in the crate's integration tests and doctests. The library declares
/// `extern crate self as polycast;` for this.
pub(crate) fn resolved_path(crate_base_name: &str, path_segments: &[&str]) -> Path {
    let segments: Punctuated<Ident, Token![::]> = path_segments
        .iter()
        .map(|s| syn::Ident::new(s, proc_macro2::Span::call_site()))
        .collect();

    let crate_ident = match crate_name(crate_base_name) {
        Ok(FoundCrate::Itself) => syn::Ident::new(crate_base_name, proc_macro2::Span::call_site()),
        Ok(FoundCrate::Name(name)) => syn::Ident::new(&name, proc_macro2::Span::call_site()),
        Err(e) => panic!("Failed to find crate `{crate_base_name}`: {e}"),
    };
    syn::parse_quote!(::#crate_ident::#segments)
}

pub(crate) fn polycast_path(path_segments: &[&str]) -> Path {
    resolved_path("polycast", path_segments)
}
