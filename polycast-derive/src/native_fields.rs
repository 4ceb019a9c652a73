use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr};

use crate::utilities::polycast_path;

struct NativeField {
    ident: Ident,
    name: LitStr,
}

pub(crate) fn derive(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "NativeFields can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &data.fields,
            "NativeFields requires named fields",
        ));
    };

    let mut default_child = false;
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("native")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default_child") {
                default_child = true;
                Ok(())
            } else {
                Err(meta.error("expected `default_child`"))
            }
        })?;
    }

    let mut fields = Vec::new();
    for field in &named.named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let mut skip = false;
        let mut name = LitStr::new(&ident.to_string(), ident.span());
        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("native")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    Ok(())
                } else if meta.path.is_ident("rename") {
                    name = meta.value()?.parse()?;
                    Ok(())
                } else {
                    Err(meta.error("expected `skip` or `rename = \"...\"`"))
                }
            })?;
        }
        if !skip {
            fields.push(NativeField { ident, name });
        }
    }

    let native_fields = polycast_path(&["entity", "NativeFields"]);
    let property_type = polycast_path(&["value", "PropertyType"]);
    let value = polycast_path(&["value", "Value"]);
    let result = polycast_path(&["error", "Result"]);
    let error = polycast_path(&["error", "PolycastError"]);

    let type_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let names: Vec<_> = fields.iter().map(|field| &field.name).collect();
    let idents: Vec<_> = fields.iter().map(|field| &field.ident).collect();

    let create_child = default_child.then(|| {
        quote! {
            fn create_child(&self) -> ::std::option::Option<::std::boxed::Box<dyn #native_fields>> {
                ::std::option::Option::Some(::std::boxed::Box::new(
                    <Self as ::std::default::Default>::default(),
                ))
            }
        }
    });

    Ok(quote! {
        impl #impl_generics #native_fields for #type_name #ty_generics #where_clause {
            fn has_field(&self, name: &str) -> bool {
                const FIELDS: &[&str] = &[#(#names),*];
                FIELDS.contains(&name)
            }

            fn get_field(&self, name: &str) -> ::std::option::Option<#value> {
                match name {
                    #(#names => #property_type::into_value(
                        ::std::clone::Clone::clone(&self.#idents),
                    ),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                value: ::std::option::Option<#value>,
            ) -> #result<()> {
                match name {
                    #(#names => {
                        self.#idents = #property_type::from_value(value)?;
                        ::std::result::Result::Ok(())
                    })*
                    _ => ::std::result::Result::Err(#error::InvalidArgument(::std::format!(
                        "`{}` has no native field `{}`",
                        ::std::stringify!(#type_name),
                        name,
                    ))),
                }
            }

            #create_child
        }
    })
}
