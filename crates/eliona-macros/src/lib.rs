// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Proc macros for eliona-sdk.
//!
//! Provides `#[derive(ElionaAttributes)]`, which maps struct fields onto Eliona
//! asset attributes.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input, spanned::Spanned};

const SUBTYPES: [(&str, &str); 5] = [
    ("input", "Input"),
    ("info", "Info"),
    ("status", "Status"),
    ("output", "Output"),
    ("property", "Property"),
];

/// Implements `eliona_sdk::asset::ElionaAttributes` for a struct with named fields.
///
/// Only fields carrying `#[eliona(...)]` take part. Supported keys:
///
/// - `attribute = "name"`: attribute name in Eliona (default: the field name)
/// - `filterable`: the attribute identifies the asset in filters
/// - `subtype = "status"`: one of `input`, `info`, `status`, `output`, `property`
///
/// Every tagged field must implement `serde::Serialize`.
///
/// # Example
///
/// ```ignore
/// use eliona_sdk::asset::ElionaAttributes;
///
/// #[derive(ElionaAttributes)]
/// struct Sensor {
///     #[eliona(attribute = "serial_number", filterable, subtype = "info")]
///     serial: String,
///     #[eliona(subtype = "input")]
///     temperature: f64,
///     // not an attribute
///     internal_id: u64,
/// }
/// ```
#[proc_macro_derive(ElionaAttributes, attributes(eliona))]
pub fn derive_eliona_attributes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_eliona_attributes(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Parsed `#[eliona(...)]` of one field.
struct FieldTag {
    ident: syn::Ident,
    attribute_name: String,
    filterable: bool,
    subtype: Option<syn::Ident>,
}

fn generate_eliona_attributes(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "ElionaAttributes requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "ElionaAttributes can only be derived for structs",
            ));
        }
    };

    let mut tags = Vec::new();
    for field in fields {
        if let Some(tag) = parse_field_tag(field)? {
            tags.push(tag);
        }
    }

    let tag_exprs: Vec<TokenStream2> = tags.iter().map(tag_tokens).collect();
    let idents: Vec<&syn::Ident> = tags.iter().map(|tag| &tag.ident).collect();

    Ok(quote! {
        impl #impl_generics ::eliona_sdk::asset::ElionaAttributes for #name #ty_generics #where_clause {
            fn eliona_tags() -> ::std::vec::Vec<::eliona_sdk::asset::ElionaTag> {
                ::std::vec![#(#tag_exprs),*]
            }

            fn eliona_values(
                &self,
            ) -> ::core::result::Result<
                ::std::vec::Vec<(::eliona_sdk::asset::ElionaTag, ::eliona_sdk::serde_json::Value)>,
                ::eliona_sdk::serde_json::Error,
            > {
                ::core::result::Result::Ok(::std::vec![
                    #((#tag_exprs, ::eliona_sdk::serde_json::to_value(&self.#idents)?)),*
                ])
            }
        }
    })
}

fn parse_field_tag(field: &syn::Field) -> syn::Result<Option<FieldTag>> {
    let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("eliona")) else {
        return Ok(None);
    };
    let Some(ident) = field.ident.clone() else {
        return Err(syn::Error::new(field.span(), "tagged field must be named"));
    };

    let mut attribute_name = ident.to_string();
    let mut filterable = false;
    let mut subtype = None;

    // `#[eliona]` without arguments uses the defaults
    if !matches!(attr.meta, syn::Meta::Path(_)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("attribute") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(syn::Error::new(value.span(), "attribute name must not be empty"));
                }
                attribute_name = value.value();
                Ok(())
            } else if meta.path.is_ident("filterable") {
                filterable = true;
                Ok(())
            } else if meta.path.is_ident("subtype") {
                let value: LitStr = meta.value()?.parse()?;
                subtype = Some(subtype_variant(&value)?);
                Ok(())
            } else {
                Err(meta.error("expected `attribute`, `filterable` or `subtype`"))
            }
        })?;
    }

    Ok(Some(FieldTag {
        ident,
        attribute_name,
        filterable,
        subtype,
    }))
}

fn subtype_variant(value: &LitStr) -> syn::Result<syn::Ident> {
    let text = value.value();
    SUBTYPES
        .iter()
        .find(|(wire, _)| *wire == text)
        .map(|(_, variant)| syn::Ident::new(variant, Span::call_site()))
        .ok_or_else(|| {
            syn::Error::new(
                value.span(),
                format!(
                    "unknown subtype '{}', expected one of: input, info, status, output, property",
                    text
                ),
            )
        })
}

fn tag_tokens(tag: &FieldTag) -> TokenStream2 {
    let field = tag.ident.to_string();
    let attribute_name = &tag.attribute_name;
    let filterable = tag.filterable;
    let subtype = match &tag.subtype {
        Some(variant) => {
            quote! { ::core::option::Option::Some(::eliona_sdk::api::DataSubtype::#variant) }
        }
        None => quote! { ::core::option::Option::None },
    };

    quote! {
        ::eliona_sdk::asset::ElionaTag {
            field: #field,
            attribute_name: #attribute_name,
            filterable: #filterable,
            subtype: #subtype,
        }
    }
}
