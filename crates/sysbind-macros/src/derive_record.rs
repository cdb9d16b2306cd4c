//! Implementation of the `#[derive(NativeRecord)]` macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input, spanned::Spanned};

use crate::attrs::{FieldAttrs, RecordAttrs, has_c_layout};

pub fn derive_native_record_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_native_record_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_native_record_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = RecordAttrs::from_attrs(&input.attrs)?;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "NativeRecord cannot be derived for generic types",
        ));
    }
    if !has_c_layout(&input.attrs)? {
        return Err(syn::Error::new(
            name.span(),
            "NativeRecord requires #[repr(C)] so the layout matches the native record",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new(
                    name.span(),
                    "NativeRecord requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                name.span(),
                "NativeRecord can only be derived for structs",
            ));
        }
    };

    let native_name = attrs.name.clone().unwrap_or_else(|| name.to_string());
    let code = match attrs.code {
        Some(code) => quote! { ::sysbind_core::TypeCode::new(#code) },
        None => quote! { ::sysbind_core::TypeCode::from_name(#native_name) },
    };

    let mut layouts = Vec::new();
    let mut field_types = Vec::new();
    for field in fields {
        let field_attrs = FieldAttrs::from_attrs(&field.attrs)?;
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let field_name = field_attrs.name.unwrap_or_else(|| ident.to_string());
        let ty = &field.ty;

        layouts.push(quote! {
            ::sysbind_core::FieldLayout::new(
                #field_name,
                ::core::mem::offset_of!(#name, #ident),
                <#ty as ::sysbind_core::NativeScalar>::KIND,
            )
        });
        field_types.push(ty);
    }

    let padding_msg = format!("{name} has padding bytes; add explicit fields to fill the gaps");

    Ok(quote! {
        // SAFETY: the struct is #[repr(C)], every field is a fixed-width
        // integer, and the assertion below rules out padding.
        unsafe impl ::sysbind_core::NativeRecord for #name {
            const NAME: &'static str = #native_name;
            const CODE: ::sysbind_core::TypeCode = #code;
            const FIELDS: &'static [::sysbind_core::FieldLayout] = &[#(#layouts),*];
        }

        const _: () = {
            assert!(
                ::core::mem::size_of::<#name>() == 0 #(+ ::core::mem::size_of::<#field_types>())*,
                #padding_msg
            );
        };
    })
}
