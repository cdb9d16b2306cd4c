//! Attribute parsing for `#[native(...)]`.

use syn::{Attribute, LitInt, LitStr};

/// Parsed `#[native(...)]` attributes on a struct.
#[derive(Debug, Default)]
pub struct RecordAttrs {
    /// Host-visible type name (default: the Rust struct name)
    pub name: Option<String>,
    /// Explicit type code (default: derived from the name)
    pub code: Option<u32>,
}

/// Parsed `#[native(...)]` attributes on a field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// Override the field name seen by the host
    pub name: Option<String>,
}

impl RecordAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("native") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    if value.value().is_empty() {
                        return Err(syn::Error::new(value.span(), "type name must not be empty"));
                    }
                    result.name = Some(value.value());
                } else if meta.path.is_ident("code") {
                    let value: LitInt = meta.value()?.parse()?;
                    let code = value.base10_parse::<u32>()?;
                    if code == 0 {
                        return Err(syn::Error::new(value.span(), "type code 0 is reserved"));
                    }
                    result.code = Some(code);
                } else {
                    return Err(meta.error(format!(
                        "unknown native attribute: {}",
                        meta.path.get_ident().map(|i| i.to_string()).unwrap_or_default()
                    )));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}

impl FieldAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("native") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else {
                    return Err(meta.error(format!(
                        "unknown native field attribute: {}",
                        meta.path.get_ident().map(|i| i.to_string()).unwrap_or_default()
                    )));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}

/// Check for `#[repr(C)]` or `#[repr(transparent)]`.
pub fn has_c_layout(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut found = false;
    for attr in attrs {
        if !attr.path().is_ident("repr") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") || meta.path.is_ident("transparent") {
                found = true;
            } else if meta.input.peek(syn::token::Paren) {
                // align(N) / packed(N)
                let content;
                syn::parenthesized!(content in meta.input);
                content.parse::<proc_macro2::TokenStream>()?;
            }
            Ok(())
        })?;
    }
    Ok(found)
}
