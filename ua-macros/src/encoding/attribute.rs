// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use syn::{parse::ParseStream, Ident, LitStr, Token};

use crate::utils::ItemAttr;

/// Walk a comma separated list of `key` or `key = "value"` entries,
/// handing each key to `on_key`.
fn parse_entries(
    input: ParseStream,
    mut on_key: impl FnMut(&Ident, ParseStream) -> syn::Result<()>,
) -> syn::Result<()> {
    loop {
        let ident: Ident = input.parse()?;
        on_key(&ident, input)?;
        if !input.peek(Token![,]) {
            break;
        }
        input.parse::<Token![,]>()?;
    }
    Ok(())
}

fn parse_rename(input: ParseStream) -> syn::Result<String> {
    input.parse::<Token![=]>()?;
    let val: LitStr = input.parse()?;
    Ok(val.value())
}

#[derive(Debug, Default)]
pub(crate) struct EncodingFieldAttribute {
    pub rename: Option<String>,
    pub ignore: bool,
    pub optional: bool,
}

impl syn::parse::Parse for EncodingFieldAttribute {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut slf = Self::default();
        parse_entries(input, |ident, input| {
            match ident.to_string().as_str() {
                "rename" => slf.rename = Some(parse_rename(input)?),
                "ignore" => slf.ignore = true,
                "optional" => slf.optional = true,
                _ => return Err(syn::Error::new_spanned(ident, "Unknown attribute value")),
            }
            Ok(())
        })?;
        Ok(slf)
    }
}

impl ItemAttr for EncodingFieldAttribute {
    fn combine(&mut self, other: Self) {
        if other.rename.is_some() {
            self.rename = other.rename;
        }
        self.ignore |= other.ignore;
        self.optional |= other.optional;
    }
}

#[derive(Debug, Default)]
pub(crate) struct EncodingVariantAttribute {
    pub rename: Option<String>,
    pub default: bool,
}

impl ItemAttr for EncodingVariantAttribute {
    fn combine(&mut self, other: Self) {
        if other.rename.is_some() {
            self.rename = other.rename;
        }
        self.default |= other.default;
    }
}

impl syn::parse::Parse for EncodingVariantAttribute {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut slf = Self::default();
        parse_entries(input, |ident, input| {
            match ident.to_string().as_str() {
                "rename" => slf.rename = Some(parse_rename(input)?),
                "default" => slf.default = true,
                _ => return Err(syn::Error::new_spanned(ident, "Unknown attribute value")),
            }
            Ok(())
        })?;
        Ok(slf)
    }
}

#[derive(Debug, Default)]
pub(crate) struct EncodingItemAttribute {
    pub(crate) rename: Option<String>,
}

impl ItemAttr for EncodingItemAttribute {
    fn combine(&mut self, other: Self) {
        if other.rename.is_some() {
            self.rename = other.rename;
        }
    }
}

impl syn::parse::Parse for EncodingItemAttribute {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut slf = Self::default();
        parse_entries(input, |ident, input| {
            match ident.to_string().as_str() {
                "rename" => slf.rename = Some(parse_rename(input)?),
                _ => return Err(syn::Error::new_spanned(ident, "Unknown attribute value")),
            }
            Ok(())
        })?;
        Ok(slf)
    }
}
