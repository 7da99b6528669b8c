// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use attribute::{EncodingFieldAttribute, EncodingItemAttribute};
use binary::{
    generate_binary_decode_impl, generate_binary_encode_impl,
    generate_simple_enum_binary_decode_impl, generate_simple_enum_binary_encode_impl,
};
use enums::{derive_ua_enum_impl, SimpleEnum};
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::DeriveInput;
use xml::{
    generate_simple_enum_xml_decode_impl, generate_simple_enum_xml_encode_impl,
    generate_xml_decode_impl, generate_xml_encode_impl, generate_xml_type_impl,
};

use crate::utils::StructItem;

mod attribute;
mod binary;
mod enums;
mod xml;

pub(crate) type EncodingStruct = StructItem<EncodingFieldAttribute, EncodingItemAttribute>;

pub(crate) enum EncodingInput {
    Struct(EncodingStruct),
    SimpleEnum(SimpleEnum),
}

impl EncodingInput {
    pub fn from_derive_input(input: DeriveInput) -> syn::Result<Self> {
        match input.data {
            syn::Data::Struct(data_struct) => Ok(Self::Struct(EncodingStruct::from_input(
                data_struct,
                input.attrs,
                input.ident,
            )?)),
            syn::Data::Enum(data_enum) => Ok(Self::SimpleEnum(SimpleEnum::from_input(
                data_enum,
                input.attrs,
                input.ident,
            )?)),
            syn::Data::Union(_) => Err(syn::Error::new_spanned(
                input.ident,
                "Unions are not supported",
            )),
        }
    }
}

pub enum EncodingToImpl {
    BinaryEncode,
    BinaryDecode,
    UaEnum,
    UaType,
    XmlEncode,
    XmlDecode,
    XmlType,
}

pub fn generate_encoding_impl(
    input: DeriveInput,
    target: EncodingToImpl,
) -> syn::Result<TokenStream> {
    let input = EncodingInput::from_derive_input(input)?;

    match (target, input) {
        (EncodingToImpl::BinaryEncode, EncodingInput::Struct(s)) => generate_binary_encode_impl(s),
        (EncodingToImpl::BinaryEncode, EncodingInput::SimpleEnum(s)) => {
            generate_simple_enum_binary_encode_impl(s)
        }
        (EncodingToImpl::BinaryDecode, EncodingInput::Struct(s)) => generate_binary_decode_impl(s),
        (EncodingToImpl::BinaryDecode, EncodingInput::SimpleEnum(s)) => {
            generate_simple_enum_binary_decode_impl(s)
        }
        (EncodingToImpl::XmlEncode, EncodingInput::Struct(s)) => generate_xml_encode_impl(s),
        (EncodingToImpl::XmlEncode, EncodingInput::SimpleEnum(s)) => {
            generate_simple_enum_xml_encode_impl(s)
        }
        (EncodingToImpl::XmlDecode, EncodingInput::Struct(s)) => generate_xml_decode_impl(s),
        (EncodingToImpl::XmlDecode, EncodingInput::SimpleEnum(s)) => {
            generate_simple_enum_xml_decode_impl(s)
        }
        (EncodingToImpl::XmlType, EncodingInput::Struct(s)) => {
            generate_xml_type_impl(s.ident, s.attribute)
        }
        (EncodingToImpl::XmlType, EncodingInput::SimpleEnum(s)) => {
            generate_xml_type_impl(s.ident, s.attr)
        }
        (EncodingToImpl::UaType, EncodingInput::Struct(s)) => {
            let ident = s.ident;
            Ok(quote! {
                impl ua_types::UaType for #ident {}
            })
        }
        (EncodingToImpl::UaType, EncodingInput::SimpleEnum(s)) => Err(syn::Error::new_spanned(
            s.ident,
            "UaType derive macro is only supported on structs",
        )),
        (EncodingToImpl::UaEnum, EncodingInput::SimpleEnum(s)) => derive_ua_enum_impl(s),
        (EncodingToImpl::UaEnum, _) => Err(syn::Error::new(
            Span::call_site(),
            "UaEnum derive macro is only supported on simple enums",
        )),
    }
}

pub(crate) fn derive_all_inner(item: DeriveInput) -> syn::Result<TokenStream> {
    let input = EncodingInput::from_derive_input(item.clone())?;
    let mut output = quote! {
        #[derive(
            ua_types::BinaryEncodable,
            ua_types::BinaryDecodable,
            ua_types::XmlEncodable,
            ua_types::XmlDecodable,
            ua_types::XmlType
        )]
    };

    match input {
        EncodingInput::SimpleEnum(_) => output.extend(quote! {
            #[derive(ua_types::UaEnum)]
        }),
        EncodingInput::Struct(_) => output.extend(quote! {
            #[derive(ua_types::UaType)]
        }),
    }

    output.extend(quote! {
        #item
    });

    Ok(output)
}
