// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

#![warn(missing_docs)]

//! Procedural macros deriving the binary and XML codecs for OPC UA data containers.
//!
//! Generated code refers to items through `ua_types::`, so the `ua-types` crate
//! must be in scope under that name (inside `ua-types` itself this is done with
//! `extern crate self as ua_types`).

mod encoding;
mod utils;

use encoding::{derive_all_inner, generate_encoding_impl, EncodingToImpl};
use proc_macro::TokenStream;
use syn::parse_macro_input;

#[proc_macro_derive(BinaryEncodable, attributes(opcua))]
/// Derive the `BinaryEncodable` trait on this struct or enum, creating code
/// to write the struct to an OPC UA binary stream.
///
/// Fields are written in declaration order. Fields marked `#[opcua(optional)]`
/// must be `Option<T>`, and cause a 32-bit encoding mask to be written before
/// the first field, with bit `n` set when the `n`th optional field is present.
///
/// All fields must be marked with `opcua(ignore)` or implement `BinaryEncodable`.
pub fn derive_binary_encodable(item: TokenStream) -> TokenStream {
    match generate_encoding_impl(parse_macro_input!(item), EncodingToImpl::BinaryEncode) {
        Ok(r) => r.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[proc_macro_derive(BinaryDecodable, attributes(opcua))]
/// Derive the `BinaryDecodable` trait on this struct or enum, creating code
/// to read the struct from an OPC UA binary stream.
///
/// All fields must be marked with `opcua(ignore)` or implement `BinaryDecodable`.
pub fn derive_binary_decodable(item: TokenStream) -> TokenStream {
    match generate_encoding_impl(parse_macro_input!(item), EncodingToImpl::BinaryDecode) {
        Ok(r) => r.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[proc_macro_derive(UaEnum, attributes(opcua))]
/// Derive the `UaEnum` trait on this simple enum, creating code to convert it
/// to and from its OPC UA string representation (`Name_Value`) and its numeric representation.
/// The enum must have a `repr([int])` attribute.
///
/// This also implements `TryFrom<[int]>` for the given `repr`, `Into<[int]>`, `Into<Variant>`, and `Default`
/// if a variant is labeled with `#[opcua(default)]`
pub fn derive_ua_enum(item: TokenStream) -> TokenStream {
    match generate_encoding_impl(parse_macro_input!(item), EncodingToImpl::UaEnum) {
        Ok(r) => r.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[proc_macro_derive(XmlEncodable, attributes(opcua))]
/// Derive the `XmlEncodable` trait on this struct or enum, creating
/// code to write the struct as OPC UA XML.
///
/// Each field is written as a child element named after the field in `PascalCase`,
/// unless renamed with `opcua(rename = "...")`. Absent optional fields are skipped.
pub fn derive_xml_encodable(item: TokenStream) -> TokenStream {
    match generate_encoding_impl(parse_macro_input!(item), EncodingToImpl::XmlEncode) {
        Ok(r) => r.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[proc_macro_derive(XmlDecodable, attributes(opcua))]
/// Derive the `XmlDecodable` trait on this struct or enum, creating
/// code to read the struct from an OPC UA XML stream.
///
/// Unknown child elements are skipped, missing ones take their default value.
pub fn derive_xml_decodable(item: TokenStream) -> TokenStream {
    match generate_encoding_impl(parse_macro_input!(item), EncodingToImpl::XmlDecode) {
        Ok(r) => r.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[proc_macro_derive(XmlType, attributes(opcua))]
/// Derive the `XmlType` trait on this struct or enum. This simply exposes
/// the type name, which can be overridden with an item-level `opcua(rename = ...)` attribute.
pub fn derive_xml_type(item: TokenStream) -> TokenStream {
    match generate_encoding_impl(parse_macro_input!(item), EncodingToImpl::XmlType) {
        Ok(r) => r.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[proc_macro_derive(UaType, attributes(opcua))]
/// Derive the `UaType` marker trait, which lets a structure be stored
/// in an `ExtensionObject` and looked up in the type registry by its Rust type.
pub fn derive_ua_type(item: TokenStream) -> TokenStream {
    match generate_encoding_impl(parse_macro_input!(item), EncodingToImpl::UaType) {
        Ok(r) => r.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[proc_macro_attribute]
/// Derive all the standard encoding traits on this struct or enum.
/// This will derive `BinaryEncodable`, `BinaryDecodable`, `XmlEncodable`, `XmlDecodable`
/// and `XmlType`, plus `UaType` on structs and `UaEnum` on simple enums.
///
/// Normal attributes for those still apply.
pub fn ua_encodable(_attr: TokenStream, item: TokenStream) -> TokenStream {
    match derive_all_inner(parse_macro_input!(item)) {
        Ok(r) => r.into(),
        Err(e) => e.to_compile_error().into(),
    }
}
