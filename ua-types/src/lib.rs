// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

#![warn(missing_docs)]

//! Builtin OPC UA types, their binary and XML encodings, and the type
//! registry through which `ExtensionObject` bodies are decoded.
//!
//! Every encode and decode call takes a [`Context`], which carries the
//! namespace table, the [`TypeRegistry`] and the [`DecodingOptions`] limiting
//! what an untrusted peer may make the decoder allocate.

// Derived code refers to this crate as `ua_types`.
extern crate self as ua_types;

/// Default limits applied when decoding.
pub mod constants {
    /// Maximum message size in bytes.
    pub const MAX_MESSAGE_SIZE: usize = 65535 * 8;
    /// Maximum length of a string in bytes.
    pub const MAX_STRING_LENGTH: usize = 65535;
    /// Maximum length of a byte string in bytes.
    pub const MAX_BYTE_STRING_LENGTH: usize = 65535;
    /// Maximum number of elements in an array.
    pub const MAX_ARRAY_LENGTH: usize = 100_000;
    /// Maximum nesting of variants, data values, diagnostic infos and
    /// extension objects.
    pub const MAX_DECODING_DEPTH: u64 = 50;
}

mod byte_string;
mod context;
pub mod custom;
mod data_change;
mod data_value;
mod date_time;
mod diagnostic_info;
mod encoding;
mod expanded_node_id;
mod extension_object;
mod guid;
mod impls;
mod localized_text;
mod namespaces;
mod node_id;
pub mod node_ids;
mod numeric_range;
mod qualified_name;
mod request_header;
mod response_header;
mod service_types;
mod status_code;
mod string;
mod type_registry;
mod ua_enum;
mod variant;
pub mod xml;

#[cfg(test)]
mod tests;

pub use ua_macros::{
    ua_encodable, BinaryDecodable, BinaryEncodable, UaEnum, UaType, XmlDecodable, XmlEncodable,
    XmlType,
};

pub use self::{
    byte_string::ByteString,
    context::{Context, ContextOwned},
    custom::DynamicStructure,
    data_change::{Deadband, MonitoringFilter, ParsedDataChangeFilter},
    data_value::{DataValue, DataValueFlags},
    date_time::DateTime,
    diagnostic_info::{DiagnosticBits, DiagnosticInfo},
    encoding::{
        byte_len_array, check_length_prefix, process_decode_io_result, process_encode_io_result,
        read_bytes, read_exact_bounded, read_f32, read_f64, read_i16, read_i32, read_i64,
        read_u16, read_u32, read_u64, read_u8, skip_bytes, write_f32, write_f64, write_i16,
        write_i32, write_i64, write_u16, write_u32, write_u64, write_u8, BinaryDecodable,
        BinaryEncodable, DecodingOptions, DepthGauge, DepthLock, EncodingResult, Error,
        SimpleBinaryDecodable, SimpleBinaryEncodable,
    },
    expanded_node_id::ExpandedNodeId,
    extension_object::{DynEncodable, ExtensionObject, ExtensionObjectBody},
    guid::Guid,
    localized_text::LocalizedText,
    namespaces::{NamespaceMap, OPC_UA_NAMESPACE_URI},
    node_id::{Identifier, NodeId},
    node_ids::{DataTypeId, ObjectId},
    numeric_range::NumericRange,
    qualified_name::QualifiedName,
    request_header::RequestHeader,
    response_header::ResponseHeader,
    service_types::*,
    status_code::{StatusCode, StatusCodeSeverity},
    string::{UAString, XmlElement},
    type_registry::{
        BinaryDecodeFn, EncodingIds, MakeEmptyFn, RegistryError, TypeEntry, TypeRegistry,
        TypeRegistryBuilder, TypeTag, UaType, XmlDecodeFn,
    },
    ua_enum::UaEnum,
    variant::{Array, Variant, VariantScalarTypeId},
};
