// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The OPC UA XML encoding.
//!
//! A value is written as the content of an element; the caller chooses the
//! element name. Structures write one child element per field.

mod builtins;
mod encoding;

use std::io::{Cursor, Read, Write};

pub use encoding::{XmlDecodable, XmlEncodable, XmlReadExt, XmlType, XmlWriteExt};
pub use ua_xml::{XmlReadError, XmlStreamReader, XmlStreamWriter, XmlWriteError};

use crate::{Context, EncodingResult, Error};

/// Encode `value` as a standalone element named after its type.
pub fn to_xml_string<T: XmlEncodable + XmlType + ?Sized>(
    value: &T,
    ctx: &Context<'_>,
) -> EncodingResult<String> {
    let mut buf = Vec::new();
    {
        let mut writer = XmlStreamWriter::new(&mut buf as &mut dyn Write);
        writer.encode_child(value.tag(), value, ctx)?;
    }
    String::from_utf8(buf).map_err(Error::encoding)
}

/// Decode a value from a document whose root element holds its content.
pub fn from_xml_str<T: XmlDecodable>(xml: &str, ctx: &Context<'_>) -> EncodingResult<T> {
    let mut cursor = Cursor::new(xml.as_bytes());
    let mut reader = XmlStreamReader::with_limit(
        &mut cursor as &mut dyn Read,
        ctx.options().max_string_length,
    );
    if reader.next_start()?.is_none() {
        return Err(Error::decoding("XML document has no root element"));
    }
    T::decode(&mut reader, ctx)
}
