// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains `UAString` and `XmlElement`.

use std::{
    fmt,
    io::{Read, Write},
};

use crate::{
    encoding::{
        check_length_prefix, process_encode_io_result, read_exact_bounded, write_i32,
        EncodingResult,
    },
    read_i32,
    xml::{XmlDecodable, XmlEncodable, XmlStreamReader, XmlStreamWriter, XmlType},
    Context, DecodingOptions, Error, SimpleBinaryDecodable, SimpleBinaryEncodable,
};

/// The OPC UA String type. Null is distinct from empty, so the value is held
/// as an `Option<String>`.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default, PartialOrd, Ord)]
pub struct UAString {
    value: Option<String>,
}

impl fmt::Display for UAString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{value}"),
            None => write!(f, "[null]"),
        }
    }
}

impl SimpleBinaryEncodable for UAString {
    fn byte_len(&self) -> usize {
        4 + self.value.as_ref().map(|s| s.len()).unwrap_or_default()
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        match &self.value {
            Some(s) => {
                write_i32(stream, s.len() as i32)?;
                process_encode_io_result(stream.write_all(s.as_bytes()))
            }
            None => write_i32(stream, -1),
        }
    }
}

impl SimpleBinaryDecodable for UAString {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let len = read_i32(stream)?;
        let Some(len) = check_length_prefix(len, decoding_options.max_string_length, "String")?
        else {
            return Ok(UAString::null());
        };
        let buf = read_exact_bounded(stream, len)?;
        let value = String::from_utf8(buf)
            .map_err(|e| Error::decoding(format!("Decoded string was not valid UTF-8 - {e}")))?;
        Ok(UAString::from(value))
    }
}

impl XmlType for UAString {
    const TAG: &'static str = "String";
}

impl XmlEncodable for UAString {
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        _ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        if let Some(s) = &self.value {
            writer.write_text(s)?;
        }
        Ok(())
    }
}

impl XmlDecodable for UAString {
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, _ctx: &Context<'_>) -> EncodingResult<Self> {
        Ok(read.consume_as_text()?.into())
    }
}

impl AsRef<str> for UAString {
    fn as_ref(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

impl From<UAString> for String {
    fn from(value: UAString) -> Self {
        value.value.unwrap_or_default()
    }
}

impl From<&str> for UAString {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<&String> for UAString {
    fn from(value: &String) -> Self {
        Self::from(value.clone())
    }
}

impl From<String> for UAString {
    fn from(value: String) -> Self {
        UAString { value: Some(value) }
    }
}

impl From<Option<String>> for UAString {
    fn from(value: Option<String>) -> Self {
        UAString { value }
    }
}

impl PartialEq<str> for UAString {
    fn eq(&self, other: &str) -> bool {
        self.value.as_deref() == Some(other)
    }
}

impl PartialEq<&str> for UAString {
    fn eq(&self, other: &&str) -> bool {
        self.value.as_deref() == Some(*other)
    }
}

impl UAString {
    /// The null string.
    pub fn null() -> UAString {
        UAString { value: None }
    }

    /// Inner value, `None` when null.
    pub fn value(&self) -> &Option<String> {
        &self.value
    }

    /// `true` if the string is null.
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// `true` if the string is null or has no characters.
    pub fn is_empty(&self) -> bool {
        self.value.as_ref().map_or(true, |v| v.is_empty())
    }

    /// Length in bytes, or -1 if null.
    pub fn len(&self) -> isize {
        self.value.as_ref().map(|v| v.len() as isize).unwrap_or(-1)
    }
}

/// An XML fragment carried as a string. The content is not validated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement(UAString);

impl XmlElement {
    /// The null element.
    pub fn null() -> Self {
        Self(UAString::null())
    }

    /// Raw content of the element.
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    /// `true` if the element is null.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for XmlElement {
    fn from(value: String) -> Self {
        Self(UAString::from(value))
    }
}

impl From<&str> for XmlElement {
    fn from(value: &str) -> Self {
        Self(UAString::from(value))
    }
}

impl SimpleBinaryEncodable for XmlElement {
    fn byte_len(&self) -> usize {
        SimpleBinaryEncodable::byte_len(&self.0)
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        SimpleBinaryEncodable::encode(&self.0, stream)
    }
}

impl SimpleBinaryDecodable for XmlElement {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        Ok(Self(SimpleBinaryDecodable::decode(stream, decoding_options)?))
    }
}

impl XmlType for XmlElement {
    const TAG: &'static str = "XmlElement";
}

impl XmlEncodable for XmlElement {
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        _ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        writer.write_raw(self.as_str().as_bytes())?;
        Ok(())
    }
}

impl XmlDecodable for XmlElement {
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, _ctx: &Context<'_>) -> EncodingResult<Self> {
        let raw = read.consume_raw()?;
        Ok(Self::from(String::from_utf8(raw).map_err(Error::decoding)?))
    }
}
