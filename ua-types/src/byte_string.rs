// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `ByteString`.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{
    encoding::{
        check_length_prefix, process_encode_io_result, read_exact_bounded, read_i32, write_i32,
        EncodingResult,
    },
    xml::{XmlDecodable, XmlEncodable, XmlStreamReader, XmlStreamWriter, XmlType},
    Context, DecodingOptions, Error, SimpleBinaryDecodable, SimpleBinaryEncodable,
};

/// A sequence of octets. Null is distinct from empty.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default, PartialOrd, Ord)]
pub struct ByteString {
    /// Raw inner value, `None` when null.
    pub value: Option<Vec<u8>>,
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        self.value.as_deref().unwrap_or(&[])
    }
}

impl SimpleBinaryEncodable for ByteString {
    fn byte_len(&self) -> usize {
        4 + self.value.as_ref().map(|v| v.len()).unwrap_or_default()
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        match &self.value {
            Some(v) => {
                write_i32(stream, v.len() as i32)?;
                process_encode_io_result(stream.write_all(v))
            }
            None => write_i32(stream, -1),
        }
    }
}

impl SimpleBinaryDecodable for ByteString {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let len = read_i32(stream)?;
        match check_length_prefix(len, decoding_options.max_byte_string_length, "ByteString")? {
            None => Ok(ByteString::null()),
            Some(len) => Ok(ByteString {
                value: Some(read_exact_bounded(stream, len)?),
            }),
        }
    }
}

impl XmlType for ByteString {
    const TAG: &'static str = "ByteString";
}

impl XmlEncodable for ByteString {
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        _ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        if self.value.is_some() {
            writer.write_text(&self.as_base64())?;
        }
        Ok(())
    }
}

impl XmlDecodable for ByteString {
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, _ctx: &Context<'_>) -> EncodingResult<Self> {
        let s = read.consume_as_text()?;
        if s.is_empty() {
            return Ok(ByteString::null());
        }
        ByteString::from_base64_ignore_whitespace(s)
            .ok_or_else(|| Error::decoding("Cannot decode base64 bytestring"))
    }
}

impl<'a, T> From<&'a T> for ByteString
where
    T: AsRef<[u8]> + ?Sized,
{
    fn from(value: &'a T) -> Self {
        Self::from(value.as_ref().to_vec())
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(value: Vec<u8>) -> Self {
        ByteString { value: Some(value) }
    }
}

impl ByteString {
    /// The null byte string.
    pub fn null() -> ByteString {
        ByteString { value: None }
    }

    /// `true` if null.
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// `true` if non-null with zero length.
    pub fn is_empty(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is_empty())
    }

    /// `true` if null or empty.
    pub fn is_null_or_empty(&self) -> bool {
        self.is_null() || self.is_empty()
    }

    /// Length in bytes, 0 when null.
    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    /// Parse base64, ignoring whitespace.
    pub fn from_base64_ignore_whitespace(mut data: String) -> Option<ByteString> {
        data.retain(|c| !c.is_whitespace());
        Self::from_base64(&data)
    }

    /// Parse base64.
    pub fn from_base64(data: &str) -> Option<ByteString> {
        STANDARD.decode(data).ok().map(Self::from)
    }

    /// Base64 form of the bytes.
    pub fn as_base64(&self) -> String {
        STANDARD.encode(self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::ByteString;
    use crate::{BinaryDecodable, BinaryEncodable, ContextOwned};

    #[test]
    fn null_empty_and_value() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        for v in [
            ByteString::null(),
            ByteString::from(Vec::new()),
            ByteString::from(&[1u8, 2, 3]),
        ] {
            let buf = v.encode_to_vec(&ctx).unwrap();
            assert_eq!(buf.len(), v.byte_len(&ctx));
            let decoded = ByteString::decode(&mut Cursor::new(buf), &ctx).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn huge_length_on_short_buffer() {
        let ctx_owned = ContextOwned::default();
        let mut data = i32::MAX.to_le_bytes().to_vec();
        data.extend_from_slice(&[0u8; 8]);
        assert!(ByteString::decode(&mut Cursor::new(data), &ctx_owned.context()).is_err());
    }

    #[test]
    fn base64() {
        let v = ByteString::from(b"hello");
        assert_eq!(v.as_base64(), "aGVsbG8=");
        assert_eq!(
            ByteString::from_base64_ignore_whitespace("aGVs\n bG8=".to_owned()),
            Some(v)
        );
    }
}
