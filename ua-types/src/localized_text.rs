// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the definition of `LocalizedText`.

use std::{
    fmt,
    io::{Read, Write},
};

use crate::{
    encoding::{BinaryDecodable, BinaryEncodable, EncodingResult},
    string::UAString,
    Context,
};

const LOCALE_BIT: u8 = 0x1;
const TEXT_BIT: u8 = 0x2;

/// Human readable text with an optional locale. Null and empty members are
/// both omitted from the binary stream.
#[derive(
    PartialEq,
    Eq,
    Default,
    Debug,
    Clone,
    Hash,
    crate::XmlEncodable,
    crate::XmlDecodable,
    crate::XmlType,
)]
pub struct LocalizedText {
    /// The locale, e.g. `en-US`.
    pub locale: UAString,
    /// The text in that locale.
    pub text: UAString,
}

impl From<&str> for LocalizedText {
    fn from(value: &str) -> Self {
        Self {
            locale: UAString::null(),
            text: UAString::from(value),
        }
    }
}

impl From<String> for LocalizedText {
    fn from(value: String) -> Self {
        Self {
            locale: UAString::null(),
            text: UAString::from(value),
        }
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl BinaryEncodable for LocalizedText {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut size = 1;
        if !self.locale.is_empty() {
            size += self.locale.byte_len(ctx);
        }
        if !self.text.is_empty() {
            size += self.text.byte_len(ctx);
        }
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
        let mut encoding_mask: u8 = 0;
        if !self.locale.is_empty() {
            encoding_mask |= LOCALE_BIT;
        }
        if !self.text.is_empty() {
            encoding_mask |= TEXT_BIT;
        }
        encoding_mask.encode(stream, ctx)?;
        if !self.locale.is_empty() {
            self.locale.encode(stream, ctx)?;
        }
        if !self.text.is_empty() {
            self.text.encode(stream, ctx)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for LocalizedText {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self> {
        let encoding_mask = u8::decode(stream, ctx)?;
        let locale = if encoding_mask & LOCALE_BIT != 0 {
            UAString::decode(stream, ctx)?
        } else {
            UAString::null()
        };
        let text = if encoding_mask & TEXT_BIT != 0 {
            UAString::decode(stream, ctx)?
        } else {
            UAString::null()
        };
        Ok(LocalizedText { locale, text })
    }
}

impl LocalizedText {
    /// Create from a locale and text.
    pub fn new(locale: &str, text: &str) -> LocalizedText {
        LocalizedText {
            locale: UAString::from(locale),
            text: UAString::from(text),
        }
    }

    /// Null locale and text.
    pub fn null() -> LocalizedText {
        LocalizedText {
            locale: UAString::null(),
            text: UAString::null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::LocalizedText;
    use crate::{BinaryDecodable, BinaryEncodable, ContextOwned};

    #[test]
    fn mask_omits_members() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        assert_eq!(LocalizedText::null().encode_to_vec(&ctx).unwrap(), [0]);
        let t = LocalizedText::from("hi");
        let buf = t.encode_to_vec(&ctx).unwrap();
        assert_eq!(buf, [2, 2, 0, 0, 0, b'h', b'i']);
        assert_eq!(LocalizedText::decode(&mut Cursor::new(buf), &ctx).unwrap(), t);

        let full = LocalizedText::new("en", "hi");
        let buf = full.encode_to_vec(&ctx).unwrap();
        assert_eq!(buf[0], 3);
        assert_eq!(LocalizedText::decode(&mut Cursor::new(buf), &ctx).unwrap(), full);
    }
}
