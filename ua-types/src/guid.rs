// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `Guid`.

use std::{
    fmt,
    io::{Read, Write},
    str::FromStr,
};

use uuid::Uuid;

use crate::{
    encoding::*,
    xml::{XmlDecodable, XmlEncodable, XmlReadExt, XmlStreamReader, XmlStreamWriter, XmlType},
    Context, DecodingOptions, Error,
};

/// A 16 byte globally unique identifier.
#[derive(Eq, PartialEq, Clone, Copy, Hash, PartialOrd, Ord, Default)]
pub struct Guid {
    uuid: Uuid,
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid.hyphenated())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid.hyphenated())
    }
}

// Data1, Data2 and Data3 are little-endian on the wire, Data4 is a byte array.
impl SimpleBinaryEncodable for Guid {
    fn byte_len(&self) -> usize {
        16
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        process_encode_io_result(stream.write_all(&self.uuid.to_bytes_le()))
    }
}

impl SimpleBinaryDecodable for Guid {
    fn decode<S: Read + ?Sized>(stream: &mut S, _: &DecodingOptions) -> EncodingResult<Self> {
        let mut bytes = [0u8; 16];
        read_bytes(stream, &mut bytes)?;
        Ok(Guid {
            uuid: Uuid::from_bytes_le(bytes),
        })
    }
}

impl XmlType for Guid {
    const TAG: &'static str = "Guid";
}

impl XmlEncodable for Guid {
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        _ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        writer.write_text_element("String", &self.to_string())?;
        Ok(())
    }
}

impl XmlDecodable for Guid {
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, ctx: &Context<'_>) -> EncodingResult<Self> {
        let s: Option<String> = read.decode_single_child("String", ctx)?;
        match s {
            Some(s) => Guid::from_str(&s).map_err(Error::decoding),
            None => Ok(Guid::null()),
        }
    }
}

impl FromStr for Guid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(|uuid| Guid { uuid })
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Self { uuid }
    }
}

impl Guid {
    /// The nil guid.
    pub fn null() -> Guid {
        Guid { uuid: Uuid::nil() }
    }

    /// A random v4 guid.
    pub fn new() -> Guid {
        Guid {
            uuid: Uuid::new_v4(),
        }
    }

    /// `true` if this is the nil guid.
    pub fn is_null(&self) -> bool {
        self.uuid.is_nil()
    }

    /// Bytes in RFC 4122 order.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.uuid.as_bytes()
    }

    /// Create from bytes in RFC 4122 order.
    pub fn from_bytes(bytes: [u8; 16]) -> Guid {
        Guid {
            uuid: Uuid::from_bytes(bytes),
        }
    }
}
