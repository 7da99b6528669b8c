// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `NodeId`.

use std::{
    fmt,
    io::{Read, Write},
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;

use crate::{
    byte_string::ByteString,
    encoding::{
        read_u16, read_u32, read_u8, write_u16, write_u32, write_u8, BinaryDecodable,
        BinaryEncodable, EncodingResult,
    },
    guid::Guid,
    status_code::StatusCode,
    string::UAString,
    Context, Error,
};

/// The kind of identifier: numeric, string, guid or opaque bytes.
#[derive(Eq, PartialEq, Clone, Debug, Hash, PartialOrd, Ord)]
pub enum Identifier {
    /// `i=123`
    Numeric(u32),
    /// `s=...`
    String(UAString),
    /// `g=...`
    Guid(Guid),
    /// `b=...`, base64.
    ByteString(ByteString),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(v) => write!(f, "i={v}"),
            Identifier::String(v) => write!(f, "s={v}"),
            Identifier::Guid(v) => write!(f, "g={v}"),
            Identifier::ByteString(v) => write!(f, "b={}", v.as_base64()),
        }
    }
}

impl FromStr for Identifier {
    type Err = StatusCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s.split_at_checked(2).ok_or(StatusCode::BadNodeIdInvalid)?;
        match k {
            "i=" => v.parse::<u32>().map(Identifier::from).ok(),
            "s=" => Some(UAString::from(v).into()),
            "g=" => Guid::from_str(v).map(Identifier::from).ok(),
            "b=" => ByteString::from_base64(v).map(Identifier::from),
            _ => None,
        }
        .ok_or(StatusCode::BadNodeIdInvalid)
    }
}

impl From<u32> for Identifier {
    fn from(v: u32) -> Self {
        Identifier::Numeric(v)
    }
}

impl From<&str> for Identifier {
    fn from(v: &str) -> Self {
        Identifier::String(UAString::from(v))
    }
}

impl From<String> for Identifier {
    fn from(v: String) -> Self {
        Identifier::String(UAString::from(v))
    }
}

impl From<UAString> for Identifier {
    fn from(v: UAString) -> Self {
        Identifier::String(v)
    }
}

impl From<Guid> for Identifier {
    fn from(v: Guid) -> Self {
        Identifier::Guid(v)
    }
}

impl From<ByteString> for Identifier {
    fn from(v: ByteString) -> Self {
        Identifier::ByteString(v)
    }
}

/// An identifier for a node in the address space of an OPC UA server, or for
/// a type or encoding.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord)]
pub struct NodeId {
    /// Namespace index.
    pub namespace: u16,
    /// Identifier within the namespace.
    pub identifier: Identifier,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};{}", self.namespace, self.identifier)
        } else {
            write!(f, "{}", self.identifier)
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId::null()
    }
}

impl BinaryEncodable for NodeId {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        match &self.identifier {
            Identifier::Numeric(value) => {
                if self.namespace == 0 && *value <= 255 {
                    2
                } else if self.namespace <= 255 && *value <= 65535 {
                    4
                } else {
                    7
                }
            }
            Identifier::String(value) => 3 + value.byte_len(ctx),
            Identifier::Guid(value) => 3 + value.byte_len(ctx),
            Identifier::ByteString(value) => 3 + value.byte_len(ctx),
        }
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
        self.encode_with_flags(0, stream, ctx)
    }
}

impl NodeId {
    /// Write the node id with `flags` or-ed into the encoding byte. Used by
    /// `ExpandedNodeId`, which keeps its own flags in the upper bits.
    pub(crate) fn encode_with_flags<S: Write + ?Sized>(
        &self,
        flags: u8,
        stream: &mut S,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        match &self.identifier {
            Identifier::Numeric(value) => {
                if self.namespace == 0 && *value <= 255 {
                    // Two byte form.
                    write_u8(stream, flags)?;
                    write_u8(stream, *value as u8)
                } else if self.namespace <= 255 && *value <= 65535 {
                    // Four byte form.
                    write_u8(stream, flags | 0x1)?;
                    write_u8(stream, self.namespace as u8)?;
                    write_u16(stream, *value as u16)
                } else {
                    write_u8(stream, flags | 0x2)?;
                    write_u16(stream, self.namespace)?;
                    write_u32(stream, *value)
                }
            }
            Identifier::String(value) => {
                write_u8(stream, flags | 0x3)?;
                write_u16(stream, self.namespace)?;
                value.encode(stream, ctx)
            }
            Identifier::Guid(value) => {
                write_u8(stream, flags | 0x4)?;
                write_u16(stream, self.namespace)?;
                value.encode(stream, ctx)
            }
            Identifier::ByteString(value) => {
                write_u8(stream, flags | 0x5)?;
                write_u16(stream, self.namespace)?;
                value.encode(stream, ctx)
            }
        }
    }

    /// Decode a node id whose encoding byte has already been read. The upper
    /// bits of the byte are masked off by the caller.
    pub(crate) fn decode_with_encoding<S: Read + ?Sized>(
        encoding: u8,
        stream: &mut S,
        ctx: &Context<'_>,
    ) -> EncodingResult<Self> {
        let node_id = match encoding {
            0x0 => NodeId::new(0, u32::from(read_u8(stream)?)),
            0x1 => {
                let namespace = read_u8(stream)?;
                NodeId::new(u16::from(namespace), u32::from(read_u16(stream)?))
            }
            0x2 => {
                let namespace = read_u16(stream)?;
                NodeId::new(namespace, read_u32(stream)?)
            }
            0x3 => {
                let namespace = read_u16(stream)?;
                NodeId::new(namespace, UAString::decode(stream, ctx)?)
            }
            0x4 => {
                let namespace = read_u16(stream)?;
                NodeId::new(namespace, Guid::decode(stream, ctx)?)
            }
            0x5 => {
                let namespace = read_u16(stream)?;
                NodeId::new(namespace, ByteString::decode(stream, ctx)?)
            }
            r => {
                return Err(Error::decoding(format!(
                    "Unrecognized node id encoding {r}"
                )));
            }
        };
        Ok(node_id)
    }
}

impl BinaryDecodable for NodeId {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self> {
        let encoding = read_u8(stream)?;
        Self::decode_with_encoding(encoding, stream, ctx)
    }
}

mod xml {
    use std::{
        io::{Read, Write},
        str::FromStr,
    };

    use super::NodeId;
    use crate::{xml::*, Context, EncodingResult, Error};

    impl XmlType for NodeId {
        const TAG: &'static str = "NodeId";
    }

    impl XmlEncodable for NodeId {
        fn encode(
            &self,
            writer: &mut XmlStreamWriter<&mut dyn Write>,
            ctx: &Context<'_>,
        ) -> EncodingResult<()> {
            writer.encode_child("Identifier", &self.to_string(), ctx)
        }
    }

    impl XmlDecodable for NodeId {
        fn decode(
            read: &mut XmlStreamReader<&mut dyn Read>,
            ctx: &Context<'_>,
        ) -> EncodingResult<Self> {
            let val: Option<String> = read.decode_single_child("Identifier", ctx)?;
            let Some(val) = val else {
                return Ok(NodeId::null());
            };
            NodeId::from_str(&val).map_err(|e| Error::new(e, format!("Invalid node ID: {val}")))
        }
    }
}

static NODE_ID_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(ns=(?P<ns>[0-9]+);)?(?P<t>[isgb]=.+)$"));

impl FromStr for NodeId {
    type Err = StatusCode;

    /// Parse the text form `ns=<index>;<type>=<value>`, where the namespace
    /// part is omitted for namespace 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let re = NODE_ID_RE
            .as_ref()
            .map_err(|_| StatusCode::BadNodeIdInvalid)?;
        let captures = re.captures(s).ok_or(StatusCode::BadNodeIdInvalid)?;

        let namespace = match captures.name("ns") {
            Some(ns) => ns
                .as_str()
                .parse::<u16>()
                .map_err(|_| StatusCode::BadNodeIdInvalid)?,
            None => 0,
        };
        let t = captures.name("t").ok_or(StatusCode::BadNodeIdInvalid)?;
        Identifier::from_str(t.as_str()).map(|t| NodeId::new(namespace, t))
    }
}

impl From<(u16, u32)> for NodeId {
    fn from(v: (u16, u32)) -> Self {
        Self::new(v.0, v.1)
    }
}

impl<'a> From<(u16, &'a str)> for NodeId {
    fn from(v: (u16, &'a str)) -> Self {
        Self::new(v.0, v.1)
    }
}

impl From<&NodeId> for NodeId {
    fn from(v: &NodeId) -> Self {
        v.clone()
    }
}

impl NodeId {
    /// Construct from anything that converts into an identifier.
    pub fn new<T>(namespace: u16, value: T) -> NodeId
    where
        T: Into<Identifier>,
    {
        NodeId {
            namespace,
            identifier: value.into(),
        }
    }

    /// The null node id, `i=0` in namespace 0.
    pub fn null() -> NodeId {
        NodeId::new(0, 0u32)
    }

    /// `true` if this is the null node id.
    pub fn is_null(&self) -> bool {
        self.namespace == 0 && self.identifier == Identifier::Numeric(0)
    }

    /// `true` if the identifier is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self.identifier, Identifier::Numeric(_))
    }

    /// Numeric value of the identifier, if numeric.
    pub fn as_u32(&self) -> Option<u32> {
        match &self.identifier {
            Identifier::Numeric(i) => Some(*i),
            _ => None,
        }
    }
}
