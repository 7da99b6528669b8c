// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `ExpandedNodeId`.

use std::{
    borrow::Cow,
    fmt,
    io::{Read, Write},
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;

use crate::{
    encoding::{read_u8, BinaryDecodable, BinaryEncodable, EncodingResult},
    namespaces::NamespaceMap,
    node_id::{Identifier, NodeId},
    status_code::StatusCode,
    string::UAString,
    Context,
};

const NAMESPACE_URI_FLAG: u8 = 0x80;
const SERVER_INDEX_FLAG: u8 = 0x40;

/// A NodeId that may name its namespace by URI instead of index, and may
/// live on another server.
#[derive(PartialEq, Eq, Clone, Debug, Hash, Default)]
pub struct ExpandedNodeId {
    /// The node id. Its namespace index is ignored when `namespace_uri` is set.
    pub node_id: NodeId,
    /// Namespace URI, null when the index in `node_id` applies.
    pub namespace_uri: UAString,
    /// Index of the server in the server table, 0 for the local server.
    pub server_index: u32,
}

impl BinaryEncodable for ExpandedNodeId {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut size = self.node_id.byte_len(ctx);
        if !self.namespace_uri.is_null() {
            size += self.namespace_uri.byte_len(ctx);
        }
        if self.server_index != 0 {
            size += self.server_index.byte_len(ctx);
        }
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
        let mut flags = 0;
        if !self.namespace_uri.is_null() {
            flags |= NAMESPACE_URI_FLAG;
        }
        if self.server_index != 0 {
            flags |= SERVER_INDEX_FLAG;
        }
        self.node_id.encode_with_flags(flags, stream, ctx)?;
        if !self.namespace_uri.is_null() {
            self.namespace_uri.encode(stream, ctx)?;
        }
        if self.server_index != 0 {
            self.server_index.encode(stream, ctx)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for ExpandedNodeId {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self> {
        let encoding = read_u8(stream)?;
        let node_id = NodeId::decode_with_encoding(encoding & 0x0f, stream, ctx)?;
        let namespace_uri = if encoding & NAMESPACE_URI_FLAG != 0 {
            UAString::decode(stream, ctx)?
        } else {
            UAString::null()
        };
        let server_index = if encoding & SERVER_INDEX_FLAG != 0 {
            u32::decode(stream, ctx)?
        } else {
            0
        };
        Ok(ExpandedNodeId {
            node_id,
            namespace_uri,
            server_index,
        })
    }
}

mod xml {
    use std::{
        io::{Read, Write},
        str::FromStr,
    };

    use super::ExpandedNodeId;
    use crate::{xml::*, Context, EncodingResult, Error};

    impl XmlType for ExpandedNodeId {
        const TAG: &'static str = "ExpandedNodeId";
    }

    impl XmlEncodable for ExpandedNodeId {
        fn encode(
            &self,
            writer: &mut XmlStreamWriter<&mut dyn Write>,
            ctx: &Context<'_>,
        ) -> EncodingResult<()> {
            writer.encode_child("Identifier", &self.to_string(), ctx)
        }
    }

    impl XmlDecodable for ExpandedNodeId {
        fn decode(
            read: &mut XmlStreamReader<&mut dyn Read>,
            ctx: &Context<'_>,
        ) -> EncodingResult<Self> {
            let val: Option<String> = read.decode_single_child("Identifier", ctx)?;
            let Some(val) = val else {
                return Ok(ExpandedNodeId::null());
            };
            ExpandedNodeId::from_str(&val)
                .map_err(|e| Error::new(e, format!("Invalid expanded node ID: {val}")))
        }
    }
}

impl fmt::Display for ExpandedNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.server_index != 0 {
            write!(f, "svr={};", self.server_index)?;
        }
        if self.namespace_uri.is_null() {
            write!(f, "{}", self.node_id)
        } else {
            // `%` and `;` are escaped in the uri.
            let namespace_uri = self
                .namespace_uri
                .as_ref()
                .replace('%', "%25")
                .replace(';', "%3b");
            write!(f, "nsu={};{}", namespace_uri, self.node_id.identifier)
        }
    }
}

static EXPANDED_NODE_ID_RE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^(svr=(?P<svr>[0-9]+);)?((ns=(?P<ns>[0-9]+)|nsu=(?P<nsu>[^;]+));)?(?P<t>[isgb]=.+)$",
    )
});

impl FromStr for ExpandedNodeId {
    type Err = StatusCode;

    /// Parse `svr=<index>;nsu=<uri>;<type>=<value>` or
    /// `svr=<index>;ns=<index>;<type>=<value>`. Both prefixes are optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let re = EXPANDED_NODE_ID_RE
            .as_ref()
            .map_err(|_| StatusCode::BadNodeIdInvalid)?;
        let captures = re.captures(s).ok_or(StatusCode::BadNodeIdInvalid)?;

        let server_index = match captures.name("svr") {
            Some(svr) => svr
                .as_str()
                .parse::<u32>()
                .map_err(|_| StatusCode::BadNodeIdInvalid)?,
            None => 0,
        };
        let namespace_uri = match captures.name("nsu") {
            Some(nsu) => UAString::from(nsu.as_str().replace("%3b", ";").replace("%25", "%")),
            None => UAString::null(),
        };
        let namespace = match captures.name("ns") {
            Some(ns) => ns
                .as_str()
                .parse::<u16>()
                .map_err(|_| StatusCode::BadNodeIdInvalid)?,
            None => 0,
        };
        let t = captures.name("t").ok_or(StatusCode::BadNodeIdInvalid)?;
        let identifier = Identifier::from_str(t.as_str())?;
        Ok(ExpandedNodeId {
            node_id: NodeId::new(namespace, identifier),
            namespace_uri,
            server_index,
        })
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(node_id: NodeId) -> Self {
        ExpandedNodeId {
            node_id,
            namespace_uri: UAString::null(),
            server_index: 0,
        }
    }
}

impl From<&NodeId> for ExpandedNodeId {
    fn from(value: &NodeId) -> Self {
        value.clone().into()
    }
}

impl From<(NodeId, &str)> for ExpandedNodeId {
    fn from(v: (NodeId, &str)) -> Self {
        ExpandedNodeId {
            node_id: v.0,
            namespace_uri: v.1.into(),
            server_index: 0,
        }
    }
}

impl ExpandedNodeId {
    /// The null expanded node id.
    pub fn null() -> ExpandedNodeId {
        NodeId::null().into()
    }

    /// `true` if the inner node id is null and nothing else is set.
    pub fn is_null(&self) -> bool {
        self.node_id.is_null() && self.namespace_uri.is_null() && self.server_index == 0
    }

    /// Resolve to a local node id. Fails if the id lives on another server,
    /// or its namespace uri is not in `namespaces`.
    pub fn try_resolve<'a>(&'a self, namespaces: &NamespaceMap) -> Option<Cow<'a, NodeId>> {
        if self.server_index != 0 {
            return None;
        }
        if self.namespace_uri.is_null() {
            return Some(Cow::Borrowed(&self.node_id));
        }
        let index = namespaces.get_index(self.namespace_uri.as_ref())?;
        Some(Cow::Owned(NodeId {
            namespace: index,
            identifier: self.node_id.identifier.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, str::FromStr};

    use super::ExpandedNodeId;
    use crate::{BinaryDecodable, BinaryEncodable, ContextOwned, NamespaceMap, NodeId};

    #[test]
    fn flags_in_encoding_byte() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        let id = ExpandedNodeId {
            node_id: NodeId::new(0, 5u32),
            namespace_uri: "urn:x".into(),
            server_index: 2,
        };
        let buf = id.encode_to_vec(&ctx).unwrap();
        assert_eq!(buf[0], 0xC0);
        assert_eq!(buf.len(), id.byte_len(&ctx));
        assert_eq!(ExpandedNodeId::decode(&mut Cursor::new(buf), &ctx).unwrap(), id);

        let plain = ExpandedNodeId::from(NodeId::new(0, 5u32));
        assert_eq!(plain.encode_to_vec(&ctx).unwrap(), [0x00, 5]);
    }

    #[test]
    fn text_form() {
        let id = ExpandedNodeId::from_str("svr=1;nsu=urn:a%3bb;s=Foo").unwrap();
        assert_eq!(id.server_index, 1);
        assert_eq!(id.namespace_uri, "urn:a;b");
        assert_eq!(id.node_id, NodeId::new(0, "Foo"));
        assert_eq!(id.to_string(), "svr=1;nsu=urn:a%3bb;s=Foo");

        let local = ExpandedNodeId::from_str("ns=2;i=10").unwrap();
        assert_eq!(local.node_id, NodeId::new(2, 10u32));
        assert_eq!(local.to_string(), "ns=2;i=10");
    }

    #[test]
    fn resolve() {
        let mut namespaces = NamespaceMap::new();
        let idx = namespaces.add_namespace("urn:test");
        let id = ExpandedNodeId::from((NodeId::new(0, 7u32), "urn:test"));
        assert_eq!(
            id.try_resolve(&namespaces).unwrap().into_owned(),
            NodeId::new(idx, 7u32)
        );
        let unknown = ExpandedNodeId::from((NodeId::new(0, 7u32), "urn:other"));
        assert!(unknown.try_resolve(&namespaces).is_none());
    }
}
