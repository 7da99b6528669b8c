// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `ExtensionObject`.

use std::{
    any::Any,
    fmt,
    io::{Cursor, Read, Write},
};

use log::warn;

use crate::{
    encoding::{read_u8, write_i32, write_u8, BinaryDecodable, BinaryEncodable, EncodingResult},
    type_registry::{TypeRegistry, TypeTag, UaType},
    xml::{XmlEncodable, XmlStreamWriter, XmlType},
    ByteString, Context, Error, NodeId, XmlElement,
};

/// A structure that can be stored in an `ExtensionObject` and encoded without
/// knowing its concrete type.
///
/// Implemented for anything that implements [`BinaryEncodable`],
/// [`XmlEncodable`], [`XmlType`], [`UaType`], `Debug`, `Clone` and
/// `PartialEq`, which the `ua_encodable` attribute derives.
pub trait DynEncodable: Any + Send + Sync + fmt::Debug {
    /// Encode the value using OPC UA binary encoding.
    fn encode_binary(&self, stream: &mut dyn Write, ctx: &Context<'_>) -> EncodingResult<()>;

    /// Binary byte length of the value.
    fn byte_len_dyn(&self, ctx: &Context<'_>) -> usize;

    /// Encode the content of the value using OPC UA XML encoding.
    fn encode_xml(
        &self,
        stream: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()>;

    /// Element name of the value in XML.
    fn xml_tag_name(&self) -> &str;

    /// Tag identifying the registry entry of the value.
    fn dyn_type_tag(&self) -> TypeTag;

    /// Cast to a `dyn Any` box, for downcasting.
    fn as_dyn_any(self: Box<Self>) -> Box<dyn Any + Send + Sync + 'static>;

    /// Cast to a `dyn Any` reference, for downcasting.
    fn as_dyn_any_ref(&self) -> &(dyn Any + Send + Sync);

    /// Deep copy into a new box.
    fn clone_box(&self) -> Box<dyn DynEncodable>;

    /// `true` if `other` has the same type and compares equal.
    fn dyn_eq(&self, other: &dyn DynEncodable) -> bool;

    /// Rust type name, for diagnostics.
    fn type_name(&self) -> &'static str;
}

impl<T> DynEncodable for T
where
    T: BinaryEncodable
        + XmlEncodable
        + XmlType
        + UaType
        + fmt::Debug
        + Send
        + Sync
        + Clone
        + PartialEq
        + 'static,
{
    fn encode_binary(&self, stream: &mut dyn Write, ctx: &Context<'_>) -> EncodingResult<()> {
        BinaryEncodable::encode(self, stream, ctx)
    }

    fn byte_len_dyn(&self, ctx: &Context<'_>) -> usize {
        BinaryEncodable::byte_len(self, ctx)
    }

    fn encode_xml(
        &self,
        stream: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        XmlEncodable::encode(self, stream, ctx)
    }

    fn xml_tag_name(&self) -> &str {
        XmlType::tag(self)
    }

    fn dyn_type_tag(&self) -> TypeTag {
        UaType::type_tag(self)
    }

    fn as_dyn_any(self: Box<Self>) -> Box<dyn Any + Send + Sync + 'static> {
        self
    }

    fn as_dyn_any_ref(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn clone_box(&self) -> Box<dyn DynEncodable> {
        Box::new(self.clone())
    }

    fn dyn_eq(&self, other: &dyn DynEncodable) -> bool {
        other
            .as_dyn_any_ref()
            .downcast_ref::<Self>()
            .is_some_and(|o| o == self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl PartialEq for dyn DynEncodable {
    fn eq(&self, other: &dyn DynEncodable) -> bool {
        self.dyn_eq(other)
    }
}

impl Clone for Box<dyn DynEncodable> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Body of an `ExtensionObject`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExtensionObjectBody {
    /// No body.
    #[default]
    Empty,
    /// Binary encoded body of a type this build cannot decode, kept verbatim.
    Binary(ByteString),
    /// XML encoded body, kept verbatim.
    Xml(XmlElement),
    /// A decoded value.
    Decoded(Box<dyn DynEncodable>),
}

/// A structured value together with the id of its type. Bodies of types that
/// are not in the type registry are carried as raw bytes so they can be
/// relayed unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtensionObject {
    /// Encoding id of the body, or data type id for a decoded body that has
    /// not been through a codec yet.
    pub type_id: NodeId,
    /// The body.
    pub body: ExtensionObjectBody,
}

impl fmt::Display for ExtensionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            ExtensionObjectBody::Empty => write!(f, "ExtensionObject(null)"),
            ExtensionObjectBody::Binary(b) => {
                write!(f, "ExtensionObject({}, {} bytes)", self.type_id, b.len())
            }
            ExtensionObjectBody::Xml(_) => write!(f, "ExtensionObject({}, xml)", self.type_id),
            ExtensionObjectBody::Decoded(v) => {
                write!(f, "ExtensionObject({}, {})", self.type_id, v.type_name())
            }
        }
    }
}

impl ExtensionObject {
    /// An extension object with no body.
    pub fn null() -> Self {
        Self::default()
    }

    /// `true` if there is no body.
    pub fn is_null(&self) -> bool {
        matches!(self.body, ExtensionObjectBody::Empty)
    }

    /// Wrap `value`, taking the type id from the core registry.
    pub fn from_message<T: DynEncodable>(value: T) -> Self {
        Self::from_message_in(value, &TypeRegistry::core())
    }

    /// Wrap `value`, taking the type id from `registry`. The type id stays
    /// null if the type is not registered, and such an object cannot be
    /// encoded.
    pub fn from_message_in<T: DynEncodable>(value: T, registry: &TypeRegistry) -> Self {
        Self::from_dyn(Box::new(value), registry)
    }

    /// Wrap a boxed value, taking the type id from `registry`.
    pub fn from_dyn(value: Box<dyn DynEncodable>, registry: &TypeRegistry) -> Self {
        let type_id = registry
            .ids_for(value.as_ref())
            .map(|ids| ids.binary.clone())
            .unwrap_or_default();
        Self {
            type_id,
            body: ExtensionObjectBody::Decoded(value),
        }
    }

    /// A raw binary body.
    pub fn from_binary(type_id: NodeId, body: impl Into<ByteString>) -> Self {
        Self {
            type_id,
            body: ExtensionObjectBody::Binary(body.into()),
        }
    }

    /// A raw XML body.
    pub fn from_xml(type_id: NodeId, body: impl Into<XmlElement>) -> Self {
        Self {
            type_id,
            body: ExtensionObjectBody::Xml(body.into()),
        }
    }

    /// The decoded body, if it has type `T`.
    pub fn inner_as<T: Any>(&self) -> Option<&T> {
        match &self.body {
            ExtensionObjectBody::Decoded(v) => v.as_dyn_any_ref().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Take the decoded body, if it has type `T`.
    pub fn into_inner_as<T: Any>(self) -> Option<Box<T>> {
        match self.body {
            ExtensionObjectBody::Decoded(v) => v.as_dyn_any().downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Type tag of the decoded body.
    pub fn inner_type_tag(&self) -> Option<TypeTag> {
        match &self.body {
            ExtensionObjectBody::Decoded(v) => Some(v.dyn_type_tag()),
            _ => None,
        }
    }

    /// The id written on the binary wire. Decoded bodies use the binary
    /// encoding id from the registry.
    fn binary_type_id<'a>(&'a self, ctx: &Context<'a>) -> &'a NodeId {
        if let ExtensionObjectBody::Decoded(v) = &self.body {
            if let Some(ids) = ctx.registry().ids_for(v.as_ref()) {
                return &ids.binary;
            }
        }
        &self.type_id
    }

    /// The id written in XML. Decoded bodies use the XML encoding id from
    /// the registry.
    fn xml_type_id<'a>(&'a self, ctx: &Context<'a>) -> &'a NodeId {
        if let ExtensionObjectBody::Decoded(v) = &self.body {
            if let Some(ids) = ctx.registry().ids_for(v.as_ref()) {
                return &ids.xml;
            }
        }
        &self.type_id
    }
}

impl BinaryEncodable for ExtensionObject {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut size = self.binary_type_id(ctx).byte_len(ctx) + 1;
        size += match &self.body {
            ExtensionObjectBody::Empty => 0,
            ExtensionObjectBody::Binary(b) => b.byte_len(ctx),
            ExtensionObjectBody::Xml(x) => x.byte_len(ctx),
            ExtensionObjectBody::Decoded(v) => 4 + v.byte_len_dyn(ctx),
        };
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
        BinaryEncodable::encode(self.binary_type_id(ctx), stream, ctx)?;
        match &self.body {
            ExtensionObjectBody::Empty => write_u8(stream, 0x0),
            ExtensionObjectBody::Binary(b) => {
                write_u8(stream, 0x1)?;
                BinaryEncodable::encode(b, stream, ctx)
            }
            ExtensionObjectBody::Xml(x) => {
                write_u8(stream, 0x2)?;
                BinaryEncodable::encode(x, stream, ctx)
            }
            ExtensionObjectBody::Decoded(v) => {
                if ctx.registry().ids_for(v.as_ref()).is_none() && self.type_id.is_null() {
                    return Err(Error::encoding(format!(
                        "ExtensionObject body of type {} has no type id",
                        v.type_name()
                    )));
                }
                write_u8(stream, 0x1)?;
                write_i32(stream, v.byte_len_dyn(ctx) as i32)?;
                let mut writer: &mut S = stream;
                v.encode_binary(&mut writer, ctx)
            }
        }
    }
}

impl BinaryDecodable for ExtensionObject {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self> {
        let _depth_lock = ctx.options().depth_lock()?;
        let type_id = NodeId::decode(stream, ctx)?;
        let encoding = read_u8(stream)?;
        let body = match encoding {
            0x0 => ExtensionObjectBody::Empty,
            0x1 => {
                let bytes = ByteString::decode(stream, ctx)?;
                let decoded = match (&bytes.value, ctx.registry().by_binary_id(&type_id)) {
                    (Some(data), Some(entry)) => {
                        let mut cursor = Cursor::new(data.as_slice());
                        let value = entry
                            .decode_binary(&mut cursor, ctx)
                            .map_err(|e| e.with_context(format!("body of {}", entry.name())))?;
                        let consumed = cursor.position() as usize;
                        if consumed < data.len() {
                            // Re-encoding the value would drop the extra bytes.
                            warn!(
                                "ExtensionObject body of {} has {} trailing bytes, keeping it raw",
                                entry.name(),
                                data.len() - consumed
                            );
                            None
                        } else {
                            Some(value)
                        }
                    }
                    _ => None,
                };
                match decoded {
                    Some(value) => ExtensionObjectBody::Decoded(value),
                    None => ExtensionObjectBody::Binary(bytes),
                }
            }
            0x2 => ExtensionObjectBody::Xml(XmlElement::decode(stream, ctx)?),
            r => {
                return Err(Error::decoding(format!(
                    "Invalid encoding byte {r} in ExtensionObject {type_id}"
                )))
            }
        };
        Ok(ExtensionObject { type_id, body })
    }
}

mod xml {
    use std::io::{Cursor, Read, Write};

    use super::{ExtensionObject, ExtensionObjectBody};
    use crate::{xml::*, ByteString, Context, EncodingResult, Error, NodeId, XmlElement};

    impl XmlType for ExtensionObject {
        const TAG: &'static str = "ExtensionObject";
    }

    impl XmlEncodable for ExtensionObject {
        fn encode(
            &self,
            stream: &mut XmlStreamWriter<&mut dyn Write>,
            ctx: &Context<'_>,
        ) -> EncodingResult<()> {
            match &self.body {
                ExtensionObjectBody::Empty => {
                    if !self.type_id.is_null() {
                        stream.encode_child("TypeId", &self.type_id, ctx)?;
                    }
                }
                ExtensionObjectBody::Binary(b) => {
                    stream.encode_child("TypeId", &self.type_id, ctx)?;
                    stream.write_start("Body")?;
                    stream.encode_child(ByteString::TAG, b, ctx)?;
                    stream.write_end("Body")?;
                }
                ExtensionObjectBody::Xml(x) => {
                    stream.encode_child("TypeId", &self.type_id, ctx)?;
                    stream.encode_child("Body", x, ctx)?;
                }
                ExtensionObjectBody::Decoded(v) => {
                    stream.encode_child("TypeId", self.xml_type_id(ctx), ctx)?;
                    stream.write_start("Body")?;
                    let tag = v.xml_tag_name();
                    stream.write_start(tag)?;
                    v.encode_xml(stream, ctx)?;
                    stream.write_end(tag)?;
                    stream.write_end("Body")?;
                }
            }
            Ok(())
        }
    }

    impl XmlDecodable for ExtensionObject {
        fn decode(
            stream: &mut XmlStreamReader<&mut dyn Read>,
            ctx: &Context<'_>,
        ) -> EncodingResult<Self> {
            let _depth_lock = ctx.options().depth_lock()?;
            let mut type_id = NodeId::null();
            let mut raw_body = None;
            stream.iter_children(
                |key, stream, ctx| {
                    match key.as_str() {
                        "TypeId" => type_id = NodeId::decode(stream, ctx)?,
                        "Body" => raw_body = Some(stream.consume_raw()?),
                        _ => stream.skip_value()?,
                    }
                    Ok(())
                },
                ctx,
            )?;
            let Some(raw_body) = raw_body else {
                return Ok(ExtensionObject {
                    type_id,
                    body: ExtensionObjectBody::Empty,
                });
            };

            // The body is parsed a second time, now that the type id is known
            // regardless of element order.
            let mut cursor = Cursor::new(raw_body.as_slice());
            let mut reader = XmlStreamReader::with_limit(
                &mut cursor as &mut dyn Read,
                ctx.options().max_byte_string_length,
            );
            let body = match reader.next_start()? {
                None => ExtensionObjectBody::Empty,
                Some(tag) if tag == ByteString::TAG => {
                    let bytes = ByteString::decode(&mut reader, ctx)?;
                    let decoded = match (&bytes.value, ctx.registry().by_binary_id(&type_id)) {
                        (Some(data), Some(entry)) => {
                            let mut data = Cursor::new(data.as_slice());
                            Some(entry.decode_binary(&mut data, ctx)?)
                        }
                        _ => None,
                    };
                    match decoded {
                        Some(v) => ExtensionObjectBody::Decoded(v),
                        None => ExtensionObjectBody::Binary(bytes),
                    }
                }
                Some(tag) => match ctx.registry().decode_xml(&type_id, &mut reader, ctx) {
                    Some(value) => ExtensionObjectBody::Decoded(
                        value.map_err(|e| e.with_context(format!("body {tag}")))?,
                    ),
                    None => ExtensionObjectBody::Xml(XmlElement::from(
                        String::from_utf8(raw_body.clone()).map_err(Error::decoding)?,
                    )),
                },
            };
            Ok(ExtensionObject { type_id, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{ExtensionObject, ExtensionObjectBody};
    use crate::{
        xml::{from_xml_str, to_xml_string},
        BinaryDecodable, BinaryEncodable, ByteString, ChannelSecurityToken, ContextOwned,
        DecodingOptions, NodeId, ObjectId, ReadValueId, StatusCode, UAString,
    };

    fn round_trip(eo: &ExtensionObject, ctx: &crate::Context<'_>) -> (Vec<u8>, ExtensionObject) {
        let buf = eo.encode_to_vec(ctx).unwrap();
        assert_eq!(buf.len(), eo.byte_len(ctx));
        let decoded = ExtensionObject::decode(&mut Cursor::new(&buf), ctx).unwrap();
        (buf, decoded)
    }

    #[test]
    fn null_object() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        let (buf, decoded) = round_trip(&ExtensionObject::null(), &ctx);
        assert_eq!(buf, vec![0x0, 0x0, 0x0]);
        assert!(decoded.is_null());
    }

    #[test]
    fn unregistered_passthrough() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        let eo = ExtensionObject::from_binary(NodeId::new(3, 9999u32), vec![1u8, 2, 3, 4, 5]);
        let (buf, decoded) = round_trip(&eo, &ctx);
        assert_eq!(decoded, eo);
        assert_eq!(decoded.encode_to_vec(&ctx).unwrap(), buf);

        // A null body is distinct from an empty one.
        let eo = ExtensionObject::from_binary(NodeId::new(3, 9999u32), ByteString::null());
        let (_, decoded) = round_trip(&eo, &ctx);
        assert_eq!(decoded, eo);
        let eo = ExtensionObject::from_binary(NodeId::new(3, 9999u32), Vec::<u8>::new());
        let (_, decoded) = round_trip(&eo, &ctx);
        assert_eq!(decoded, eo);
    }

    #[test]
    fn registered_body_is_decoded() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        let token = ChannelSecurityToken {
            channel_id: 1,
            token_id: 2,
            created_at: crate::DateTime::from_ticks(5),
            revised_lifetime: 60_000,
        };
        let eo = ExtensionObject::from_message(token.clone());
        assert!(!eo.type_id.is_null());
        let (_, decoded) = round_trip(&eo, &ctx);
        assert_eq!(decoded, eo);
        assert_eq!(decoded.inner_as::<ChannelSecurityToken>(), Some(&token));
        assert!(decoded.inner_as::<ReadValueId>().is_none());
        assert_eq!(*decoded.into_inner_as::<ChannelSecurityToken>().unwrap(), token);
    }

    #[test]
    fn body_with_trailing_bytes_stays_raw() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        let token = ChannelSecurityToken {
            channel_id: 1,
            token_id: 2,
            created_at: crate::DateTime::from_ticks(5),
            revised_lifetime: 60_000,
        };
        let mut body = token.encode_to_vec(&ctx).unwrap();
        body.extend_from_slice(&[0xAB, 0xCD]);
        let eo = ExtensionObject::from_binary(
            ObjectId::ChannelSecurityToken_Encoding_DefaultBinary.into(),
            body,
        );
        let (buf, decoded) = round_trip(&eo, &ctx);
        assert!(matches!(decoded.body, ExtensionObjectBody::Binary(_)));
        assert_eq!(decoded, eo);
        assert_eq!(decoded.encode_to_vec(&ctx).unwrap(), buf);
    }

    #[test]
    fn truncated_body() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        let eo = ExtensionObject::from_binary(NodeId::new(3, 1u32), vec![0u8; 16]);
        let mut buf = eo.encode_to_vec(&ctx).unwrap();
        buf.truncate(buf.len() - 4);
        let err = ExtensionObject::decode(&mut Cursor::new(&buf), &ctx).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadDecodingError);

        // A length far beyond the buffer fails without allocating it.
        let mut buf = NodeId::new(3, 1u32).encode_to_vec(&ctx).unwrap();
        buf.push(0x1);
        buf.extend_from_slice(&(i32::MAX - 1).to_le_bytes());
        let ctx_owned = ContextOwned::new_default(
            Default::default(),
            DecodingOptions {
                max_byte_string_length: usize::MAX,
                ..Default::default()
            },
        );
        assert!(ExtensionObject::decode(&mut Cursor::new(&buf), &ctx_owned.context()).is_err());
    }

    #[test]
    fn bad_encoding_byte() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        let buf = vec![0x0, 0x0, 0x3];
        assert!(ExtensionObject::decode(&mut Cursor::new(&buf), &ctx).is_err());
    }

    #[test]
    fn xml_forms() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();

        let eo = ExtensionObject::from_binary(NodeId::new(2, 5u32), vec![1u8, 2, 3]);
        let xml = to_xml_string(&eo, &ctx).unwrap();
        assert_eq!(
            xml,
            "<ExtensionObject><TypeId><Identifier>ns=2;i=5</Identifier></TypeId>\
             <Body><ByteString>AQID</ByteString></Body></ExtensionObject>"
        );
        assert_eq!(from_xml_str::<ExtensionObject>(&xml, &ctx).unwrap(), eo);

        let xml = "<ExtensionObject><TypeId><Identifier>ns=2;i=6</Identifier></TypeId>\
                   <Body><Custom><A>1</A></Custom></Body></ExtensionObject>";
        let eo = from_xml_str::<ExtensionObject>(xml, &ctx).unwrap();
        let ExtensionObjectBody::Xml(raw) = &eo.body else {
            panic!("expected raw xml, got {eo:?}");
        };
        assert_eq!(raw.as_str(), "<Custom><A>1</A></Custom>");
        assert_eq!(to_xml_string(&eo, &ctx).unwrap(), xml);

        let rvi = ReadValueId {
            node_id: NodeId::new(1, "x"),
            attribute_id: 13,
            index_range: UAString::from("1:2"),
            data_encoding: Default::default(),
        };
        let eo = ExtensionObject::from_message(rvi.clone());
        let xml = to_xml_string(&eo, &ctx).unwrap();
        assert!(xml.contains("<Body><ReadValueId>"), "{xml}");
        let decoded = from_xml_str::<ExtensionObject>(&xml, &ctx).unwrap();
        assert_eq!(decoded.inner_as::<ReadValueId>(), Some(&rvi));
    }
}
