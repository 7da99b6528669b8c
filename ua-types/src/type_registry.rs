// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The type registry: one table, built once, mapping the encoding ids of every
//! known structure to the functions that decode, encode and construct it.
//!
//! A registry is immutable once built. Extra types, including structures that
//! are only known at runtime, are added by building a new registry from a
//! [`TypeRegistryBuilder`] seeded with the core table.

use std::{
    any::TypeId,
    fmt,
    io::{Cursor, Read, Write},
    sync::{Arc, LazyLock},
};

use hashbrown::HashMap;
use log::error;
use thiserror::Error;

use crate::{
    custom::{DynamicStructure, StructureDefinition},
    encoding::{BinaryDecodable, EncodingResult},
    xml::{XmlDecodable, XmlStreamReader, XmlStreamWriter},
    Context, DynEncodable, Error, NodeId, StatusCode,
};

/// The pair of encoding ids under which a structure is sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodingIds {
    /// Id of the default binary encoding.
    pub binary: NodeId,
    /// Id of the default XML encoding.
    pub xml: NodeId,
}

impl EncodingIds {
    /// Encoding ids from arbitrary node ids.
    pub fn new(binary: impl Into<NodeId>, xml: impl Into<NodeId>) -> Self {
        Self {
            binary: binary.into(),
            xml: xml.into(),
        }
    }

    /// Numeric encoding ids in namespace 0.
    pub fn ns0(binary: u32, xml: u32) -> Self {
        Self::new((0, binary), (0, xml))
    }
}

/// Identifies the in-memory representation of a value stored in an
/// `ExtensionObject`, so it can be matched with its registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// A compiled Rust type.
    Rust(TypeId),
    /// A dynamic structure, named by its data type id.
    Structure(NodeId),
}

impl TypeTag {
    /// Tag of the Rust type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeTag::Rust(TypeId::of::<T>())
    }
}

/// A structure that can be stored in an `ExtensionObject` and found in the
/// type registry. Derive it with `#[derive(UaType)]`.
pub trait UaType: std::any::Any + Send + Sync {
    /// Tag used to look the value up in the registry.
    fn type_tag(&self) -> TypeTag {
        TypeTag::Rust(TypeId::of::<Self>())
    }
}

/// Decodes a registered type from a binary stream.
pub type BinaryDecodeFn = Arc<
    dyn Fn(&mut dyn Read, &Context<'_>) -> EncodingResult<Box<dyn DynEncodable>> + Send + Sync,
>;

/// Decodes a registered type from the element whose start tag was just read.
pub type XmlDecodeFn = Arc<
    dyn Fn(&mut XmlStreamReader<&mut dyn Read>, &Context<'_>) -> EncodingResult<Box<dyn DynEncodable>>
        + Send
        + Sync,
>;

/// Constructs the empty instance of a registered type.
pub type MakeEmptyFn = Arc<dyn Fn() -> Box<dyn DynEncodable> + Send + Sync>;

fn binary_decode_to_enc<T: DynEncodable + BinaryDecodable>(
    stream: &mut dyn Read,
    ctx: &Context<'_>,
) -> EncodingResult<Box<dyn DynEncodable>> {
    Ok(Box::new(<T as BinaryDecodable>::decode(stream, ctx)?))
}

fn xml_decode_to_enc<T: DynEncodable + XmlDecodable>(
    stream: &mut XmlStreamReader<&mut dyn Read>,
    ctx: &Context<'_>,
) -> EncodingResult<Box<dyn DynEncodable>> {
    Ok(Box::new(<T as XmlDecodable>::decode(stream, ctx)?))
}

fn make_empty<T: DynEncodable + Default>() -> Box<dyn DynEncodable> {
    Box::new(T::default())
}

/// One row of the registry.
#[derive(Clone)]
pub struct TypeEntry {
    name: String,
    tag: TypeTag,
    ids: EncodingIds,
    data_type_id: Option<NodeId>,
    decode_binary: BinaryDecodeFn,
    decode_xml: XmlDecodeFn,
    make_empty: MakeEmptyFn,
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("ids", &self.ids)
            .field("data_type_id", &self.data_type_id)
            .finish_non_exhaustive()
    }
}

impl TypeEntry {
    /// Name of the type, also its XML element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag of the in-memory representation.
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    /// Encoding ids.
    pub fn ids(&self) -> &EncodingIds {
        &self.ids
    }

    /// Data type id, if known.
    pub fn data_type_id(&self) -> Option<&NodeId> {
        self.data_type_id.as_ref()
    }

    /// Decode a value of this type from a binary stream.
    pub fn decode_binary(
        &self,
        stream: &mut dyn Read,
        ctx: &Context<'_>,
    ) -> EncodingResult<Box<dyn DynEncodable>> {
        (self.decode_binary)(stream, ctx)
    }

    /// Decode a value of this type from an XML stream.
    pub fn decode_xml(
        &self,
        stream: &mut XmlStreamReader<&mut dyn Read>,
        ctx: &Context<'_>,
    ) -> EncodingResult<Box<dyn DynEncodable>> {
        (self.decode_xml)(stream, ctx)
    }

    /// Empty instance of this type.
    pub fn make_empty(&self) -> Box<dyn DynEncodable> {
        (self.make_empty)()
    }
}

/// Reasons a type cannot be added to a registry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    /// Another type already uses this binary encoding id.
    #[error("binary encoding id {0} is already registered")]
    DuplicateBinaryId(NodeId),
    /// Another type already uses this XML encoding id.
    #[error("XML encoding id {0} is already registered")]
    DuplicateXmlId(NodeId),
    /// Another type already uses this data type id.
    #[error("data type id {0} is already registered")]
    DuplicateDataTypeId(NodeId),
    /// The Rust type or structure is already registered.
    #[error("type {0} is already registered")]
    DuplicateType(String),
}

/// Collects entries and freezes them into a [`TypeRegistry`].
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    registry: TypeRegistry,
}

impl TypeRegistryBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder holding every entry of the core table.
    pub fn with_core() -> Self {
        Self {
            registry: TypeRegistry::core().as_ref().clone(),
        }
    }

    /// Register the Rust type `T` under `ids`.
    pub fn register<T>(
        &mut self,
        name: &str,
        ids: EncodingIds,
        data_type_id: Option<NodeId>,
    ) -> Result<&mut Self, RegistryError>
    where
        T: DynEncodable + BinaryDecodable + XmlDecodable + Default,
    {
        self.insert(TypeEntry {
            name: name.to_owned(),
            tag: TypeTag::of::<T>(),
            ids,
            data_type_id,
            decode_binary: Arc::new(binary_decode_to_enc::<T>),
            decode_xml: Arc::new(xml_decode_to_enc::<T>),
            make_empty: Arc::new(make_empty::<T>),
        })?;
        Ok(self)
    }

    /// Register a structure known only at runtime. Its values are
    /// [`DynamicStructure`]s.
    pub fn register_structure(
        &mut self,
        definition: Arc<StructureDefinition>,
    ) -> Result<&mut Self, RegistryError> {
        let binary_def = definition.clone();
        let xml_def = definition.clone();
        let empty_def = definition.clone();
        self.insert(TypeEntry {
            name: definition.name.clone(),
            tag: TypeTag::Structure(definition.data_type_id.clone()),
            ids: definition.ids.clone(),
            data_type_id: Some(definition.data_type_id.clone()),
            decode_binary: Arc::new(move |stream: &mut dyn Read, ctx: &Context<'_>| {
                let value = DynamicStructure::decode_binary(binary_def.clone(), stream, ctx)?;
                Ok(Box::new(value) as Box<dyn DynEncodable>)
            }),
            decode_xml: Arc::new(
                move |stream: &mut XmlStreamReader<&mut dyn Read>, ctx: &Context<'_>| {
                    let value = DynamicStructure::decode_xml(xml_def.clone(), stream, ctx)?;
                    Ok(Box::new(value) as Box<dyn DynEncodable>)
                },
            ),
            make_empty: Arc::new(move || {
                Box::new(DynamicStructure::new_empty(empty_def.clone())) as Box<dyn DynEncodable>
            }),
        })?;
        Ok(self)
    }

    fn insert(&mut self, entry: TypeEntry) -> Result<(), RegistryError> {
        let reg = &mut self.registry;
        if reg.by_tag.contains_key(&entry.tag) {
            return Err(RegistryError::DuplicateType(entry.name));
        }
        if reg.by_binary.contains_key(&entry.ids.binary) {
            return Err(RegistryError::DuplicateBinaryId(entry.ids.binary));
        }
        if reg.by_xml.contains_key(&entry.ids.xml) {
            return Err(RegistryError::DuplicateXmlId(entry.ids.xml));
        }
        if let Some(dt) = &entry.data_type_id {
            if reg.by_data_type.contains_key(dt) {
                return Err(RegistryError::DuplicateDataTypeId(dt.clone()));
            }
        }

        let idx = reg.entries.len();
        reg.by_tag.insert(entry.tag.clone(), idx);
        reg.by_binary.insert(entry.ids.binary.clone(), idx);
        reg.by_xml.insert(entry.ids.xml.clone(), idx);
        if let Some(dt) = &entry.data_type_id {
            reg.by_data_type.insert(dt.clone(), idx);
        }
        reg.entries.push(entry);
        Ok(())
    }

    /// Freeze the collected entries.
    pub fn build(self) -> Arc<TypeRegistry> {
        Arc::new(self.registry)
    }
}

static CORE_REGISTRY: LazyLock<Arc<TypeRegistry>> = LazyLock::new(|| {
    let mut builder = TypeRegistryBuilder::new();
    if let Err(e) = crate::service_types::register_core_types(&mut builder) {
        error!("Failed to register core types: {e}");
    }
    builder.build()
});

/// Lookup table from encoding ids to codecs for structured types.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    by_binary: HashMap<NodeId, usize>,
    by_xml: HashMap<NodeId, usize>,
    by_tag: HashMap<TypeTag, usize>,
    by_data_type: HashMap<NodeId, usize>,
}

impl TypeRegistry {
    /// The process-wide table of types the runtime itself uses.
    pub fn core() -> Arc<TypeRegistry> {
        CORE_REGISTRY.clone()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &TypeEntry> {
        self.entries.iter()
    }

    /// Entry for a binary encoding id.
    pub fn by_binary_id(&self, id: &NodeId) -> Option<&TypeEntry> {
        self.by_binary.get(id).map(|i| &self.entries[*i])
    }

    /// Entry for an XML encoding id.
    pub fn by_xml_id(&self, id: &NodeId) -> Option<&TypeEntry> {
        self.by_xml.get(id).map(|i| &self.entries[*i])
    }

    /// Entry for a data type id.
    pub fn by_data_type_id(&self, id: &NodeId) -> Option<&TypeEntry> {
        self.by_data_type.get(id).map(|i| &self.entries[*i])
    }

    /// Entry for an in-memory representation.
    pub fn by_tag(&self, tag: &TypeTag) -> Option<&TypeEntry> {
        self.by_tag.get(tag).map(|i| &self.entries[*i])
    }

    /// Encoding ids of a value, if its type is registered.
    pub fn ids_for(&self, value: &dyn DynEncodable) -> Option<&EncodingIds> {
        self.by_tag(&value.dyn_type_tag()).map(|e| &e.ids)
    }

    /// Entry for any of the ids of a type.
    fn by_any_id(&self, id: &NodeId) -> Option<&TypeEntry> {
        self.by_binary_id(id)
            .or_else(|| self.by_xml_id(id))
            .or_else(|| self.by_data_type_id(id))
    }

    /// `true` if `id` is any of the ids of a registered type.
    pub fn is_registered(&self, id: &NodeId) -> bool {
        self.by_any_id(id).is_some()
    }

    /// Decode a value from a binary stream, or `None` if `type_id` is not a
    /// registered binary encoding id.
    pub fn decode_binary(
        &self,
        type_id: &NodeId,
        stream: &mut dyn Read,
        ctx: &Context<'_>,
    ) -> Option<EncodingResult<Box<dyn DynEncodable>>> {
        self.by_binary_id(type_id)
            .map(|entry| entry.decode_binary(stream, ctx))
    }

    /// Decode a value from the start of `bytes`, returning it with the number
    /// of bytes consumed.
    pub fn decode_binary_bytes(
        &self,
        type_id: &NodeId,
        bytes: &[u8],
        ctx: &Context<'_>,
    ) -> EncodingResult<(Box<dyn DynEncodable>, usize)> {
        let entry = self.by_binary_id(type_id).ok_or_else(|| {
            Error::new(
                StatusCode::BadDataTypeIdUnknown,
                format!("No type registered for binary encoding id {type_id}"),
            )
        })?;
        let mut cursor = Cursor::new(bytes);
        let value = entry.decode_binary(&mut cursor, ctx)?;
        Ok((value, cursor.position() as usize))
    }

    fn check_entry(
        &self,
        entry: Option<&TypeEntry>,
        type_id: &NodeId,
        value: &dyn DynEncodable,
    ) -> EncodingResult<()> {
        let entry = entry.ok_or_else(|| {
            Error::new(
                StatusCode::BadDataTypeIdUnknown,
                format!("No type registered for encoding id {type_id}"),
            )
        })?;
        if entry.tag != value.dyn_type_tag() {
            return Err(Error::new(
                StatusCode::BadTypeMismatch,
                format!(
                    "Value of type {} cannot be encoded as {}",
                    value.type_name(),
                    entry.name
                ),
            ));
        }
        Ok(())
    }

    /// Encode `value` as the type registered under binary encoding id
    /// `type_id`.
    pub fn encode_binary(
        &self,
        type_id: &NodeId,
        value: &dyn DynEncodable,
        ctx: &Context<'_>,
    ) -> EncodingResult<Vec<u8>> {
        self.check_entry(self.by_binary_id(type_id), type_id, value)?;
        let mut buf = Vec::with_capacity(value.byte_len_dyn(ctx));
        value.encode_binary(&mut buf, ctx)?;
        Ok(buf)
    }

    /// Decode a value from the element whose start tag was just read, or
    /// `None` if `type_id` is not a registered XML encoding id.
    pub fn decode_xml(
        &self,
        type_id: &NodeId,
        stream: &mut XmlStreamReader<&mut dyn Read>,
        ctx: &Context<'_>,
    ) -> Option<EncodingResult<Box<dyn DynEncodable>>> {
        self.by_xml_id(type_id)
            .map(|entry| entry.decode_xml(stream, ctx))
    }

    /// Encode `value` as a standalone element of the type registered under XML
    /// encoding id `type_id`.
    pub fn encode_xml(
        &self,
        type_id: &NodeId,
        value: &dyn DynEncodable,
        ctx: &Context<'_>,
    ) -> EncodingResult<String> {
        self.check_entry(self.by_xml_id(type_id), type_id, value)?;
        let mut buf = Vec::new();
        {
            let mut writer = XmlStreamWriter::new(&mut buf as &mut dyn Write);
            writer.write_start(value.xml_tag_name())?;
            value.encode_xml(&mut writer, ctx)?;
            writer.write_end(value.xml_tag_name())?;
        }
        String::from_utf8(buf).map_err(Error::encoding)
    }

    /// Empty instance of the type with any of the ids `type_id`.
    pub fn make_empty(&self, type_id: &NodeId) -> Option<Box<dyn DynEncodable>> {
        self.by_any_id(type_id).map(|e| e.make_empty())
    }
}
