// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::{
    io::{Read, Write},
    sync::Arc,
};

use crate::{
    encoding::{
        check_length_prefix, read_i32, read_u32, write_i32, write_u32, BinaryEncodable,
        EncodingResult, PREALLOC_LIMIT,
    },
    Array, Context, Error, ExtensionObject, ExtensionObjectBody, StatusCode, TypeTag, UaType,
    Variant,
};

use super::{FieldKind, StructureDefinition, StructureField};

/// A value of a structure described by a [`StructureDefinition`]. Holds one
/// variant per field, `Empty` for absent optional fields and null arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicStructure {
    pub(super) definition: Arc<StructureDefinition>,
    pub(super) values: Vec<Variant>,
}

impl UaType for DynamicStructure {
    fn type_tag(&self) -> TypeTag {
        TypeTag::Structure(self.definition.data_type_id.clone())
    }
}

impl DynamicStructure {
    /// Create a structure from one value per field, in field order.
    pub fn new(definition: Arc<StructureDefinition>, values: Vec<Variant>) -> Result<Self, Error> {
        if values.len() != definition.fields.len() {
            return Err(Error::new(
                StatusCode::BadInvalidArgument,
                format!(
                    "{} has {} fields, got {} values",
                    definition.name,
                    definition.fields.len(),
                    values.len()
                ),
            ));
        }
        for (field, value) in definition.fields.iter().zip(values.iter()) {
            field.validate(value)?;
        }
        Ok(Self { definition, values })
    }

    /// A structure with default builtin values, no optional fields and null
    /// arrays. Nested structure fields are left empty and must be set before
    /// encoding.
    pub fn new_empty(definition: Arc<StructureDefinition>) -> Self {
        let values = definition
            .fields
            .iter()
            .map(|f| match &f.kind {
                _ if f.is_optional || f.is_array => Variant::Empty,
                FieldKind::Builtin(ty) => Variant::default_of(*ty),
                FieldKind::Enum => Variant::Int32(0),
                FieldKind::Structure(_) => Variant::Empty,
            })
            .collect();
        Self { definition, values }
    }

    /// The definition of this structure.
    pub fn definition(&self) -> &Arc<StructureDefinition> {
        &self.definition
    }

    /// All field values, in field order.
    pub fn values(&self) -> &[Variant] {
        &self.values
    }

    /// Value of the field at `index`.
    pub fn get_field(&self, index: usize) -> Option<&Variant> {
        self.values.get(index)
    }

    /// Value of the field called `name`.
    pub fn get_field_by_name(&self, name: &str) -> Option<&Variant> {
        self.definition
            .field_index(name)
            .and_then(|i| self.values.get(i))
    }

    /// Set the field called `name`, checking the value against the field.
    pub fn set_field(&mut self, name: &str, value: impl Into<Variant>) -> Result<(), Error> {
        let idx = self.definition.field_index(name).ok_or_else(|| {
            Error::new(
                StatusCode::BadInvalidArgument,
                format!("{} has no field {name}", self.definition.name),
            )
        })?;
        let value = value.into();
        self.definition.fields[idx].validate(&value)?;
        self.values[idx] = value;
        Ok(())
    }

    fn is_present(field: &StructureField, value: &Variant) -> bool {
        !field.is_optional || !value.is_empty()
    }

    fn encoding_mask(&self) -> u32 {
        let mut mask = 0u32;
        let optional = self
            .definition
            .fields
            .iter()
            .zip(self.values.iter())
            .filter(|(f, _)| f.is_optional);
        for (bit, (_, value)) in optional.enumerate() {
            if !value.is_empty() {
                mask |= 1 << bit;
            }
        }
        mask
    }

    fn scalar_byte_len(field: &StructureField, value: &Variant, ctx: &Context<'_>) -> usize {
        match (&field.kind, value) {
            (FieldKind::Structure(_), Variant::ExtensionObject(eo)) => match &eo.body {
                ExtensionObjectBody::Decoded(v) => v.byte_len_dyn(ctx),
                _ => 0,
            },
            (_, v) => v.value_byte_len(ctx),
        }
    }

    fn field_byte_len(field: &StructureField, value: &Variant, ctx: &Context<'_>) -> usize {
        if !field.is_array {
            return Self::scalar_byte_len(field, value, ctx);
        }
        4 + value.as_array().map_or(0, |values| {
            values
                .iter()
                .map(|v| Self::scalar_byte_len(field, v, ctx))
                .sum()
        })
    }

    fn encode_scalar<S: Write + ?Sized>(
        field: &StructureField,
        value: &Variant,
        stream: &mut S,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        match (&field.kind, value) {
            (FieldKind::Structure(_), Variant::ExtensionObject(eo)) => match &eo.body {
                ExtensionObjectBody::Decoded(v) => {
                    let mut writer: &mut S = stream;
                    v.encode_binary(&mut writer, ctx)
                }
                _ => Err(Error::encoding(format!(
                    "Field {} holds an undecoded structure",
                    field.name
                ))),
            },
            (_, Variant::Empty) => Err(Error::encoding(format!(
                "Required field {} is empty",
                field.name
            ))),
            (_, v) => v.encode_value(stream, ctx),
        }
    }

    fn encode_field<S: Write + ?Sized>(
        field: &StructureField,
        value: &Variant,
        stream: &mut S,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        if !field.is_array {
            return Self::encode_scalar(field, value, stream, ctx);
        }
        match value.as_array() {
            None => write_i32(stream, -1),
            Some(values) => {
                write_i32(stream, values.len() as i32)?;
                for v in values {
                    Self::encode_scalar(field, v, stream, ctx)?;
                }
                Ok(())
            }
        }
    }

    fn decode_scalar<S: Read + ?Sized>(
        field: &StructureField,
        stream: &mut S,
        ctx: &Context<'_>,
    ) -> EncodingResult<Variant> {
        match &field.kind {
            FieldKind::Builtin(ty) => Variant::decode_value(*ty, stream, ctx),
            FieldKind::Enum => Ok(Variant::Int32(read_i32(stream)?)),
            FieldKind::Structure(data_type_id) => {
                let entry = ctx.registry().by_data_type_id(data_type_id).ok_or_else(|| {
                    Error::new(
                        StatusCode::BadDataTypeIdUnknown,
                        format!("Field {} has unknown type {data_type_id}", field.name),
                    )
                })?;
                let mut reader: &mut S = stream;
                let value = entry.decode_binary(&mut reader, ctx)?;
                Ok(Variant::from(ExtensionObject {
                    type_id: entry.ids().binary.clone(),
                    body: ExtensionObjectBody::Decoded(value),
                }))
            }
        }
    }

    fn decode_field<S: Read + ?Sized>(
        field: &StructureField,
        stream: &mut S,
        ctx: &Context<'_>,
    ) -> EncodingResult<Variant> {
        if !field.is_array {
            return Self::decode_scalar(field, stream, ctx);
        }
        let len = read_i32(stream)?;
        let Some(len) = check_length_prefix(len, ctx.options().max_array_length, &field.name)?
        else {
            return Ok(Variant::Empty);
        };
        let mut values = Vec::with_capacity(len.min(PREALLOC_LIMIT));
        for _ in 0..len {
            values.push(Self::decode_scalar(field, stream, ctx)?);
        }
        Ok(Variant::from(Array::new(field.kind.scalar_type(), values)?))
    }

    /// Decode a structure with the given definition from a binary stream.
    pub fn decode_binary<S: Read + ?Sized>(
        definition: Arc<StructureDefinition>,
        stream: &mut S,
        ctx: &Context<'_>,
    ) -> EncodingResult<Self> {
        let _depth_lock = ctx.options().depth_lock()?;
        let mask = if definition.has_optional_fields() {
            read_u32(stream)?
        } else {
            0
        };
        let mut values = Vec::with_capacity(definition.fields.len());
        let mut optional_bit = 0;
        for field in &definition.fields {
            if field.is_optional {
                let present = mask & (1 << optional_bit) != 0;
                optional_bit += 1;
                if !present {
                    values.push(Variant::Empty);
                    continue;
                }
            }
            values.push(Self::decode_field(field, stream, ctx)?);
        }
        Ok(Self { definition, values })
    }
}

impl BinaryEncodable for DynamicStructure {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut size = if self.definition.has_optional_fields() {
            4
        } else {
            0
        };
        for (field, value) in self.definition.fields.iter().zip(self.values.iter()) {
            if Self::is_present(field, value) {
                size += Self::field_byte_len(field, value, ctx);
            }
        }
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
        if self.definition.has_optional_fields() {
            write_u32(stream, self.encoding_mask())?;
        }
        for (field, value) in self.definition.fields.iter().zip(self.values.iter()) {
            if Self::is_present(field, value) {
                Self::encode_field(field, value, stream, ctx)?;
            }
        }
        Ok(())
    }
}
