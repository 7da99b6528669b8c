// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::{
    io::{Read, Write},
    sync::Arc,
};

use crate::{
    xml::*, Array, Context, EncodingResult, Error, ExtensionObject, ExtensionObjectBody,
    StatusCode, Variant,
};

use super::{DynamicStructure, FieldKind, StructureDefinition, StructureField};

impl XmlType for DynamicStructure {
    const TAG: &'static str = "Structure";

    fn tag(&self) -> &str {
        &self.definition.name
    }
}

impl DynamicStructure {
    fn xml_encode_content(
        field: &StructureField,
        value: &Variant,
        stream: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        match (&field.kind, value) {
            (FieldKind::Structure(_), Variant::ExtensionObject(eo)) => match &eo.body {
                ExtensionObjectBody::Decoded(v) => v.encode_xml(stream, ctx),
                _ => Err(Error::encoding(format!(
                    "Field {} holds an undecoded structure",
                    field.name
                ))),
            },
            (_, v) => v.xml_encode_value(stream, ctx),
        }
    }

    fn xml_encode_element(
        field: &StructureField,
        value: &Variant,
        stream: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        match (&field.kind, value) {
            (FieldKind::Structure(_), Variant::ExtensionObject(eo)) => {
                let ExtensionObjectBody::Decoded(v) = &eo.body else {
                    return Err(Error::encoding(format!(
                        "Field {} holds an undecoded structure",
                        field.name
                    )));
                };
                let tag = v.xml_tag_name();
                stream.write_start(tag)?;
                v.encode_xml(stream, ctx)?;
                stream.write_end(tag)?;
                Ok(())
            }
            (_, v) => v.xml_encode_scalar(stream, ctx),
        }
    }

    fn xml_decode_scalar(
        field: &StructureField,
        stream: &mut XmlStreamReader<&mut dyn Read>,
        ctx: &Context<'_>,
    ) -> EncodingResult<Variant> {
        match &field.kind {
            FieldKind::Builtin(ty) => Variant::xml_decode_variant_value(stream, ctx, ty.xml_name()),
            FieldKind::Enum => {
                // Enumerations are written as `Name_Value` or as a bare number.
                let text = stream.consume_as_text()?;
                let number = text.rsplit('_').next().unwrap_or_default();
                number.parse::<i32>().map(Variant::Int32).map_err(|_| {
                    Error::decoding(format!("Invalid enumeration value {text} in {}", field.name))
                })
            }
            FieldKind::Structure(data_type_id) => {
                let entry = ctx.registry().by_data_type_id(data_type_id).ok_or_else(|| {
                    Error::new(
                        StatusCode::BadDataTypeIdUnknown,
                        format!("Field {} has unknown type {data_type_id}", field.name),
                    )
                })?;
                let value = entry.decode_xml(stream, ctx)?;
                Ok(Variant::from(ExtensionObject {
                    type_id: entry.ids().binary.clone(),
                    body: ExtensionObjectBody::Decoded(value),
                }))
            }
        }
    }

    fn xml_decode_field(
        field: &StructureField,
        stream: &mut XmlStreamReader<&mut dyn Read>,
        ctx: &Context<'_>,
    ) -> EncodingResult<Variant> {
        if !field.is_array {
            return Self::xml_decode_scalar(field, stream, ctx);
        }
        let mut values = Vec::new();
        stream.iter_children(
            |_, stream, ctx| {
                values.push(Self::xml_decode_scalar(field, stream, ctx)?);
                Ok(())
            },
            ctx,
        )?;
        Ok(Variant::from(Array::new(field.kind.scalar_type(), values)?))
    }

    fn missing_value(field: &StructureField, ctx: &Context<'_>) -> EncodingResult<Variant> {
        Ok(match &field.kind {
            _ if field.is_optional || field.is_array => Variant::Empty,
            FieldKind::Builtin(ty) => Variant::default_of(*ty),
            FieldKind::Enum => Variant::Int32(0),
            FieldKind::Structure(data_type_id) => {
                let entry = ctx.registry().by_data_type_id(data_type_id).ok_or_else(|| {
                    Error::new(
                        StatusCode::BadDataTypeIdUnknown,
                        format!("Field {} has unknown type {data_type_id}", field.name),
                    )
                })?;
                Variant::from(ExtensionObject {
                    type_id: entry.ids().binary.clone(),
                    body: ExtensionObjectBody::Decoded(entry.make_empty()),
                })
            }
        })
    }

    /// Decode a structure with the given definition from the element whose
    /// start tag was just read.
    pub fn decode_xml(
        definition: Arc<StructureDefinition>,
        stream: &mut XmlStreamReader<&mut dyn Read>,
        ctx: &Context<'_>,
    ) -> EncodingResult<Self> {
        let _depth_lock = ctx.options().depth_lock()?;
        let mut values: Vec<Option<Variant>> = vec![None; definition.fields.len()];
        stream.iter_children(
            |key, stream, ctx| {
                let Some(idx) = definition.field_index(&key) else {
                    stream.skip_value()?;
                    return Ok(());
                };
                values[idx] = Some(Self::xml_decode_field(&definition.fields[idx], stream, ctx)?);
                Ok(())
            },
            ctx,
        )?;
        let values = definition
            .fields
            .iter()
            .zip(values)
            .map(|(field, value)| match value {
                Some(v) => Ok(v),
                None => Self::missing_value(field, ctx),
            })
            .collect::<EncodingResult<Vec<_>>>()?;
        Ok(Self { definition, values })
    }
}

impl XmlEncodable for DynamicStructure {
    fn encode(
        &self,
        stream: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        for (field, value) in self.definition.fields.iter().zip(self.values.iter()) {
            if value.is_empty() {
                continue;
            }
            stream.write_start(&field.name)?;
            if field.is_array {
                for v in value.as_array().into_iter().flatten() {
                    Self::xml_encode_element(field, v, stream, ctx)?;
                }
            } else {
                Self::xml_encode_content(field, value, stream, ctx)?;
            }
            stream.write_end(&field.name)?;
        }
        Ok(())
    }
}
