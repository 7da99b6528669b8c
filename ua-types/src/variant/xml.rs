// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::io::{Read, Write};

use crate::{
    xml::*, ByteString, Context, DataValue, DateTime, DiagnosticInfo, EncodingResult, Error,
    ExpandedNodeId, ExtensionObject, Guid, LocalizedText, NodeId, QualifiedName, StatusCode,
    UAString, XmlElement,
};

use super::{Array, Variant, VariantScalarTypeId};

impl XmlType for Variant {
    const TAG: &'static str = "Variant";
}

impl Variant {
    /// Decode the content of an element named after a variant type, such as
    /// `Int32`, `ListOfString` or `Matrix`.
    pub fn xml_decode_variant_value(
        stream: &mut XmlStreamReader<&mut dyn Read>,
        ctx: &Context<'_>,
        key: &str,
    ) -> EncodingResult<Self> {
        if let Some(ty) = key.strip_prefix("ListOf") {
            let ty = VariantScalarTypeId::from_xml_name(ty)
                .ok_or_else(|| Error::decoding(format!("Invalid variant contents: {key}")))?;
            let mut values = Vec::new();
            stream.iter_children(
                |key, stream, ctx| {
                    values.push(Self::xml_decode_variant_value(stream, ctx, &key)?);
                    Ok(())
                },
                ctx,
            )?;
            Ok(Self::from(Array::new(ty, values)?))
        } else if key == "Matrix" {
            let mut dims = Vec::new();
            let mut elems = Vec::new();
            stream.iter_children(
                |key, stream, ctx| match key.as_str() {
                    "Dimensions" => {
                        dims = Vec::<i32>::decode(stream, ctx)?;
                        Ok(())
                    }
                    "Elements" => stream.iter_children(
                        |key, stream, ctx| {
                            elems.push(Self::xml_decode_variant_value(stream, ctx, &key)?);
                            Ok(())
                        },
                        ctx,
                    ),
                    r => Err(Error::decoding(format!(
                        "Invalid field in Matrix content: {r}"
                    ))),
                },
                ctx,
            )?;
            // The element type of an empty matrix cannot be known.
            let scalar_type = elems
                .first()
                .and_then(|v| v.scalar_type_id())
                .unwrap_or(VariantScalarTypeId::Int32);
            let dims = dims
                .into_iter()
                .map(u32::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| Error::decoding("Invalid array dimensions, must all be non-negative"))?;
            Ok(Self::from(Array::new_multi(scalar_type, elems, dims)?))
        } else {
            let ty = VariantScalarTypeId::from_xml_name(key)
                .ok_or_else(|| Error::decoding(format!("Invalid variant type {key}")))?;
            Ok(match ty {
                VariantScalarTypeId::Boolean => Self::from(bool::decode(stream, ctx)?),
                VariantScalarTypeId::SByte => Self::from(i8::decode(stream, ctx)?),
                VariantScalarTypeId::Byte => Self::from(u8::decode(stream, ctx)?),
                VariantScalarTypeId::Int16 => Self::from(i16::decode(stream, ctx)?),
                VariantScalarTypeId::UInt16 => Self::from(u16::decode(stream, ctx)?),
                VariantScalarTypeId::Int32 => Self::from(i32::decode(stream, ctx)?),
                VariantScalarTypeId::UInt32 => Self::from(u32::decode(stream, ctx)?),
                VariantScalarTypeId::Int64 => Self::from(i64::decode(stream, ctx)?),
                VariantScalarTypeId::UInt64 => Self::from(u64::decode(stream, ctx)?),
                VariantScalarTypeId::Float => Self::from(f32::decode(stream, ctx)?),
                VariantScalarTypeId::Double => Self::from(f64::decode(stream, ctx)?),
                VariantScalarTypeId::String => Self::from(UAString::decode(stream, ctx)?),
                VariantScalarTypeId::DateTime => Self::from(DateTime::decode(stream, ctx)?),
                VariantScalarTypeId::Guid => Self::from(Guid::decode(stream, ctx)?),
                VariantScalarTypeId::ByteString => Self::from(ByteString::decode(stream, ctx)?),
                VariantScalarTypeId::XmlElement => Self::from(XmlElement::decode(stream, ctx)?),
                VariantScalarTypeId::NodeId => Self::from(NodeId::decode(stream, ctx)?),
                VariantScalarTypeId::ExpandedNodeId => {
                    Self::from(ExpandedNodeId::decode(stream, ctx)?)
                }
                VariantScalarTypeId::StatusCode => Self::from(StatusCode::decode(stream, ctx)?),
                VariantScalarTypeId::QualifiedName => {
                    Self::from(QualifiedName::decode(stream, ctx)?)
                }
                VariantScalarTypeId::LocalizedText => {
                    Self::from(LocalizedText::decode(stream, ctx)?)
                }
                VariantScalarTypeId::ExtensionObject => {
                    Self::from(ExtensionObject::decode(stream, ctx)?)
                }
                VariantScalarTypeId::DataValue => {
                    let _depth_lock = ctx.options().depth_lock()?;
                    Self::from(DataValue::decode(stream, ctx)?)
                }
                VariantScalarTypeId::Variant => {
                    let _depth_lock = ctx.options().depth_lock()?;
                    Self::Variant(Box::new(Variant::decode(stream, ctx)?))
                }
                VariantScalarTypeId::DiagnosticInfo => {
                    let _depth_lock = ctx.options().depth_lock()?;
                    Self::from(DiagnosticInfo::decode(stream, ctx)?)
                }
            })
        }
    }

    pub(crate) fn xml_encode_scalar(
        &self,
        stream: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        let Some(ty) = self.scalar_type_id() else {
            return Ok(());
        };
        stream.write_start(ty.xml_name())?;
        self.xml_encode_value(stream, ctx)?;
        stream.write_end(ty.xml_name())?;
        Ok(())
    }

    /// Write the content of a scalar value, without the element naming its
    /// type.
    pub(crate) fn xml_encode_value(
        &self,
        stream: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        match self {
            Variant::Empty => Ok(()),
            Variant::Array(_) => Err(Error::encoding(
                "Nested arrays must be wrapped in a variant",
            )),
            Variant::Boolean(v) => v.encode(stream, ctx),
            Variant::SByte(v) => v.encode(stream, ctx),
            Variant::Byte(v) => v.encode(stream, ctx),
            Variant::Int16(v) => v.encode(stream, ctx),
            Variant::UInt16(v) => v.encode(stream, ctx),
            Variant::Int32(v) => v.encode(stream, ctx),
            Variant::UInt32(v) => v.encode(stream, ctx),
            Variant::Int64(v) => v.encode(stream, ctx),
            Variant::UInt64(v) => v.encode(stream, ctx),
            Variant::Float(v) => v.encode(stream, ctx),
            Variant::Double(v) => v.encode(stream, ctx),
            Variant::String(v) => v.encode(stream, ctx),
            Variant::DateTime(v) => v.encode(stream, ctx),
            Variant::Guid(v) => v.encode(stream, ctx),
            Variant::StatusCode(v) => v.encode(stream, ctx),
            Variant::ByteString(v) => v.encode(stream, ctx),
            Variant::XmlElement(v) => v.encode(stream, ctx),
            Variant::QualifiedName(v) => v.encode(stream, ctx),
            Variant::LocalizedText(v) => v.encode(stream, ctx),
            Variant::NodeId(v) => v.encode(stream, ctx),
            Variant::ExpandedNodeId(v) => v.encode(stream, ctx),
            Variant::ExtensionObject(v) => v.encode(stream, ctx),
            Variant::Variant(v) => v.encode(stream, ctx),
            Variant::DataValue(v) => v.encode(stream, ctx),
            Variant::DiagnosticInfo(v) => v.encode(stream, ctx),
        }
    }
}

impl XmlEncodable for Variant {
    fn encode(
        &self,
        stream: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        let Variant::Array(array) = self else {
            return self.xml_encode_scalar(stream, ctx);
        };
        match &array.dimensions {
            Some(dims) if dims.len() > 1 => {
                stream.write_start("Matrix")?;
                // Dimensions are signed in the XML schema.
                let dims: Vec<i32> = dims.iter().map(|d| *d as i32).collect();
                stream.encode_child("Dimensions", &dims, ctx)?;
                stream.write_start("Elements")?;
                for item in &array.values {
                    item.xml_encode_scalar(stream, ctx)?;
                }
                stream.write_end("Elements")?;
                stream.write_end("Matrix")?;
            }
            _ => {
                let tag = format!("ListOf{}", array.value_type.xml_name());
                stream.write_start(&tag)?;
                for item in &array.values {
                    item.xml_encode_scalar(stream, ctx)?;
                }
                stream.write_end(&tag)?;
            }
        }
        Ok(())
    }
}

impl XmlDecodable for Variant {
    fn decode(stream: &mut XmlStreamReader<&mut dyn Read>, ctx: &Context<'_>) -> EncodingResult<Self> {
        let mut value = None;
        stream.iter_children(
            |key, stream, ctx| {
                if value.is_none() {
                    value = Some(Self::xml_decode_variant_value(stream, ctx, &key)?);
                } else {
                    stream.skip_value()?;
                }
                Ok(())
            },
            ctx,
        )?;
        Ok(value.unwrap_or(Variant::Empty))
    }
}
