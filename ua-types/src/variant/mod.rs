// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `Variant`, the tagged union over every
//! builtin type, and `Array`, its array form.

mod from;
mod type_id;
mod xml;

pub use type_id::VariantScalarTypeId;

use std::{
    fmt,
    io::{Read, Write},
};

use crate::{
    encoding::{
        check_length_prefix, read_i32, read_u8, write_i32, write_u32, write_u8, BinaryDecodable,
        BinaryEncodable, EncodingResult, PREALLOC_LIMIT,
    },
    numeric_range::NumericRange,
    ByteString, Context, DataValue, DateTime, DiagnosticInfo, Error, ExpandedNodeId,
    ExtensionObject, Guid, LocalizedText, NodeId, QualifiedName, StatusCode, UAString, XmlElement,
};

/// Bit set in the encoding mask when the value is an array.
const ARRAY_VALUES_BIT: u8 = 0x80;
/// Bit set in the encoding mask when array dimensions follow the values.
const ARRAY_DIMENSIONS_BIT: u8 = 0x40;
/// Bits holding the builtin type id.
const TYPE_ID_MASK: u8 = 0x3F;

/// A value of any builtin type, a nested variant, or an array of one type.
///
/// Larger members are boxed to keep the enum small.
#[derive(PartialEq, Debug, Clone, Default)]
pub enum Variant {
    /// Empty, null value.
    #[default]
    Empty,
    /// Boolean
    Boolean(bool),
    /// Signed byte
    SByte(i8),
    /// Unsigned byte
    Byte(u8),
    /// Signed 16-bit int
    Int16(i16),
    /// Unsigned 16-bit int
    UInt16(u16),
    /// Signed 32-bit int
    Int32(i32),
    /// Unsigned 32-bit int
    UInt32(u32),
    /// Signed 64-bit int
    Int64(i64),
    /// Unsigned 64-bit int
    UInt64(u64),
    /// Float
    Float(f32),
    /// Double
    Double(f64),
    /// String
    String(UAString),
    /// DateTime
    DateTime(Box<DateTime>),
    /// Guid
    Guid(Box<Guid>),
    /// StatusCode
    StatusCode(StatusCode),
    /// ByteString
    ByteString(ByteString),
    /// XmlElement
    XmlElement(XmlElement),
    /// QualifiedName
    QualifiedName(Box<QualifiedName>),
    /// LocalizedText
    LocalizedText(Box<LocalizedText>),
    /// NodeId
    NodeId(Box<NodeId>),
    /// ExpandedNodeId
    ExpandedNodeId(Box<ExpandedNodeId>),
    /// ExtensionObject
    ExtensionObject(ExtensionObject),
    /// Variant
    Variant(Box<Variant>),
    /// DataValue
    DataValue(Box<DataValue>),
    /// DiagnosticInfo
    DiagnosticInfo(Box<DiagnosticInfo>),
    /// Single or multi dimensional array of values of one type.
    Array(Box<Array>),
}

/// An array of variants. Every value has the scalar type `value_type`.
#[derive(PartialEq, Debug, Clone)]
pub struct Array {
    /// Type of every element.
    pub value_type: VariantScalarTypeId,
    /// Values, in row major order for multi dimensional arrays.
    pub values: Vec<Variant>,
    /// Length of each dimension. The product equals `values.len()`.
    pub dimensions: Option<Vec<u32>>,
}

impl Array {
    /// Create a single dimension array. Fails if any value is not of `value_type`.
    pub fn new(value_type: VariantScalarTypeId, values: Vec<Variant>) -> EncodingResult<Array> {
        Self::validate_values(value_type, &values)?;
        Ok(Array {
            value_type,
            values,
            dimensions: None,
        })
    }

    /// Create a multi dimensional array. Fails if the dimensions do not match
    /// the number of values.
    pub fn new_multi(
        value_type: VariantScalarTypeId,
        values: Vec<Variant>,
        dimensions: Vec<u32>,
    ) -> EncodingResult<Array> {
        Self::validate_values(value_type, &values)?;
        if dimensions.iter().any(|d| *d == 0) {
            return Err(Error::decoding(
                "Invalid array dimensions, one or more dimensions are 0",
            ));
        }
        let mut length = 1u32;
        for d in &dimensions {
            length = length
                .checked_mul(*d)
                .ok_or_else(|| Error::decoding("Array dimension overflow"))?;
        }
        if length as usize != values.len() {
            return Err(Error::decoding(format!(
                "Array dimensions {dimensions:?} do not match array length {}",
                values.len()
            )));
        }
        Ok(Array {
            value_type,
            values,
            dimensions: Some(dimensions),
        })
    }

    fn validate_values(value_type: VariantScalarTypeId, values: &[Variant]) -> EncodingResult<()> {
        match values
            .iter()
            .find(|v| v.scalar_type_id() != Some(value_type))
        {
            Some(v) => Err(Error::decoding(format!(
                "Array of {value_type:?} contains a value of type {:?}",
                v.scalar_type_id()
            ))),
            None => Ok(()),
        }
    }

    fn encoding_mask(&self) -> u8 {
        let mut mask = self.value_type as u8 | ARRAY_VALUES_BIT;
        if self.has_dimensions() {
            mask |= ARRAY_DIMENSIONS_BIT;
        }
        mask
    }

    // Dimensions are only written for non-empty arrays, an empty array cannot
    // carry any valid dimension.
    fn has_dimensions(&self) -> bool {
        self.dimensions.is_some() && !self.values.is_empty()
    }
}

impl BinaryEncodable for Variant {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut size = 1usize;
        match self {
            Variant::Empty => {}
            Variant::Array(array) => {
                size += 4;
                size += array
                    .values
                    .iter()
                    .map(|v| v.value_byte_len(ctx))
                    .sum::<usize>();
                if array.has_dimensions() {
                    size += 4 + array.dimensions.as_ref().map_or(0, |d| d.len() * 4);
                }
            }
            value => size += value.value_byte_len(ctx),
        }
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
        write_u8(stream, self.encoding_mask())?;
        match self {
            Variant::Empty => Ok(()),
            Variant::Array(array) => {
                write_i32(stream, array.values.len() as i32)?;
                for value in &array.values {
                    value.encode_value(stream, ctx)?;
                }
                if array.has_dimensions() {
                    if let Some(dimensions) = &array.dimensions {
                        write_i32(stream, dimensions.len() as i32)?;
                        for d in dimensions {
                            write_u32(stream, *d)?;
                        }
                    }
                }
                Ok(())
            }
            value => value.encode_value(stream, ctx),
        }
    }
}

impl BinaryDecodable for Variant {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self> {
        let encoding_mask = read_u8(stream)?;
        let type_bits = encoding_mask & TYPE_ID_MASK;

        if encoding_mask & ARRAY_VALUES_BIT == 0 {
            if encoding_mask & ARRAY_DIMENSIONS_BIT != 0 {
                return Err(Error::decoding(
                    "Array dimensions bit specified without any values",
                ));
            }
            if type_bits == 0 {
                return Ok(Variant::Empty);
            }
            let type_id = VariantScalarTypeId::try_from(type_bits)?;
            return Self::decode_value(type_id, stream, ctx);
        }

        let type_id = VariantScalarTypeId::try_from(type_bits)?;
        let length = read_i32(stream)?;
        // A null array (-1) is read as an empty one.
        let length = check_length_prefix(length, ctx.options().max_array_length, "Variant array")?
            .unwrap_or_default();

        let mut values = Vec::with_capacity(length.min(PREALLOC_LIMIT));
        for _ in 0..length {
            values.push(Self::decode_value(type_id, stream, ctx)?);
        }

        if encoding_mask & ARRAY_DIMENSIONS_BIT != 0 {
            let Some(dimensions) = <Option<Vec<i32>>>::decode(stream, ctx)? else {
                return Err(Error::decoding(
                    "No array dimensions despite the bit flag being set",
                ));
            };
            let dimensions = dimensions
                .into_iter()
                .map(|d| u32::try_from(d).map_err(|_| Error::decoding("Negative array dimension")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Variant::from(Array::new_multi(type_id, values, dimensions)?))
        } else {
            Ok(Variant::from(Array::new(type_id, values)?))
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => write!(f, "Empty"),
            Variant::Boolean(v) => write!(f, "{v}"),
            Variant::SByte(v) => write!(f, "{v}"),
            Variant::Byte(v) => write!(f, "{v}"),
            Variant::Int16(v) => write!(f, "{v}"),
            Variant::UInt16(v) => write!(f, "{v}"),
            Variant::Int32(v) => write!(f, "{v}"),
            Variant::UInt32(v) => write!(f, "{v}"),
            Variant::Int64(v) => write!(f, "{v}"),
            Variant::UInt64(v) => write!(f, "{v}"),
            Variant::Float(v) => write!(f, "{v}"),
            Variant::Double(v) => write!(f, "{v}"),
            Variant::String(v) => write!(f, "{v}"),
            Variant::DateTime(v) => write!(f, "{v}"),
            Variant::Guid(v) => write!(f, "{v}"),
            Variant::StatusCode(v) => write!(f, "{v}"),
            Variant::ByteString(v) => write!(f, "{}", v.as_base64()),
            Variant::XmlElement(v) => write!(f, "{v}"),
            Variant::QualifiedName(v) => write!(f, "{v}"),
            Variant::LocalizedText(v) => write!(f, "{v}"),
            Variant::NodeId(v) => write!(f, "{v}"),
            Variant::ExpandedNodeId(v) => write!(f, "{v}"),
            Variant::ExtensionObject(v) => write!(f, "ExtensionObject({})", v.type_id),
            Variant::Variant(v) => write!(f, "Variant({v})"),
            Variant::DataValue(v) => write!(f, "DataValue({:?})", v.value),
            Variant::DiagnosticInfo(v) => write!(f, "{v:?}"),
            Variant::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Variant {
    fn encoding_mask(&self) -> u8 {
        match self {
            Variant::Empty => 0,
            Variant::Array(array) => array.encoding_mask(),
            value => value.scalar_type_id().map_or(0, |t| t as u8),
        }
    }

    /// Length of a scalar value without the encoding mask.
    pub fn value_byte_len(&self, ctx: &Context<'_>) -> usize {
        match self {
            Variant::Empty | Variant::Array(_) => 0,
            Variant::Boolean(v) => v.byte_len(ctx),
            Variant::SByte(v) => v.byte_len(ctx),
            Variant::Byte(v) => v.byte_len(ctx),
            Variant::Int16(v) => v.byte_len(ctx),
            Variant::UInt16(v) => v.byte_len(ctx),
            Variant::Int32(v) => v.byte_len(ctx),
            Variant::UInt32(v) => v.byte_len(ctx),
            Variant::Int64(v) => v.byte_len(ctx),
            Variant::UInt64(v) => v.byte_len(ctx),
            Variant::Float(v) => v.byte_len(ctx),
            Variant::Double(v) => v.byte_len(ctx),
            Variant::String(v) => v.byte_len(ctx),
            Variant::DateTime(v) => v.byte_len(ctx),
            Variant::Guid(v) => v.byte_len(ctx),
            Variant::StatusCode(v) => v.byte_len(ctx),
            Variant::ByteString(v) => v.byte_len(ctx),
            Variant::XmlElement(v) => v.byte_len(ctx),
            Variant::QualifiedName(v) => v.byte_len(ctx),
            Variant::LocalizedText(v) => v.byte_len(ctx),
            Variant::NodeId(v) => v.byte_len(ctx),
            Variant::ExpandedNodeId(v) => v.byte_len(ctx),
            Variant::ExtensionObject(v) => v.byte_len(ctx),
            Variant::Variant(v) => v.byte_len(ctx),
            Variant::DataValue(v) => v.byte_len(ctx),
            Variant::DiagnosticInfo(v) => v.byte_len(ctx),
        }
    }

    /// Write a scalar value without the encoding mask.
    pub fn encode_value<S: Write + ?Sized>(
        &self,
        stream: &mut S,
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

    /// Read a scalar value of the given type, without an encoding mask.
    pub fn decode_value<S: Read + ?Sized>(
        type_id: VariantScalarTypeId,
        stream: &mut S,
        ctx: &Context<'_>,
    ) -> EncodingResult<Self> {
        Ok(match type_id {
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
            VariantScalarTypeId::StatusCode => Self::from(StatusCode::decode(stream, ctx)?),
            VariantScalarTypeId::ByteString => Self::from(ByteString::decode(stream, ctx)?),
            VariantScalarTypeId::XmlElement => Self::from(XmlElement::decode(stream, ctx)?),
            VariantScalarTypeId::QualifiedName => {
                Self::from(QualifiedName::decode(stream, ctx)?)
            }
            VariantScalarTypeId::LocalizedText => {
                Self::from(LocalizedText::decode(stream, ctx)?)
            }
            VariantScalarTypeId::NodeId => Self::from(NodeId::decode(stream, ctx)?),
            VariantScalarTypeId::ExpandedNodeId => {
                Self::from(ExpandedNodeId::decode(stream, ctx)?)
            }
            VariantScalarTypeId::ExtensionObject => {
                Self::from(ExtensionObject::decode(stream, ctx)?)
            }
            VariantScalarTypeId::Variant => {
                let _depth_lock = ctx.options().depth_lock()?;
                Self::Variant(Box::new(Variant::decode(stream, ctx)?))
            }
            VariantScalarTypeId::DataValue => {
                let _depth_lock = ctx.options().depth_lock()?;
                Self::from(DataValue::decode(stream, ctx)?)
            }
            VariantScalarTypeId::DiagnosticInfo => {
                let _depth_lock = ctx.options().depth_lock()?;
                Self::from(DiagnosticInfo::decode(stream, ctx)?)
            }
        })
    }

    /// Builtin type of a scalar value. `None` for `Empty` and arrays.
    pub fn scalar_type_id(&self) -> Option<VariantScalarTypeId> {
        Some(match self {
            Variant::Empty | Variant::Array(_) => return None,
            Variant::Boolean(_) => VariantScalarTypeId::Boolean,
            Variant::SByte(_) => VariantScalarTypeId::SByte,
            Variant::Byte(_) => VariantScalarTypeId::Byte,
            Variant::Int16(_) => VariantScalarTypeId::Int16,
            Variant::UInt16(_) => VariantScalarTypeId::UInt16,
            Variant::Int32(_) => VariantScalarTypeId::Int32,
            Variant::UInt32(_) => VariantScalarTypeId::UInt32,
            Variant::Int64(_) => VariantScalarTypeId::Int64,
            Variant::UInt64(_) => VariantScalarTypeId::UInt64,
            Variant::Float(_) => VariantScalarTypeId::Float,
            Variant::Double(_) => VariantScalarTypeId::Double,
            Variant::String(_) => VariantScalarTypeId::String,
            Variant::DateTime(_) => VariantScalarTypeId::DateTime,
            Variant::Guid(_) => VariantScalarTypeId::Guid,
            Variant::StatusCode(_) => VariantScalarTypeId::StatusCode,
            Variant::ByteString(_) => VariantScalarTypeId::ByteString,
            Variant::XmlElement(_) => VariantScalarTypeId::XmlElement,
            Variant::QualifiedName(_) => VariantScalarTypeId::QualifiedName,
            Variant::LocalizedText(_) => VariantScalarTypeId::LocalizedText,
            Variant::NodeId(_) => VariantScalarTypeId::NodeId,
            Variant::ExpandedNodeId(_) => VariantScalarTypeId::ExpandedNodeId,
            Variant::ExtensionObject(_) => VariantScalarTypeId::ExtensionObject,
            Variant::Variant(_) => VariantScalarTypeId::Variant,
            Variant::DataValue(_) => VariantScalarTypeId::DataValue,
            Variant::DiagnosticInfo(_) => VariantScalarTypeId::DiagnosticInfo,
        })
    }

    /// `true` if the variant is `Empty`.
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// `true` if the variant is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Variant::Array(_))
    }

    /// `true` for numeric scalars.
    pub fn is_numeric(&self) -> bool {
        self.scalar_type_id().is_some_and(|t| t.is_numeric())
    }

    /// The values of an array variant.
    pub fn as_array(&self) -> Option<&Vec<Variant>> {
        match self {
            Variant::Array(a) => Some(&a.values),
            _ => None,
        }
    }

    /// Numeric value widened to `f64`, used for deadband comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        Some(match self {
            Variant::SByte(v) => *v as f64,
            Variant::Byte(v) => *v as f64,
            Variant::Int16(v) => *v as f64,
            Variant::UInt16(v) => *v as f64,
            Variant::Int32(v) => *v as f64,
            Variant::UInt32(v) => *v as f64,
            Variant::Int64(v) => *v as f64,
            Variant::UInt64(v) => *v as f64,
            Variant::Float(v) => *v as f64,
            Variant::Double(v) => *v,
            _ => return None,
        })
    }

    /// A default value of the given type.
    pub fn default_of(ty: VariantScalarTypeId) -> Variant {
        match ty {
            VariantScalarTypeId::Boolean => Variant::Boolean(Default::default()),
            VariantScalarTypeId::SByte => Variant::SByte(Default::default()),
            VariantScalarTypeId::Byte => Variant::Byte(Default::default()),
            VariantScalarTypeId::Int16 => Variant::Int16(Default::default()),
            VariantScalarTypeId::UInt16 => Variant::UInt16(Default::default()),
            VariantScalarTypeId::Int32 => Variant::Int32(Default::default()),
            VariantScalarTypeId::UInt32 => Variant::UInt32(Default::default()),
            VariantScalarTypeId::Int64 => Variant::Int64(Default::default()),
            VariantScalarTypeId::UInt64 => Variant::UInt64(Default::default()),
            VariantScalarTypeId::Float => Variant::Float(Default::default()),
            VariantScalarTypeId::Double => Variant::Double(Default::default()),
            VariantScalarTypeId::String => Variant::String(Default::default()),
            VariantScalarTypeId::DateTime => Variant::DateTime(Default::default()),
            VariantScalarTypeId::Guid => Variant::Guid(Default::default()),
            VariantScalarTypeId::ByteString => Variant::ByteString(Default::default()),
            VariantScalarTypeId::XmlElement => Variant::XmlElement(Default::default()),
            VariantScalarTypeId::NodeId => Variant::NodeId(Default::default()),
            VariantScalarTypeId::ExpandedNodeId => Variant::ExpandedNodeId(Default::default()),
            VariantScalarTypeId::StatusCode => Variant::StatusCode(Default::default()),
            VariantScalarTypeId::QualifiedName => Variant::QualifiedName(Default::default()),
            VariantScalarTypeId::LocalizedText => Variant::LocalizedText(Default::default()),
            VariantScalarTypeId::ExtensionObject => Variant::ExtensionObject(Default::default()),
            VariantScalarTypeId::DataValue => Variant::DataValue(Default::default()),
            VariantScalarTypeId::Variant => Variant::Variant(Default::default()),
            VariantScalarTypeId::DiagnosticInfo => Variant::DiagnosticInfo(Default::default()),
        }
    }

    /// Select part of the value.
    ///
    /// Arrays are indexed by element, strings and byte strings by character.
    /// A range with more than one dimension selects elements of a
    /// multi dimensional array, or elements and then characters of an array
    /// of strings or byte strings.
    pub fn range_of(&self, range: &NumericRange) -> Result<Variant, StatusCode> {
        let dims = match range {
            NumericRange::None => return Ok(self.clone()),
            NumericRange::Index(_) | NumericRange::Range(_, _) => {
                return self.range_of_dimension(range)
            }
            NumericRange::MultipleRanges(dims) => dims,
        };

        let Variant::Array(array) = self else {
            return Err(StatusCode::BadIndexRangeNoData);
        };

        match &array.dimensions {
            Some(shape) if shape.len() == dims.len() && dims.len() > 1 => {
                Self::range_of_matrix(array, shape, dims)
            }
            _ => {
                // Elements by the first range, the content of each element by the rest.
                let Some((first, rest)) = dims.split_first() else {
                    return Err(StatusCode::BadIndexRangeInvalid);
                };
                let Variant::Array(outer) = self.range_of_dimension(first)? else {
                    return Err(StatusCode::BadIndexRangeNoData);
                };
                if rest.is_empty() {
                    return Ok(Variant::Array(outer));
                }
                if rest.len() > 1
                    || !matches!(
                        outer.value_type,
                        VariantScalarTypeId::String | VariantScalarTypeId::ByteString
                    )
                {
                    return Err(StatusCode::BadIndexRangeNoData);
                }
                let values = outer
                    .values
                    .iter()
                    .map(|v| v.range_of_dimension(&rest[0]))
                    .collect::<Result<Vec<_>, _>>()?;
                Array::new(outer.value_type, values)
                    .map(Variant::from)
                    .map_err(|_| StatusCode::BadIndexRangeNoData)
            }
        }
    }

    fn range_of_dimension(&self, range: &NumericRange) -> Result<Variant, StatusCode> {
        let (min, max) = range.bounds().ok_or(StatusCode::BadIndexRangeInvalid)?;
        match self {
            Variant::String(s) => {
                let chars: Vec<char> = s.as_ref().chars().collect();
                let (min, max) = Self::clamp(min, max, chars.len())?;
                Ok(Variant::from(chars[min..=max].iter().collect::<String>()))
            }
            Variant::ByteString(b) => {
                let bytes = b.as_ref();
                let (min, max) = Self::clamp(min, max, bytes.len())?;
                Ok(Variant::from(ByteString::from(bytes[min..=max].to_vec())))
            }
            Variant::Array(array) => {
                let (min, max) = Self::clamp(min, max, array.values.len())?;
                Array::new(array.value_type, array.values[min..=max].to_vec())
                    .map(Variant::from)
                    .map_err(|_| StatusCode::BadIndexRangeNoData)
            }
            _ => Err(StatusCode::BadIndexRangeNoData),
        }
    }

    fn range_of_matrix(
        array: &Array,
        shape: &[u32],
        dims: &[NumericRange],
    ) -> Result<Variant, StatusCode> {
        let mut bounds = Vec::with_capacity(dims.len());
        for (range, len) in dims.iter().zip(shape) {
            let (min, max) = range.bounds().ok_or(StatusCode::BadIndexRangeInvalid)?;
            bounds.push(Self::clamp(min, max, *len as usize)?);
        }
        let new_shape: Vec<u32> = bounds.iter().map(|(a, b)| (b - a + 1) as u32).collect();
        let total: usize = new_shape.iter().map(|d| *d as usize).product();

        let mut values = Vec::with_capacity(total);
        let mut index = vec![0usize; shape.len()];
        for _ in 0..total {
            let mut offset = 0usize;
            for (dim, idx) in index.iter().enumerate() {
                offset = offset * shape[dim] as usize + bounds[dim].0 + idx;
            }
            let value = array
                .values
                .get(offset)
                .ok_or(StatusCode::BadIndexRangeNoData)?;
            values.push(value.clone());
            // Advance the row major counter.
            for dim in (0..index.len()).rev() {
                index[dim] += 1;
                if index[dim] < new_shape[dim] as usize {
                    break;
                }
                index[dim] = 0;
            }
        }
        Array::new_multi(array.value_type, values, new_shape)
            .map(Variant::from)
            .map_err(|_| StatusCode::BadIndexRangeNoData)
    }

    // The start must be in bounds, the end is clamped to the length.
    fn clamp(min: usize, max: usize, len: usize) -> Result<(usize, usize), StatusCode> {
        if min >= len {
            Err(StatusCode::BadIndexRangeNoData)
        } else {
            Ok((min, max.min(len - 1)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{Array, Variant, VariantScalarTypeId};
    use crate::{
        BinaryDecodable, BinaryEncodable, ContextOwned, DecodingOptions, LocalizedText,
        NumericRange, StatusCode,
    };

    fn decode(data: Vec<u8>, ctx: &ContextOwned) -> Result<Variant, crate::Error> {
        Variant::decode(&mut Cursor::new(data), &ctx.context())
    }

    #[test]
    fn scalar_wire_form() {
        let ctx = ContextOwned::default();
        let v = Variant::from(-2i32);
        let buf = v.encode_to_vec(&ctx.context()).unwrap();
        assert_eq!(buf, vec![6, 0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(decode(buf, &ctx).unwrap(), v);
        assert_eq!(
            Variant::Empty.encode_to_vec(&ctx.context()).unwrap(),
            vec![0]
        );
    }

    #[test]
    fn array_with_dimensions() {
        let ctx = ContextOwned::default();
        let values = (1..=6i32).map(Variant::from).collect::<Vec<_>>();
        let v = Variant::from(
            Array::new_multi(VariantScalarTypeId::Int32, values, vec![2, 3]).unwrap(),
        );
        let buf = v.encode_to_vec(&ctx.context()).unwrap();
        assert_eq!(buf[0], 6 | 0x80 | 0x40);
        assert_eq!(buf.len(), v.byte_len(&ctx.context()));
        assert_eq!(decode(buf, &ctx).unwrap(), v);
    }

    #[test]
    fn null_and_empty_arrays_decode_empty() {
        let ctx = ContextOwned::default();
        for len in [-1i32, 0] {
            let mut data = vec![6 | 0x80];
            data.extend_from_slice(&len.to_le_bytes());
            let v = decode(data, &ctx).unwrap();
            assert_eq!(v.as_array().map(|a| a.len()), Some(0));
        }
    }

    #[test]
    fn bad_dimensions() {
        let ctx = ContextOwned::default();
        // Two values, dimensions [3].
        let mut data = vec![3 | 0x80 | 0x40];
        data.extend_from_slice(&2i32.to_le_bytes());
        data.extend_from_slice(&[1, 2]);
        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&3i32.to_le_bytes());
        assert!(decode(data, &ctx).is_err());

        // Dimension bit on a scalar.
        assert!(decode(vec![3 | 0x40, 1], &ctx).is_err());

        // Dimensions whose product overflows.
        let mut data = vec![3 | 0x80 | 0x40];
        data.extend_from_slice(&1i32.to_le_bytes());
        data.push(1);
        data.extend_from_slice(&2i32.to_le_bytes());
        data.extend_from_slice(&i32::MAX.to_le_bytes());
        data.extend_from_slice(&i32::MAX.to_le_bytes());
        assert!(decode(data, &ctx).is_err());
    }

    #[test]
    fn array_length_limit() {
        let ctx = ContextOwned::new_default(
            Default::default(),
            DecodingOptions {
                max_array_length: 4,
                ..Default::default()
            },
        );
        let mut data = vec![3 | 0x80];
        data.extend_from_slice(&5i32.to_le_bytes());
        data.extend_from_slice(&[0; 5]);
        assert_eq!(
            decode(data, &ctx).unwrap_err().status(),
            StatusCode::BadEncodingLimitsExceeded
        );
    }

    #[test]
    fn nested_variant_depth() {
        let ctx = ContextOwned::default();
        // 100 nested variants, far beyond the default depth limit.
        let mut data = vec![24u8; 100];
        data.push(0);
        assert_eq!(
            decode(data, &ctx).unwrap_err().status(),
            StatusCode::BadDecodingError
        );
        let mut data = vec![24u8; 3];
        data.push(0);
        assert!(decode(data, &ctx).is_ok());
    }

    #[test]
    fn unknown_type_id() {
        let ctx = ContextOwned::default();
        assert!(decode(vec![26], &ctx).is_err());
        assert!(decode(vec![], &ctx).is_err());
    }

    #[test]
    fn mixed_array_rejected() {
        assert!(Array::new(
            VariantScalarTypeId::Int32,
            vec![Variant::from(1i32), Variant::from(LocalizedText::from("x"))]
        )
        .is_err());
    }

    #[test]
    fn ranges() {
        let v = Variant::from(vec![1i32, 2, 3, 4]);
        let r: NumericRange = "1:2".parse().unwrap();
        assert_eq!(v.range_of(&r).unwrap(), Variant::from(vec![2i32, 3]));
        let r: NumericRange = "3:10".parse().unwrap();
        assert_eq!(v.range_of(&r).unwrap(), Variant::from(vec![4i32]));
        let r: NumericRange = "4".parse().unwrap();
        assert_eq!(v.range_of(&r), Err(StatusCode::BadIndexRangeNoData));

        let s = Variant::from("hello");
        let r: NumericRange = "1:3".parse().unwrap();
        assert_eq!(s.range_of(&r).unwrap(), Variant::from("ell"));
    }

    #[test]
    fn string_array_ranges() {
        let v = Variant::from(vec!["abcd".to_owned(), "efgh".to_owned(), "ijkl".to_owned()]);
        let r: NumericRange = "1:2,0:1".parse().unwrap();
        assert_eq!(
            v.range_of(&r).unwrap(),
            Variant::from(vec!["ef".to_owned(), "ij".to_owned()])
        );
    }

    #[test]
    fn matrix_ranges() {
        let values = (0..6i32).map(Variant::from).collect::<Vec<_>>();
        // [[0, 1, 2], [3, 4, 5]]
        let v = Variant::from(
            Array::new_multi(VariantScalarTypeId::Int32, values, vec![2, 3]).unwrap(),
        );
        let r: NumericRange = "1,1:2".parse().unwrap();
        let expected = Variant::from(
            Array::new_multi(
                VariantScalarTypeId::Int32,
                vec![Variant::from(4i32), Variant::from(5i32)],
                vec![1, 2],
            )
            .unwrap(),
        );
        assert_eq!(v.range_of(&r).unwrap(), expected);
    }
}
