// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use crate::{node_ids::DataTypeId, Error};

/// The builtin type of a scalar variant value, numbered as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VariantScalarTypeId {
    /// Boolean
    Boolean = 1,
    /// Signed byte
    SByte = 2,
    /// Unsigned byte
    Byte = 3,
    /// Signed 16 bit integer
    Int16 = 4,
    /// Unsigned 16 bit integer
    UInt16 = 5,
    /// Signed 32 bit integer
    Int32 = 6,
    /// Unsigned 32 bit integer
    UInt32 = 7,
    /// Signed 64 bit integer
    Int64 = 8,
    /// Unsigned 64 bit integer
    UInt64 = 9,
    /// 32 bit float
    Float = 10,
    /// 64 bit float
    Double = 11,
    /// String
    String = 12,
    /// DateTime
    DateTime = 13,
    /// Guid
    Guid = 14,
    /// ByteString
    ByteString = 15,
    /// XmlElement
    XmlElement = 16,
    /// NodeId
    NodeId = 17,
    /// ExpandedNodeId
    ExpandedNodeId = 18,
    /// StatusCode
    StatusCode = 19,
    /// QualifiedName
    QualifiedName = 20,
    /// LocalizedText
    LocalizedText = 21,
    /// ExtensionObject
    ExtensionObject = 22,
    /// DataValue
    DataValue = 23,
    /// Variant
    Variant = 24,
    /// DiagnosticInfo
    DiagnosticInfo = 25,
}

const ALL: [VariantScalarTypeId; 25] = [
    VariantScalarTypeId::Boolean,
    VariantScalarTypeId::SByte,
    VariantScalarTypeId::Byte,
    VariantScalarTypeId::Int16,
    VariantScalarTypeId::UInt16,
    VariantScalarTypeId::Int32,
    VariantScalarTypeId::UInt32,
    VariantScalarTypeId::Int64,
    VariantScalarTypeId::UInt64,
    VariantScalarTypeId::Float,
    VariantScalarTypeId::Double,
    VariantScalarTypeId::String,
    VariantScalarTypeId::DateTime,
    VariantScalarTypeId::Guid,
    VariantScalarTypeId::ByteString,
    VariantScalarTypeId::XmlElement,
    VariantScalarTypeId::NodeId,
    VariantScalarTypeId::ExpandedNodeId,
    VariantScalarTypeId::StatusCode,
    VariantScalarTypeId::QualifiedName,
    VariantScalarTypeId::LocalizedText,
    VariantScalarTypeId::ExtensionObject,
    VariantScalarTypeId::DataValue,
    VariantScalarTypeId::Variant,
    VariantScalarTypeId::DiagnosticInfo,
];

impl TryFrom<u8> for VariantScalarTypeId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=25 => Ok(ALL[value as usize - 1]),
            r => Err(Error::decoding(format!("Unknown variant type id {r}"))),
        }
    }
}

impl VariantScalarTypeId {
    /// Element name of the type in the XML encoding.
    pub fn xml_name(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::ByteString => "ByteString",
            Self::XmlElement => "XmlElement",
            Self::NodeId => "NodeId",
            Self::ExpandedNodeId => "ExpandedNodeId",
            Self::StatusCode => "StatusCode",
            Self::QualifiedName => "QualifiedName",
            Self::LocalizedText => "LocalizedText",
            Self::ExtensionObject => "ExtensionObject",
            Self::DataValue => "DataValue",
            Self::Variant => "Variant",
            Self::DiagnosticInfo => "DiagnosticInfo",
        }
    }

    /// Look up a type by its XML element name.
    pub fn from_xml_name(name: &str) -> Option<Self> {
        ALL.iter().find(|t| t.xml_name() == name).copied()
    }

    /// The data type node of the builtin type.
    pub fn data_type_id(&self) -> DataTypeId {
        match self {
            // Data type 22 is Structure, the abstract base of extension object bodies.
            Self::ExtensionObject => DataTypeId::Structure,
            // Data type 24 is BaseDataType, the type of a variant.
            Self::Variant => DataTypeId::BaseDataType,
            other => match DataTypeId::try_from(*other as u32) {
                Ok(id) => id,
                Err(_) => DataTypeId::BaseDataType,
            },
        }
    }

    /// `true` for the numeric types.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::SByte
                | Self::Byte
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
                | Self::Float
                | Self::Double
        )
    }
}

#[cfg(test)]
mod tests {
    use super::VariantScalarTypeId;

    #[test]
    fn wire_ids() {
        assert_eq!(
            VariantScalarTypeId::try_from(6u8).unwrap(),
            VariantScalarTypeId::Int32
        );
        assert_eq!(
            VariantScalarTypeId::try_from(25u8).unwrap(),
            VariantScalarTypeId::DiagnosticInfo
        );
        assert!(VariantScalarTypeId::try_from(0u8).is_err());
        assert!(VariantScalarTypeId::try_from(26u8).is_err());
        assert_eq!(
            VariantScalarTypeId::from_xml_name("QualifiedName"),
            Some(VariantScalarTypeId::QualifiedName)
        );
    }
}
