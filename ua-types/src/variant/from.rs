// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Conversions into `Variant`.

use crate::{
    ByteString, DataValue, DateTime, DiagnosticInfo, ExpandedNodeId, ExtensionObject, Guid,
    LocalizedText, NodeId, QualifiedName, StatusCode, UAString, XmlElement,
};

use super::{Array, Variant, VariantScalarTypeId};

macro_rules! from_scalar {
    ($t:ty, $variant:ident) => {
        impl From<$t> for Variant {
            fn from(value: $t) -> Self {
                Variant::$variant(value)
            }
        }
    };
    ($t:ty, $variant:ident, boxed) => {
        impl From<$t> for Variant {
            fn from(value: $t) -> Self {
                Variant::$variant(Box::new(value))
            }
        }
    };
}

from_scalar!(bool, Boolean);
from_scalar!(i8, SByte);
from_scalar!(u8, Byte);
from_scalar!(i16, Int16);
from_scalar!(u16, UInt16);
from_scalar!(i32, Int32);
from_scalar!(u32, UInt32);
from_scalar!(i64, Int64);
from_scalar!(u64, UInt64);
from_scalar!(f32, Float);
from_scalar!(f64, Double);
from_scalar!(UAString, String);
from_scalar!(StatusCode, StatusCode);
from_scalar!(ByteString, ByteString);
from_scalar!(XmlElement, XmlElement);
from_scalar!(ExtensionObject, ExtensionObject);
from_scalar!(DateTime, DateTime, boxed);
from_scalar!(Guid, Guid, boxed);
from_scalar!(QualifiedName, QualifiedName, boxed);
from_scalar!(LocalizedText, LocalizedText, boxed);
from_scalar!(NodeId, NodeId, boxed);
from_scalar!(ExpandedNodeId, ExpandedNodeId, boxed);
from_scalar!(DataValue, DataValue, boxed);
from_scalar!(DiagnosticInfo, DiagnosticInfo, boxed);

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(UAString::from(value))
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::String(UAString::from(value))
    }
}

impl From<Array> for Variant {
    fn from(value: Array) -> Self {
        Variant::Array(Box::new(value))
    }
}

impl<T> From<Option<T>> for Variant
where
    T: Into<Variant>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Variant::Empty, Into::into)
    }
}

macro_rules! from_vec {
    ($t:ty, $type_id:ident) => {
        impl From<Vec<$t>> for Variant {
            fn from(values: Vec<$t>) -> Self {
                Variant::from(Array {
                    value_type: VariantScalarTypeId::$type_id,
                    values: values.into_iter().map(Variant::from).collect(),
                    dimensions: None,
                })
            }
        }
    };
}

from_vec!(bool, Boolean);
from_vec!(i8, SByte);
from_vec!(i16, Int16);
from_vec!(u16, UInt16);
from_vec!(i32, Int32);
from_vec!(u32, UInt32);
from_vec!(i64, Int64);
from_vec!(u64, UInt64);
from_vec!(f32, Float);
from_vec!(f64, Double);
from_vec!(String, String);
from_vec!(UAString, String);
from_vec!(StatusCode, StatusCode);
from_vec!(NodeId, NodeId);
from_vec!(DataValue, DataValue);
from_vec!(ExtensionObject, ExtensionObject);

// Byte vectors become a ByteString, the usual meaning of a `Vec<u8>`.
impl From<Vec<u8>> for Variant {
    fn from(value: Vec<u8>) -> Self {
        Variant::ByteString(ByteString::from(value))
    }
}
