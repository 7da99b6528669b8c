// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use hashbrown::HashMap;

use crate::{EncodingIds, Error, NodeId, StatusCode, Variant, VariantScalarTypeId};

/// How a field of a dynamic structure is encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A builtin type.
    Builtin(VariantScalarTypeId),
    /// A registered structure, named by its data type id. Values are held as
    /// decoded `ExtensionObject`s and encoded without the wrapper.
    Structure(NodeId),
    /// An enumeration, encoded as `Int32`.
    Enum,
}

impl FieldKind {
    /// Type of the variant holding a value of this kind.
    pub fn scalar_type(&self) -> VariantScalarTypeId {
        match self {
            FieldKind::Builtin(t) => *t,
            FieldKind::Structure(_) => VariantScalarTypeId::ExtensionObject,
            FieldKind::Enum => VariantScalarTypeId::Int32,
        }
    }
}

/// One field of a [`StructureDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub struct StructureField {
    /// Field name, also its XML element name.
    pub name: String,
    /// Encoding of the field.
    pub kind: FieldKind,
    /// The field is a one dimensional array.
    pub is_array: bool,
    /// The field may be absent.
    pub is_optional: bool,
}

impl StructureField {
    /// A required scalar field.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_array: false,
            is_optional: false,
        }
    }

    /// Make the field an array.
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// Make the field optional.
    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    /// Check that `value` can be stored in this field.
    pub fn validate(&self, value: &Variant) -> Result<(), Error> {
        match value {
            Variant::Empty if self.is_optional => Ok(()),
            // A null array.
            Variant::Empty if self.is_array => Ok(()),
            Variant::Empty => Err(Error::new(
                StatusCode::BadInvalidArgument,
                format!("Null value for required field {}", self.name),
            )),
            Variant::Array(a) if self.is_array => {
                if a.value_type != self.kind.scalar_type() {
                    return Err(self.mismatch(value));
                }
                a.values.iter().try_for_each(|v| self.validate_scalar(v))
            }
            _ if self.is_array => Err(self.mismatch(value)),
            v => self.validate_scalar(v),
        }
    }

    fn validate_scalar(&self, value: &Variant) -> Result<(), Error> {
        if value.scalar_type_id() != Some(self.kind.scalar_type()) {
            return Err(self.mismatch(value));
        }
        if let (FieldKind::Structure(_), Variant::ExtensionObject(eo)) = (&self.kind, value) {
            if eo.inner_type_tag().is_none() {
                return Err(Error::new(
                    StatusCode::BadInvalidArgument,
                    format!("Field {} requires a decoded structure", self.name),
                ));
            }
        }
        Ok(())
    }

    fn mismatch(&self, value: &Variant) -> Error {
        Error::new(
            StatusCode::BadTypeMismatch,
            format!("Value {value} does not match field {}", self.name),
        )
    }
}

/// The layout of a structure that is only known at runtime, such as one read
/// from a server's type dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureDefinition {
    /// Structure name, also its XML element name.
    pub name: String,
    /// Data type id.
    pub data_type_id: NodeId,
    /// Encoding ids.
    pub ids: EncodingIds,
    /// Fields in encoding order.
    pub fields: Vec<StructureField>,
    index_by_name: HashMap<String, usize>,
}

impl StructureDefinition {
    /// Create a definition. Field names must be unique and non-empty.
    pub fn new(
        name: impl Into<String>,
        data_type_id: NodeId,
        ids: EncodingIds,
        fields: Vec<StructureField>,
    ) -> Result<Self, Error> {
        let name = name.into();
        let mut index_by_name = HashMap::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            if field.name.is_empty() || index_by_name.insert(field.name.clone(), idx).is_some() {
                return Err(Error::new(
                    StatusCode::BadInvalidArgument,
                    format!("Invalid or duplicate field name {:?} in {name}", field.name),
                ));
            }
        }
        let optional = fields.iter().filter(|f| f.is_optional).count();
        if optional > 32 {
            return Err(Error::new(
                StatusCode::BadInvalidArgument,
                format!("{name} has {optional} optional fields, at most 32 are supported"),
            ));
        }
        Ok(Self {
            name,
            data_type_id,
            ids,
            fields,
            index_by_name,
        })
    }

    /// `true` if the encoding starts with an optional field mask.
    pub fn has_optional_fields(&self) -> bool {
        self.fields.iter().any(|f| f.is_optional)
    }

    /// Index of the field called `name`.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }
}
