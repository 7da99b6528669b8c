// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use syn::{parse::Parse, Attribute, DataStruct, Field, Ident, Type};

/// Attribute types that can be repeated on the same item and merged.
pub trait ItemAttr {
    fn combine(&mut self, other: Self);
}

/// Merge every `#[opcua(...)]` attribute in `attrs` into a single value.
pub fn parse_opcua_attrs<T: Parse + ItemAttr + Default>(attrs: &[Attribute]) -> syn::Result<T> {
    let mut final_attr = T::default();
    for attr in attrs {
        let is_opcua = attr.path().segments.len() == 1
            && attr
                .path()
                .segments
                .first()
                .is_some_and(|s| s.ident == "opcua");
        if is_opcua {
            final_attr.combine(attr.parse_args()?);
        }
    }
    Ok(final_attr)
}

pub struct StructField<T> {
    pub ident: Ident,
    pub typ: Type,
    pub attr: T,
}

pub struct StructItem<TFieldAttr, TAttr> {
    pub ident: Ident,
    pub fields: Vec<StructField<TFieldAttr>>,
    pub attribute: TAttr,
}

impl<TFieldAttr: Parse + ItemAttr + Default, TAttr: Parse + ItemAttr + Default>
    StructItem<TFieldAttr, TAttr>
{
    pub fn from_input(
        input: DataStruct,
        attributes: Vec<Attribute>,
        ident: Ident,
    ) -> syn::Result<Self> {
        let fields = input
            .fields
            .into_iter()
            .map(StructField::from_field)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ident,
            fields,
            attribute: parse_opcua_attrs(&attributes)?,
        })
    }
}

impl<T: Parse + ItemAttr + Default> StructField<T> {
    pub fn from_field(field: Field) -> syn::Result<Self> {
        let attr = parse_opcua_attrs(&field.attrs)?;
        let Some(ident) = field.ident else {
            return Err(syn::Error::new_spanned(
                field.ty,
                "Derive macro input must have named fields",
            ));
        };
        Ok(StructField {
            ident,
            typ: field.ty,
            attr,
        })
    }
}
