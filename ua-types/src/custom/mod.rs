// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Structures whose layout is only known at runtime.
//!
//! A [`StructureDefinition`] is registered with a
//! [`TypeRegistryBuilder`](crate::TypeRegistryBuilder), after which
//! `ExtensionObject`s carrying the structure decode into [`DynamicStructure`]
//! values.

mod custom_struct;
mod definition;
mod xml;

pub use custom_struct::DynamicStructure;
pub use definition::{FieldKind, StructureDefinition, StructureField};

#[cfg(test)]
mod tests {
    use std::{io::Cursor, sync::Arc};

    use super::{DynamicStructure, FieldKind, StructureDefinition, StructureField};
    use crate::{
        xml::{from_xml_str, to_xml_string},
        Array, BinaryDecodable, BinaryEncodable, ContextOwned, DecodingOptions, EncodingIds,
        ExtensionObject, NamespaceMap, NodeId, StatusCode, TypeRegistry, TypeRegistryBuilder,
        Variant, VariantScalarTypeId,
    };

    fn point_definition() -> Arc<StructureDefinition> {
        Arc::new(
            StructureDefinition::new(
                "Point",
                NodeId::new(2, 3001u32),
                EncodingIds::new((2, 3002u32), (2, 3003u32)),
                vec![
                    StructureField::new("X", FieldKind::Builtin(VariantScalarTypeId::Double)),
                    StructureField::new("Y", FieldKind::Builtin(VariantScalarTypeId::Double)),
                    StructureField::new("Label", FieldKind::Builtin(VariantScalarTypeId::String))
                        .optional(),
                    StructureField::new("Tags", FieldKind::Builtin(VariantScalarTypeId::String))
                        .array(),
                    StructureField::new("Mode", FieldKind::Enum),
                ],
            )
            .unwrap(),
        )
    }

    fn line_definition() -> Arc<StructureDefinition> {
        Arc::new(
            StructureDefinition::new(
                "Line",
                NodeId::new(2, 3011u32),
                EncodingIds::new((2, 3012u32), (2, 3013u32)),
                vec![
                    StructureField::new("Start", FieldKind::Structure(NodeId::new(2, 3001u32))),
                    StructureField::new("Points", FieldKind::Structure(NodeId::new(2, 3001u32)))
                        .array()
                        .optional(),
                ],
            )
            .unwrap(),
        )
    }

    fn context() -> (ContextOwned, Arc<TypeRegistry>) {
        let mut builder = TypeRegistryBuilder::with_core();
        builder
            .register_structure(point_definition())
            .unwrap()
            .register_structure(line_definition())
            .unwrap();
        let registry = builder.build();
        (
            ContextOwned::new(
                NamespaceMap::new(),
                registry.clone(),
                DecodingOptions::default(),
            ),
            registry,
        )
    }

    fn point(x: f64, label: Option<&str>) -> DynamicStructure {
        DynamicStructure::new(
            point_definition(),
            vec![
                Variant::from(x),
                Variant::from(2.0f64),
                Variant::from(label),
                Variant::from(vec!["a".to_owned(), "b".to_owned()]),
                Variant::Int32(1),
            ],
        )
        .unwrap()
    }

    #[test]
    fn optional_mask() {
        let (ctx_owned, _) = context();
        let ctx = ctx_owned.context();

        let p = point(1.0, None);
        let buf = p.encode_to_vec(&ctx).unwrap();
        assert_eq!(&buf[0..4], &[0, 0, 0, 0]);
        assert_eq!(buf.len(), p.byte_len(&ctx));
        let decoded =
            DynamicStructure::decode_binary(point_definition(), &mut Cursor::new(&buf), &ctx)
                .unwrap();
        assert_eq!(decoded, p);

        let p = point(1.0, Some("here"));
        let buf = p.encode_to_vec(&ctx).unwrap();
        assert_eq!(&buf[0..4], &[1, 0, 0, 0]);
        let decoded =
            DynamicStructure::decode_binary(point_definition(), &mut Cursor::new(&buf), &ctx)
                .unwrap();
        assert_eq!(decoded.get_field_by_name("Label"), Some(&Variant::from("here")));
    }

    #[test]
    fn extension_object_round_trip() {
        let (ctx_owned, registry) = context();
        let ctx = ctx_owned.context();

        let line = DynamicStructure::new(
            line_definition(),
            vec![
                Variant::from(ExtensionObject::from_message_in(point(5.0, None), &registry)),
                Variant::from(
                    Array::new(
                        VariantScalarTypeId::ExtensionObject,
                        vec![
                            Variant::from(ExtensionObject::from_message_in(
                                point(6.0, Some("x")),
                                &registry,
                            )),
                            Variant::from(ExtensionObject::from_message_in(
                                point(7.0, None),
                                &registry,
                            )),
                        ],
                    )
                    .unwrap(),
                ),
            ],
        )
        .unwrap();
        let eo = ExtensionObject::from_message_in(line.clone(), &registry);
        assert_eq!(eo.type_id, NodeId::new(2, 3012u32));

        let buf = eo.encode_to_vec(&ctx).unwrap();
        let decoded = ExtensionObject::decode(&mut Cursor::new(&buf), &ctx).unwrap();
        assert_eq!(decoded.inner_as::<DynamicStructure>(), Some(&line));

        // Without the definition the body is carried as raw bytes.
        let core = ContextOwned::default();
        let raw = ExtensionObject::decode(&mut Cursor::new(&buf), &core.context()).unwrap();
        assert!(raw.inner_as::<DynamicStructure>().is_none());
        assert_eq!(raw.encode_to_vec(&core.context()).unwrap(), buf);
    }

    #[test]
    fn xml_round_trip() {
        let (ctx_owned, registry) = context();
        let ctx = ctx_owned.context();

        let eo = ExtensionObject::from_message_in(point(1.5, Some("p")), &registry);
        let xml = to_xml_string(&eo, &ctx).unwrap();
        assert!(
            xml.contains("<Body><Point><X>1.5</X><Y>2</Y><Label>p</Label>"),
            "{xml}"
        );
        assert!(xml.contains("<Tags><String>a</String><String>b</String></Tags>"));
        let decoded = from_xml_str::<ExtensionObject>(&xml, &ctx).unwrap();
        assert_eq!(decoded.inner_as::<DynamicStructure>(), Some(&point(1.5, Some("p"))));
    }

    #[test]
    fn registry_operations() {
        let (ctx_owned, registry) = context();
        let ctx = ctx_owned.context();
        let p = point(3.0, None);

        let bytes = registry
            .encode_binary(&NodeId::new(2, 3002u32), &p, &ctx)
            .unwrap();
        let mut padded = bytes.clone();
        padded.extend_from_slice(&[0xFF, 0xFF]);
        let (value, consumed) = registry
            .decode_binary_bytes(&NodeId::new(2, 3002u32), &padded, &ctx)
            .unwrap();
        assert_eq!(consumed, bytes.len());
        assert!(value.dyn_eq(&p));

        let err = registry
            .encode_binary(&NodeId::new(2, 3012u32), &p, &ctx)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BadTypeMismatch);

        let empty = registry.make_empty(&NodeId::new(2, 3001u32)).unwrap();
        assert_eq!(empty.xml_tag_name(), "Point");
    }

    #[test]
    fn invalid_values() {
        let mut p = point(1.0, None);
        assert_eq!(
            p.set_field("X", "text").unwrap_err().status(),
            StatusCode::BadTypeMismatch
        );
        assert_eq!(
            p.set_field("Z", 1.0f64).unwrap_err().status(),
            StatusCode::BadInvalidArgument
        );
        p.set_field("Label", Variant::Empty).unwrap();
        assert!(p.set_field("X", Variant::Empty).is_err());
        assert!(DynamicStructure::new(point_definition(), vec![]).is_err());

        let duplicate = StructureDefinition::new(
            "Bad",
            NodeId::new(2, 1u32),
            EncodingIds::new((2, 2u32), (2, 3u32)),
            vec![
                StructureField::new("A", FieldKind::Enum),
                StructureField::new("A", FieldKind::Enum),
            ],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn duplicate_registration() {
        let mut builder = TypeRegistryBuilder::with_core();
        builder.register_structure(point_definition()).unwrap();
        assert!(builder.register_structure(point_definition()).is_err());
    }
}
