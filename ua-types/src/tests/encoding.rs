// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::io::Cursor;

use crate::{
    BinaryDecodable, BinaryEncodable, ByteString, ChannelSecurityToken, DateTime,
    DecodingOptions, ExtensionObject, NodeId, OpenSecureChannelRequest, RequestHeader,
    SecurityTokenRequestType, StatusCode, UAString, Variant, XmlDecodable, XmlEncodable, XmlType,
};

use super::context;

#[derive(
    Debug,
    Clone,
    PartialEq,
    Default,
    BinaryEncodable,
    BinaryDecodable,
    XmlEncodable,
    XmlDecodable,
    XmlType,
)]
struct Settings {
    name: UAString,
    #[opcua(optional)]
    limit: Option<u32>,
    values: Option<Vec<i32>>,
    #[opcua(optional)]
    label: Option<UAString>,
    #[opcua(ignore)]
    cached: bool,
}

fn round_trip<T: BinaryEncodable + BinaryDecodable + PartialEq + std::fmt::Debug>(value: &T) -> Vec<u8> {
    let ctx_owned = context();
    let ctx = ctx_owned.context();
    let buf = value.encode_to_vec(&ctx).unwrap();
    assert_eq!(buf.len(), value.byte_len(&ctx));
    let decoded = T::decode(&mut Cursor::new(&buf), &ctx).unwrap();
    assert_eq!(&decoded, value);
    buf
}

#[test]
fn optional_fields_mask() {
    let buf = round_trip(&Settings {
        name: "a".into(),
        limit: None,
        values: None,
        label: Some("x".into()),
        cached: false,
    });
    // Bit 1 for the second optional field, then the name.
    assert_eq!(&buf[..9], &[2, 0, 0, 0, 1, 0, 0, 0, b'a']);
    // Null array.
    assert_eq!(&buf[9..13], &[0xFF, 0xFF, 0xFF, 0xFF]);

    let buf = round_trip(&Settings {
        name: UAString::null(),
        limit: Some(5),
        values: Some(vec![]),
        label: None,
        cached: false,
    });
    assert_eq!(
        buf,
        [1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 5, 0, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn ignored_fields_decode_default() {
    let ctx_owned = context();
    let ctx = ctx_owned.context();
    let value = Settings {
        cached: true,
        ..Default::default()
    };
    let buf = value.encode_to_vec(&ctx).unwrap();
    let decoded = Settings::decode(&mut Cursor::new(&buf), &ctx).unwrap();
    assert!(!decoded.cached);
}

#[test]
fn request_round_trip() {
    round_trip(&OpenSecureChannelRequest {
        request_header: RequestHeader::new(&NodeId::new(1, "session"), 12),
        client_protocol_version: 0,
        request_type: SecurityTokenRequestType::Renew,
        security_mode: crate::MessageSecurityMode::SignAndEncrypt,
        client_nonce: ByteString::from(vec![1u8; 32]),
        requested_lifetime: 60_000,
    });
}

#[test]
fn bogus_array_length_is_rejected_without_allocation() {
    let ctx_owned = context();
    let ctx = ctx_owned.context();
    // Array of i32 claiming 2^31 - 1 elements, followed by 4 bytes.
    let buf = [0xFF, 0xFF, 0xFF, 0x7F, 1, 0, 0, 0];
    let err = <Option<Vec<i32>>>::decode(&mut Cursor::new(&buf), &ctx).unwrap_err();
    assert_eq!(err.status(), StatusCode::BadEncodingLimitsExceeded);

    let mut options = DecodingOptions::default();
    options.max_array_length = usize::MAX;
    let ctx_owned = crate::ContextOwned::new_default(Default::default(), options);
    let err = <Option<Vec<i32>>>::decode(&mut Cursor::new(&buf), &ctx_owned.context())
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BadDecodingError);
}

#[test]
fn unregistered_body_inside_variant_array() {
    let ctx_owned = context();
    let ctx = ctx_owned.context();
    let unknown = ExtensionObject::from_binary(NodeId::new(5, "Future"), vec![9, 8, 7]);
    let known = ExtensionObject::from_message(ChannelSecurityToken {
        channel_id: 1,
        token_id: 2,
        created_at: DateTime::from_ticks(5),
        revised_lifetime: 1000,
    });
    let value = Variant::from(vec![unknown.clone(), known.clone()]);
    let buf = round_trip(&value);
    let decoded = Variant::decode(&mut Cursor::new(&buf), &ctx).unwrap();
    let items = decoded.as_array().unwrap();
    assert_eq!(items[0], Variant::from(unknown));
    let Variant::ExtensionObject(eo) = &items[1] else {
        panic!("Expected an extension object");
    };
    assert_eq!(
        eo.inner_as::<ChannelSecurityToken>().map(|t| t.token_id),
        Some(2)
    );
    assert_eq!(decoded.encode_to_vec(&ctx).unwrap(), buf);
}
