// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use crate::Error;

/// Trait implemented by simple OPC UA enums. Derive it with
/// `#[derive(UaEnum)]` on an enum with a `#[repr(..)]` attribute.
pub trait UaEnum: Sized {
    /// The numeric type used to represent this enum when encoded.
    type Repr: Copy;

    /// Convert from a numeric value to an instance of this enum.
    fn from_repr(repr: Self::Repr) -> Result<Self, Error>;

    /// Convert this enum into its numeric representation.
    fn into_repr(self) -> Self::Repr;

    /// The XML form of this value, `Name_Value`.
    fn as_str(&self) -> &'static str;

    /// Parse the XML form of this value, `Name_Value`.
    fn from_str(val: &str) -> Result<Self, Error>;
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{
        xml::{from_xml_str, to_xml_string},
        BinaryDecodable, BinaryEncodable, ContextOwned, MonitoringMode, TimestampsToReturn,
        UaEnum,
    };

    #[test]
    fn enum_forms() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        assert_eq!(TimestampsToReturn::default(), TimestampsToReturn::Both);
        assert_eq!(TimestampsToReturn::Neither.as_str(), "Neither_3");
        assert_eq!(
            TimestampsToReturn::from_str("Server_1").unwrap(),
            TimestampsToReturn::Server
        );
        assert!(TimestampsToReturn::from_repr(9).is_err());

        let buf = MonitoringMode::Sampling.encode_to_vec(&ctx).unwrap();
        assert_eq!(buf, [1, 0, 0, 0]);
        assert_eq!(
            MonitoringMode::decode(&mut Cursor::new(&buf), &ctx).unwrap(),
            MonitoringMode::Sampling
        );
        assert!(MonitoringMode::decode(&mut Cursor::new([7, 0, 0, 0]), &ctx).is_err());

        let xml = to_xml_string(&MonitoringMode::Reporting, &ctx).unwrap();
        assert_eq!(xml, "<MonitoringMode>Reporting_2</MonitoringMode>");
        assert_eq!(
            from_xml_str::<MonitoringMode>(&xml, &ctx).unwrap(),
            MonitoringMode::Reporting
        );
    }
}
