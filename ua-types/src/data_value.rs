// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `DataValue`.

use std::io::{Read, Write};

use bitflags::bitflags;

use crate::{
    encoding::{read_u8, write_u8, BinaryDecodable, BinaryEncodable, EncodingResult},
    Context, DateTime, StatusCode, Variant,
};

bitflags! {
    /// Members present in an encoded `DataValue`.
    #[derive(Copy, Clone, Debug, PartialEq)]
    pub struct DataValueFlags: u8 {
        /// Value
        const HAS_VALUE = 0x1;
        /// Status code
        const HAS_STATUS = 0x2;
        /// Source timestamp
        const HAS_SOURCE_TIMESTAMP = 0x4;
        /// Server timestamp
        const HAS_SERVER_TIMESTAMP = 0x8;
        /// Source picoseconds
        const HAS_SOURCE_PICOSECONDS = 0x10;
        /// Server picoseconds
        const HAS_SERVER_PICOSECONDS = 0x20;
    }
}

/// A value with its status and timestamps. A missing status means `Good`.
#[derive(
    Debug, Clone, PartialEq, Default, crate::XmlEncodable, crate::XmlDecodable, crate::XmlType,
)]
pub struct DataValue {
    /// The value.
    #[opcua(optional)]
    pub value: Option<Variant>,
    /// Quality of the value.
    #[opcua(optional, rename = "StatusCode")]
    pub status: Option<StatusCode>,
    /// When the source produced the value.
    #[opcua(optional)]
    pub source_timestamp: Option<DateTime>,
    /// Sub tick precision of the source timestamp, in units of 10 ps.
    #[opcua(optional)]
    pub source_picoseconds: Option<u16>,
    /// When the server received the value.
    #[opcua(optional)]
    pub server_timestamp: Option<DateTime>,
    /// Sub tick precision of the server timestamp, in units of 10 ps.
    #[opcua(optional)]
    pub server_picoseconds: Option<u16>,
}

impl BinaryEncodable for DataValue {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut size = 1;
        if let Some(value) = &self.value {
            size += value.byte_len(ctx);
        }
        size += self.status.map_or(0, |_| 4);
        size += self.source_timestamp.map_or(0, |_| 8);
        size += self.source_picoseconds.map_or(0, |_| 2);
        size += self.server_timestamp.map_or(0, |_| 8);
        size += self.server_picoseconds.map_or(0, |_| 2);
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
        write_u8(stream, self.encoding_mask().bits())?;
        if let Some(value) = &self.value {
            value.encode(stream, ctx)?;
        }
        if let Some(status) = &self.status {
            status.encode(stream, ctx)?;
        }
        if let Some(ts) = &self.source_timestamp {
            ts.encode(stream, ctx)?;
        }
        if let Some(ps) = &self.source_picoseconds {
            ps.encode(stream, ctx)?;
        }
        if let Some(ts) = &self.server_timestamp {
            ts.encode(stream, ctx)?;
        }
        if let Some(ps) = &self.server_picoseconds {
            ps.encode(stream, ctx)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for DataValue {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self> {
        let mask = DataValueFlags::from_bits_truncate(read_u8(stream)?);
        let value = if mask.contains(DataValueFlags::HAS_VALUE) {
            Some(Variant::decode(stream, ctx)?)
        } else {
            None
        };
        let status = if mask.contains(DataValueFlags::HAS_STATUS) {
            Some(StatusCode::decode(stream, ctx)?)
        } else {
            None
        };
        let source_timestamp = if mask.contains(DataValueFlags::HAS_SOURCE_TIMESTAMP) {
            Some(DateTime::decode(stream, ctx)?)
        } else {
            None
        };
        let source_picoseconds = if mask.contains(DataValueFlags::HAS_SOURCE_PICOSECONDS) {
            Some(u16::decode(stream, ctx)?)
        } else {
            None
        };
        let server_timestamp = if mask.contains(DataValueFlags::HAS_SERVER_TIMESTAMP) {
            Some(DateTime::decode(stream, ctx)?)
        } else {
            None
        };
        let server_picoseconds = if mask.contains(DataValueFlags::HAS_SERVER_PICOSECONDS) {
            Some(u16::decode(stream, ctx)?)
        } else {
            None
        };
        Ok(DataValue {
            value,
            status,
            source_timestamp,
            source_picoseconds,
            server_timestamp,
            server_picoseconds,
        })
    }
}

impl From<Variant> for DataValue {
    fn from(value: Variant) -> Self {
        Self::value_only(value)
    }
}

impl DataValue {
    /// A good value with both timestamps set to now.
    pub fn new_now(value: impl Into<Variant>) -> DataValue {
        let now = DateTime::now();
        DataValue {
            value: Some(value.into()),
            status: Some(StatusCode::Good),
            source_timestamp: Some(now),
            server_timestamp: Some(now),
            ..Default::default()
        }
    }

    /// A value with no status or timestamps.
    pub fn value_only(value: impl Into<Variant>) -> DataValue {
        DataValue {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Status of the value, `Good` when absent.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::Good)
    }

    /// `true` if the value is present and its status is not bad.
    pub fn is_valid(&self) -> bool {
        self.value.is_some() && !self.status().is_bad()
    }

    /// Mask of the members that are present.
    pub fn encoding_mask(&self) -> DataValueFlags {
        let mut mask = DataValueFlags::empty();
        mask.set(DataValueFlags::HAS_VALUE, self.value.is_some());
        mask.set(DataValueFlags::HAS_STATUS, self.status.is_some());
        mask.set(
            DataValueFlags::HAS_SOURCE_TIMESTAMP,
            self.source_timestamp.is_some(),
        );
        mask.set(
            DataValueFlags::HAS_SOURCE_PICOSECONDS,
            self.source_picoseconds.is_some(),
        );
        mask.set(
            DataValueFlags::HAS_SERVER_TIMESTAMP,
            self.server_timestamp.is_some(),
        );
        mask.set(
            DataValueFlags::HAS_SERVER_PICOSECONDS,
            self.server_picoseconds.is_some(),
        );
        mask
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::DataValue;
    use crate::{BinaryDecodable, BinaryEncodable, ContextOwned, DateTime, StatusCode};

    #[test]
    fn mask_and_order() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        let dv = DataValue {
            value: Some(7u8.into()),
            status: Some(StatusCode::BadTimeout),
            server_picoseconds: Some(3),
            ..Default::default()
        };
        let buf = dv.encode_to_vec(&ctx).unwrap();
        assert_eq!(
            buf,
            vec![0x23, 3, 7, 0x00, 0x00, 0x0A, 0x80, 3, 0]
        );
        assert_eq!(buf.len(), dv.byte_len(&ctx));
        assert_eq!(DataValue::decode(&mut Cursor::new(buf), &ctx).unwrap(), dv);
    }

    #[test]
    fn empty_value() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        let dv = DataValue::default();
        assert_eq!(dv.encode_to_vec(&ctx).unwrap(), vec![0]);
        assert_eq!(dv.status(), StatusCode::Good);
        assert!(!dv.is_valid());
    }

    #[test]
    fn timestamps() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        let dv = DataValue {
            source_timestamp: Some(DateTime::from_ticks(1_000)),
            ..DataValue::new_now(1.5f64)
        };
        let buf = dv.encode_to_vec(&ctx).unwrap();
        assert_eq!(buf[0], 0x0F);
        assert_eq!(DataValue::decode(&mut Cursor::new(buf), &ctx).unwrap(), dv);
    }
}
