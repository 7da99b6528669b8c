// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `StatusCode`.

use std::{
    fmt,
    io::{Read, Write},
};

use crate::{
    read_u32, write_u32,
    xml::{XmlDecodable, XmlEncodable, XmlReadExt, XmlStreamReader, XmlStreamWriter, XmlType, XmlWriteExt},
    Context, DecodingOptions, EncodingResult, SimpleBinaryDecodable, SimpleBinaryEncodable,
};

/// Severity of a status code, held in its two top bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCodeSeverity {
    /// Operation succeeded.
    Good,
    /// Operation partially succeeded, the value may be of reduced quality.
    Uncertain,
    /// Operation failed.
    Bad,
}

/// A 32-bit OPC UA status code. The top two bits are the severity, the next
/// fourteen the sub code, and the low sixteen hold info bits such as
/// `Overflow`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusCode(u32);

const SEVERITY_MASK: u32 = 0xC000_0000;
const SUB_CODE_MASK: u32 = 0xFFFF_0000;
const INFO_TYPE_DATA_VALUE: u32 = 0x0400;
const OVERFLOW: u32 = 0x0080;

macro_rules! status_codes {
    ($($name:ident = $value:literal,)*) => {
        #[allow(non_upper_case_globals)]
        impl StatusCode {
            $(
                #[doc = stringify!($name)]
                pub const $name: StatusCode = StatusCode($value);
            )*

            /// Symbolic name of the sub code, if it is known.
            pub fn name(&self) -> Option<&'static str> {
                match self.0 & SUB_CODE_MASK {
                    $($value => Some(stringify!($name)),)*
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    Good = 0x0000_0000,
    Uncertain = 0x4000_0000,
    Bad = 0x8000_0000,
    BadUnexpectedError = 0x8001_0000,
    BadInternalError = 0x8002_0000,
    BadOutOfMemory = 0x8003_0000,
    BadResourceUnavailable = 0x8004_0000,
    BadCommunicationError = 0x8005_0000,
    BadEncodingError = 0x8006_0000,
    BadDecodingError = 0x8007_0000,
    BadEncodingLimitsExceeded = 0x8008_0000,
    BadUnknownResponse = 0x8009_0000,
    BadTimeout = 0x800A_0000,
    BadServiceUnsupported = 0x800B_0000,
    BadShutdown = 0x800C_0000,
    BadNothingToDo = 0x800F_0000,
    BadTooManyOperations = 0x8010_0000,
    BadDataTypeIdUnknown = 0x8011_0000,
    BadSecurityChecksFailed = 0x8013_0000,
    BadSecureChannelIdInvalid = 0x8022_0000,
    BadNonceInvalid = 0x8024_0000,
    BadSessionIdInvalid = 0x8025_0000,
    BadSessionClosed = 0x8026_0000,
    BadSubscriptionIdInvalid = 0x8028_0000,
    BadRequestHeaderInvalid = 0x802A_0000,
    BadTimestampsToReturnInvalid = 0x802B_0000,
    BadNodeIdInvalid = 0x8033_0000,
    BadNodeIdUnknown = 0x8034_0000,
    BadAttributeIdInvalid = 0x8035_0000,
    BadIndexRangeInvalid = 0x8036_0000,
    BadIndexRangeNoData = 0x8037_0000,
    BadDataEncodingInvalid = 0x8038_0000,
    BadOutOfRange = 0x803C_0000,
    BadNotSupported = 0x803D_0000,
    BadNotFound = 0x803E_0000,
    BadMonitoringModeInvalid = 0x8041_0000,
    BadMonitoredItemIdInvalid = 0x8042_0000,
    BadMonitoredItemFilterInvalid = 0x8043_0000,
    BadMonitoredItemFilterUnsupported = 0x8044_0000,
    BadFilterNotAllowed = 0x8045_0000,
    BadStructureMissing = 0x8046_0000,
    BadContinuationPointInvalid = 0x804A_0000,
    BadNoContinuationPoints = 0x804B_0000,
    BadRequestTypeInvalid = 0x8053_0000,
    BadSecurityModeRejected = 0x8054_0000,
    BadSecurityPolicyRejected = 0x8055_0000,
    BadTypeMismatch = 0x8074_0000,
    BadTooManySubscriptions = 0x8077_0000,
    BadTooManyPublishRequests = 0x8078_0000,
    BadNoSubscription = 0x8079_0000,
    BadSequenceNumberUnknown = 0x807A_0000,
    BadMessageNotAvailable = 0x807B_0000,
    BadSecureChannelClosed = 0x8086_0000,
    BadSecureChannelTokenUnknown = 0x8087_0000,
    BadSequenceNumberInvalid = 0x8088_0000,
    BadDeadbandFilterInvalid = 0x808E_0000,
    BadInvalidArgument = 0x80AB_0000,
    BadInvalidState = 0x80AF_0000,
    BadTooManyMonitoredItems = 0x80DB_0000,
}

impl StatusCode {
    /// Create a status code from its raw bits.
    pub const fn from_u32(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits of the status code.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Severity, read from the top two bits.
    pub fn severity(&self) -> StatusCodeSeverity {
        match self.0 & SEVERITY_MASK {
            0 => StatusCodeSeverity::Good,
            0x4000_0000 => StatusCodeSeverity::Uncertain,
            _ => StatusCodeSeverity::Bad,
        }
    }

    /// `true` if the severity is good.
    pub fn is_good(&self) -> bool {
        self.severity() == StatusCodeSeverity::Good
    }

    /// `true` if the severity is uncertain.
    pub fn is_uncertain(&self) -> bool {
        self.severity() == StatusCodeSeverity::Uncertain
    }

    /// `true` if the severity is bad. Reserved severity `11` also counts as bad.
    pub fn is_bad(&self) -> bool {
        self.severity() == StatusCodeSeverity::Bad
    }

    /// The status code with every info bit cleared.
    pub fn sub_code(&self) -> StatusCode {
        StatusCode(self.0 & SUB_CODE_MASK)
    }

    /// `true` if the overflow info bit is set, meaning a monitored item queue
    /// discarded values before this one was delivered.
    pub fn overflow(&self) -> bool {
        self.0 & INFO_TYPE_DATA_VALUE != 0 && self.0 & OVERFLOW != 0
    }

    /// Set or clear the overflow info bit. Setting it also sets the info type to `DataValue`.
    pub fn set_overflow(self, value: bool) -> StatusCode {
        if value {
            StatusCode(self.0 | INFO_TYPE_DATA_VALUE | OVERFLOW)
        } else {
            StatusCode(self.0 & !OVERFLOW)
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}")?,
            None => write!(f, "0x{:08X}", self.0 & SUB_CODE_MASK)?,
        }
        if self.overflow() {
            write!(f, " | Overflow")?;
        }
        Ok(())
    }
}

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} (0x{:08X})", self.0)
    }
}

impl std::error::Error for StatusCode {}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<StatusCode> for u32 {
    fn from(value: StatusCode) -> Self {
        value.0
    }
}

impl From<StatusCode> for std::io::Error {
    fn from(value: StatusCode) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, value)
    }
}

impl SimpleBinaryEncodable for StatusCode {
    fn byte_len(&self) -> usize {
        4
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        write_u32(stream, self.0)
    }
}

impl SimpleBinaryDecodable for StatusCode {
    fn decode<S: Read + ?Sized>(stream: &mut S, _: &DecodingOptions) -> EncodingResult<Self> {
        Ok(StatusCode(read_u32(stream)?))
    }
}

impl XmlType for StatusCode {
    const TAG: &'static str = "StatusCode";
}

impl XmlEncodable for StatusCode {
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        writer.encode_child("Code", &self.0, ctx)
    }
}

impl XmlDecodable for StatusCode {
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, ctx: &Context<'_>) -> EncodingResult<Self> {
        let code: Option<u32> = read.decode_single_child("Code", ctx)?;
        Ok(StatusCode(code.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::{StatusCode, StatusCodeSeverity};

    #[test]
    fn severity_is_bit_test() {
        assert!(StatusCode::Good.is_good());
        assert!(StatusCode::BadTimeout.is_bad());
        assert_eq!(
            StatusCode::Uncertain.severity(),
            StatusCodeSeverity::Uncertain
        );
        // Reserved severity bits 11 are treated as bad, not compared numerically.
        assert!(StatusCode::from(0xC000_0000).is_bad());
        // Info bits never change severity.
        assert!(StatusCode::Good.set_overflow(true).is_good());
    }

    #[test]
    fn overflow_bit() {
        let s = StatusCode::Good.set_overflow(true);
        assert!(s.overflow());
        assert_eq!(s.bits(), 0x0000_0480);
        assert_eq!(s.sub_code(), StatusCode::Good);
        assert!(!s.set_overflow(false).overflow());
    }

    #[test]
    fn display() {
        assert_eq!(
            StatusCode::BadSequenceNumberUnknown.to_string(),
            "BadSequenceNumberUnknown"
        );
        assert_eq!(
            StatusCode::Good.set_overflow(true).to_string(),
            "Good | Overflow"
        );
        assert_eq!(StatusCode::from(0x8FFF_0000).to_string(), "0x8FFF0000");
    }
}
