// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `DiagnosticInfo`.

use std::io::{Read, Write};

use bitflags::bitflags;

use crate::{
    encoding::{read_u32, read_u8, write_u32, write_u8, BinaryDecodable, BinaryEncodable, EncodingResult},
    status_code::StatusCode,
    string::UAString,
    Context, DecodingOptions,
};

bitflags! {
    /// Members present in an encoded `DiagnosticInfo`.
    #[derive(Copy, Clone, Debug, PartialEq, Default)]
    pub struct DiagnosticInfoMask: u8 {
        /// Symbolic id.
        const HAS_SYMBOLIC_ID = 0x01;
        /// Namespace.
        const HAS_NAMESPACE = 0x02;
        /// Localized text.
        const HAS_LOCALIZED_TEXT = 0x04;
        /// Locale.
        const HAS_LOCALE = 0x08;
        /// Additional info.
        const HAS_ADDITIONAL_INFO = 0x10;
        /// Inner status code.
        const HAS_INNER_STATUS_CODE = 0x20;
        /// Inner diagnostic info.
        const HAS_INNER_DIAGNOSTIC_INFO = 0x40;
    }
}

bitflags! {
    /// Diagnostics a client asks for in `RequestHeader::return_diagnostics`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Hash)]
    pub struct DiagnosticBits: u32 {
        /// ServiceLevel / SymbolicId
        const SERVICE_LEVEL_SYMBOLIC_ID = 0x0000_0001;
        /// ServiceLevel / LocalizedText
        const SERVICE_LEVEL_LOCALIZED_TEXT = 0x0000_0002;
        /// ServiceLevel / AdditionalInfo
        const SERVICE_LEVEL_ADDITIONAL_INFO = 0x0000_0004;
        /// ServiceLevel / Inner StatusCode
        const SERVICE_LEVEL_INNER_STATUS_CODE = 0x0000_0008;
        /// ServiceLevel / Inner Diagnostics
        const SERVICE_LEVEL_INNER_DIAGNOSTICS = 0x0000_0010;
        /// OperationLevel / SymbolicId
        const OPERATIONAL_LEVEL_SYMBOLIC_ID = 0x0000_0020;
        /// OperationLevel / LocalizedText
        const OPERATIONAL_LEVEL_LOCALIZED_TEXT = 0x0000_0040;
        /// OperationLevel / AdditionalInfo
        const OPERATIONAL_LEVEL_ADDITIONAL_INFO = 0x0000_0080;
        /// OperationLevel / Inner StatusCode
        const OPERATIONAL_LEVEL_INNER_STATUS_CODE = 0x0000_0100;
        /// OperationLevel / Inner Diagnostics
        const OPERATIONAL_LEVEL_INNER_DIAGNOSTICS = 0x0000_0200;
    }
}

impl crate::SimpleBinaryEncodable for DiagnosticBits {
    fn byte_len(&self) -> usize {
        4
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        write_u32(stream, self.bits())
    }
}

impl crate::SimpleBinaryDecodable for DiagnosticBits {
    fn decode<S: Read + ?Sized>(stream: &mut S, _: &DecodingOptions) -> EncodingResult<Self> {
        Ok(Self::from_bits_truncate(read_u32(stream)?))
    }
}

mod xml {
    use std::io::{Read, Write};

    use super::DiagnosticBits;
    use crate::{xml::*, Context, EncodingResult};

    impl XmlType for DiagnosticBits {
        const TAG: &'static str = u32::TAG;
    }

    impl XmlEncodable for DiagnosticBits {
        fn encode(
            &self,
            writer: &mut XmlStreamWriter<&mut dyn Write>,
            ctx: &Context<'_>,
        ) -> EncodingResult<()> {
            self.bits().encode(writer, ctx)
        }
    }

    impl XmlDecodable for DiagnosticBits {
        fn decode(
            read: &mut XmlStreamReader<&mut dyn Read>,
            ctx: &Context<'_>,
        ) -> EncodingResult<Self> {
            Ok(Self::from_bits_truncate(u32::decode(read, ctx)?))
        }
    }
}

/// Vendor specific diagnostics attached to a status. String members are
/// indexes into the response's string table.
#[derive(
    PartialEq, Debug, Clone, Default, crate::XmlEncodable, crate::XmlDecodable, crate::XmlType,
)]
pub struct DiagnosticInfo {
    /// Index of the symbolic id in the string table.
    #[opcua(optional)]
    pub symbolic_id: Option<i32>,
    /// Index of the namespace uri in the string table.
    #[opcua(optional)]
    pub namespace_uri: Option<i32>,
    /// Index of the locale in the string table.
    #[opcua(optional)]
    pub locale: Option<i32>,
    /// Index of the localized text in the string table.
    #[opcua(optional)]
    pub localized_text: Option<i32>,
    /// Free form detail.
    #[opcua(optional)]
    pub additional_info: Option<UAString>,
    /// Status code from a lower layer.
    #[opcua(optional)]
    pub inner_status_code: Option<StatusCode>,
    /// Diagnostics from a lower layer.
    #[opcua(optional)]
    pub inner_diagnostic_info: Option<Box<DiagnosticInfo>>,
}

impl BinaryEncodable for DiagnosticInfo {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut size: usize = 1;
        size += self.symbolic_id.map_or(0, |_| 4);
        size += self.namespace_uri.map_or(0, |_| 4);
        size += self.locale.map_or(0, |_| 4);
        size += self.localized_text.map_or(0, |_| 4);
        if let Some(additional_info) = &self.additional_info {
            size += additional_info.byte_len(ctx);
        }
        size += self.inner_status_code.map_or(0, |_| 4);
        if let Some(inner) = &self.inner_diagnostic_info {
            size += inner.byte_len(ctx);
        }
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
        write_u8(stream, self.encoding_mask().bits())?;
        for v in [self.symbolic_id, self.namespace_uri, self.locale, self.localized_text]
            .into_iter()
            .flatten()
        {
            v.encode(stream, ctx)?;
        }
        if let Some(additional_info) = &self.additional_info {
            additional_info.encode(stream, ctx)?;
        }
        if let Some(inner_status_code) = &self.inner_status_code {
            inner_status_code.encode(stream, ctx)?;
        }
        if let Some(inner) = &self.inner_diagnostic_info {
            inner.as_ref().encode(stream, ctx)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for DiagnosticInfo {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self> {
        let encoding_mask = DiagnosticInfoMask::from_bits_truncate(read_u8(stream)?);
        let mut diagnostic_info = DiagnosticInfo::default();

        if encoding_mask.contains(DiagnosticInfoMask::HAS_SYMBOLIC_ID) {
            diagnostic_info.symbolic_id = Some(i32::decode(stream, ctx)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_NAMESPACE) {
            diagnostic_info.namespace_uri = Some(i32::decode(stream, ctx)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_LOCALE) {
            diagnostic_info.locale = Some(i32::decode(stream, ctx)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_LOCALIZED_TEXT) {
            diagnostic_info.localized_text = Some(i32::decode(stream, ctx)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_ADDITIONAL_INFO) {
            diagnostic_info.additional_info = Some(UAString::decode(stream, ctx)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_INNER_STATUS_CODE) {
            diagnostic_info.inner_status_code = Some(StatusCode::decode(stream, ctx)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_INNER_DIAGNOSTIC_INFO) {
            let _depth_lock = ctx.options().depth_lock()?;
            diagnostic_info.inner_diagnostic_info =
                Some(Box::new(DiagnosticInfo::decode(stream, ctx)?));
        }
        Ok(diagnostic_info)
    }
}

impl DiagnosticInfo {
    /// No members set.
    pub fn null() -> DiagnosticInfo {
        DiagnosticInfo::default()
    }

    /// Mask describing which members are present.
    pub fn encoding_mask(&self) -> DiagnosticInfoMask {
        let mut mask = DiagnosticInfoMask::empty();
        mask.set(DiagnosticInfoMask::HAS_SYMBOLIC_ID, self.symbolic_id.is_some());
        mask.set(DiagnosticInfoMask::HAS_NAMESPACE, self.namespace_uri.is_some());
        mask.set(DiagnosticInfoMask::HAS_LOCALE, self.locale.is_some());
        mask.set(DiagnosticInfoMask::HAS_LOCALIZED_TEXT, self.localized_text.is_some());
        mask.set(DiagnosticInfoMask::HAS_ADDITIONAL_INFO, self.additional_info.is_some());
        mask.set(
            DiagnosticInfoMask::HAS_INNER_STATUS_CODE,
            self.inner_status_code.is_some(),
        );
        mask.set(
            DiagnosticInfoMask::HAS_INNER_DIAGNOSTIC_INFO,
            self.inner_diagnostic_info.is_some(),
        );
        mask
    }
}
