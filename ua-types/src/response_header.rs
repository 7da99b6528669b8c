// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `ResponseHeader`.

use std::io::{Read, Write};

use crate::{
    date_time::DateTime,
    diagnostic_info::DiagnosticInfo,
    encoding::{BinaryDecodable, BinaryEncodable, EncodingResult},
    extension_object::ExtensionObject,
    request_header::RequestHeader,
    status_code::StatusCode,
    string::UAString,
    Context, Error,
};

/// Common parameters of every response.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Default,
    crate::XmlEncodable,
    crate::XmlDecodable,
    crate::XmlType,
    crate::UaType,
)]
pub struct ResponseHeader {
    /// When the server sent the response.
    pub timestamp: DateTime,
    /// Handle of the request this is a response to.
    pub request_handle: u32,
    /// Result of the service as a whole.
    pub service_result: StatusCode,
    /// Diagnostics for the service result.
    pub service_diagnostics: DiagnosticInfo,
    /// Strings referenced by diagnostics.
    pub string_table: Option<Vec<UAString>>,
    /// Reserved.
    pub additional_header: ExtensionObject,
}

impl BinaryEncodable for ResponseHeader {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut size = 0;
        size += self.timestamp.byte_len(ctx);
        size += self.request_handle.byte_len(ctx);
        size += self.service_result.byte_len(ctx);
        size += self.service_diagnostics.byte_len(ctx);
        size += self.string_table.byte_len(ctx);
        size += self.additional_header.byte_len(ctx);
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
        self.timestamp.encode(stream, ctx)?;
        self.request_handle.encode(stream, ctx)?;
        self.service_result.encode(stream, ctx)?;
        self.service_diagnostics.encode(stream, ctx)?;
        self.string_table.encode(stream, ctx)?;
        self.additional_header.encode(stream, ctx)
    }
}

impl BinaryDecodable for ResponseHeader {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self> {
        let timestamp = DateTime::decode(stream, ctx)?;
        let request_handle = u32::decode(stream, ctx)?;
        let (service_result, service_diagnostics, string_table, additional_header) = (|| {
            Ok((
                StatusCode::decode(stream, ctx)?,
                DiagnosticInfo::decode(stream, ctx)?,
                <Option<Vec<UAString>>>::decode(stream, ctx)?,
                ExtensionObject::decode(stream, ctx)?,
            ))
        })()
        .map_err(|e: Error| e.with_request_handle(request_handle))?;
        Ok(ResponseHeader {
            timestamp,
            request_handle,
            service_result,
            service_diagnostics,
            string_table,
            additional_header,
        })
    }
}

impl ResponseHeader {
    /// A good response to `request_header`.
    pub fn new_good(request_header: &RequestHeader) -> ResponseHeader {
        ResponseHeader::new_service_result(request_header, StatusCode::Good)
    }

    /// A response to `request_header` with the given service result.
    pub fn new_service_result(
        request_header: &RequestHeader,
        service_result: StatusCode,
    ) -> ResponseHeader {
        ResponseHeader::new_for_handle(request_header.request_handle, service_result)
    }

    /// A response to the request with handle `request_handle`.
    pub fn new_for_handle(request_handle: u32, service_result: StatusCode) -> ResponseHeader {
        ResponseHeader {
            timestamp: DateTime::now(),
            request_handle,
            service_result,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{
        BinaryDecodable, BinaryEncodable, ContextOwned, NodeId, RequestHeader, ResponseHeader,
        StatusCode,
    };

    #[test]
    fn handle_attached_to_errors() {
        let ctx_owned = ContextOwned::default();
        let ctx = ctx_owned.context();
        let header = RequestHeader::new(&NodeId::new(0, 5u32), 77);
        let mut buf = header.encode_to_vec(&ctx).unwrap();
        assert_eq!(buf.len(), header.byte_len(&ctx));
        assert_eq!(
            RequestHeader::decode(&mut Cursor::new(&buf), &ctx).unwrap(),
            header
        );

        buf.truncate(buf.len() - 3);
        let err = RequestHeader::decode(&mut Cursor::new(&buf), &ctx).unwrap_err();
        assert_eq!(err.request_handle(), Some(77));

        let response = ResponseHeader::new_service_result(&header, StatusCode::BadTimeout);
        let buf = response.encode_to_vec(&ctx).unwrap();
        let decoded = ResponseHeader::decode(&mut Cursor::new(&buf), &ctx).unwrap();
        assert_eq!(decoded.request_handle, 77);
        assert_eq!(decoded.service_result, StatusCode::BadTimeout);
    }
}
