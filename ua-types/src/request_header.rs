// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `RequestHeader`.

use std::io::{Read, Write};

use crate::{
    date_time::DateTime,
    diagnostic_info::DiagnosticBits,
    encoding::{BinaryDecodable, BinaryEncodable, EncodingResult},
    extension_object::ExtensionObject,
    node_id::NodeId,
    string::UAString,
    Context, Error,
};

/// Common parameters of every request.
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
pub struct RequestHeader {
    /// Session authentication token.
    pub authentication_token: NodeId,
    /// When the client sent the request.
    pub timestamp: DateTime,
    /// Client chosen handle, echoed in the response.
    pub request_handle: u32,
    /// Diagnostics the client wants back.
    pub return_diagnostics: DiagnosticBits,
    /// Audit log entry id.
    pub audit_entry_id: UAString,
    /// How long the client waits for the response, in milliseconds. Zero means
    /// no timeout.
    pub timeout_hint: u32,
    /// Reserved.
    pub additional_header: ExtensionObject,
}

impl BinaryEncodable for RequestHeader {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut size: usize = 0;
        size += self.authentication_token.byte_len(ctx);
        size += self.timestamp.byte_len(ctx);
        size += self.request_handle.byte_len(ctx);
        size += self.return_diagnostics.byte_len(ctx);
        size += self.audit_entry_id.byte_len(ctx);
        size += self.timeout_hint.byte_len(ctx);
        size += self.additional_header.byte_len(ctx);
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
        self.authentication_token.encode(stream, ctx)?;
        self.timestamp.encode(stream, ctx)?;
        self.request_handle.encode(stream, ctx)?;
        self.return_diagnostics.encode(stream, ctx)?;
        self.audit_entry_id.encode(stream, ctx)?;
        self.timeout_hint.encode(stream, ctx)?;
        self.additional_header.encode(stream, ctx)
    }
}

impl BinaryDecodable for RequestHeader {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self> {
        let authentication_token = NodeId::decode(stream, ctx)?;
        let timestamp = DateTime::decode(stream, ctx)?;
        let request_handle = u32::decode(stream, ctx)?;
        // Once the handle is known, later failures can be reported against it.
        let (return_diagnostics, audit_entry_id, timeout_hint, additional_header) = (|| {
            let return_diagnostics = DiagnosticBits::decode(stream, ctx)?;
            let audit_entry_id = UAString::decode(stream, ctx)?;
            let timeout_hint = u32::decode(stream, ctx)?;
            let additional_header = ExtensionObject::decode(stream, ctx)?;
            Ok((
                return_diagnostics,
                audit_entry_id,
                timeout_hint,
                additional_header,
            ))
        })()
        .map_err(|e: Error| e.with_request_handle(request_handle))?;

        Ok(RequestHeader {
            authentication_token,
            timestamp,
            request_handle,
            return_diagnostics,
            audit_entry_id,
            timeout_hint,
            additional_header,
        })
    }
}

impl RequestHeader {
    /// A header for a new request sent now.
    pub fn new(authentication_token: &NodeId, request_handle: u32) -> RequestHeader {
        RequestHeader {
            authentication_token: authentication_token.clone(),
            timestamp: DateTime::now(),
            request_handle,
            ..Default::default()
        }
    }

    /// A header without a session, for channel level requests.
    pub fn dummy() -> RequestHeader {
        RequestHeader::new(&NodeId::null(), 1)
    }
}
