// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use crate::{
    ByteString, DateTime, MessageSecurityMode, RequestHeader, ResponseHeader,
    SecurityTokenRequestType,
};

/// Identifies the symmetric keys securing a channel and how long they live.
#[crate::ua_encodable]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelSecurityToken {
    /// Channel the token belongs to.
    pub channel_id: u32,
    /// Token id, unique within the channel.
    pub token_id: u32,
    /// When the server issued the token.
    pub created_at: DateTime,
    /// Lifetime granted by the server, in milliseconds.
    pub revised_lifetime: u32,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenSecureChannelRequest {
    pub request_header: RequestHeader,
    pub client_protocol_version: u32,
    pub request_type: SecurityTokenRequestType,
    pub security_mode: MessageSecurityMode,
    pub client_nonce: ByteString,
    /// Requested token lifetime in milliseconds.
    pub requested_lifetime: u32,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenSecureChannelResponse {
    pub response_header: ResponseHeader,
    pub server_protocol_version: u32,
    pub security_token: ChannelSecurityToken,
    pub server_nonce: ByteString,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloseSecureChannelRequest {
    pub request_header: RequestHeader,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloseSecureChannelResponse {
    pub response_header: ResponseHeader,
}
