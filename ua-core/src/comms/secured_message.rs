// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The secured message envelope.
//!
//! ```text
//! channel id      u32 ┐
//! token id        u32 │ signed
//! sequence number u32 ┤ ┐
//! request id      u32 │ │
//! body length     i32 │ │ encrypted
//! body                │ │
//! padding             ┘ │
//! signature             ┘
//! ```
//!
//! Padding and encryption only appear in `SignAndEncrypt` mode, the signature
//! in `Sign` and `SignAndEncrypt` modes.

use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};
use log::{error, trace};
use tokio::time::Instant;

use ua_types::{Error, StatusCode};

use super::secure_channel::{ChannelToken, SecureChannel};
use crate::ChannelError;

/// Size of the plain text header holding channel and token id.
pub const SECURITY_HEADER_SIZE: usize = 8;
/// Size of sequence number and request id.
pub const SEQUENCE_HEADER_SIZE: usize = 8;

/// An envelope after security has been removed.
#[derive(Debug, Clone, PartialEq)]
pub struct SecuredMessage {
    /// Channel the message was sent on.
    pub channel_id: u32,
    /// Token the message was secured with.
    pub token_id: u32,
    /// Per channel sequence number.
    pub sequence_number: u32,
    /// Id pairing a response with its request.
    pub request_id: u32,
    /// Encoded message.
    pub body: Vec<u8>,
}

fn checks_failed(context: impl Into<String>) -> ChannelError {
    ChannelError::fatal(StatusCode::BadSecurityChecksFailed, context)
}

/// Number of padding bytes, including the trailing size byte, needed to
/// make `plain_size` plus the padding a multiple of `block_size`.
fn padding_size(plain_size: usize, block_size: usize) -> usize {
    let rem = (plain_size + 1) % block_size;
    1 + if rem == 0 { 0 } else { block_size - rem }
}

impl SecureChannel {
    /// Secure `body` with the current token.
    pub fn seal(&self, request_id: u32, body: &[u8]) -> Result<Vec<u8>, ChannelError> {
        let token = self.current_token()?;
        self.seal_with_token(&token, request_id, body)
    }

    /// Secure `body` with a specific token. Only the answer to a renew
    /// request is sealed with the token the request arrived on rather than
    /// the current one, since the peer cannot know the new keys yet.
    pub fn seal_with_token(
        &self,
        token: &ChannelToken,
        request_id: u32,
        body: &[u8],
    ) -> Result<Vec<u8>, ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        let channel_id = self.channel_id();
        let sequence_number = self.next_send_sequence_number();
        let policy = self.security_policy();
        let keys = if self.is_signed() {
            Some(token.sending_keys(self.role()).ok_or_else(|| {
                ChannelError::fatal(StatusCode::BadInvalidState, "Token has no keys")
            })?)
        } else {
            None
        };

        let signature_size = if keys.is_some() {
            policy.signature_size()
        } else {
            0
        };
        let unpadded = SEQUENCE_HEADER_SIZE + 4 + body.len() + signature_size;
        let padding = if self.is_encrypted() {
            padding_size(unpadded, policy.params().block_size)
        } else {
            0
        };

        let mut buf = BytesMut::with_capacity(SECURITY_HEADER_SIZE + unpadded + padding);
        buf.put_u32_le(channel_id);
        buf.put_u32_le(token.token_id());
        buf.put_u32_le(sequence_number);
        buf.put_u32_le(request_id);
        buf.put_i32_le(body.len() as i32);
        buf.put_slice(body);
        if padding > 0 {
            // Every padding byte, including the last, holds the count of
            // padding bytes before the last.
            buf.put_bytes((padding - 1) as u8, padding);
        }

        let Some(keys) = keys else {
            return Ok(buf.to_vec());
        };
        let signature = keys.sign(policy, &buf).map_err(ChannelError::Fatal)?;
        buf.put_slice(&signature);
        if padding == 0 {
            return Ok(buf.to_vec());
        }

        let encrypted = keys
            .encrypt(&buf[SECURITY_HEADER_SIZE..])
            .map_err(ChannelError::Fatal)?;
        let mut out = Vec::with_capacity(SECURITY_HEADER_SIZE + encrypted.len());
        out.extend_from_slice(&buf[..SECURITY_HEADER_SIZE]);
        out.extend_from_slice(&encrypted);
        crate::debug::log_buffer("Sealed message", &out);
        Ok(out)
    }

    /// Remove security from an inbound message. A message naming another
    /// channel, an unknown or expired token, a bad signature or a replayed
    /// sequence number is fatal to the channel.
    pub fn open(&self, data: &[u8], now: Instant) -> Result<SecuredMessage, ChannelError> {
        if data.len() < SECURITY_HEADER_SIZE + SEQUENCE_HEADER_SIZE + 4 {
            return Err(ChannelError::fatal(
                StatusCode::BadDecodingError,
                format!("Message of {} bytes is too short", data.len()),
            ));
        }
        let mut header = &data[..SECURITY_HEADER_SIZE];
        let channel_id = header.get_u32_le();
        let token_id = header.get_u32_le();
        if channel_id != self.channel_id() {
            return Err(ChannelError::fatal(
                StatusCode::BadSecureChannelIdInvalid,
                format!("Message for channel {channel_id} received on {}", self.channel_id()),
            ));
        }
        let token = self.token_for_decode(token_id, now)?;
        let policy = self.security_policy();

        let plain = if self.is_signed() {
            let keys = token.receiving_keys(self.role()).ok_or_else(|| {
                ChannelError::fatal(StatusCode::BadInvalidState, "Token has no keys")
            })?;
            let mut plain = if self.is_encrypted() {
                let decrypted = keys
                    .decrypt(&data[SECURITY_HEADER_SIZE..])
                    .map_err(|e| checks_failed(format!("Failed to decrypt message: {e}")))?;
                let mut plain = Vec::with_capacity(data.len());
                plain.extend_from_slice(&data[..SECURITY_HEADER_SIZE]);
                plain.extend_from_slice(&decrypted);
                plain
            } else {
                data.to_vec()
            };
            let signature_size = policy.signature_size();
            if plain.len() < SECURITY_HEADER_SIZE + SEQUENCE_HEADER_SIZE + 4 + signature_size {
                return Err(checks_failed("Message too short for its signature"));
            }
            let signed_end = plain.len() - signature_size;
            if let Err(e) = keys.verify(policy, &plain[..signed_end], &plain[signed_end..]) {
                error!("Signature check failed on channel {channel_id}, token {token_id}");
                return Err(ChannelError::Fatal(e));
            }
            plain.truncate(signed_end);
            if self.is_encrypted() {
                let Some(&last) = plain.last() else {
                    return Err(checks_failed("Missing padding"));
                };
                let padding = last as usize + 1;
                let min_len = SECURITY_HEADER_SIZE + SEQUENCE_HEADER_SIZE + 4 + padding;
                if plain.len() < min_len
                    || plain[plain.len() - padding..].iter().any(|b| *b != last)
                {
                    return Err(checks_failed("Invalid padding"));
                }
                plain.truncate(plain.len() - padding);
            }
            plain
        } else {
            data.to_vec()
        };

        let mut stream = Cursor::new(&plain[SECURITY_HEADER_SIZE..]);
        let sequence_number = stream.get_u32_le();
        let request_id = stream.get_u32_le();
        let body_len = stream.get_i32_le();
        if body_len < 0 || body_len as usize != stream.remaining() {
            return Err(ChannelError::Message(
                Error::decoding(format!(
                    "Body length {body_len} does not match the {} bytes present",
                    stream.remaining()
                ))
                .with_request_id(request_id),
            ));
        }
        self.check_received_sequence_number(sequence_number)?;
        trace!(
            "Opened message {sequence_number} for request {request_id} on channel {channel_id}"
        );

        let body_start = SECURITY_HEADER_SIZE + SEQUENCE_HEADER_SIZE + 4;
        Ok(SecuredMessage {
            channel_id,
            token_id,
            sequence_number,
            request_id,
            body: plain[body_start..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::padding_size;

    #[test]
    fn padding_fills_block() {
        for plain in 0..100 {
            let padding = padding_size(plain, 16);
            assert!((1..=16).contains(&padding));
            assert_eq!((plain + padding) % 16, 0);
        }
    }
}
