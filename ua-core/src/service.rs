// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The boundary between a secure channel and the services answering its
//! requests.

use async_trait::async_trait;
use log::{debug, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use ua_types::{ContextOwned, StatusCode};

use crate::{
    comms::{secured_message::SecuredMessage, SecureChannel},
    ChannelError, Message, RequestMessage, ResponseMessage,
};

/// Where a request came from.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Channel the request arrived on.
    pub channel_id: u32,
    /// Token the request was secured with.
    pub token_id: u32,
    /// Request id from the envelope.
    pub request_id: u32,
    /// Cancelled when the channel closes.
    pub cancel: CancellationToken,
}

/// A handler for service requests. Requests for the secure channel itself
/// never reach the handler.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    /// Answer a request. An `Err` is sent to the client as a service fault.
    async fn handle(
        &self,
        context: RequestContext,
        request: RequestMessage,
    ) -> Result<ResponseMessage, StatusCode>;
}

/// Process one inbound message on an open channel: remove security, decode
/// the request, hand it to `handler` and seal the response.
///
/// Returns `Ok(None)` when there is nothing to send back, which happens when
/// the client closed the channel. Decode and service errors are answered with
/// a service fault. Any `Err` is fatal to the channel, which is closed before
/// returning.
///
/// The first `OpenSecureChannel` request travels outside this envelope and is
/// passed to [`SecureChannel::handle_open_request`] directly.
pub async fn process_message(
    channel: &SecureChannel,
    handler: &dyn ServiceHandler,
    encoding: &ContextOwned,
    data: &[u8],
) -> Result<Option<Vec<u8>>, ChannelError> {
    let result = process_message_inner(channel, handler, encoding, data).await;
    if let Err(e) = &result {
        if e.is_fatal() {
            warn!("Closing channel {}: {e}", channel.channel_id());
            channel.close();
        }
    }
    result
}

async fn process_message_inner(
    channel: &SecureChannel,
    handler: &dyn ServiceHandler,
    encoding: &ContextOwned,
    data: &[u8],
) -> Result<Option<Vec<u8>>, ChannelError> {
    let message = match channel.open(data, Instant::now()) {
        Ok(m) => m,
        Err(ChannelError::Message(e)) => {
            // The envelope was authentic but unreadable, answer if we know
            // which request it was.
            let Some(request_id) = e.request_id() else {
                return Err(ChannelError::Message(e));
            };
            let fault = ResponseMessage::for_handle(0, e.status());
            return seal_response(channel, encoding, request_id, &fault).map(Some);
        }
        Err(e) => return Err(e),
    };
    let SecuredMessage {
        token_id,
        request_id,
        body,
        ..
    } = message;

    let ctx = encoding.context();
    let request = match RequestMessage::decode_body(&body, &ctx) {
        Ok(r) => r,
        Err(e) => {
            debug!("Failed to decode request {request_id}: {e}");
            let handle = e.request_handle().unwrap_or_default();
            let fault = ResponseMessage::for_handle(handle, e.status());
            return seal_response(channel, encoding, request_id, &fault).map(Some);
        }
    };

    let response = match request {
        RequestMessage::CloseSecureChannel(_) => {
            debug!("Client closed channel {}", channel.channel_id());
            channel.close();
            return Ok(None);
        }
        RequestMessage::OpenSecureChannel(request) => {
            let request_token = channel.token_for_decode(token_id, Instant::now())?;
            let response: ResponseMessage =
                channel.handle_open_request(&request, Instant::now())?.into();
            let body = response.encode_body(&ctx).map_err(ChannelError::Fatal)?;
            return channel
                .seal_with_token(&request_token, request_id, &body)
                .map(Some);
        }
        request => {
            let header = request.request_header().clone();
            let context = RequestContext {
                channel_id: channel.channel_id(),
                token_id,
                request_id,
                cancel: channel.cancellation_token(),
            };
            let cancel = context.cancel.clone();
            tokio::select! {
                r = handler.handle(context, request) => match r {
                    Ok(response) => response,
                    Err(status) => ResponseMessage::service_fault(&header, status),
                },
                _ = cancel.cancelled() => return Err(ChannelError::Closed),
            }
        }
    };
    seal_response(channel, encoding, request_id, &response).map(Some)
}

fn seal_response(
    channel: &SecureChannel,
    encoding: &ContextOwned,
    request_id: u32,
    response: &ResponseMessage,
) -> Result<Vec<u8>, ChannelError> {
    let body = match response.encode_body(&encoding.context()) {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to encode response to request {request_id}: {e}");
            ResponseMessage::for_handle(response.request_handle(), e.status())
                .encode_body(&encoding.context())
                .map_err(ChannelError::Fatal)?
        }
    };
    channel.seal(request_id, &body)
}
