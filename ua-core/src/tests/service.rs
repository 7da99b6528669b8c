// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use ua_crypto::SecurityPolicy;
use ua_types::{
    CloseSecureChannelRequest, ContextOwned, CreateSubscriptionRequest,
    CreateSubscriptionResponse, DeleteSubscriptionsRequest, MessageSecurityMode, NodeId,
    PublishRequest, RequestHeader, ResponseHeader, StatusCode,
};

use super::open_pair;
use crate::{
    comms::ChannelState,
    service::{process_message, RequestContext, ServiceHandler},
    ChannelError, Message, RequestMessage, ResponseMessage,
};

struct TestHandler;

#[async_trait]
impl ServiceHandler for TestHandler {
    async fn handle(
        &self,
        _context: RequestContext,
        request: RequestMessage,
    ) -> Result<ResponseMessage, StatusCode> {
        match request {
            RequestMessage::CreateSubscription(r) => Ok(CreateSubscriptionResponse {
                response_header: ResponseHeader::new_good(&r.request_header),
                subscription_id: 1,
                revised_publishing_interval: r.requested_publishing_interval,
                revised_lifetime_count: r.requested_lifetime_count,
                revised_max_keep_alive_count: r.requested_max_keep_alive_count,
            }
            .into()),
            RequestMessage::Publish(_) => {
                // Never answers, only channel close ends the wait.
                std::future::pending().await
            }
            _ => Err(StatusCode::BadServiceUnsupported),
        }
    }
}

fn request_body(request: impl Into<RequestMessage>) -> Vec<u8> {
    let ctx = ContextOwned::default();
    let request: RequestMessage = request.into();
    request.encode_body(&ctx.context()).unwrap()
}

#[test]
fn body_round_trip() {
    let ctx = ContextOwned::default();
    let request: RequestMessage = CreateSubscriptionRequest {
        request_header: RequestHeader::new(&NodeId::new(1, 5u32), 42),
        requested_publishing_interval: 250.0,
        requested_lifetime_count: 30,
        requested_max_keep_alive_count: 10,
        max_notifications_per_publish: 0,
        publishing_enabled: true,
        priority: 1,
    }
    .into();
    let body = request.encode_body(&ctx.context()).unwrap();
    let decoded = RequestMessage::decode_body(&body, &ctx.context()).unwrap();
    assert_eq!(decoded, request);
    assert_eq!(decoded.request_handle(), 42);
    assert_eq!(decoded.name(), "CreateSubscription");

    // A response cannot be decoded as a request.
    let response = ResponseMessage::for_handle(3, StatusCode::BadTimeout);
    let body = response.encode_body(&ctx.context()).unwrap();
    let err = RequestMessage::decode_body(&body, &ctx.context()).unwrap_err();
    assert_eq!(err.status(), StatusCode::BadServiceUnsupported);
    let decoded = ResponseMessage::decode_body(&body, &ctx.context()).unwrap();
    assert!(decoded.is_service_fault());
    assert_eq!(decoded.service_result(), StatusCode::BadTimeout);
}

#[tokio::test]
async fn dispatch_and_fault() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::Basic256Sha256,
        MessageSecurityMode::SignAndEncrypt,
        60_000,
        t0,
    );
    let ctx = ContextOwned::default();

    let body = request_body(CreateSubscriptionRequest {
        request_header: RequestHeader::new(&NodeId::null(), 5),
        requested_publishing_interval: 100.0,
        ..Default::default()
    });
    let sealed = client.seal(1, &body).unwrap();
    let reply = process_message(&server, &TestHandler, &ctx, &sealed)
        .await
        .unwrap()
        .unwrap();
    let opened = client.open(&reply, Instant::now()).unwrap();
    assert_eq!(opened.request_id, 1);
    let ResponseMessage::CreateSubscription(response) =
        ResponseMessage::decode_body(&opened.body, &ctx.context()).unwrap()
    else {
        panic!("Expected CreateSubscription response");
    };
    assert_eq!(response.response_header.request_handle, 5);
    assert_eq!(response.revised_publishing_interval, 100.0);

    let body = request_body(DeleteSubscriptionsRequest {
        request_header: RequestHeader::new(&NodeId::null(), 6),
        subscription_ids: None,
    });
    let sealed = client.seal(2, &body).unwrap();
    let reply = process_message(&server, &TestHandler, &ctx, &sealed)
        .await
        .unwrap()
        .unwrap();
    let opened = client.open(&reply, Instant::now()).unwrap();
    let response = ResponseMessage::decode_body(&opened.body, &ctx.context()).unwrap();
    assert!(response.is_service_fault());
    assert_eq!(response.request_handle(), 6);
    assert_eq!(response.service_result(), StatusCode::BadServiceUnsupported);
}

#[tokio::test]
async fn undecodable_body_is_a_fault() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::None,
        MessageSecurityMode::None,
        60_000,
        t0,
    );
    let ctx = ContextOwned::default();
    let mut body = request_body(CreateSubscriptionRequest {
        request_header: RequestHeader::new(&NodeId::null(), 9),
        ..Default::default()
    });
    body.truncate(body.len() - 3);
    let sealed = client.seal(1, &body).unwrap();
    let reply = process_message(&server, &TestHandler, &ctx, &sealed)
        .await
        .unwrap()
        .unwrap();
    let opened = client.open(&reply, Instant::now()).unwrap();
    let response = ResponseMessage::decode_body(&opened.body, &ctx.context()).unwrap();
    assert!(response.is_service_fault());
    assert_eq!(response.request_handle(), 9);
    assert_eq!(response.service_result(), StatusCode::BadDecodingError);
    assert_eq!(server.state(), ChannelState::Open);
}

#[tokio::test]
async fn renew_through_envelope() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::Basic256Sha256,
        MessageSecurityMode::Sign,
        60_000,
        t0,
    );
    let ctx = ContextOwned::default();
    let renew = client.make_open_request(2, 60_000).unwrap();
    let sealed = client.seal(1, &request_body(renew)).unwrap();
    let reply = process_message(&server, &TestHandler, &ctx, &sealed)
        .await
        .unwrap()
        .unwrap();
    // The answer is sealed with the old token, which the client still holds.
    let opened = client.open(&reply, Instant::now()).unwrap();
    assert_eq!(opened.token_id, 1);
    let ResponseMessage::OpenSecureChannel(response) =
        ResponseMessage::decode_body(&opened.body, &ctx.context()).unwrap()
    else {
        panic!("Expected OpenSecureChannel response");
    };
    client
        .handle_open_response(&response, Instant::now())
        .unwrap();
    assert_eq!(client.current_token().unwrap().token_id(), 2);
}

#[tokio::test]
async fn fatal_error_closes_channel() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::Basic256Sha256,
        MessageSecurityMode::Sign,
        60_000,
        t0,
    );
    let ctx = ContextOwned::default();
    let mut sealed = client.seal(1, &request_body(PublishRequest::default())).unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0xFF;
    let err = process_message(&server, &TestHandler, &ctx, &sealed)
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.status(), StatusCode::BadSecurityChecksFailed);
    assert_eq!(server.state(), ChannelState::Closed);
}

#[tokio::test]
async fn close_request_and_pending_work() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::None,
        MessageSecurityMode::None,
        60_000,
        t0,
    );
    let server = std::sync::Arc::new(server);
    let ctx = ContextOwned::default();

    let publish = client.seal(1, &request_body(PublishRequest::default())).unwrap();
    let pending = {
        let server = server.clone();
        tokio::spawn(async move {
            process_message(&server, &TestHandler, &ContextOwned::default(), &publish).await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let close = client
        .seal(
            2,
            &request_body(CloseSecureChannelRequest {
                request_header: RequestHeader::dummy(),
            }),
        )
        .unwrap();
    let reply = process_message(&server, &TestHandler, &ctx, &close)
        .await
        .unwrap();
    assert!(reply.is_none());
    assert!(server.is_closed());
    assert!(matches!(pending.await.unwrap(), Err(ChannelError::Closed)));
}
