// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::{sync::Arc, time::Duration};

use tokio::time::Instant;
use ua_core::{ChannelError, Message, RequestMessage, ResponseMessage};
use ua_crypto::SecurityPolicy;
use ua_server::{
    continuation_points::{ContinuationPointKind, VecPager},
    Server, ServerConfig,
};
use ua_types::{
    ByteString, CloseSecureChannelRequest, CreateSubscriptionRequest, MessageSecurityMode,
    PublishRequest, RequestHeader, StatusCode,
};

use crate::utils::Tester;

#[tokio::test]
async fn channel_limit() {
    let mut config = ServerConfig::default();
    config.limits.max_channels = 1;
    let tester = Tester::new(config);
    let Err(err) = Tester::connect(tester.server.clone(), 60_000) else {
        panic!("Expected the second channel to be rejected");
    };
    assert!(err.is_fatal());
    assert_eq!(err.status(), StatusCode::BadResourceUnavailable);

    // Room for a new channel once the first is gone.
    assert!(tester.server.close_channel(tester.channel_id));
    let second = Tester::connect(tester.server.clone(), 60_000).unwrap();
    assert_ne!(second.channel_id, tester.channel_id);
}

#[tokio::test]
async fn first_message_must_issue_a_token() {
    let server = Server::new(ServerConfig::default()).unwrap();
    let request: RequestMessage = PublishRequest::default().into();
    let body = request.encode_body(&server.encoding().context()).unwrap();
    let err = server
        .open_channel(SecurityPolicy::None, MessageSecurityMode::None, &body)
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BadRequestTypeInvalid);

    let err = server
        .open_channel(SecurityPolicy::None, MessageSecurityMode::None, &body[..3])
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(server.channels().is_empty());
}

#[tokio::test]
async fn unknown_channel() {
    let server = Server::new(ServerConfig::default()).unwrap();
    let err = server.process(17, &[0u8; 64]).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BadSecureChannelIdInvalid);
}

#[tokio::test]
async fn renew_token() {
    let tester = Tester::new(ServerConfig::default());
    let request = tester.client.make_open_request(7, 60_000).unwrap();
    let response = tester.call(request).await;
    let ResponseMessage::OpenSecureChannel(response) = response else {
        panic!("Expected OpenSecureChannel response, got {response:?}");
    };
    assert_eq!(response.response_header.request_handle, 7);
    assert_eq!(response.security_token.token_id, 2);
    tester
        .client
        .handle_open_response(&response, Instant::now())
        .unwrap();

    // Requests secured with the new token go through.
    let response = tester
        .call(CreateSubscriptionRequest {
            request_header: tester.header(),
            requested_publishing_interval: 100.0,
            ..Default::default()
        })
        .await;
    assert!(!response.is_service_fault());
}

#[tokio::test(start_paused = true)]
async fn unrenewed_channel_expires() {
    // 10 s tokens with a quarter of grace.
    let tester = Tester::with_lifetime(ServerConfig::default(), 10_000);
    tokio::time::advance(Duration::from_millis(12_000)).await;
    tester.server.purge_expired();
    assert_eq!(tester.server.channels().len(), 1);

    tokio::time::advance(Duration::from_millis(1_000)).await;
    tester.server.purge_expired();
    assert!(tester.server.channels().is_empty());
    assert!(tester.client.current_token().is_ok());
    let session = tester.server.session(tester.channel_id);
    assert!(session.is_none());
}

#[tokio::test]
async fn close_request_removes_channel() {
    let tester = Tester::new(ServerConfig::default());
    let sealed = tester.seal(CloseSecureChannelRequest {
        request_header: RequestHeader::dummy(),
    });
    let reply = tester
        .server
        .process(tester.channel_id, &sealed)
        .await
        .unwrap();
    assert!(reply.is_none());
    assert!(tester.server.channels().is_empty());
}

#[tokio::test(start_paused = true)]
async fn closing_channel_releases_publish_requests() {
    let tester = Tester::new(ServerConfig::default());
    tester.create_subscription(100.0, 30, 10).await;
    let session = tester.server.session(tester.channel_id).unwrap();
    let publish = tester.spawn_publish(vec![]).await;
    assert_eq!(session.subscriptions().activity().pending(), 1);

    assert!(tester.server.close_channel(tester.channel_id));
    let result = publish.await.unwrap();
    assert!(matches!(result, Err(ChannelError::Closed)));
    assert!(session.channel().is_closed());
    assert!(session.subscriptions().is_empty());
    assert!(tester.server.channels().is_empty());
}

#[tokio::test]
async fn shutdown_closes_every_channel() {
    let tester = Tester::new(ServerConfig::default());
    let other = Tester::connect(tester.server.clone(), 60_000).unwrap();
    assert_eq!(tester.server.channels().len(), 2);
    let server: Arc<Server> = tester.server.clone();
    server.shutdown();
    assert!(server.channels().is_empty());
    assert!(other.server.session(other.channel_id).is_none());
}

#[tokio::test]
async fn session_continuation_points() {
    let tester = Tester::new(ServerConfig::default());
    let session = tester.server.session(tester.channel_id).unwrap();
    let store = session
        .continuation_points()
        .store(ContinuationPointKind::Browse);
    let now = Instant::now();

    let page = store.first_page(VecPager::new(0..10), 4, now);
    assert_eq!(page.items, vec![0, 1, 2, 3]);
    assert!(!page.continuation_point.is_null());
    let handle = page.continuation_point;

    let page = store
        .next_page::<VecPager<i32>>(&handle, 4, now)
        .unwrap();
    assert_eq!(page.items, vec![4, 5, 6, 7]);

    // Handles are single use.
    assert_eq!(
        store.next_page::<VecPager<i32>>(&handle, 4, now),
        Err(StatusCode::BadContinuationPointInvalid)
    );
    assert_eq!(
        store.next_page::<VecPager<i32>>(&ByteString::from(vec![1u8; 16]), 4, now),
        Err(StatusCode::BadContinuationPointInvalid)
    );
}
