// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

use tokio::time::Instant;
use ua_core::ResponseMessage;
use ua_server::ServerConfig;
use ua_types::{
    DataValue, DeleteSubscriptionsRequest, ModifySubscriptionRequest, NodeId, PublishRequest,
    PublishResponse, RepublishRequest, SetPublishingModeRequest, StatusCode, Variant,
};

use crate::utils::{Tester, VALUE_ATTRIBUTE};

fn expect_publish(response: ResponseMessage) -> Box<PublishResponse> {
    match response {
        ResponseMessage::Publish(r) => r,
        r => panic!("Expected publish response, got {r:?}"),
    }
}

fn values(response: &PublishResponse) -> Vec<(u32, Option<Variant>)> {
    response
        .notification_message
        .data_changes()
        .flat_map(|d| d.monitored_items.iter().flatten())
        .map(|n| (n.client_handle, n.value.value.clone()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn data_change_through_publish() {
    let tester = Tester::new(ServerConfig::default());
    let sub = tester.create_subscription(100.0, 30, 10).await;
    let node = NodeId::new(1, 1u32);
    let items = tester.monitor_values(sub, &[node.clone()]).await;
    assert_eq!(items.len(), 1);

    tester
        .server
        .notify_value(&node, VALUE_ATTRIBUTE, &DataValue::new_now(5i32));
    // Values of other nodes are ignored.
    tester.server.notify_value(
        &NodeId::new(1, 2u32),
        VALUE_ATTRIBUTE,
        &DataValue::new_now(9i32),
    );

    let publish = tester.spawn_publish(vec![]).await;
    let response = expect_publish(tester.publish_reply(publish).await);
    assert_eq!(response.subscription_id, sub);
    assert_eq!(response.notification_message.sequence_number, 1);
    assert_eq!(response.available_sequence_numbers, Some(vec![1]));
    assert!(!response.more_notifications);
    assert_eq!(values(&response), vec![(100, Some(Variant::Int32(5)))]);
}

#[tokio::test(start_paused = true)]
async fn keep_alives_do_not_use_sequence_numbers() {
    let tester = Tester::new(ServerConfig::default());
    let sub = tester.create_subscription(100.0, 0, 5).await;

    // The first keep-alive goes out on the first cycle.
    let start = Instant::now();
    let publish = tester.spawn_publish(vec![]).await;
    let response = expect_publish(tester.publish_reply(publish).await);
    assert_eq!(response.subscription_id, sub);
    assert!(response.notification_message.is_keep_alive());
    assert_eq!(response.notification_message.sequence_number, 1);
    assert_eq!(start.elapsed(), Duration::from_millis(100));

    // The next one after the keep-alive count.
    let start = Instant::now();
    let publish = tester.spawn_publish(vec![]).await;
    let response = expect_publish(tester.publish_reply(publish).await);
    assert!(response.notification_message.is_keep_alive());
    assert_eq!(response.notification_message.sequence_number, 1);
    assert_eq!(start.elapsed(), Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn acknowledge_and_republish() {
    let tester = Tester::new(ServerConfig::default());
    let sub = tester.create_subscription(100.0, 300, 100).await;
    let node = NodeId::new(1, "Counter");
    tester.monitor_values(sub, &[node.clone()]).await;

    tester
        .server
        .notify_value(&node, VALUE_ATTRIBUTE, &DataValue::new_now(1i32));
    let publish = tester.spawn_publish(vec![]).await;
    let first = expect_publish(tester.publish_reply(publish).await);
    assert_eq!(first.notification_message.sequence_number, 1);

    let republished = tester
        .call(RepublishRequest {
            request_header: tester.header(),
            subscription_id: sub,
            retransmit_sequence_number: 1,
        })
        .await;
    let ResponseMessage::Republish(republished) = republished else {
        panic!("Expected republish response, got {republished:?}");
    };
    assert_eq!(
        republished.notification_message.sequence_number,
        first.notification_message.sequence_number
    );
    assert_eq!(
        republished.notification_message.publish_time,
        first.notification_message.publish_time
    );

    // Acknowledged messages leave the retransmission queue.
    let publish = tester.spawn_publish(vec![(sub, 1)]).await;
    let response = tester
        .call(RepublishRequest {
            request_header: tester.header(),
            subscription_id: sub,
            retransmit_sequence_number: 1,
        })
        .await;
    assert_eq!(response.service_result(), StatusCode::BadMessageNotAvailable);

    tester
        .server
        .notify_value(&node, VALUE_ATTRIBUTE, &DataValue::new_now(2i32));
    let second = expect_publish(tester.publish_reply(publish).await);
    assert_eq!(second.results, Some(vec![StatusCode::Good]));
    assert_eq!(second.notification_message.sequence_number, 2);
    assert_eq!(second.available_sequence_numbers, Some(vec![2]));
    assert_eq!(values(&second), vec![(100, Some(Variant::Int32(2)))]);

    let publish = tester.spawn_publish(vec![(sub, 1), (999, 2)]).await;
    tester
        .server
        .notify_value(&node, VALUE_ATTRIBUTE, &DataValue::new_now(3i32));
    let third = expect_publish(tester.publish_reply(publish).await);
    assert_eq!(
        third.results,
        Some(vec![
            StatusCode::BadSequenceNumberUnknown,
            StatusCode::BadSubscriptionIdInvalid
        ])
    );
    assert_eq!(third.available_sequence_numbers, Some(vec![2, 3]));
}

#[tokio::test(start_paused = true)]
async fn subscription_expires_without_publish_requests() {
    let tester = Tester::new(ServerConfig::default());
    let sub = tester.create_subscription(100.0, 3, 1).await;
    let session = tester.server.session(tester.channel_id).unwrap();
    assert_eq!(session.subscriptions().subscription_ids(), vec![sub]);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(session.subscriptions().is_empty());

    // The status change waits for the next publish request.
    let publish = tester.spawn_publish(vec![]).await;
    let response = expect_publish(tester.publish_reply(publish).await);
    assert_eq!(response.subscription_id, sub);
    let statuses: Vec<_> = response
        .notification_message
        .status_changes()
        .map(|s| s.status)
        .collect();
    assert_eq!(statuses, vec![StatusCode::BadTimeout]);

    let response = tester
        .call(PublishRequest {
            request_header: tester.header(),
            subscription_acknowledgements: None,
        })
        .await;
    assert!(response.is_service_fault());
    assert_eq!(response.service_result(), StatusCode::BadNoSubscription);
}

#[tokio::test(start_paused = true)]
async fn disabled_publishing_keeps_values() {
    let tester = Tester::new(ServerConfig::default());
    let sub = tester.create_subscription(100.0, 30, 2).await;
    let node = NodeId::new(1, 7u32);
    tester.monitor_values(sub, &[node.clone()]).await;

    let response = tester
        .call(SetPublishingModeRequest {
            request_header: tester.header(),
            publishing_enabled: false,
            subscription_ids: Some(vec![sub, 42]),
        })
        .await;
    let ResponseMessage::SetPublishingMode(response) = response else {
        panic!("Expected SetPublishingMode response, got {response:?}");
    };
    assert_eq!(
        response.results,
        Some(vec![StatusCode::Good, StatusCode::BadSubscriptionIdInvalid])
    );

    tester
        .server
        .notify_value(&node, VALUE_ATTRIBUTE, &DataValue::new_now(11i32));
    let publish = tester.spawn_publish(vec![]).await;
    let response = expect_publish(tester.publish_reply(publish).await);
    assert!(response.notification_message.is_keep_alive());

    tester
        .call(SetPublishingModeRequest {
            request_header: tester.header(),
            publishing_enabled: true,
            subscription_ids: Some(vec![sub]),
        })
        .await;
    let publish = tester.spawn_publish(vec![]).await;
    let response = expect_publish(tester.publish_reply(publish).await);
    assert_eq!(values(&response), vec![(100, Some(Variant::Int32(11)))]);
    assert_eq!(response.notification_message.sequence_number, 1);
}

#[tokio::test]
async fn modify_subscription() {
    let tester = Tester::new(ServerConfig::default());
    let sub = tester.create_subscription(100.0, 30, 10).await;

    let response = tester
        .call(ModifySubscriptionRequest {
            request_header: tester.header(),
            subscription_id: sub,
            requested_publishing_interval: 1.0,
            requested_lifetime_count: 5,
            requested_max_keep_alive_count: 4,
            max_notifications_per_publish: 0,
            priority: 3,
        })
        .await;
    let ResponseMessage::ModifySubscription(response) = response else {
        panic!("Expected ModifySubscription response, got {response:?}");
    };
    let limits = ServerConfig::default().limits.subscriptions;
    assert_eq!(
        response.revised_publishing_interval,
        limits.min_publishing_interval_ms
    );
    assert_eq!(response.revised_max_keep_alive_count, 4);
    assert_eq!(response.revised_lifetime_count, 12);

    let response = tester
        .call(ModifySubscriptionRequest {
            request_header: tester.header(),
            subscription_id: sub + 1,
            ..Default::default()
        })
        .await;
    assert_eq!(response.service_result(), StatusCode::BadSubscriptionIdInvalid);
}

#[tokio::test]
async fn delete_subscriptions() {
    let tester = Tester::new(ServerConfig::default());
    let first = tester.create_subscription(100.0, 30, 10).await;
    let second = tester.create_subscription(100.0, 30, 10).await;
    assert_ne!(first, second);

    let response = tester
        .call(DeleteSubscriptionsRequest {
            request_header: tester.header(),
            subscription_ids: Some(vec![first, first]),
        })
        .await;
    let ResponseMessage::DeleteSubscriptions(response) = response else {
        panic!("Expected DeleteSubscriptions response, got {response:?}");
    };
    assert_eq!(
        response.results,
        Some(vec![StatusCode::Good, StatusCode::BadSubscriptionIdInvalid])
    );

    let response = tester
        .call(DeleteSubscriptionsRequest {
            request_header: tester.header(),
            subscription_ids: Some(Vec::new()),
        })
        .await;
    assert_eq!(response.service_result(), StatusCode::BadNothingToDo);

    let session = tester.server.session(tester.channel_id).unwrap();
    assert_eq!(session.subscriptions().subscription_ids(), vec![second]);
}

#[tokio::test]
async fn too_many_subscriptions() {
    let mut config = ServerConfig::default();
    config.limits.subscriptions.max_subscriptions_per_session = 1;
    let tester = Tester::new(config);
    tester.create_subscription(100.0, 30, 10).await;

    let response = tester
        .call(ua_types::CreateSubscriptionRequest {
            request_header: tester.header(),
            requested_publishing_interval: 100.0,
            ..Default::default()
        })
        .await;
    assert_eq!(response.service_result(), StatusCode::BadTooManySubscriptions);
}

#[tokio::test]
async fn publish_without_subscriptions() {
    let tester = Tester::new(ServerConfig::default());
    let response = tester
        .call(PublishRequest {
            request_header: tester.header(),
            subscription_acknowledgements: None,
        })
        .await;
    assert!(response.is_service_fault());
    assert_eq!(response.service_result(), StatusCode::BadNoSubscription);
}

#[tokio::test(start_paused = true)]
async fn publish_request_times_out() {
    let mut config = ServerConfig::default();
    config.publish_timeout_default_ms = 1_000;
    let tester = Tester::new(config);
    // Keep-alives every 100 s leave the request unanswered.
    tester.create_subscription(100_000.0, 0, 1).await;
    let start = Instant::now();
    let publish = tester.spawn_publish(vec![]).await;
    let response = tester.publish_reply(publish).await;
    assert_eq!(response.service_result(), StatusCode::BadTimeout);
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}
