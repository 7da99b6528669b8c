// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::{collections::VecDeque, time::Duration};

use hashbrown::HashMap;
use log::{debug, info};
use ua_core::handle::Handle;
use ua_types::{
    DataChangeNotification, DateTime, DiagnosticInfo, ExtensionObject,
    MonitoredItemCreateRequest, MonitoredItemCreateResult, MonitoringMode, NodeId,
    NotificationMessage, StatusChangeNotification, StatusCode, TimestampsToReturn,
};

use super::monitored_item::MonitoredItem;
use crate::config::SubscriptionLimits;

/// A notification message ready to be sent in a publish response.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    /// Subscription the message belongs to.
    pub subscription_id: u32,
    /// The message.
    pub message: NotificationMessage,
    /// `true` if the subscription has more notifications ready.
    pub more_notifications: bool,
    /// Sequence numbers in the retransmission queue when the message was
    /// assembled.
    pub available_sequence_numbers: Vec<u32>,
}

impl OutgoingMessage {
    /// `true` if the message carries no notifications.
    pub fn is_keep_alive(&self) -> bool {
        self.message.is_keep_alive()
    }
}

/// Outcome of one publishing cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum TickResult {
    /// Nothing to send.
    Idle,
    /// Messages to send, oldest first.
    Publish(Vec<OutgoingMessage>),
    /// The lifetime elapsed without publish requests. The message carries a
    /// `BadTimeout` status change and the subscription must be removed.
    Expired(OutgoingMessage),
}

/// Publishing parameters after revision against the server limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevisedParameters {
    /// Publishing interval in milliseconds.
    pub publishing_interval: f64,
    /// Cycles without publish requests before the subscription expires.
    pub lifetime_count: u32,
    /// Cycles without notifications before a keep-alive is sent.
    pub max_keep_alive_count: u32,
    /// Notifications per message, 0 for no limit.
    pub max_notifications_per_publish: usize,
}

impl RevisedParameters {
    /// Revise requested parameters.
    pub fn revise(
        limits: &SubscriptionLimits,
        publishing_interval: f64,
        lifetime_count: u32,
        max_keep_alive_count: u32,
        max_notifications_per_publish: u32,
    ) -> Self {
        let publishing_interval = if publishing_interval.is_nan()
            || publishing_interval < limits.min_publishing_interval_ms
        {
            limits.min_publishing_interval_ms
        } else {
            publishing_interval
        };
        let max_keep_alive_count = if max_keep_alive_count == 0 {
            limits.default_keep_alive_count
        } else {
            max_keep_alive_count.min(limits.max_keep_alive_count)
        };
        // The lifetime must span at least three keep-alive periods.
        let lifetime_count = lifetime_count
            .max(max_keep_alive_count.saturating_mul(3))
            .min(limits.max_lifetime_count);
        let server_max = limits.max_notifications_per_publish as usize;
        let requested = max_notifications_per_publish as usize;
        let max_notifications_per_publish = match (requested, server_max) {
            (0, m) | (m, 0) => m,
            (r, m) => r.min(m),
        };
        Self {
            publishing_interval,
            lifetime_count,
            max_keep_alive_count,
            max_notifications_per_publish,
        }
    }

    /// The publishing interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.publishing_interval / 1000.0)
    }
}

/// State of one subscription. Owned by a single task, see
/// [`SubscriptionActor`](super::actor::SubscriptionActor).
#[derive(Debug)]
pub struct Subscription {
    id: u32,
    params: RevisedParameters,
    priority: u8,
    publishing_enabled: bool,
    limits: SubscriptionLimits,
    monitored_items: HashMap<u32, MonitoredItem>,
    next_item_id: Handle,
    sequence_numbers: Handle,
    retransmission_queue: VecDeque<NotificationMessage>,
    keep_alive_counter: u32,
    lifetime_counter: u32,
    first_message_sent: bool,
}

impl Subscription {
    /// Create a subscription with revised parameters.
    pub fn new(
        id: u32,
        params: RevisedParameters,
        publishing_enabled: bool,
        priority: u8,
        limits: SubscriptionLimits,
    ) -> Self {
        Self {
            id,
            params,
            priority,
            publishing_enabled,
            limits,
            monitored_items: HashMap::new(),
            next_item_id: Handle::new(1),
            sequence_numbers: Handle::new(1),
            retransmission_queue: VecDeque::new(),
            keep_alive_counter: 0,
            lifetime_counter: 0,
            first_message_sent: false,
        }
    }

    /// Subscription id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Revised parameters.
    pub fn parameters(&self) -> &RevisedParameters {
        &self.params
    }

    /// Priority relative to other subscriptions of the session.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// `true` if data notifications are published.
    pub fn publishing_enabled(&self) -> bool {
        self.publishing_enabled
    }

    /// Replace the publishing parameters and reset the counters.
    pub fn modify(&mut self, params: RevisedParameters, priority: u8) {
        self.params = params;
        self.priority = priority;
        self.keep_alive_counter = 0;
        self.lifetime_counter = 0;
    }

    /// Enable or disable publishing of data. A disabled subscription keeps
    /// sending keep-alives and its items keep sampling.
    pub fn set_publishing_mode(&mut self, enabled: bool) {
        self.publishing_enabled = enabled;
        self.lifetime_counter = 0;
    }

    /// Number of monitored items.
    pub fn len(&self) -> usize {
        self.monitored_items.len()
    }

    /// `true` if the subscription has no monitored items.
    pub fn is_empty(&self) -> bool {
        self.monitored_items.is_empty()
    }

    /// A monitored item by id.
    pub fn monitored_item(&self, id: u32) -> Option<&MonitoredItem> {
        self.monitored_items.get(&id)
    }

    /// Create monitored items, one result per request.
    pub fn create_monitored_items(
        &mut self,
        timestamps_to_return: TimestampsToReturn,
        requests: &[MonitoredItemCreateRequest],
    ) -> Vec<MonitoredItemCreateResult> {
        requests
            .iter()
            .map(|request| {
                let max = self.limits.max_monitored_items_per_sub;
                if max > 0 && self.monitored_items.len() >= max {
                    return failed_item(StatusCode::BadTooManyMonitoredItems);
                }
                let id = self.next_item_id.next();
                match MonitoredItem::new(
                    id,
                    timestamps_to_return,
                    request,
                    &self.limits,
                    self.params.publishing_interval,
                ) {
                    Ok(item) => {
                        let result = item.create_result();
                        debug!(
                            "Subscription {} monitoring {} attribute {} as item {}",
                            self.id,
                            request.item_to_monitor.node_id,
                            request.item_to_monitor.attribute_id,
                            id
                        );
                        self.monitored_items.insert(id, item);
                        result
                    }
                    Err(status) => failed_item(status),
                }
            })
            .collect()
    }

    /// Delete monitored items by id, one status per id.
    pub fn delete_monitored_items(&mut self, ids: &[u32]) -> Vec<StatusCode> {
        ids.iter()
            .map(|id| match self.monitored_items.remove(id) {
                Some(_) => StatusCode::Good,
                None => StatusCode::BadMonitoredItemIdInvalid,
            })
            .collect()
    }

    /// Change the monitoring mode of items, one status per id.
    pub fn set_monitoring_mode(&mut self, mode: MonitoringMode, ids: &[u32]) -> Vec<StatusCode> {
        ids.iter()
            .map(|id| match self.monitored_items.get_mut(id) {
                Some(item) => {
                    item.set_monitoring_mode(mode);
                    StatusCode::Good
                }
                None => StatusCode::BadMonitoredItemIdInvalid,
            })
            .collect()
    }

    /// Feed a new value to every item monitoring `attribute_id` of `node_id`.
    /// Returns the number of items that queued it.
    pub fn notify_value(
        &mut self,
        node_id: &NodeId,
        attribute_id: u32,
        value: &ua_types::DataValue,
    ) -> usize {
        self.monitored_items
            .values_mut()
            .filter(|item| item.matches(node_id, attribute_id))
            .map(|item| item.notify(value.clone()))
            .filter(|queued| *queued)
            .count()
    }

    fn has_notifications(&self) -> bool {
        self.monitored_items.values().any(|i| i.has_notifications())
    }

    /// Remove an acknowledged message from the retransmission queue.
    pub fn acknowledge(&mut self, sequence_number: u32) -> StatusCode {
        match self
            .retransmission_queue
            .iter()
            .position(|m| m.sequence_number == sequence_number)
        {
            Some(idx) => {
                self.retransmission_queue.remove(idx);
                StatusCode::Good
            }
            None => StatusCode::BadSequenceNumberUnknown,
        }
    }

    /// The message with `sequence_number`, exactly as it was sent.
    pub fn republish(&mut self, sequence_number: u32) -> Result<NotificationMessage, StatusCode> {
        self.lifetime_counter = 0;
        self.retransmission_queue
            .iter()
            .find(|m| m.sequence_number == sequence_number)
            .cloned()
            .ok_or(StatusCode::BadMessageNotAvailable)
    }

    /// Sequence numbers of unacknowledged messages, oldest first.
    pub fn available_sequence_numbers(&self) -> Vec<u32> {
        self.retransmission_queue
            .iter()
            .map(|m| m.sequence_number)
            .collect()
    }

    fn retain(&mut self, message: NotificationMessage) {
        if self.retransmission_queue.len() >= self.limits.max_retransmission_queue_size {
            if let Some(dropped) = self.retransmission_queue.pop_front() {
                debug!(
                    "Subscription {} dropped unacknowledged message {}",
                    self.id, dropped.sequence_number
                );
            }
        }
        self.retransmission_queue.push_back(message);
    }

    /// Run one publishing cycle.
    ///
    /// `publish_pending` tells whether the session holds a publish request
    /// right now, `publish_received` whether it received one since the last
    /// cycle. Either counts as the client being alive.
    pub fn tick(
        &mut self,
        publish_time: DateTime,
        publish_pending: bool,
        publish_received: bool,
    ) -> TickResult {
        if publish_pending || publish_received {
            self.lifetime_counter = 0;
        } else {
            self.lifetime_counter += 1;
            if self.lifetime_counter >= self.params.lifetime_count {
                info!(
                    "Subscription {} expired after {} cycles without a publish request",
                    self.id, self.lifetime_counter
                );
                return TickResult::Expired(self.status_change(StatusCode::BadTimeout, publish_time));
            }
        }

        if self.publishing_enabled && self.has_notifications() {
            self.keep_alive_counter = 0;
            self.first_message_sent = true;
            return TickResult::Publish(self.assemble(publish_time));
        }

        self.keep_alive_counter = self.keep_alive_counter.saturating_add(1);
        let keep_alive_due = !self.first_message_sent
            || self.keep_alive_counter >= self.params.max_keep_alive_count;
        if keep_alive_due && publish_pending {
            self.keep_alive_counter = 0;
            self.first_message_sent = true;
            // A keep-alive announces the next sequence number without using it.
            let message =
                NotificationMessage::keep_alive(self.sequence_numbers.peek_next(), publish_time);
            return TickResult::Publish(vec![OutgoingMessage {
                subscription_id: self.id,
                message,
                more_notifications: false,
                available_sequence_numbers: self.available_sequence_numbers(),
            }]);
        }
        TickResult::Idle
    }

    fn assemble(&mut self, publish_time: DateTime) -> Vec<OutgoingMessage> {
        let mut notifications = Vec::new();
        let mut ids: Vec<_> = self.monitored_items.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(item) = self.monitored_items.get_mut(&id) {
                notifications.extend(item.take_notifications());
            }
        }

        let chunk_size = match self.params.max_notifications_per_publish {
            0 => notifications.len().max(1),
            n => n,
        };
        let mut messages = Vec::new();
        let mut remaining = notifications.into_iter().peekable();
        while remaining.peek().is_some() {
            let chunk: Vec<_> = remaining.by_ref().take(chunk_size).collect();
            let data_change = DataChangeNotification {
                monitored_items: Some(chunk),
                diagnostic_infos: None,
            };
            let message = NotificationMessage {
                sequence_number: self.sequence_numbers.next(),
                publish_time,
                notification_data: Some(vec![ExtensionObject::from_message(data_change)]),
            };
            self.retain(message.clone());
            messages.push(message);
        }

        let available = self.available_sequence_numbers();
        let count = messages.len();
        messages
            .into_iter()
            .enumerate()
            .map(|(idx, message)| OutgoingMessage {
                subscription_id: self.id,
                message,
                more_notifications: idx + 1 < count,
                available_sequence_numbers: available.clone(),
            })
            .collect()
    }

    fn status_change(&mut self, status: StatusCode, publish_time: DateTime) -> OutgoingMessage {
        let notification = StatusChangeNotification {
            status,
            diagnostic_info: DiagnosticInfo::default(),
        };
        OutgoingMessage {
            subscription_id: self.id,
            message: NotificationMessage {
                sequence_number: self.sequence_numbers.next(),
                publish_time,
                notification_data: Some(vec![ExtensionObject::from_message(notification)]),
            },
            more_notifications: false,
            available_sequence_numbers: Vec::new(),
        }
    }
}

fn failed_item(status: StatusCode) -> MonitoredItemCreateResult {
    MonitoredItemCreateResult {
        status_code: status,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use ua_types::{
        DataValue, DateTime, MonitoredItemCreateRequest, MonitoringMode, MonitoringParameters,
        NodeId, ReadValueId, StatusCode, TimestampsToReturn,
    };

    use super::{RevisedParameters, Subscription, TickResult};
    use crate::config::SubscriptionLimits;

    fn node(i: u32) -> NodeId {
        NodeId::new(2, i)
    }

    fn subscription(keep_alive: u32, lifetime: u32, max_notifications: u32) -> Subscription {
        let limits = SubscriptionLimits::default();
        let params = RevisedParameters::revise(&limits, 100.0, lifetime, keep_alive, max_notifications);
        let mut sub = Subscription::new(1, params, true, 0, limits);
        let requests: Vec<_> = (1..=3)
            .map(|i| MonitoredItemCreateRequest {
                item_to_monitor: ReadValueId {
                    node_id: node(i),
                    attribute_id: 13,
                    ..Default::default()
                },
                monitoring_mode: MonitoringMode::Reporting,
                requested_parameters: MonitoringParameters {
                    client_handle: i,
                    sampling_interval: -1.0,
                    queue_size: 10,
                    discard_oldest: true,
                    ..Default::default()
                },
            })
            .collect();
        let results = sub.create_monitored_items(TimestampsToReturn::Both, &requests);
        assert!(results.iter().all(|r| r.status_code.is_good()));
        sub
    }

    fn publish(sub: &mut Subscription) -> Vec<super::OutgoingMessage> {
        match sub.tick(DateTime::now(), true, true) {
            TickResult::Publish(m) => m,
            r => panic!("Expected messages, got {r:?}"),
        }
    }

    #[test]
    fn revision() {
        let limits = SubscriptionLimits::default();
        let p = RevisedParameters::revise(&limits, 1.0, 0, 0, 0);
        assert_eq!(p.publishing_interval, limits.min_publishing_interval_ms);
        assert_eq!(p.max_keep_alive_count, limits.default_keep_alive_count);
        assert_eq!(p.lifetime_count, 3 * limits.default_keep_alive_count);
        let p = RevisedParameters::revise(&limits, f64::NAN, u32::MAX, u32::MAX, 7);
        assert_eq!(p.publishing_interval, limits.min_publishing_interval_ms);
        assert_eq!(p.max_keep_alive_count, limits.max_keep_alive_count);
        assert_eq!(p.lifetime_count, limits.max_lifetime_count);
        assert_eq!(p.max_notifications_per_publish, 7);
    }

    #[test]
    fn sequence_numbers_and_keep_alives() {
        let mut sub = subscription(2, 10, 0);
        // The first cycle sends a keep-alive announcing sequence number 1.
        let m = publish(&mut sub);
        assert!(m[0].is_keep_alive());
        assert_eq!(m[0].message.sequence_number, 1);

        let mut expected = 1;
        for round in 0..5 {
            sub.notify_value(&node(1), 13, &DataValue::value_only(round));
            let m = publish(&mut sub);
            assert_eq!(m.len(), 1);
            assert!(!m[0].is_keep_alive());
            assert_eq!(m[0].message.sequence_number, expected);
            expected += 1;

            // Nothing new, one idle cycle, then a keep-alive with the next number.
            assert_eq!(sub.tick(DateTime::now(), true, true), TickResult::Idle);
            let m = publish(&mut sub);
            assert!(m[0].is_keep_alive());
            assert_eq!(m[0].message.sequence_number, expected);
        }
        assert_eq!(sub.available_sequence_numbers(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn keep_alive_needs_a_publish_request() {
        let mut sub = subscription(1, 100, 0);
        assert_eq!(sub.tick(DateTime::now(), false, true), TickResult::Idle);
        assert!(publish(&mut sub)[0].is_keep_alive());
    }

    #[test]
    fn acknowledge_twice() {
        let mut sub = subscription(5, 20, 0);
        for v in 0..3 {
            sub.notify_value(&node(2), 13, &DataValue::value_only(v));
            publish(&mut sub);
        }
        assert_eq!(sub.available_sequence_numbers(), vec![1, 2, 3]);
        assert_eq!(sub.acknowledge(2), StatusCode::Good);
        assert_eq!(sub.acknowledge(2), StatusCode::BadSequenceNumberUnknown);
        assert_eq!(sub.available_sequence_numbers(), vec![1, 3]);

        let m = sub.republish(3).unwrap();
        assert_eq!(m.sequence_number, 3);
        assert_eq!(
            sub.republish(2).unwrap_err(),
            StatusCode::BadMessageNotAvailable
        );
    }

    #[test]
    fn retransmission_queue_is_bounded() {
        let mut limits = SubscriptionLimits::default();
        limits.max_retransmission_queue_size = 2;
        let params = RevisedParameters::revise(&limits, 100.0, 30, 10, 0);
        let mut sub = Subscription::new(1, params, true, 0, limits);
        sub.create_monitored_items(
            TimestampsToReturn::Neither,
            &[MonitoredItemCreateRequest {
                item_to_monitor: ReadValueId {
                    node_id: node(1),
                    attribute_id: 13,
                    ..Default::default()
                },
                monitoring_mode: MonitoringMode::Reporting,
                requested_parameters: MonitoringParameters {
                    queue_size: 1,
                    ..Default::default()
                },
            }],
        );
        for v in 0..4 {
            sub.notify_value(&node(1), 13, &DataValue::value_only(v));
            publish(&mut sub);
        }
        assert_eq!(sub.available_sequence_numbers(), vec![3, 4]);
    }

    #[test]
    fn split_by_max_notifications() {
        let mut sub = subscription(5, 20, 2);
        for i in 1..=3 {
            sub.notify_value(&node(i), 13, &DataValue::value_only(i as i32));
        }
        sub.notify_value(&node(1), 13, &DataValue::value_only(10));
        let m = publish(&mut sub);
        assert_eq!(m.len(), 2);
        assert!(m[0].more_notifications);
        assert!(!m[1].more_notifications);
        assert_eq!(m[0].message.sequence_number, 1);
        assert_eq!(m[1].message.sequence_number, 2);
        let counts: Vec<_> = m
            .iter()
            .map(|m| {
                m.message
                    .data_changes()
                    .map(|d| d.monitored_items.as_ref().map_or(0, |i| i.len()))
                    .sum::<usize>()
            })
            .collect();
        assert_eq!(counts, vec![2, 2]);
        assert_eq!(m[1].available_sequence_numbers, vec![1, 2]);
    }

    #[test]
    fn disabled_publishing_sends_keep_alives() {
        let mut sub = subscription(1, 20, 0);
        sub.set_publishing_mode(false);
        sub.notify_value(&node(1), 13, &DataValue::value_only(1));
        let m = publish(&mut sub);
        assert!(m[0].is_keep_alive());
        sub.set_publishing_mode(true);
        assert!(!publish(&mut sub)[0].is_keep_alive());
    }

    #[test]
    fn expiry() {
        let mut sub = subscription(1, 3, 0);
        assert_eq!(sub.parameters().lifetime_count, 3);
        assert_eq!(sub.tick(DateTime::now(), false, false), TickResult::Idle);
        assert_eq!(sub.tick(DateTime::now(), false, false), TickResult::Idle);
        let TickResult::Expired(m) = sub.tick(DateTime::now(), false, false) else {
            panic!("Expected expiry");
        };
        let status: Vec<_> = m.message.status_changes().map(|s| s.status).collect();
        assert_eq!(status, vec![StatusCode::BadTimeout]);
        assert_eq!(m.message.sequence_number, 1);
    }

    #[test]
    fn publish_requests_keep_subscription_alive() {
        let mut sub = subscription(1, 3, 0);
        for _ in 0..10 {
            sub.tick(DateTime::now(), false, false);
            sub.tick(DateTime::now(), false, true);
        }
        assert!(!matches!(
            sub.tick(DateTime::now(), false, false),
            TickResult::Expired(_)
        ));
    }

    #[test]
    fn delete_items() {
        let mut sub = subscription(5, 20, 0);
        assert_eq!(
            sub.delete_monitored_items(&[1, 9, 1]),
            vec![
                StatusCode::Good,
                StatusCode::BadMonitoredItemIdInvalid,
                StatusCode::BadMonitoredItemIdInvalid
            ]
        );
        assert_eq!(sub.len(), 2);
    }
}
