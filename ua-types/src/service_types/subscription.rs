// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use crate::{
    DataValue, DateTime, DiagnosticInfo, ExtensionObject, RequestHeader, ResponseHeader,
    StatusCode,
};

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateSubscriptionRequest {
    pub request_header: RequestHeader,
    pub requested_publishing_interval: f64,
    pub requested_lifetime_count: u32,
    pub requested_max_keep_alive_count: u32,
    pub max_notifications_per_publish: u32,
    pub publishing_enabled: bool,
    pub priority: u8,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateSubscriptionResponse {
    pub response_header: ResponseHeader,
    pub subscription_id: u32,
    pub revised_publishing_interval: f64,
    pub revised_lifetime_count: u32,
    pub revised_max_keep_alive_count: u32,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModifySubscriptionRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub requested_publishing_interval: f64,
    pub requested_lifetime_count: u32,
    pub requested_max_keep_alive_count: u32,
    pub max_notifications_per_publish: u32,
    pub priority: u8,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModifySubscriptionResponse {
    pub response_header: ResponseHeader,
    pub revised_publishing_interval: f64,
    pub revised_lifetime_count: u32,
    pub revised_max_keep_alive_count: u32,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetPublishingModeRequest {
    pub request_header: RequestHeader,
    pub publishing_enabled: bool,
    pub subscription_ids: Option<Vec<u32>>,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetPublishingModeResponse {
    pub response_header: ResponseHeader,
    pub results: Option<Vec<StatusCode>>,
    pub diagnostic_infos: Option<Vec<DiagnosticInfo>>,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteSubscriptionsRequest {
    pub request_header: RequestHeader,
    pub subscription_ids: Option<Vec<u32>>,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteSubscriptionsResponse {
    pub response_header: ResponseHeader,
    pub results: Option<Vec<StatusCode>>,
    pub diagnostic_infos: Option<Vec<DiagnosticInfo>>,
}

/// Acknowledges receipt of one notification message.
#[crate::ua_encodable]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SubscriptionAcknowledgement {
    /// Subscription the message came from.
    pub subscription_id: u32,
    /// Sequence number of the message.
    pub sequence_number: u32,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PublishRequest {
    pub request_header: RequestHeader,
    pub subscription_acknowledgements: Option<Vec<SubscriptionAcknowledgement>>,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PublishResponse {
    pub response_header: ResponseHeader,
    pub subscription_id: u32,
    pub available_sequence_numbers: Option<Vec<u32>>,
    pub more_notifications: bool,
    pub notification_message: NotificationMessage,
    /// One status per acknowledgement in the request.
    pub results: Option<Vec<StatusCode>>,
    pub diagnostic_infos: Option<Vec<DiagnosticInfo>>,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RepublishRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub retransmit_sequence_number: u32,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RepublishResponse {
    pub response_header: ResponseHeader,
    pub notification_message: NotificationMessage,
}

/// A sequenced batch of notifications from one subscription. A message
/// without notification data is a keep-alive.
#[crate::ua_encodable]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotificationMessage {
    /// Sequence number, starting at 1.
    pub sequence_number: u32,
    /// When the message was assembled.
    pub publish_time: DateTime,
    /// `DataChangeNotification` and `StatusChangeNotification` objects.
    pub notification_data: Option<Vec<ExtensionObject>>,
}

/// Changed values of monitored items.
#[crate::ua_encodable]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataChangeNotification {
    /// One entry per reported value.
    pub monitored_items: Option<Vec<MonitoredItemNotification>>,
    /// Unused.
    pub diagnostic_infos: Option<Vec<DiagnosticInfo>>,
}

/// One reported value.
#[crate::ua_encodable]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoredItemNotification {
    /// Client handle of the monitored item.
    pub client_handle: u32,
    /// The value.
    pub value: DataValue,
}

/// A change in the state of a subscription, such as its expiry.
#[crate::ua_encodable]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusChangeNotification {
    /// New status of the subscription.
    pub status: StatusCode,
    /// Diagnostics.
    pub diagnostic_info: DiagnosticInfo,
}

impl NotificationMessage {
    /// A message without notifications.
    pub fn keep_alive(sequence_number: u32, publish_time: DateTime) -> Self {
        Self {
            sequence_number,
            publish_time,
            notification_data: None,
        }
    }

    /// `true` if the message carries no notifications.
    pub fn is_keep_alive(&self) -> bool {
        self.notification_data
            .as_ref()
            .map_or(true, |data| data.is_empty())
    }

    /// Data change notifications in this message, decoded.
    pub fn data_changes(&self) -> impl Iterator<Item = &DataChangeNotification> {
        self.notification_data
            .iter()
            .flatten()
            .filter_map(|n| n.inner_as::<DataChangeNotification>())
    }

    /// Status change notifications in this message, decoded.
    pub fn status_changes(&self) -> impl Iterator<Item = &StatusChangeNotification> {
        self.notification_data
            .iter()
            .flatten()
            .filter_map(|n| n.inner_as::<StatusChangeNotification>())
    }
}
