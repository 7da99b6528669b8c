// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};
use ua_types::DecodingOptions;

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
/// Server limits configuration.
pub struct Limits {
    /// Max array length in elements
    #[serde(default = "defaults::max_array_length")]
    pub max_array_length: usize,
    /// Max string length in characters
    #[serde(default = "defaults::max_string_length")]
    pub max_string_length: usize,
    /// Max bytestring length in bytes
    #[serde(default = "defaults::max_byte_string_length")]
    pub max_byte_string_length: usize,
    /// Maximum message length in bytes
    #[serde(default = "defaults::max_message_size")]
    pub max_message_size: usize,
    /// Maximum nesting of variants, data values and extension objects.
    #[serde(default = "defaults::max_decoding_depth")]
    pub max_decoding_depth: u64,
    /// Maximum number of open secure channels.
    #[serde(default = "defaults::max_channels")]
    pub max_channels: usize,
    /// Limits specific to subscriptions.
    #[serde(default)]
    pub subscriptions: SubscriptionLimits,
    /// Limits on continuation points.
    #[serde(default)]
    pub continuation_points: ContinuationPointLimits,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_array_length: defaults::max_array_length(),
            max_string_length: defaults::max_string_length(),
            max_byte_string_length: defaults::max_byte_string_length(),
            max_message_size: defaults::max_message_size(),
            max_decoding_depth: defaults::max_decoding_depth(),
            max_channels: defaults::max_channels(),
            subscriptions: Default::default(),
            continuation_points: Default::default(),
        }
    }
}

impl Limits {
    /// Decoding options for messages received by the server.
    pub fn decoding_options(&self) -> DecodingOptions {
        DecodingOptions {
            max_message_size: self.max_message_size,
            max_string_length: self.max_string_length,
            max_byte_string_length: self.max_byte_string_length,
            max_array_length: self.max_array_length,
            decoding_depth_gauge: ua_types::DepthGauge::new(self.max_decoding_depth),
        }
    }

    pub(crate) fn validate(&self, errors: &mut Vec<String>) {
        if self.max_channels == 0 {
            errors.push("limits.max_channels must be at least 1".to_owned());
        }
        self.subscriptions.validate(errors);
        self.continuation_points.validate(errors);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
/// Subscription-related limits.
pub struct SubscriptionLimits {
    /// Maximum number of subscriptions per session.
    #[serde(default = "defaults::max_subscriptions_per_session")]
    pub max_subscriptions_per_session: usize,
    /// Maximum number of pending publish requests per session.
    #[serde(default = "defaults::max_pending_publish_requests")]
    pub max_pending_publish_requests: usize,
    /// Specifies the minimum sampling interval for this server in milliseconds.
    #[serde(default = "defaults::min_sampling_interval_ms")]
    pub min_sampling_interval_ms: f64,
    /// Specifies the minimum publishing interval for this server in milliseconds.
    #[serde(default = "defaults::min_publishing_interval_ms")]
    pub min_publishing_interval_ms: f64,
    /// Maximum value of `KeepAliveCount`
    #[serde(default = "defaults::max_keep_alive_count")]
    pub max_keep_alive_count: u32,
    /// Default value of `KeepAliveCount`, used if the client sets it to 0.
    #[serde(default = "defaults::default_keep_alive_count")]
    pub default_keep_alive_count: u32,
    /// Maximum number of monitored items per subscription, 0 for no limit
    #[serde(default = "defaults::max_monitored_items_per_sub")]
    pub max_monitored_items_per_sub: usize,
    /// Maximum number of values in a monitored item queue
    #[serde(default = "defaults::max_monitored_item_queue_size")]
    pub max_monitored_item_queue_size: usize,
    /// Maximum lifetime count (3 times as large as max keep alive)
    #[serde(default = "defaults::max_lifetime_count")]
    pub max_lifetime_count: u32,
    /// Maximum number of notifications per publish message, 0 for no limit.
    #[serde(default = "defaults::max_notifications_per_publish")]
    pub max_notifications_per_publish: u64,
    /// Maximum number of messages per session waiting for a publish request.
    #[serde(default = "defaults::max_queued_notifications")]
    pub max_queued_notifications: usize,
    /// Maximum number of sent messages kept for republish, per subscription.
    #[serde(default = "defaults::max_retransmission_queue_size")]
    pub max_retransmission_queue_size: usize,
}

impl Default for SubscriptionLimits {
    fn default() -> Self {
        Self {
            max_subscriptions_per_session: defaults::max_subscriptions_per_session(),
            max_pending_publish_requests: defaults::max_pending_publish_requests(),
            min_sampling_interval_ms: defaults::min_sampling_interval_ms(),
            min_publishing_interval_ms: defaults::min_publishing_interval_ms(),
            max_keep_alive_count: defaults::max_keep_alive_count(),
            default_keep_alive_count: defaults::default_keep_alive_count(),
            max_monitored_items_per_sub: defaults::max_monitored_items_per_sub(),
            max_monitored_item_queue_size: defaults::max_monitored_item_queue_size(),
            max_lifetime_count: defaults::max_lifetime_count(),
            max_notifications_per_publish: defaults::max_notifications_per_publish(),
            max_queued_notifications: defaults::max_queued_notifications(),
            max_retransmission_queue_size: defaults::max_retransmission_queue_size(),
        }
    }
}

impl SubscriptionLimits {
    fn validate(&self, errors: &mut Vec<String>) {
        if self.max_pending_publish_requests == 0 {
            errors.push("max_pending_publish_requests must be at least 1".to_owned());
        }
        if !(self.min_publishing_interval_ms > 0.0) {
            errors.push("min_publishing_interval_ms must be positive".to_owned());
        }
        if self.default_keep_alive_count == 0
            || self.default_keep_alive_count > self.max_keep_alive_count
        {
            errors.push(format!(
                "default_keep_alive_count must be between 1 and {}",
                self.max_keep_alive_count
            ));
        }
        if self.max_lifetime_count < self.max_keep_alive_count.saturating_mul(3) {
            errors.push("max_lifetime_count must be at least 3 times max_keep_alive_count".to_owned());
        }
        if self.max_monitored_item_queue_size == 0 {
            errors.push("max_monitored_item_queue_size must be at least 1".to_owned());
        }
        if self.max_retransmission_queue_size == 0 {
            errors.push("max_retransmission_queue_size must be at least 1".to_owned());
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
/// Limits on continuation points.
pub struct ContinuationPointLimits {
    /// Maximum number of browse continuation points per session.
    #[serde(default = "defaults::max_browse_continuation_points")]
    pub max_browse_continuation_points: usize,
    /// Maximum number of history continuation points per session.
    #[serde(default = "defaults::max_history_continuation_points")]
    pub max_history_continuation_points: usize,
    /// Maximum number of query continuation points per session.
    #[serde(default = "defaults::max_query_continuation_points")]
    pub max_query_continuation_points: usize,
    /// Time in milliseconds after which an unused continuation point is released.
    #[serde(default = "defaults::continuation_point_expiry_ms")]
    pub expiry_ms: u64,
}

impl Default for ContinuationPointLimits {
    fn default() -> Self {
        Self {
            max_browse_continuation_points: defaults::max_browse_continuation_points(),
            max_history_continuation_points: defaults::max_history_continuation_points(),
            max_query_continuation_points: defaults::max_query_continuation_points(),
            expiry_ms: defaults::continuation_point_expiry_ms(),
        }
    }
}

impl ContinuationPointLimits {
    fn validate(&self, errors: &mut Vec<String>) {
        if self.expiry_ms == 0 {
            errors.push("continuation_points.expiry_ms must be positive".to_owned());
        }
    }
}

mod defaults {
    use crate::constants;

    pub fn max_array_length() -> usize {
        ua_types::constants::MAX_ARRAY_LENGTH
    }
    pub fn max_string_length() -> usize {
        ua_types::constants::MAX_STRING_LENGTH
    }
    pub fn max_byte_string_length() -> usize {
        ua_types::constants::MAX_BYTE_STRING_LENGTH
    }
    pub fn max_message_size() -> usize {
        ua_types::constants::MAX_MESSAGE_SIZE
    }
    pub fn max_decoding_depth() -> u64 {
        ua_types::constants::MAX_DECODING_DEPTH
    }
    pub fn max_channels() -> usize {
        constants::MAX_CHANNELS
    }

    pub fn max_subscriptions_per_session() -> usize {
        constants::MAX_SUBSCRIPTIONS_PER_SESSION
    }
    pub fn max_pending_publish_requests() -> usize {
        constants::MAX_PENDING_PUBLISH_REQUESTS
    }
    pub fn min_sampling_interval_ms() -> f64 {
        constants::MIN_SAMPLING_INTERVAL_MS
    }
    pub fn min_publishing_interval_ms() -> f64 {
        constants::MIN_PUBLISHING_INTERVAL_MS
    }
    pub fn max_keep_alive_count() -> u32 {
        constants::MAX_KEEP_ALIVE_COUNT
    }
    pub fn default_keep_alive_count() -> u32 {
        constants::DEFAULT_KEEP_ALIVE_COUNT
    }
    pub fn max_monitored_items_per_sub() -> usize {
        constants::DEFAULT_MAX_MONITORED_ITEMS_PER_SUB
    }
    pub fn max_monitored_item_queue_size() -> usize {
        constants::MAX_DATA_CHANGE_QUEUE_SIZE
    }
    pub fn max_lifetime_count() -> u32 {
        constants::MAX_KEEP_ALIVE_COUNT * 3
    }
    pub fn max_notifications_per_publish() -> u64 {
        constants::MAX_NOTIFICATIONS_PER_PUBLISH
    }
    pub fn max_queued_notifications() -> usize {
        constants::MAX_QUEUED_NOTIFICATIONS
    }
    pub fn max_retransmission_queue_size() -> usize {
        constants::MAX_RETRANSMISSION_QUEUE_SIZE
    }

    pub fn max_browse_continuation_points() -> usize {
        constants::MAX_BROWSE_CONTINUATION_POINTS
    }
    pub fn max_history_continuation_points() -> usize {
        constants::MAX_HISTORY_CONTINUATION_POINTS
    }
    pub fn max_query_continuation_points() -> usize {
        constants::MAX_QUERY_CONTINUATION_POINTS
    }
    pub fn continuation_point_expiry_ms() -> u64 {
        constants::CONTINUATION_POINT_EXPIRY_MS
    }
}
