// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The server side runtime: a registry of secure channels, the subscription
//! and publish engine of each session, and continuation points for paged
//! results.
//!
//! Address space and session management are outside this crate. Values enter
//! the engine through [`Server::notify_value`], and requests arrive through
//! the [`ua_core::service::ServiceHandler`] implemented by
//! [`SubscriptionService`].

#![warn(missing_docs)]

mod channels;
pub mod config;
pub mod continuation_points;
mod message_handler;
mod server;
pub mod subscriptions;

pub use channels::{ChannelRegistry, Session};
pub use config::ServerConfig;
pub use message_handler::SubscriptionService;
pub use server::Server;

/// Default values of the server configuration.
pub mod constants {
    /// Default shortest security token lifetime.
    pub const MIN_TOKEN_LIFETIME_MS: u32 = 10_000;
    /// Default longest security token lifetime.
    pub const MAX_TOKEN_LIFETIME_MS: u32 = 3_600_000;
    /// Default fraction of the token lifetime after which a client renews.
    pub const TOKEN_RENEW_FRACTION: f64 = 0.75;
    /// Default fraction of the token lifetime a token survives its expiry.
    pub const TOKEN_GRACE_FRACTION: f64 = 0.25;
    /// Default publish request timeout.
    pub const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 30_000;
    /// Default number of open secure channels.
    pub const MAX_CHANNELS: usize = 100;

    /// Maximum number of subscriptions in a session.
    pub const MAX_SUBSCRIPTIONS_PER_SESSION: usize = 100;
    /// Maximum number of pending publish requests in a session.
    pub const MAX_PENDING_PUBLISH_REQUESTS: usize = 20;
    /// Fastest sampling rate in milliseconds.
    pub const MIN_SAMPLING_INTERVAL_MS: f64 = 50.0;
    /// Fastest publishing rate in milliseconds.
    pub const MIN_PUBLISHING_INTERVAL_MS: f64 = 50.0;
    /// Maximum keep-alive count.
    pub const MAX_KEEP_ALIVE_COUNT: u32 = 30000;
    /// Keep-alive count used when the client asks for 0.
    pub const DEFAULT_KEEP_ALIVE_COUNT: u32 = 10;
    /// Maximum number of monitored items in a subscription.
    pub const DEFAULT_MAX_MONITORED_ITEMS_PER_SUB: usize = 1000;
    /// Maximum number of values queued per monitored item.
    pub const MAX_DATA_CHANGE_QUEUE_SIZE: usize = 10;
    /// Maximum number of notifications in one message, 0 for no limit.
    pub const MAX_NOTIFICATIONS_PER_PUBLISH: u64 = 0;
    /// Maximum number of messages waiting for a publish request per session.
    pub const MAX_QUEUED_NOTIFICATIONS: usize = 20;
    /// Maximum number of messages kept for republish per subscription.
    pub const MAX_RETRANSMISSION_QUEUE_SIZE: usize = 40;

    /// Maximum number of browse continuation points per session.
    pub const MAX_BROWSE_CONTINUATION_POINTS: usize = 5000;
    /// Maximum number of history continuation points per session.
    pub const MAX_HISTORY_CONTINUATION_POINTS: usize = 500;
    /// Maximum number of query continuation points per session.
    pub const MAX_QUERY_CONTINUATION_POINTS: usize = 500;
    /// Idle time after which a continuation point is released.
    pub const CONTINUATION_POINT_EXPIRY_MS: u64 = 60_000;
    /// Length of continuation point handles.
    pub const CONTINUATION_POINT_HANDLE_LENGTH: usize = 16;
}
