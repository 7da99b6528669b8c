// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

/// Security applied to messages on a secure channel.
#[crate::ua_encodable]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MessageSecurityMode {
    /// Not a valid mode, rejected when opening a channel.
    #[opcua(default)]
    Invalid = 0,
    /// No security.
    None = 1,
    /// Messages are signed.
    Sign = 2,
    /// Messages are signed and encrypted.
    SignAndEncrypt = 3,
}

/// Whether an `OpenSecureChannel` request creates a channel or renews its
/// token.
#[crate::ua_encodable]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SecurityTokenRequestType {
    /// Open a new channel.
    #[opcua(default)]
    Issue = 0,
    /// Issue a new token for an existing channel.
    Renew = 1,
}

/// Sampling and reporting state of a monitored item.
#[crate::ua_encodable]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MonitoringMode {
    /// Not sampled, not reported.
    Disabled = 0,
    /// Sampled and queued, not reported.
    Sampling = 1,
    /// Sampled and reported.
    #[opcua(default)]
    Reporting = 2,
}

/// Timestamps attached to values in notifications.
#[crate::ua_encodable]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TimestampsToReturn {
    /// Source timestamp only.
    Source = 0,
    /// Server timestamp only.
    Server = 1,
    /// Both timestamps.
    #[opcua(default)]
    Both = 2,
    /// No timestamps.
    Neither = 3,
    /// Rejected with `BadTimestampsToReturnInvalid`.
    Invalid = 4,
}

/// What counts as a change for a data change filter.
#[crate::ua_encodable]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DataChangeTrigger {
    /// Status changes only.
    Status = 0,
    /// Status or value changes.
    #[opcua(default)]
    StatusValue = 1,
    /// Status, value or source timestamp changes.
    StatusValueTimestamp = 2,
}

/// Deadband kind of a data change filter.
#[crate::ua_encodable]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DeadbandType {
    /// No deadband.
    #[opcua(default)]
    None = 0,
    /// Absolute difference between values.
    Absolute = 1,
    /// Percentage of the engineering unit range.
    Percent = 2,
}
