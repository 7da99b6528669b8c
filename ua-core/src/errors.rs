// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Errors raised by a secure channel.

use thiserror::Error;
use ua_types::{Error, StatusCode};

/// An error on a secure channel. Only [`ChannelError::Message`] leaves the
/// channel usable, every other variant means the channel must be torn down.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The peer is desynchronized or hostile, for example it used an unknown or
    /// expired token or a signature did not verify.
    #[error("Channel fatal error: {0}")]
    Fatal(Error),
    /// The channel has been closed.
    #[error("Secure channel is closed")]
    Closed,
    /// A single message could not be processed.
    #[error("Message error: {0}")]
    Message(Error),
}

impl ChannelError {
    /// Create a fatal error.
    pub fn fatal(status: StatusCode, context: impl Into<String>) -> Self {
        Self::Fatal(Error::new(status, context.into()))
    }

    /// `true` if the channel must be closed.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Message(_))
    }

    /// Status code to report for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Fatal(e) | Self::Message(e) => e.status(),
            Self::Closed => StatusCode::BadSecureChannelClosed,
        }
    }
}

impl From<Error> for ChannelError {
    fn from(value: Error) -> Self {
        Self::Message(value)
    }
}
