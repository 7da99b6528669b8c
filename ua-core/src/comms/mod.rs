// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Secure channel state and the secured message envelope.

pub mod secure_channel;
pub mod secured_message;

pub use secure_channel::{ChannelState, ChannelToken, Role, SecureChannel, TokenPolicy};
pub use secured_message::SecuredMessage;
