// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

mod config;
mod secure_channel;
mod service;

use tokio::time::Instant;
use ua_crypto::SecurityPolicy;
use ua_types::MessageSecurityMode;

use crate::comms::{SecureChannel, TokenPolicy};

pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A client and server channel, opened at `now`.
pub(crate) fn open_pair(
    policy: SecurityPolicy,
    mode: MessageSecurityMode,
    lifetime: u32,
    now: Instant,
) -> (SecureChannel, SecureChannel) {
    init_test_logging();
    let server = SecureChannel::new_server(7, policy, mode, TokenPolicy::default());
    let client = SecureChannel::new_client(policy, mode, TokenPolicy::default());
    let request = client.make_open_request(1, lifetime).unwrap();
    let response = server.handle_open_request(&request, now).unwrap();
    client.handle_open_response(&response, now).unwrap();
    (client, server)
}
