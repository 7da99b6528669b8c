// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

#![no_main]
#![cfg(feature = "nightly")]
use libfuzzer_sys::fuzz_target;

use tokio::time::Instant;
use ua_core::{
    comms::{SecureChannel, TokenPolicy},
    Message, RequestMessage,
};
use ua_crypto::SecurityPolicy;
use ua_types::{ContextOwned, MessageSecurityMode};

fuzz_target!(|data: &[u8]| {
    // An open unsecured channel, then arbitrary bytes as the next message.
    let server = SecureChannel::new_server(
        1,
        SecurityPolicy::None,
        MessageSecurityMode::None,
        TokenPolicy::default(),
    );
    let client = SecureChannel::new_client(
        SecurityPolicy::None,
        MessageSecurityMode::None,
        TokenPolicy::default(),
    );
    let now = Instant::now();
    let Ok(request) = client.make_open_request(1, 60_000) else {
        return;
    };
    let Ok(response) = server.handle_open_request(&request, now) else {
        return;
    };
    let _ = client.handle_open_response(&response, now);

    if let Ok(message) = server.open(data, now) {
        let ctx = ContextOwned::default();
        let _ = RequestMessage::decode_body(&message.body, &ctx.context());
    }
});
