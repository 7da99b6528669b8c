// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

use tokio::time::Instant;
use ua_crypto::SecurityPolicy;
use ua_types::{MessageSecurityMode, StatusCode};

use super::open_pair;
use crate::{
    comms::{ChannelState, SecureChannel, TokenPolicy},
    ChannelError,
};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn assert_fatal<T: std::fmt::Debug>(result: Result<T, ChannelError>, status: StatusCode) {
    match result {
        Err(ChannelError::Fatal(e)) => assert_eq!(e.status(), status),
        r => panic!("Expected fatal {status}, got {r:?}"),
    }
}

#[test]
fn lifetime_is_clamped() {
    let policy = TokenPolicy::default();
    assert_eq!(policy.revise_lifetime(60_000), 60_000);
    assert_eq!(policy.revise_lifetime(1_000), 10_000);
    assert_eq!(policy.revise_lifetime(0), 10_000);
    assert_eq!(policy.revise_lifetime(u32::MAX), 3_600_000);
}

#[test]
fn renewal_overlap() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::Basic256Sha256,
        MessageSecurityMode::SignAndEncrypt,
        60_000,
        t0,
    );
    let first = server.current_token().unwrap();
    assert_eq!(first.security_token().revised_lifetime, 60_000);
    assert_eq!(client.channel_id(), 7);

    assert!(!client.should_renew(t0 + ms(44_999)));
    assert!(client.should_renew(t0 + ms(45_000)));

    let renew = client.make_open_request(2, 60_000).unwrap();
    assert_eq!(client.state(), ChannelState::Renewing);
    let response = server.handle_open_request(&renew, t0 + ms(45_000)).unwrap();
    assert_eq!(response.security_token.token_id, first.token_id() + 1);
    assert_eq!(server.current_token().unwrap().token_id(), 2);

    // The client has not seen the new token yet and keeps sending with the old one.
    let late = client.seal(10, b"in flight").unwrap();
    let opened = server.open(&late, t0 + ms(74_000)).unwrap();
    assert_eq!(opened.token_id, 1);
    assert_eq!(opened.body, b"in flight");

    client
        .handle_open_response(&response, t0 + ms(45_000))
        .unwrap();
    let fresh = client.seal(11, b"renewed").unwrap();
    assert_eq!(server.open(&fresh, t0 + ms(76_000)).unwrap().token_id, 2);

    let stale = client
        .seal_with_token(&first, 12, b"too late")
        .unwrap();
    assert_fatal(
        server.open(&stale, t0 + ms(76_000)),
        StatusCode::BadSecureChannelTokenUnknown,
    );
}

#[test]
fn previous_token_is_purged() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::Basic256,
        MessageSecurityMode::Sign,
        60_000,
        t0,
    );
    let renew = client.make_open_request(2, 60_000).unwrap();
    server.handle_open_request(&renew, t0 + ms(45_000)).unwrap();
    server.purge_expired_tokens(t0 + ms(60_000));
    assert!(server.token_for_decode(1, t0 + ms(60_000)).is_ok());
    server.purge_expired_tokens(t0 + ms(80_000));
    assert_fatal(
        server.token_for_decode(1, t0 + ms(60_000)),
        StatusCode::BadSecureChannelTokenUnknown,
    );
}

#[test]
fn purge_keeps_renewed_token() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::Basic256Sha256,
        MessageSecurityMode::Sign,
        60_000,
        t0,
    );
    let far_future = t0 + ms(3_600_000);

    std::thread::scope(|s| {
        let renewing = s.spawn(|| {
            for handle in 0..500 {
                let renew = client.make_open_request(handle, 60_000).unwrap();
                let response = server.handle_open_request(&renew, t0).unwrap();
                assert_eq!(
                    server.current_token().unwrap().token_id(),
                    response.security_token.token_id
                );
                client.handle_open_response(&response, t0).unwrap();
            }
        });
        while !renewing.is_finished() {
            server.purge_expired_tokens(far_future);
        }
        renewing.join().unwrap();
    });

    // Every message under the last issued token still opens.
    let message = client.seal(1, b"after").unwrap();
    assert_eq!(server.open(&message, t0).unwrap().token_id, 501);
    server.purge_expired_tokens(far_future);
    assert_eq!(server.current_token().unwrap().token_id(), 501);
    assert_fatal(
        server.token_for_decode(500, t0),
        StatusCode::BadSecureChannelTokenUnknown,
    );
}

#[test]
fn unrenewed_token_expires() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::None,
        MessageSecurityMode::None,
        20_000,
        t0,
    );
    let message = client.seal(1, b"late").unwrap();
    assert_fatal(
        server.open(&message, t0 + ms(25_001)),
        StatusCode::BadSecureChannelTokenUnknown,
    );
    assert_eq!(server.expiry_deadline(), Some(t0 + ms(25_000)));
}

#[test]
fn token_ids_increase() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::Aes128Sha256RsaOaep,
        MessageSecurityMode::SignAndEncrypt,
        30_000,
        t0,
    );
    let mut last = server.current_token().unwrap().token_id();
    for i in 1..5u64 {
        let now = t0 + ms(i * 25_000);
        let renew = client.make_open_request(i as u32 + 1, 30_000).unwrap();
        let response = server.handle_open_request(&renew, now).unwrap();
        assert!(response.security_token.token_id > last);
        last = response.security_token.token_id;
        client.handle_open_response(&response, now).unwrap();
        let message = client.seal(i as u32, b"x").unwrap();
        assert_eq!(server.open(&message, now).unwrap().token_id, last);
    }
}

#[test]
fn issue_on_open_channel_is_fatal() {
    let t0 = Instant::now();
    let (_, server) = open_pair(
        SecurityPolicy::None,
        MessageSecurityMode::None,
        60_000,
        t0,
    );
    let other = SecureChannel::new_client(
        SecurityPolicy::None,
        MessageSecurityMode::None,
        TokenPolicy::default(),
    );
    let issue = other.make_open_request(1, 60_000).unwrap();
    assert_fatal(
        server.handle_open_request(&issue, t0),
        StatusCode::BadRequestTypeInvalid,
    );
}

#[test]
fn security_mode_must_match() {
    let server = SecureChannel::new_server(
        1,
        SecurityPolicy::Basic256Sha256,
        MessageSecurityMode::SignAndEncrypt,
        TokenPolicy::default(),
    );
    let client = SecureChannel::new_client(
        SecurityPolicy::Basic256Sha256,
        MessageSecurityMode::Sign,
        TokenPolicy::default(),
    );
    let request = client.make_open_request(1, 60_000).unwrap();
    assert_fatal(
        server.handle_open_request(&request, Instant::now()),
        StatusCode::BadSecurityModeRejected,
    );
}

#[test]
fn all_policies_round_trip() {
    for policy in SecurityPolicy::all() {
        for mode in [
            MessageSecurityMode::None,
            MessageSecurityMode::Sign,
            MessageSecurityMode::SignAndEncrypt,
        ] {
            let t0 = Instant::now();
            let (client, server) = open_pair(policy, mode, 60_000, t0);
            for len in [0usize, 1, 15, 16, 17, 1000] {
                let body: Vec<u8> = (0..len).map(|i| i as u8).collect();
                let sealed = client.seal(len as u32, &body).unwrap();
                if server.is_encrypted() && len > 16 {
                    assert!(!sealed.windows(16).any(|w| w == &body[..16]));
                }
                let opened = server.open(&sealed, t0).unwrap();
                assert_eq!(opened.body, body, "{policy} {mode:?} {len}");
                assert_eq!(opened.request_id, len as u32);

                let reply = server.seal(len as u32, &body).unwrap();
                assert_eq!(client.open(&reply, t0).unwrap().body, body);
            }
        }
    }
}

#[test]
fn tampering_is_fatal() {
    for mode in [MessageSecurityMode::Sign, MessageSecurityMode::SignAndEncrypt] {
        let t0 = Instant::now();
        let (client, server) = open_pair(SecurityPolicy::Basic256Sha256, mode, 60_000, t0);
        let mut sealed = client.seal(1, b"transfer 100").unwrap();
        sealed[20] ^= 0x01;
        assert_fatal(server.open(&sealed, t0), StatusCode::BadSecurityChecksFailed);
    }
}

#[test]
fn replay_is_fatal() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::Basic256Sha256,
        MessageSecurityMode::Sign,
        60_000,
        t0,
    );
    let sealed = client.seal(1, b"once").unwrap();
    server.open(&sealed, t0).unwrap();
    assert_fatal(server.open(&sealed, t0), StatusCode::BadSequenceNumberInvalid);
}

#[test]
fn wrong_channel_or_token_is_fatal() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::None,
        MessageSecurityMode::None,
        60_000,
        t0,
    );
    let mut sealed = client.seal(1, b"x").unwrap();
    sealed[0] = 8;
    assert_fatal(server.open(&sealed, t0), StatusCode::BadSecureChannelIdInvalid);

    let mut sealed = client.seal(2, b"x").unwrap();
    sealed[4] = 9;
    assert_fatal(
        server.open(&sealed, t0),
        StatusCode::BadSecureChannelTokenUnknown,
    );
}

#[tokio::test]
async fn close_invalidates_everything() {
    let t0 = Instant::now();
    let (client, server) = open_pair(
        SecurityPolicy::Basic256Sha256,
        MessageSecurityMode::SignAndEncrypt,
        60_000,
        t0,
    );
    let cancel = server.cancellation_token();
    let waiter = tokio::spawn(async move { cancel.cancelled().await });
    let sealed = client.seal(1, b"x").unwrap();

    server.close();
    assert_eq!(server.state(), ChannelState::Closed);
    assert!(matches!(server.open(&sealed, t0), Err(ChannelError::Closed)));
    assert!(matches!(server.seal(1, b"x"), Err(ChannelError::Closed)));
    assert!(matches!(server.current_token(), Err(ChannelError::Closed)));
    waiter.await.unwrap();
}
