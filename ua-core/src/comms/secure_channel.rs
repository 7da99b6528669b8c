// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The secure channel and the lifecycle of its security tokens.
//!
//! A channel holds at most two tokens. New messages are always secured with
//! the current token. After a renewal the previous token is still accepted
//! on inbound messages until its lifetime plus a grace period has elapsed, to
//! absorb messages that were in flight when the renewal completed.

use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use arc_swap::ArcSwap;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use ua_crypto::{ChannelKeys, DerivedKeys, SecurityPolicy};
use ua_types::{
    ByteString, ChannelSecurityToken, DateTime, MessageSecurityMode, NodeId,
    OpenSecureChannelRequest, OpenSecureChannelResponse, RequestHeader, ResponseHeader,
    SecurityTokenRequestType, StatusCode,
};

use crate::ChannelError;

/// Role of an application in OPC-UA communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Role is client.
    Client,
    /// Role is server.
    Server,
}

/// State of a secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No tokens, nothing can be sent or received.
    Closed,
    /// Waiting for the first token.
    Opening,
    /// A token is active.
    Open,
    /// A renewal has been requested but not yet answered.
    Renewing,
}

fn default_min_lifetime() -> u32 {
    10_000
}

fn default_max_lifetime() -> u32 {
    3_600_000
}

fn default_renew_fraction() -> f64 {
    0.75
}

fn default_grace_fraction() -> f64 {
    0.25
}

/// Lifetime rules for security tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPolicy {
    /// Shortest lifetime a server grants, in milliseconds.
    #[serde(default = "default_min_lifetime")]
    pub min_lifetime_ms: u32,
    /// Longest lifetime a server grants, in milliseconds.
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_ms: u32,
    /// Fraction of the lifetime after which a client renews.
    #[serde(default = "default_renew_fraction")]
    pub renew_fraction: f64,
    /// Fraction of the lifetime a token stays valid for inbound messages
    /// once its lifetime has elapsed.
    #[serde(default = "default_grace_fraction")]
    pub grace_fraction: f64,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            min_lifetime_ms: default_min_lifetime(),
            max_lifetime_ms: default_max_lifetime(),
            renew_fraction: default_renew_fraction(),
            grace_fraction: default_grace_fraction(),
        }
    }
}

impl TokenPolicy {
    /// Lifetime granted for a requested lifetime. The result lies in
    /// `[min, max]` and is only above the request if the request is below
    /// the minimum.
    pub fn revise_lifetime(&self, requested_ms: u32) -> u32 {
        requested_ms
            .min(self.max_lifetime_ms)
            .max(self.min_lifetime_ms)
    }

    /// Time after issue at which a client should renew a token.
    pub fn renew_after(&self, lifetime_ms: u32) -> Duration {
        Duration::from_secs_f64(lifetime_ms as f64 * self.renew_fraction / 1000.0)
    }

    /// Time after issue beyond which a token is rejected.
    pub fn valid_for(&self, lifetime_ms: u32) -> Duration {
        Duration::from_secs_f64(lifetime_ms as f64 * (1.0 + self.grace_fraction) / 1000.0)
    }

    /// Check the policy, returning the list of problems.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.min_lifetime_ms == 0 {
            errors.push("min_lifetime_ms must be greater than 0".to_owned());
        }
        if self.min_lifetime_ms > self.max_lifetime_ms {
            errors.push(format!(
                "min_lifetime_ms {} is greater than max_lifetime_ms {}",
                self.min_lifetime_ms, self.max_lifetime_ms
            ));
        }
        if !(self.renew_fraction > 0.0 && self.renew_fraction < 1.0) {
            errors.push(format!(
                "renew_fraction {} must lie between 0 and 1",
                self.renew_fraction
            ));
        }
        if !(self.grace_fraction >= 0.0 && self.grace_fraction <= 1.0) {
            errors.push(format!(
                "grace_fraction {} must lie between 0 and 1",
                self.grace_fraction
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A security token together with the keys derived for it.
pub struct ChannelToken {
    token: ChannelSecurityToken,
    /// Local instant the token was issued or received.
    issued_at: Instant,
    keys: ChannelKeys,
}

impl std::fmt::Debug for ChannelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelToken")
            .field("token", &self.token)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

impl ChannelToken {
    /// The token as sent on the wire.
    pub fn security_token(&self) -> &ChannelSecurityToken {
        &self.token
    }

    /// Token id.
    pub fn token_id(&self) -> u32 {
        self.token.token_id
    }

    /// Local instant the token was issued or received.
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// Keys derived for the token.
    pub fn keys(&self) -> &ChannelKeys {
        &self.keys
    }

    /// Keys for what `role` sends.
    pub fn sending_keys(&self, role: Role) -> Option<&DerivedKeys> {
        self.keys.sending(role == Role::Server)
    }

    /// Keys for what `role` receives.
    pub fn receiving_keys(&self, role: Role) -> Option<&DerivedKeys> {
        self.keys.receiving(role == Role::Server)
    }
}

#[derive(Debug, Default)]
struct TokenSet {
    current: Option<Arc<ChannelToken>>,
    previous: Option<Arc<ChannelToken>>,
}

#[derive(Debug)]
struct ChannelInner {
    state: ChannelState,
    channel_id: u32,
    last_token_id: u32,
    /// Nonce sent in the pending open or renew request, client only.
    local_nonce: ByteString,
    requested_lifetime: u32,
}

/// Holds the security state of one secure channel.
#[derive(Debug)]
pub struct SecureChannel {
    role: Role,
    security_policy: SecurityPolicy,
    security_mode: MessageSecurityMode,
    token_policy: TokenPolicy,
    /// Snapshot of the tokens, read without locking on every message.
    tokens: ArcSwap<TokenSet>,
    inner: Mutex<ChannelInner>,
    send_sequence_number: AtomicU32,
    last_received_sequence_number: Mutex<Option<u32>>,
    cancel: CancellationToken,
}

impl SecureChannel {
    fn new(
        role: Role,
        channel_id: u32,
        security_policy: SecurityPolicy,
        security_mode: MessageSecurityMode,
        token_policy: TokenPolicy,
    ) -> Self {
        Self {
            role,
            security_policy,
            security_mode,
            token_policy,
            tokens: ArcSwap::from_pointee(TokenSet::default()),
            inner: Mutex::new(ChannelInner {
                state: ChannelState::Opening,
                channel_id,
                last_token_id: 0,
                local_nonce: ByteString::null(),
                requested_lifetime: 0,
            }),
            send_sequence_number: AtomicU32::new(1),
            last_received_sequence_number: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Create the server side of a channel with the given id.
    pub fn new_server(
        channel_id: u32,
        security_policy: SecurityPolicy,
        security_mode: MessageSecurityMode,
        token_policy: TokenPolicy,
    ) -> Self {
        Self::new(
            Role::Server,
            channel_id,
            security_policy,
            security_mode,
            token_policy,
        )
    }

    /// Create the client side of a channel. The channel id is assigned by
    /// the server when the channel opens.
    pub fn new_client(
        security_policy: SecurityPolicy,
        security_mode: MessageSecurityMode,
        token_policy: TokenPolicy,
    ) -> Self {
        Self::new(
            Role::Client,
            0,
            security_policy,
            security_mode,
            token_policy,
        )
    }

    /// Role of this end of the channel.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Security policy of the channel.
    pub fn security_policy(&self) -> SecurityPolicy {
        self.security_policy
    }

    /// Security mode of the channel.
    pub fn security_mode(&self) -> MessageSecurityMode {
        self.security_mode
    }

    /// `true` if messages are signed.
    pub fn is_signed(&self) -> bool {
        self.security_policy.is_secure()
            && matches!(
                self.security_mode,
                MessageSecurityMode::Sign | MessageSecurityMode::SignAndEncrypt
            )
    }

    /// `true` if messages are encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.security_policy.is_secure() && self.security_mode == MessageSecurityMode::SignAndEncrypt
    }

    /// Token lifetime rules of the channel.
    pub fn token_policy(&self) -> &TokenPolicy {
        &self.token_policy
    }

    /// Id of the channel, `0` on a client until the channel is open.
    pub fn channel_id(&self) -> u32 {
        self.inner.lock().channel_id
    }

    /// Current state.
    pub fn state(&self) -> ChannelState {
        self.inner.lock().state
    }

    /// `true` once the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A token cancelled when the channel closes. Work bound to the channel
    /// should stop when it fires.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The token used to secure outbound messages.
    pub fn current_token(&self) -> Result<Arc<ChannelToken>, ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.tokens.load().current.clone().ok_or_else(|| {
            ChannelError::fatal(
                StatusCode::BadSecureChannelTokenUnknown,
                "Channel has no security token",
            )
        })
    }

    /// Look up the token an inbound message claims to be secured with. Only
    /// the current token and the previous token within its grace period are
    /// accepted, anything else is fatal to the channel.
    pub fn token_for_decode(
        &self,
        token_id: u32,
        now: Instant,
    ) -> Result<Arc<ChannelToken>, ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        let tokens = self.tokens.load();
        let token = [tokens.current.as_ref(), tokens.previous.as_ref()]
            .into_iter()
            .flatten()
            .find(|t| t.token_id() == token_id)
            .ok_or_else(|| {
                ChannelError::fatal(
                    StatusCode::BadSecureChannelTokenUnknown,
                    format!("Token {token_id} is not known on this channel"),
                )
            })?;
        let valid_until =
            token.issued_at + self.token_policy.valid_for(token.token.revised_lifetime);
        if now > valid_until {
            warn!(
                "Message on channel {} uses token {token_id} which expired {:?} ago",
                token.token.channel_id,
                now - valid_until
            );
            return Err(ChannelError::fatal(
                StatusCode::BadSecureChannelTokenUnknown,
                format!("Token {token_id} has expired"),
            ));
        }
        Ok(token.clone())
    }

    /// `true` if a client should renew its token now.
    pub fn should_renew(&self, now: Instant) -> bool {
        self.renewal_deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Instant at which the current token should be renewed. `None` unless
    /// the channel is open.
    pub fn renewal_deadline(&self) -> Option<Instant> {
        if self.state() != ChannelState::Open {
            return None;
        }
        let tokens = self.tokens.load();
        let current = tokens.current.as_ref()?;
        Some(current.issued_at + self.token_policy.renew_after(current.token.revised_lifetime))
    }

    /// Instant after which the channel can no longer be used unless it is
    /// renewed. Servers close channels that pass this point.
    pub fn expiry_deadline(&self) -> Option<Instant> {
        let tokens = self.tokens.load();
        let current = tokens.current.as_ref()?;
        Some(current.issued_at + self.token_policy.valid_for(current.token.revised_lifetime))
    }

    /// Next sequence number for an outbound message.
    pub fn next_send_sequence_number(&self) -> u32 {
        let mut current = self.send_sequence_number.load(Ordering::Acquire);
        loop {
            // Sequence numbers wrap to 1 well before overflowing.
            let next = if current >= u32::MAX - 1024 { 1 } else { current + 1 };
            match self.send_sequence_number.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return current,
                Err(actual) => current = actual,
            }
        }
    }

    /// Check that an inbound sequence number follows the last one received.
    /// Replayed or reordered messages are fatal.
    pub fn check_received_sequence_number(&self, sequence_number: u32) -> Result<(), ChannelError> {
        let mut last = self.last_received_sequence_number.lock();
        let accepted = match *last {
            None => true,
            Some(prev) if prev >= u32::MAX - 1024 => sequence_number > prev || sequence_number < 1024,
            Some(prev) => sequence_number > prev,
        };
        if !accepted {
            return Err(ChannelError::fatal(
                StatusCode::BadSequenceNumberInvalid,
                format!("Sequence number {sequence_number} does not follow {last:?}"),
            ));
        }
        *last = Some(sequence_number);
        Ok(())
    }

    fn install_token(&self, token: ChannelToken, keep_previous: bool) {
        let token = Arc::new(token);
        let old = self.tokens.load();
        let previous = if keep_previous {
            old.current.clone()
        } else {
            None
        };
        self.tokens.store(Arc::new(TokenSet {
            current: Some(token),
            previous,
        }));
    }

    fn derive_keys(
        &self,
        client_nonce: &ByteString,
        server_nonce: &ByteString,
    ) -> Result<ChannelKeys, ChannelError> {
        ChannelKeys::derive(self.security_policy, client_nonce, server_nonce).map_err(|e| {
            ChannelError::fatal(e.status(), format!("Failed to derive channel keys: {e}"))
        })
    }

    /// Handle an `OpenSecureChannel` request on the server. Issues a new
    /// token, keeping the current one as the previous token on renewal.
    pub fn handle_open_request(
        &self,
        request: &OpenSecureChannelRequest,
        now: Instant,
    ) -> Result<OpenSecureChannelResponse, ChannelError> {
        if self.role != Role::Server {
            return Err(ChannelError::fatal(
                StatusCode::BadInvalidState,
                "Only a server handles open requests",
            ));
        }
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        if request.security_mode != self.security_mode {
            return Err(ChannelError::fatal(
                StatusCode::BadSecurityModeRejected,
                format!(
                    "Requested mode {:?} does not match channel mode {:?}",
                    request.security_mode, self.security_mode
                ),
            ));
        }
        if self.security_policy.is_secure() {
            self.security_policy
                .validate_nonce(&request.client_nonce)
                .map_err(ChannelError::Fatal)?;
        }

        let mut inner = self.inner.lock();
        let renew = match (request.request_type, inner.state) {
            (SecurityTokenRequestType::Issue, ChannelState::Opening) => false,
            (SecurityTokenRequestType::Renew, ChannelState::Open) => true,
            (request_type, state) => {
                return Err(ChannelError::fatal(
                    StatusCode::BadRequestTypeInvalid,
                    format!("{request_type:?} request on a channel that is {state:?}"),
                ));
            }
        };

        let server_nonce = if self.security_policy.is_secure() {
            self.security_policy.random_nonce()
        } else {
            ByteString::null()
        };
        let keys = self.derive_keys(&request.client_nonce, &server_nonce)?;

        inner.last_token_id = inner.last_token_id.wrapping_add(1).max(1);
        let security_token = ChannelSecurityToken {
            channel_id: inner.channel_id,
            token_id: inner.last_token_id,
            created_at: DateTime::now(),
            revised_lifetime: self.token_policy.revise_lifetime(request.requested_lifetime),
        };
        info!(
            "Channel {} {} token {} with lifetime {} ms (requested {} ms)",
            security_token.channel_id,
            if renew { "renewed to" } else { "opened with" },
            security_token.token_id,
            security_token.revised_lifetime,
            request.requested_lifetime
        );
        self.install_token(
            ChannelToken {
                token: security_token.clone(),
                issued_at: now,
                keys,
            },
            renew,
        );
        inner.state = ChannelState::Open;

        Ok(OpenSecureChannelResponse {
            response_header: ResponseHeader::new_good(&request.request_header),
            server_protocol_version: 0,
            security_token,
            server_nonce,
        })
    }

    /// Build the request that opens the channel, or renews its token once it
    /// is open.
    pub fn make_open_request(
        &self,
        request_handle: u32,
        requested_lifetime: u32,
    ) -> Result<OpenSecureChannelRequest, ChannelError> {
        if self.role != Role::Client {
            return Err(ChannelError::fatal(
                StatusCode::BadInvalidState,
                "Only a client makes open requests",
            ));
        }
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        let mut inner = self.inner.lock();
        let request_type = match inner.state {
            ChannelState::Opening => SecurityTokenRequestType::Issue,
            ChannelState::Open => {
                inner.state = ChannelState::Renewing;
                SecurityTokenRequestType::Renew
            }
            state => {
                return Err(ChannelError::Message(ua_types::Error::new(
                    StatusCode::BadInvalidState,
                    format!("Cannot request a token while the channel is {state:?}"),
                )));
            }
        };
        inner.local_nonce = if self.security_policy.is_secure() {
            self.security_policy.random_nonce()
        } else {
            ByteString::null()
        };
        inner.requested_lifetime = requested_lifetime;
        debug!("Requesting token ({request_type:?}), lifetime {requested_lifetime} ms");

        Ok(OpenSecureChannelRequest {
            request_header: RequestHeader::new(&NodeId::null(), request_handle),
            client_protocol_version: 0,
            request_type,
            security_mode: self.security_mode,
            client_nonce: inner.local_nonce.clone(),
            requested_lifetime,
        })
    }

    /// Apply the server's answer to an open or renew request on the client.
    pub fn handle_open_response(
        &self,
        response: &OpenSecureChannelResponse,
        now: Instant,
    ) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        let status = response.response_header.service_result;
        if status.is_bad() {
            return Err(ChannelError::fatal(
                status,
                "Server refused to issue a security token",
            ));
        }
        let mut inner = self.inner.lock();
        let token = &response.security_token;
        let renew = match inner.state {
            ChannelState::Opening => false,
            ChannelState::Renewing => {
                if token.channel_id != inner.channel_id || token.token_id <= inner.last_token_id {
                    return Err(ChannelError::fatal(
                        StatusCode::BadSecureChannelTokenUnknown,
                        format!(
                            "Renewed token {}/{} does not follow {}/{}",
                            token.channel_id,
                            token.token_id,
                            inner.channel_id,
                            inner.last_token_id
                        ),
                    ));
                }
                true
            }
            state => {
                return Err(ChannelError::fatal(
                    StatusCode::BadInvalidState,
                    format!("Unexpected open response while the channel is {state:?}"),
                ));
            }
        };
        if self.security_policy.is_secure() {
            self.security_policy
                .validate_nonce(&response.server_nonce)
                .map_err(ChannelError::Fatal)?;
        }
        let keys = self.derive_keys(&inner.local_nonce, &response.server_nonce)?;
        if token.revised_lifetime > inner.requested_lifetime {
            debug!(
                "Server raised token lifetime from {} ms to {} ms",
                inner.requested_lifetime, token.revised_lifetime
            );
        }
        trace!("Received security token {token:?}");

        inner.channel_id = token.channel_id;
        inner.last_token_id = token.token_id;
        inner.local_nonce = ByteString::null();
        inner.state = ChannelState::Open;
        self.install_token(
            ChannelToken {
                token: token.clone(),
                issued_at: now,
                keys,
            },
            renew,
        );
        Ok(())
    }

    /// Drop the previous token once its grace period has passed.
    pub fn purge_expired_tokens(&self, now: Instant) {
        // Token sets are only replaced under `inner`, a renewal in between
        // the load and the store would otherwise be lost.
        let _inner = self.inner.lock();
        let tokens = self.tokens.load();
        let Some(previous) = tokens.previous.as_ref() else {
            return;
        };
        if now > previous.issued_at + self.token_policy.valid_for(previous.token.revised_lifetime)
        {
            trace!("Dropping expired token {}", previous.token_id());
            self.tokens.store(Arc::new(TokenSet {
                current: tokens.current.clone(),
                previous: None,
            }));
        }
    }

    /// Close the channel. All tokens become invalid at once and everything
    /// waiting on the channel's cancellation token is released.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.state == ChannelState::Closed {
            return;
        }
        info!("Closing secure channel {}", inner.channel_id);
        inner.state = ChannelState::Closed;
        self.tokens.store(Arc::new(TokenSet::default()));
        self.cancel.cancel();
    }
}
