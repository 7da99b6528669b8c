// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::{sync::Arc, time::Duration};

use hashbrown::HashMap;
use log::{debug, info, warn};
use parking_lot::RwLock;
use tokio::time::Instant;
use ua_core::{comms::SecureChannel, handle::AtomicHandle, ChannelError};
use ua_crypto::SecurityPolicy;
use ua_types::{
    MessageSecurityMode, OpenSecureChannelRequest, OpenSecureChannelResponse, StatusCode,
};

use crate::{
    config::ServerConfig, continuation_points::ContinuationPoints,
    subscriptions::SessionSubscriptions,
};

/// Everything the server keeps for one open secure channel: the channel
/// itself, its subscriptions and its continuation points.
pub struct Session {
    channel: Arc<SecureChannel>,
    subscriptions: SessionSubscriptions,
    continuation_points: ContinuationPoints,
}

impl Session {
    /// The secure channel.
    pub fn channel(&self) -> &Arc<SecureChannel> {
        &self.channel
    }

    /// Channel id, which doubles as the session id.
    pub fn id(&self) -> u32 {
        self.channel.channel_id()
    }

    /// The subscriptions of the session.
    pub fn subscriptions(&self) -> &SessionSubscriptions {
        &self.subscriptions
    }

    /// The continuation points of the session.
    pub fn continuation_points(&self) -> &ContinuationPoints {
        &self.continuation_points
    }

    fn close(&self) {
        self.channel.close();
        self.subscriptions.close();
    }
}

/// The open channels of a server, by channel id.
pub struct ChannelRegistry {
    config: Arc<ServerConfig>,
    next_channel_id: AtomicHandle,
    next_subscription_id: Arc<AtomicHandle>,
    sessions: RwLock<HashMap<u32, Arc<Session>>>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            config,
            next_channel_id: AtomicHandle::new(1),
            next_subscription_id: Arc::new(AtomicHandle::new(1)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a new channel from the first `OpenSecureChannel` request of a
    /// client. Must be called within a tokio runtime.
    pub fn open_channel(
        &self,
        security_policy: SecurityPolicy,
        security_mode: MessageSecurityMode,
        request: &OpenSecureChannelRequest,
        now: Instant,
    ) -> Result<(Arc<Session>, OpenSecureChannelResponse), ChannelError> {
        let max_channels = self.config.limits.max_channels;
        if max_channels > 0 && self.len() >= max_channels {
            warn!("Rejecting channel, {max_channels} channels are already open");
            return Err(ChannelError::fatal(
                StatusCode::BadResourceUnavailable,
                "Too many open channels",
            ));
        }

        let channel_id = self.next_channel_id.next();
        let channel = Arc::new(SecureChannel::new_server(
            channel_id,
            security_policy,
            security_mode,
            self.config.token_policy(),
        ));
        let response = channel.handle_open_request(request, now)?;

        let cancel = channel.cancellation_token().child_token();
        let session = Arc::new(Session {
            subscriptions: SessionSubscriptions::new(
                channel_id,
                self.config.limits.subscriptions,
                Duration::from_millis(self.config.publish_timeout_default_ms),
                self.next_subscription_id.clone(),
                cancel,
            ),
            continuation_points: ContinuationPoints::new(&self.config.limits.continuation_points),
            channel,
        });
        self.sessions.write().insert(channel_id, session.clone());
        info!("Opened channel {channel_id} with {security_policy:?} / {security_mode:?}");
        Ok((session, response))
    }

    /// Look up an open channel.
    pub fn get(&self, channel_id: u32) -> Option<Arc<Session>> {
        self.sessions.read().get(&channel_id).cloned()
    }

    /// Ids of the open channels.
    pub fn channel_ids(&self) -> Vec<u32> {
        self.sessions.read().keys().copied().collect()
    }

    /// Close a channel and stop its subscriptions. Returns `false` if the
    /// channel was unknown.
    pub fn close(&self, channel_id: u32) -> bool {
        let session = self.sessions.write().remove(&channel_id);
        match session {
            Some(session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    /// Close every channel.
    pub fn close_all(&self) {
        let sessions: Vec<_> = self.sessions.write().drain().map(|(_, s)| s).collect();
        for session in sessions {
            session.close();
        }
    }

    /// Drop tokens past their grace period. Channels that were closed, or
    /// whose current token has expired, are removed.
    pub fn purge_expired(&self, now: Instant) {
        let mut sessions = self.sessions.write();
        sessions.retain(|id, session| {
            let channel = session.channel();
            channel.purge_expired_tokens(now);
            let expired = channel.expiry_deadline().is_some_and(|d| now > d);
            if expired {
                info!("Channel {id} token expired without renewal");
            } else if channel.is_closed() {
                debug!("Removing closed channel {id}");
            } else {
                return true;
            }
            session.close();
            false
        });
    }

    /// Number of open channels.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// `true` if no channel is open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
