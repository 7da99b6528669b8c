// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::sync::Arc;

use log::{info, warn};
use tokio::time::Instant;
use ua_core::{
    config::{Config, ConfigError},
    service::process_message,
    ChannelError, Message, RequestMessage, ResponseMessage,
};
use ua_crypto::SecurityPolicy;
use ua_types::{
    ContextOwned, DataValue, MessageSecurityMode, NamespaceMap, NodeId, SecurityTokenRequestType,
    StatusCode,
};

use crate::{
    channels::{ChannelRegistry, Session},
    config::ServerConfig,
    message_handler::SubscriptionService,
};

/// The server runtime. Bytes received on a connection go through
/// [`Server::open_channel`] once, then through [`Server::process`] for every
/// message after that. Transport is up to the caller.
pub struct Server {
    config: Arc<ServerConfig>,
    registry: Arc<ChannelRegistry>,
    handler: SubscriptionService,
    encoding: ContextOwned,
}

impl Server {
    /// Create a server. Fails if the configuration is invalid.
    pub fn new(config: ServerConfig) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::ConfigInvalid)?;
        let config = Arc::new(config);
        let registry = Arc::new(ChannelRegistry::new(config.clone()));
        let encoding =
            ContextOwned::new_default(NamespaceMap::new(), config.limits.decoding_options());
        info!("Server {} created", config.application_name);
        Ok(Self {
            handler: SubscriptionService::new(registry.clone()),
            registry,
            encoding,
            config,
        })
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The open channels.
    pub fn channels(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Encoding context used for message bodies.
    pub fn encoding(&self) -> &ContextOwned {
        &self.encoding
    }

    /// Open a channel from the body of the first `OpenSecureChannel` request
    /// on a connection. The request and the response travel unsecured, the
    /// response body is returned with the new channel id.
    pub fn open_channel(
        &self,
        security_policy: SecurityPolicy,
        security_mode: MessageSecurityMode,
        body: &[u8],
    ) -> Result<(u32, Vec<u8>), ChannelError> {
        let ctx = self.encoding.context();
        let request = match RequestMessage::decode_body(body, &ctx) {
            Ok(RequestMessage::OpenSecureChannel(request))
                if request.request_type == SecurityTokenRequestType::Issue =>
            {
                request
            }
            Ok(request) => {
                return Err(ChannelError::fatal(
                    StatusCode::BadRequestTypeInvalid,
                    format!("Expected an Issue request, got {}", request.name()),
                ))
            }
            Err(e) => return Err(ChannelError::Fatal(e)),
        };
        let (session, response) =
            self.registry
                .open_channel(security_policy, security_mode, &request, Instant::now())?;
        let response: ResponseMessage = response.into();
        let body = response.encode_body(&ctx).map_err(ChannelError::Fatal)?;
        Ok((session.id(), body))
    }

    /// Process a secured message received on `channel_id` and return the
    /// secured response, if any. The channel is forgotten when it is closed,
    /// by the client or after a fatal error.
    pub async fn process(
        &self,
        channel_id: u32,
        data: &[u8],
    ) -> Result<Option<Vec<u8>>, ChannelError> {
        let Some(session) = self.registry.get(channel_id) else {
            return Err(ChannelError::fatal(
                StatusCode::BadSecureChannelIdInvalid,
                format!("Unknown channel {channel_id}"),
            ));
        };
        let result = process_message(session.channel(), &self.handler, &self.encoding, data).await;
        match &result {
            Ok(None) => {
                self.registry.close(channel_id);
            }
            Err(e) if e.is_fatal() => {
                warn!("Dropping channel {channel_id}: {e}");
                self.registry.close(channel_id);
            }
            _ => {}
        }
        result
    }

    /// Look up the state of an open channel.
    pub fn session(&self, channel_id: u32) -> Option<Arc<Session>> {
        self.registry.get(channel_id)
    }

    /// Feed a new value of a node attribute to every subscription that
    /// monitors it.
    pub fn notify_value(&self, node_id: &NodeId, attribute_id: u32, value: &DataValue) {
        for channel_id in self.registry.channel_ids() {
            if let Some(session) = self.registry.get(channel_id) {
                session
                    .subscriptions()
                    .notify_value(node_id, attribute_id, value);
            }
        }
    }

    /// Drop expired tokens and channels. Call this periodically.
    pub fn purge_expired(&self) {
        self.registry.purge_expired(Instant::now());
    }

    /// Close one channel.
    pub fn close_channel(&self, channel_id: u32) -> bool {
        self.registry.close(channel_id)
    }

    /// Close every channel.
    pub fn shutdown(&self) {
        info!("Server {} shutting down", self.config.application_name);
        self.registry.close_all();
    }
}
