// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use ua_core::{
    service::{RequestContext, ServiceHandler},
    RequestMessage, ResponseMessage,
};
use ua_types::StatusCode;

use crate::channels::ChannelRegistry;

/// Answers the subscription services for every channel in a registry.
pub struct SubscriptionService {
    registry: Arc<ChannelRegistry>,
}

impl SubscriptionService {
    /// Create a handler for the channels in `registry`.
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ServiceHandler for SubscriptionService {
    async fn handle(
        &self,
        context: RequestContext,
        request: RequestMessage,
    ) -> Result<ResponseMessage, StatusCode> {
        let Some(session) = self.registry.get(context.channel_id) else {
            warn!("Request on unknown channel {}", context.channel_id);
            return Err(StatusCode::BadSecureChannelIdInvalid);
        };
        debug!(
            "Channel {} request {}: {}",
            context.channel_id,
            context.request_id,
            request.name()
        );
        let subscriptions = session.subscriptions();

        let response: ResponseMessage = match request {
            RequestMessage::CreateSubscription(r) => subscriptions.create_subscription(&r)?.into(),
            RequestMessage::ModifySubscription(r) => {
                subscriptions.modify_subscription(&r).await?.into()
            }
            RequestMessage::SetPublishingMode(r) => {
                subscriptions.set_publishing_mode(&r).await?.into()
            }
            RequestMessage::DeleteSubscriptions(r) => {
                subscriptions.delete_subscriptions(&r).await?.into()
            }
            RequestMessage::CreateMonitoredItems(r) => {
                subscriptions.create_monitored_items(&r).await?.into()
            }
            RequestMessage::DeleteMonitoredItems(r) => {
                subscriptions.delete_monitored_items(&r).await?.into()
            }
            RequestMessage::Republish(r) => subscriptions.republish(&r).await?.into(),
            RequestMessage::Publish(r) => {
                let header = r.request_header.clone();
                let pending = subscriptions.publish(r).await?;
                // Long poll, the dispatcher drops the sender if the session
                // closes first.
                match pending.await {
                    Ok(response) => response,
                    Err(_) => ResponseMessage::service_fault(&header, StatusCode::BadSessionClosed),
                }
            }
            request => {
                debug!("Unsupported service {}", request.name());
                return Err(StatusCode::BadServiceUnsupported);
            }
        };
        Ok(response)
    }
}
