// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The subscription and publish engine.
//!
//! Every subscription runs as its own task (see [`actor`]) and every session
//! has one publish dispatcher task (see [`publish`]). [`SessionSubscriptions`]
//! is the front the services talk to: it keeps the handles of the tasks of a
//! session and turns service requests into commands for them.

pub mod actor;
mod monitored_item;
pub mod publish;
mod subscription;

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use hashbrown::HashMap;
use log::{debug, info};
use parking_lot::RwLock;
use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use ua_core::{handle::AtomicHandle, ResponseMessage};
use ua_types::{
    CreateMonitoredItemsRequest, CreateMonitoredItemsResponse, CreateSubscriptionRequest,
    CreateSubscriptionResponse, DataValue, DeleteMonitoredItemsRequest,
    DeleteMonitoredItemsResponse, DeleteSubscriptionsRequest, DeleteSubscriptionsResponse,
    ModifySubscriptionRequest, ModifySubscriptionResponse, MonitoringMode, NodeId, PublishRequest,
    RepublishRequest, RepublishResponse, ResponseHeader, SetPublishingModeRequest,
    SetPublishingModeResponse, StatusCode, TimestampsToReturn,
};

pub use monitored_item::MonitoredItem;
pub use subscription::{OutgoingMessage, RevisedParameters, Subscription, TickResult};

use crate::config::SubscriptionLimits;
use actor::{SubscriptionActor, SubscriptionCommand, SubscriptionHandle};
use publish::{DispatchEvent, PendingPublish, PublishActivity, PublishDispatcher};

/// The subscriptions of one session.
pub struct SessionSubscriptions {
    session_id: u32,
    limits: SubscriptionLimits,
    publish_timeout_default: Duration,
    subscriptions: RwLock<HashMap<u32, SubscriptionHandle>>,
    next_subscription_id: Arc<AtomicHandle>,
    dispatcher: mpsc::UnboundedSender<DispatchEvent>,
    activity: Arc<PublishActivity>,
    cancel: CancellationToken,
}

impl SessionSubscriptions {
    /// Create the engine of a session and spawn its publish dispatcher.
    /// Everything stops when `cancel` fires. Must be called within a tokio
    /// runtime.
    pub fn new(
        session_id: u32,
        limits: SubscriptionLimits,
        publish_timeout_default: Duration,
        next_subscription_id: Arc<AtomicHandle>,
        cancel: CancellationToken,
    ) -> Self {
        let activity = Arc::new(PublishActivity::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = PublishDispatcher::new(
            limits.max_pending_publish_requests,
            limits.max_queued_notifications,
            activity.clone(),
        );
        tokio::spawn(dispatcher.run(rx, cancel.clone()));
        Self {
            session_id,
            limits,
            publish_timeout_default,
            subscriptions: RwLock::new(HashMap::new()),
            next_subscription_id,
            dispatcher: tx,
            activity,
            cancel,
        }
    }

    /// Publish activity of the session.
    pub fn activity(&self) -> &PublishActivity {
        &self.activity
    }

    /// Ids of the live subscriptions, in ascending order. Subscriptions whose
    /// task has stopped are forgotten.
    pub fn subscription_ids(&self) -> Vec<u32> {
        self.purge_stopped();
        let mut ids: Vec<_> = self.subscriptions.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.purge_stopped();
        self.subscriptions.read().len()
    }

    /// `true` if the session has no live subscriptions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_stopped(&self) {
        let mut subscriptions = self.subscriptions.write();
        subscriptions.retain(|id, handle| {
            let alive = handle.is_alive();
            if !alive {
                debug!("Session {} forgets stopped subscription {id}", self.session_id);
            }
            alive
        });
    }

    fn with_handle<T>(
        &self,
        subscription_id: u32,
        f: impl FnOnce(&SubscriptionHandle) -> T,
    ) -> Result<T, StatusCode> {
        let subscriptions = self.subscriptions.read();
        match subscriptions.get(&subscription_id) {
            Some(handle) if handle.is_alive() => Ok(f(handle)),
            _ => Err(StatusCode::BadSubscriptionIdInvalid),
        }
    }

    /// Send a command to a subscription and wait for the reply.
    async fn call<T>(
        &self,
        subscription_id: u32,
        command: impl FnOnce(oneshot::Sender<T>) -> SubscriptionCommand,
    ) -> Result<T, StatusCode> {
        let (tx, rx) = oneshot::channel();
        self.with_handle(subscription_id, |h| h.send(command(tx)))??;
        rx.await.map_err(|_| StatusCode::BadSubscriptionIdInvalid)
    }

    /// Create a subscription.
    pub fn create_subscription(
        &self,
        request: &CreateSubscriptionRequest,
    ) -> Result<CreateSubscriptionResponse, StatusCode> {
        self.purge_stopped();
        let mut subscriptions = self.subscriptions.write();
        let max = self.limits.max_subscriptions_per_session;
        if max > 0 && subscriptions.len() >= max {
            return Err(StatusCode::BadTooManySubscriptions);
        }
        let params = RevisedParameters::revise(
            &self.limits,
            request.requested_publishing_interval,
            request.requested_lifetime_count,
            request.requested_max_keep_alive_count,
            request.max_notifications_per_publish,
        );
        let id = self.next_subscription_id.next();
        let state = Subscription::new(
            id,
            params,
            request.publishing_enabled,
            request.priority,
            self.limits,
        );
        let handle = SubscriptionActor::spawn(
            state,
            self.dispatcher.clone(),
            self.activity.clone(),
            self.cancel.child_token(),
        );
        subscriptions.insert(id, handle);
        info!(
            "Session {} created subscription {id} publishing every {} ms",
            self.session_id, params.publishing_interval
        );
        Ok(CreateSubscriptionResponse {
            response_header: ResponseHeader::new_good(&request.request_header),
            subscription_id: id,
            revised_publishing_interval: params.publishing_interval,
            revised_lifetime_count: params.lifetime_count,
            revised_max_keep_alive_count: params.max_keep_alive_count,
        })
    }

    /// Change the publishing parameters of a subscription.
    pub async fn modify_subscription(
        &self,
        request: &ModifySubscriptionRequest,
    ) -> Result<ModifySubscriptionResponse, StatusCode> {
        let params = RevisedParameters::revise(
            &self.limits,
            request.requested_publishing_interval,
            request.requested_lifetime_count,
            request.requested_max_keep_alive_count,
            request.max_notifications_per_publish,
        );
        let priority = request.priority;
        self.call(request.subscription_id, |reply| SubscriptionCommand::Modify {
            params,
            priority,
            reply,
        })
        .await?;
        Ok(ModifySubscriptionResponse {
            response_header: ResponseHeader::new_good(&request.request_header),
            revised_publishing_interval: params.publishing_interval,
            revised_lifetime_count: params.lifetime_count,
            revised_max_keep_alive_count: params.max_keep_alive_count,
        })
    }

    /// Enable or disable publishing on a list of subscriptions.
    pub async fn set_publishing_mode(
        &self,
        request: &SetPublishingModeRequest,
    ) -> Result<SetPublishingModeResponse, StatusCode> {
        let ids = non_empty(&request.subscription_ids)?;
        let enabled = request.publishing_enabled;
        let results = join_all(ids.iter().map(|id| async move {
            self.call(*id, |reply| SubscriptionCommand::SetPublishingMode { enabled, reply })
                .await
                .err()
                .unwrap_or(StatusCode::Good)
        }))
        .await;
        Ok(SetPublishingModeResponse {
            response_header: ResponseHeader::new_good(&request.request_header),
            results: Some(results),
            diagnostic_infos: None,
        })
    }

    /// Delete a list of subscriptions with their monitored items.
    pub async fn delete_subscriptions(
        &self,
        request: &DeleteSubscriptionsRequest,
    ) -> Result<DeleteSubscriptionsResponse, StatusCode> {
        let ids = non_empty(&request.subscription_ids)?;
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let handle = self.subscriptions.write().remove(id);
            let status = match handle {
                Some(handle) => match handle
                    .call(|reply| SubscriptionCommand::Delete { reply })
                    .await
                {
                    Ok(()) => {
                        info!("Session {} deleted subscription {id}", self.session_id);
                        StatusCode::Good
                    }
                    Err(status) => status,
                },
                None => StatusCode::BadSubscriptionIdInvalid,
            };
            results.push(status);
        }
        Ok(DeleteSubscriptionsResponse {
            response_header: ResponseHeader::new_good(&request.request_header),
            results: Some(results),
            diagnostic_infos: None,
        })
    }

    /// Create monitored items in a subscription.
    pub async fn create_monitored_items(
        &self,
        request: &CreateMonitoredItemsRequest,
    ) -> Result<CreateMonitoredItemsResponse, StatusCode> {
        if request.timestamps_to_return == TimestampsToReturn::Invalid {
            return Err(StatusCode::BadTimestampsToReturnInvalid);
        }
        let items = non_empty(&request.items_to_create)?.to_vec();
        let timestamps_to_return = request.timestamps_to_return;
        let results = self
            .call(request.subscription_id, |reply| {
                SubscriptionCommand::CreateMonitoredItems {
                    timestamps_to_return,
                    items,
                    reply,
                }
            })
            .await?;
        Ok(CreateMonitoredItemsResponse {
            response_header: ResponseHeader::new_good(&request.request_header),
            results: Some(results),
            diagnostic_infos: None,
        })
    }

    /// Delete monitored items from a subscription.
    pub async fn delete_monitored_items(
        &self,
        request: &DeleteMonitoredItemsRequest,
    ) -> Result<DeleteMonitoredItemsResponse, StatusCode> {
        let ids = non_empty(&request.monitored_item_ids)?.to_vec();
        let results = self
            .call(request.subscription_id, |reply| {
                SubscriptionCommand::DeleteMonitoredItems { ids, reply }
            })
            .await?;
        Ok(DeleteMonitoredItemsResponse {
            response_header: ResponseHeader::new_good(&request.request_header),
            results: Some(results),
            diagnostic_infos: None,
        })
    }

    /// Change the monitoring mode of monitored items in a subscription.
    pub async fn set_monitoring_mode(
        &self,
        subscription_id: u32,
        mode: MonitoringMode,
        ids: &[u32],
    ) -> Result<Vec<StatusCode>, StatusCode> {
        if ids.is_empty() {
            return Err(StatusCode::BadNothingToDo);
        }
        let ids = ids.to_vec();
        self.call(subscription_id, |reply| SubscriptionCommand::SetMonitoringMode {
            mode,
            ids,
            reply,
        })
        .await
    }

    /// Handle a publish request. Acknowledgements are applied first, then
    /// the request is parked with the dispatcher. The returned receiver
    /// yields the response; it fails if the session is closed first.
    pub async fn publish(
        &self,
        request: Box<PublishRequest>,
    ) -> Result<oneshot::Receiver<ResponseMessage>, StatusCode> {
        if self.is_empty() && self.activity.queued() == 0 {
            return Err(StatusCode::BadNoSubscription);
        }

        let ack_results = match &request.subscription_acknowledgements {
            Some(acks) if !acks.is_empty() => Some(
                join_all(acks.iter().map(|ack| async move {
                    let sequence_number = ack.sequence_number;
                    self.call(ack.subscription_id, |reply| SubscriptionCommand::Acknowledge {
                        sequence_number,
                        reply,
                    })
                    .await
                    .unwrap_or_else(|e| e)
                }))
                .await,
            ),
            _ => None,
        };

        let timeout = match request.request_header.timeout_hint {
            0 => self.publish_timeout_default,
            ms => Duration::from_millis(ms.into()),
        };
        let (tx, rx) = oneshot::channel();
        let pending = PendingPublish {
            request,
            ack_results,
            response: tx,
            deadline: Instant::now() + timeout,
        };
        self.dispatcher
            .send(DispatchEvent::Publish(pending))
            .map_err(|_| StatusCode::BadSessionClosed)?;
        Ok(rx)
    }

    /// Fetch a sent message again.
    pub async fn republish(
        &self,
        request: &RepublishRequest,
    ) -> Result<RepublishResponse, StatusCode> {
        let sequence_number = request.retransmit_sequence_number;
        let notification_message = self
            .call(request.subscription_id, |reply| SubscriptionCommand::Republish {
                sequence_number,
                reply,
            })
            .await??;
        Ok(RepublishResponse {
            response_header: ResponseHeader::new_good(&request.request_header),
            notification_message,
        })
    }

    /// Feed a new value of `attribute_id` of `node_id` to every subscription.
    pub fn notify_value(&self, node_id: &NodeId, attribute_id: u32, value: &DataValue) {
        for handle in self.subscriptions.read().values() {
            let _ = handle.send(SubscriptionCommand::Notify {
                node_id: node_id.clone(),
                attribute_id,
                value: value.clone(),
            });
        }
    }

    /// Stop every task of the session. Parked publish requests fail.
    pub fn close(&self) {
        self.cancel.cancel();
        self.subscriptions.write().clear();
    }
}

fn non_empty<T>(items: &Option<Vec<T>>) -> Result<&[T], StatusCode> {
    match items {
        Some(items) if !items.is_empty() => Ok(items),
        _ => Err(StatusCode::BadNothingToDo),
    }
}
