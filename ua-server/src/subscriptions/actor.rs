// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! One task per subscription. The task owns the subscription state, its
//! monitored item queues and its retransmission queue, and talks to the
//! rest of the session through channels only.

use std::sync::Arc;

use log::{debug, info};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use ua_types::{
    DataValue, DateTime, MonitoredItemCreateRequest, MonitoredItemCreateResult, MonitoringMode,
    NodeId, NotificationMessage, StatusCode, TimestampsToReturn,
};

use super::{
    publish::{DispatchEvent, PublishActivity},
    subscription::{RevisedParameters, Subscription, TickResult},
};

/// Requests handled by a subscription task.
#[derive(Debug)]
pub enum SubscriptionCommand {
    /// Replace the publishing parameters.
    Modify {
        /// New parameters.
        params: RevisedParameters,
        /// New priority.
        priority: u8,
        /// Signalled once applied.
        reply: oneshot::Sender<()>,
    },
    /// Enable or disable publishing.
    SetPublishingMode {
        /// New mode.
        enabled: bool,
        /// Signalled once applied.
        reply: oneshot::Sender<()>,
    },
    /// Create monitored items.
    CreateMonitoredItems {
        /// Timestamps to attach to values.
        timestamps_to_return: TimestampsToReturn,
        /// Items to create.
        items: Vec<MonitoredItemCreateRequest>,
        /// One result per item.
        reply: oneshot::Sender<Vec<MonitoredItemCreateResult>>,
    },
    /// Delete monitored items.
    DeleteMonitoredItems {
        /// Ids of the items.
        ids: Vec<u32>,
        /// One status per id.
        reply: oneshot::Sender<Vec<StatusCode>>,
    },
    /// Change the monitoring mode of monitored items.
    SetMonitoringMode {
        /// New mode.
        mode: MonitoringMode,
        /// Ids of the items.
        ids: Vec<u32>,
        /// One status per id.
        reply: oneshot::Sender<Vec<StatusCode>>,
    },
    /// Acknowledge a sent message.
    Acknowledge {
        /// Sequence number of the message.
        sequence_number: u32,
        /// Result of the acknowledgement.
        reply: oneshot::Sender<StatusCode>,
    },
    /// Fetch a sent message again.
    Republish {
        /// Sequence number of the message.
        sequence_number: u32,
        /// The message, or `BadMessageNotAvailable`.
        reply: oneshot::Sender<Result<NotificationMessage, StatusCode>>,
    },
    /// A new value for a node attribute.
    Notify {
        /// The node.
        node_id: NodeId,
        /// The attribute.
        attribute_id: u32,
        /// The value.
        value: DataValue,
    },
    /// Stop the task.
    Delete {
        /// Signalled once stopped.
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running subscription task.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: u32,
    commands: mpsc::UnboundedSender<SubscriptionCommand>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Subscription id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// `false` once the task has stopped, for example after the
    /// subscription expired.
    pub fn is_alive(&self) -> bool {
        !self.commands.is_closed() && !self.task.is_finished()
    }

    /// Send a command without waiting for it to be handled.
    pub fn send(&self, command: SubscriptionCommand) -> Result<(), StatusCode> {
        self.commands
            .send(command)
            .map_err(|_| StatusCode::BadSubscriptionIdInvalid)
    }

    /// Send a command and wait for its reply. Fails with
    /// `BadSubscriptionIdInvalid` if the task has stopped.
    pub async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SubscriptionCommand,
    ) -> Result<T, StatusCode> {
        let (tx, rx) = oneshot::channel();
        self.send(command(tx))?;
        rx.await.map_err(|_| StatusCode::BadSubscriptionIdInvalid)
    }
}

/// The task driving one subscription.
pub struct SubscriptionActor {
    state: Subscription,
    commands: mpsc::UnboundedReceiver<SubscriptionCommand>,
    outbox: mpsc::UnboundedSender<DispatchEvent>,
    activity: Arc<PublishActivity>,
    last_received: u64,
    cancel: CancellationToken,
}

fn make_interval(params: &RevisedParameters) -> Interval {
    let period = params.interval();
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

impl SubscriptionActor {
    /// Spawn a task for `state`. Messages go to `outbox`, the task stops
    /// when `cancel` fires, when it is deleted or when it expires.
    pub fn spawn(
        state: Subscription,
        outbox: mpsc::UnboundedSender<DispatchEvent>,
        activity: Arc<PublishActivity>,
        cancel: CancellationToken,
    ) -> SubscriptionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = state.id();
        let actor = Self {
            state,
            commands: rx,
            outbox,
            last_received: activity.received(),
            activity,
            cancel,
        };
        let task = tokio::spawn(actor.run());
        SubscriptionHandle {
            id,
            commands: tx,
            task,
        }
    }

    async fn run(mut self) {
        let id = self.state.id();
        let mut interval = make_interval(self.state.parameters());
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Subscription {id} stopped with its session");
                    break;
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if !self.handle_command(command, &mut interval) {
                        break;
                    }
                }
                _ = interval.tick() => {
                    if !self.tick() {
                        break;
                    }
                }
            }
        }
    }

    fn tick(&mut self) -> bool {
        let received = self.activity.received();
        let publish_received = received != self.last_received;
        self.last_received = received;
        let publish_pending = self.activity.pending() > 0;

        match self
            .state
            .tick(DateTime::now(), publish_pending, publish_received)
        {
            TickResult::Idle => true,
            TickResult::Publish(messages) => {
                for message in messages {
                    if self.outbox.send(DispatchEvent::Message(message)).is_err() {
                        return false;
                    }
                }
                true
            }
            TickResult::Expired(message) => {
                info!("Subscription {} removed after expiry", self.state.id());
                let _ = self.outbox.send(DispatchEvent::Message(message));
                false
            }
        }
    }

    /// Returns `false` when the task should stop.
    fn handle_command(&mut self, command: SubscriptionCommand, interval: &mut Interval) -> bool {
        match command {
            SubscriptionCommand::Modify {
                params,
                priority,
                reply,
            } => {
                let interval_changed = params.publishing_interval
                    != self.state.parameters().publishing_interval;
                self.state.modify(params, priority);
                if interval_changed {
                    *interval = make_interval(self.state.parameters());
                }
                let _ = reply.send(());
            }
            SubscriptionCommand::SetPublishingMode { enabled, reply } => {
                self.state.set_publishing_mode(enabled);
                let _ = reply.send(());
            }
            SubscriptionCommand::CreateMonitoredItems {
                timestamps_to_return,
                items,
                reply,
            } => {
                let _ = reply.send(
                    self.state
                        .create_monitored_items(timestamps_to_return, &items),
                );
            }
            SubscriptionCommand::DeleteMonitoredItems { ids, reply } => {
                let _ = reply.send(self.state.delete_monitored_items(&ids));
            }
            SubscriptionCommand::SetMonitoringMode { mode, ids, reply } => {
                let _ = reply.send(self.state.set_monitoring_mode(mode, &ids));
            }
            SubscriptionCommand::Acknowledge {
                sequence_number,
                reply,
            } => {
                let _ = reply.send(self.state.acknowledge(sequence_number));
            }
            SubscriptionCommand::Republish {
                sequence_number,
                reply,
            } => {
                let _ = reply.send(self.state.republish(sequence_number));
            }
            SubscriptionCommand::Notify {
                node_id,
                attribute_id,
                value,
            } => {
                self.state.notify_value(&node_id, attribute_id, &value);
            }
            SubscriptionCommand::Delete { reply } => {
                debug!("Subscription {} deleted", self.state.id());
                let _ = reply.send(());
                return false;
            }
        }
        true
    }
}
