// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The publish dispatcher of a session.
//!
//! Publish requests are long polls. Each is parked here as a
//! [`PendingPublish`] holding the sending half of a oneshot channel, and is
//! answered by the first of: a message from one of the subscriptions, its
//! deadline, or a newer request pushing it out of a full queue. Messages
//! that arrive while no request is parked wait in a bounded queue.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use log::{debug, trace, warn};
use tokio::{
    sync::{mpsc, oneshot},
    time::{sleep_until, Instant},
};
use tokio_util::sync::CancellationToken;
use ua_core::ResponseMessage;
use ua_types::{PublishRequest, PublishResponse, ResponseHeader, StatusCode};

use super::subscription::OutgoingMessage;

/// A publish request waiting for a notification message.
#[derive(Debug)]
pub struct PendingPublish {
    /// The request.
    pub request: Box<PublishRequest>,
    /// Results of the acknowledgements in the request.
    pub ack_results: Option<Vec<StatusCode>>,
    /// Where to send the response.
    pub response: oneshot::Sender<ResponseMessage>,
    /// When the request times out.
    pub deadline: Instant,
}

impl PendingPublish {
    fn respond(self, message: OutgoingMessage) -> Result<(), OutgoingMessage> {
        let response = PublishResponse {
            response_header: ResponseHeader::new_good(&self.request.request_header),
            subscription_id: message.subscription_id,
            available_sequence_numbers: Some(message.available_sequence_numbers.clone()),
            more_notifications: message.more_notifications,
            notification_message: message.message.clone(),
            results: self.ack_results,
            diagnostic_infos: None,
        };
        // The requester is gone if the receiver was dropped, keep the message.
        self.response.send(response.into()).map_err(|_| message)
    }

    fn fault(self, status: StatusCode) {
        let _ = self
            .response
            .send(ResponseMessage::service_fault(&self.request.request_header, status));
    }
}

/// Events handled by the dispatcher.
#[derive(Debug)]
pub enum DispatchEvent {
    /// A publish request from the client.
    Publish(PendingPublish),
    /// A message from a subscription.
    Message(OutgoingMessage),
}

/// Counters the subscriptions of a session read at every publishing cycle.
#[derive(Debug, Default)]
pub struct PublishActivity {
    pending: AtomicUsize,
    queued: AtomicUsize,
    received: AtomicU64,
}

impl PublishActivity {
    /// Number of parked publish requests.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Number of messages waiting for a publish request.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    /// Total number of publish requests received.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Acquire)
    }
}

/// Parks publish requests and matches them with notification messages.
pub struct PublishDispatcher {
    pending: VecDeque<PendingPublish>,
    queued: VecDeque<OutgoingMessage>,
    max_pending: usize,
    max_queued: usize,
    activity: Arc<PublishActivity>,
}

impl PublishDispatcher {
    /// Create a dispatcher.
    pub fn new(max_pending: usize, max_queued: usize, activity: Arc<PublishActivity>) -> Self {
        Self {
            pending: VecDeque::new(),
            queued: VecDeque::new(),
            max_pending: max_pending.max(1),
            max_queued,
            activity,
        }
    }

    fn update_activity(&self) {
        self.activity
            .pending
            .store(self.pending.len(), Ordering::Release);
        self.activity
            .queued
            .store(self.queued.len(), Ordering::Release);
    }

    /// Handle a new publish request. A queued message answers it right away,
    /// otherwise it is parked. When too many requests are parked the oldest
    /// is answered with `BadTooManyPublishRequests`.
    pub fn enqueue(&mut self, request: PendingPublish) {
        self.activity.received.fetch_add(1, Ordering::AcqRel);
        if let Some(message) = self.queued.pop_front() {
            if let Err(message) = request.respond(message) {
                debug!("Publish requester went away before it could be answered");
                self.queued.push_front(message);
            }
            self.update_activity();
            return;
        }
        if self.pending.len() >= self.max_pending {
            if let Some(oldest) = self.pending.pop_front() {
                warn!(
                    "Too many publish requests, rejecting request {}",
                    oldest.request.request_header.request_handle
                );
                oldest.fault(StatusCode::BadTooManyPublishRequests);
            }
        }
        self.pending.push_back(request);
        self.update_activity();
    }

    /// Handle a message from a subscription. Keep-alives only make sense as
    /// the answer to a parked request and are dropped otherwise.
    pub fn deliver(&mut self, mut message: OutgoingMessage) {
        while let Some(request) = self.pending.pop_front() {
            match request.respond(message) {
                Ok(()) => {
                    self.update_activity();
                    return;
                }
                Err(m) => message = m,
            }
        }
        if message.is_keep_alive() {
            trace!(
                "Dropping keep-alive of subscription {}, no publish request",
                message.subscription_id
            );
        } else {
            if self.queued.len() >= self.max_queued {
                if let Some(dropped) = self.queued.pop_front() {
                    warn!(
                        "Notification queue full, dropping message {} of subscription {}",
                        dropped.message.sequence_number, dropped.subscription_id
                    );
                }
            }
            if self.max_queued > 0 {
                self.queued.push_back(message);
            }
        }
        self.update_activity();
    }

    /// Answer requests whose deadline has passed with `BadTimeout`.
    pub fn expire(&mut self, now: Instant) {
        let (expired, pending): (VecDeque<_>, VecDeque<_>) =
            self.pending.drain(..).partition(|p| p.deadline <= now);
        self.pending = pending;
        for request in expired {
            debug!(
                "Publish request {} timed out",
                request.request.request_header.request_handle
            );
            request.fault(StatusCode::BadTimeout);
        }
        self.update_activity();
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.deadline).min()
    }

    /// Run until `cancel` fires or every sender is dropped. Parked requests
    /// are dropped on exit, which fails their receivers.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<DispatchEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(DispatchEvent::Publish(request)) => self.enqueue(request),
                    Some(DispatchEvent::Message(message)) => self.deliver(message),
                    None => break,
                },
                _ = async {
                    match deadline {
                        Some(d) => sleep_until(d).await,
                        None => std::future::pending().await,
                    }
                } => self.expire(Instant::now()),
            }
        }
        debug!(
            "Publish dispatcher stopped with {} pending requests",
            self.pending.len()
        );
        self.pending.clear();
        self.queued.clear();
        self.update_activity();
    }
}
