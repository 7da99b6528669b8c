// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use tokio::{task::JoinHandle, time::Instant};
use ua_core::{
    comms::{SecureChannel, TokenPolicy},
    ChannelError, Message, RequestMessage, ResponseMessage,
};
use ua_crypto::SecurityPolicy;
use ua_server::{Server, ServerConfig};
use ua_types::{
    CreateMonitoredItemsRequest, CreateSubscriptionRequest, MessageSecurityMode,
    MonitoredItemCreateRequest, MonitoringMode, MonitoringParameters, NodeId, PublishRequest,
    ReadValueId, RequestHeader, SubscriptionAcknowledgement, TimestampsToReturn,
};

/// Attribute id of the value of a variable.
pub const VALUE_ATTRIBUTE: u32 = 13;

pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A server with one client channel open.
pub struct Tester {
    pub server: Arc<Server>,
    pub client: Arc<SecureChannel>,
    pub channel_id: u32,
    next_request_id: AtomicU32,
    next_handle: AtomicU32,
}

impl Tester {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_lifetime(config, 3_600_000)
    }

    pub fn with_lifetime(config: ServerConfig, lifetime: u32) -> Self {
        init_test_logging();
        let server = Arc::new(Server::new(config).unwrap());
        Self::connect(server, lifetime).unwrap()
    }

    /// Open another channel to `server`.
    pub fn connect(server: Arc<Server>, lifetime: u32) -> Result<Self, ChannelError> {
        let policy = SecurityPolicy::Basic256Sha256;
        let mode = MessageSecurityMode::SignAndEncrypt;
        let client = SecureChannel::new_client(policy, mode, TokenPolicy::default());
        let request: RequestMessage = client.make_open_request(1, lifetime)?.into();
        let ctx = server.encoding().context();
        let body = request.encode_body(&ctx).unwrap();
        let (channel_id, body) = server.open_channel(policy, mode, &body)?;
        let ResponseMessage::OpenSecureChannel(response) =
            ResponseMessage::decode_body(&body, &ctx).unwrap()
        else {
            panic!("Expected OpenSecureChannel response");
        };
        client.handle_open_response(&response, Instant::now())?;
        assert_eq!(client.channel_id(), channel_id);
        drop(ctx);
        Ok(Self {
            server,
            client: Arc::new(client),
            channel_id,
            next_request_id: AtomicU32::new(1),
            next_handle: AtomicU32::new(1),
        })
    }

    pub fn header(&self) -> RequestHeader {
        RequestHeader::new(
            &NodeId::null(),
            self.next_handle.fetch_add(1, Ordering::Relaxed),
        )
    }

    /// Seal a request without sending it.
    pub fn seal(&self, request: impl Into<RequestMessage>) -> Vec<u8> {
        let request: RequestMessage = request.into();
        let body = request
            .encode_body(&self.server.encoding().context())
            .unwrap();
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        self.client.seal(request_id, &body).unwrap()
    }

    /// Open a sealed response. Responses must be opened in the order the
    /// server sealed them.
    pub fn open(&self, reply: &[u8]) -> ResponseMessage {
        let opened = self.client.open(reply, Instant::now()).unwrap();
        ResponseMessage::decode_body(&opened.body, &self.server.encoding().context()).unwrap()
    }

    pub async fn call(&self, request: impl Into<RequestMessage>) -> ResponseMessage {
        let sealed = self.seal(request);
        let reply = self
            .server
            .process(self.channel_id, &sealed)
            .await
            .unwrap()
            .unwrap();
        self.open(&reply)
    }

    /// Send a publish request on a task of its own and wait until the server
    /// has parked it, or answered it right away. The task yields the sealed
    /// reply, open it with [`Tester::publish_reply`].
    pub async fn spawn_publish(
        &self,
        acks: Vec<(u32, u32)>,
    ) -> JoinHandle<Result<Option<Vec<u8>>, ChannelError>> {
        let acks = (!acks.is_empty()).then(|| {
            acks.into_iter()
                .map(|(subscription_id, sequence_number)| SubscriptionAcknowledgement {
                    subscription_id,
                    sequence_number,
                })
                .collect()
        });
        let sealed = self.seal(PublishRequest {
            request_header: self.header(),
            subscription_acknowledgements: acks,
        });
        let server = self.server.clone();
        let channel_id = self.channel_id;
        let session = self.server.session(channel_id).unwrap();
        let received = session.subscriptions().activity().received();
        let task = tokio::spawn(async move { server.process(channel_id, &sealed).await });
        // The server rejects reordered messages, so the publish must be read
        // before anything else is sent.
        while !task.is_finished() && session.subscriptions().activity().received() == received {
            tokio::task::yield_now().await;
        }
        task
    }

    /// Wait for a spawned publish and open its reply.
    pub async fn publish_reply(
        &self,
        task: JoinHandle<Result<Option<Vec<u8>>, ChannelError>>,
    ) -> ResponseMessage {
        let reply = task.await.unwrap().unwrap().unwrap();
        self.open(&reply)
    }

    pub async fn create_subscription(
        &self,
        publishing_interval: f64,
        lifetime_count: u32,
        max_keep_alive_count: u32,
    ) -> u32 {
        let response = self
            .call(CreateSubscriptionRequest {
                request_header: self.header(),
                requested_publishing_interval: publishing_interval,
                requested_lifetime_count: lifetime_count,
                requested_max_keep_alive_count: max_keep_alive_count,
                max_notifications_per_publish: 0,
                publishing_enabled: true,
                priority: 0,
            })
            .await;
        let ResponseMessage::CreateSubscription(response) = response else {
            panic!("Expected CreateSubscription response, got {response:?}");
        };
        response.subscription_id
    }

    /// Monitor the value of each node, returning the monitored item ids.
    pub async fn monitor_values(&self, subscription_id: u32, nodes: &[NodeId]) -> Vec<u32> {
        let items = nodes
            .iter()
            .enumerate()
            .map(|(idx, node_id)| MonitoredItemCreateRequest {
                item_to_monitor: ReadValueId {
                    node_id: node_id.clone(),
                    attribute_id: VALUE_ATTRIBUTE,
                    ..Default::default()
                },
                monitoring_mode: MonitoringMode::Reporting,
                requested_parameters: MonitoringParameters {
                    client_handle: idx as u32 + 100,
                    sampling_interval: 0.0,
                    queue_size: 10,
                    discard_oldest: true,
                    ..Default::default()
                },
            })
            .collect();
        let response = self
            .call(CreateMonitoredItemsRequest {
                request_header: self.header(),
                subscription_id,
                timestamps_to_return: TimestampsToReturn::Both,
                items_to_create: Some(items),
            })
            .await;
        let ResponseMessage::CreateMonitoredItems(response) = response else {
            panic!("Expected CreateMonitoredItems response, got {response:?}");
        };
        response
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|r| {
                assert!(r.status_code.is_good(), "{}", r.status_code);
                r.monitored_item_id
            })
            .collect()
    }
}
