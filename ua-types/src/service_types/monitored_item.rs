// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use crate::{
    DataChangeTrigger, DiagnosticInfo, ExtensionObject, MonitoringMode, NodeId, QualifiedName,
    RequestHeader, ResponseHeader, StatusCode, TimestampsToReturn, UAString,
};

/// The node and attribute a monitored item samples.
#[crate::ua_encodable]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadValueId {
    /// Node to read.
    pub node_id: NodeId,
    /// Attribute of the node.
    pub attribute_id: u32,
    /// Sub range of an array value, in `NumericRange` syntax.
    pub index_range: UAString,
    /// Requested data encoding.
    pub data_encoding: QualifiedName,
}

/// Filter deciding which sampled values are reported.
#[crate::ua_encodable]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataChangeFilter {
    /// What counts as a change.
    pub trigger: DataChangeTrigger,
    /// A `DeadbandType` value.
    pub deadband_type: u32,
    /// Deadband size.
    pub deadband_value: f64,
}

/// Requested sampling and queueing of a monitored item.
#[crate::ua_encodable]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoringParameters {
    /// Handle chosen by the client, sent back in notifications.
    pub client_handle: u32,
    /// Sampling interval in milliseconds. Negative means the publishing
    /// interval of the subscription.
    pub sampling_interval: f64,
    /// A monitoring filter, or a null object.
    pub filter: ExtensionObject,
    /// Requested queue size.
    pub queue_size: u32,
    /// On overflow, drop the oldest value instead of the newest.
    pub discard_oldest: bool,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoredItemCreateRequest {
    pub item_to_monitor: ReadValueId,
    pub monitoring_mode: MonitoringMode,
    pub requested_parameters: MonitoringParameters,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoredItemCreateResult {
    pub status_code: StatusCode,
    pub monitored_item_id: u32,
    pub revised_sampling_interval: f64,
    pub revised_queue_size: u32,
    pub filter_result: ExtensionObject,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateMonitoredItemsRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub timestamps_to_return: TimestampsToReturn,
    pub items_to_create: Option<Vec<MonitoredItemCreateRequest>>,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateMonitoredItemsResponse {
    pub response_header: ResponseHeader,
    pub results: Option<Vec<MonitoredItemCreateResult>>,
    pub diagnostic_infos: Option<Vec<DiagnosticInfo>>,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteMonitoredItemsRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub monitored_item_ids: Option<Vec<u32>>,
}

#[crate::ua_encodable]
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteMonitoredItemsResponse {
    pub response_header: ResponseHeader,
    pub results: Option<Vec<StatusCode>>,
    pub diagnostic_infos: Option<Vec<DiagnosticInfo>>,
}
