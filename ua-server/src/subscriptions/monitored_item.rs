// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::collections::VecDeque;

use log::trace;
use ua_types::{
    DataValue, DateTime, MonitoredItemCreateRequest, MonitoredItemCreateResult,
    MonitoredItemNotification, MonitoringFilter, MonitoringMode, NodeId, NumericRange,
    ReadValueId, StatusCode, TimestampsToReturn,
};

use crate::config::SubscriptionLimits;

/// Highest valid attribute id.
const MAX_ATTRIBUTE_ID: u32 = 27;

/// A monitored item, owned by the task of its subscription.
#[derive(Debug)]
pub struct MonitoredItem {
    id: u32,
    item_to_monitor: ReadValueId,
    index_range: NumericRange,
    monitoring_mode: MonitoringMode,
    client_handle: u32,
    sampling_interval: f64,
    filter: MonitoringFilter,
    discard_oldest: bool,
    queue_size: usize,
    timestamps_to_return: TimestampsToReturn,
    last_value: Option<DataValue>,
    queue: VecDeque<DataValue>,
}

impl MonitoredItem {
    /// Create an item from a request, revising its sampling interval and
    /// queue size against `limits`.
    pub fn new(
        id: u32,
        timestamps_to_return: TimestampsToReturn,
        request: &MonitoredItemCreateRequest,
        limits: &SubscriptionLimits,
        publishing_interval: f64,
    ) -> Result<Self, StatusCode> {
        let item = &request.item_to_monitor;
        if item.node_id.is_null() {
            return Err(StatusCode::BadNodeIdInvalid);
        }
        if item.attribute_id == 0 || item.attribute_id > MAX_ATTRIBUTE_ID {
            return Err(StatusCode::BadAttributeIdInvalid);
        }
        let index_range = NumericRange::try_from(&item.index_range)?;
        let params = &request.requested_parameters;
        let filter = MonitoringFilter::from_extension_object(&params.filter)?;

        let mut item = Self {
            id,
            item_to_monitor: item.clone(),
            index_range,
            monitoring_mode: request.monitoring_mode,
            client_handle: params.client_handle,
            sampling_interval: 0.0,
            filter,
            discard_oldest: params.discard_oldest,
            queue_size: 1,
            timestamps_to_return,
            last_value: None,
            queue: VecDeque::new(),
        };
        item.set_sampling_interval(params.sampling_interval, publishing_interval, limits);
        item.set_queue_size(params.queue_size as usize, limits);
        Ok(item)
    }

    fn set_sampling_interval(
        &mut self,
        requested: f64,
        publishing_interval: f64,
        limits: &SubscriptionLimits,
    ) {
        // Negative means "same as the subscription".
        let requested = if requested < 0.0 {
            publishing_interval
        } else {
            requested
        };
        self.sampling_interval = if requested.is_nan() {
            limits.min_sampling_interval_ms
        } else {
            requested.max(limits.min_sampling_interval_ms)
        };
    }

    fn set_queue_size(&mut self, requested: usize, limits: &SubscriptionLimits) {
        self.queue_size = requested.clamp(1, limits.max_monitored_item_queue_size.max(1));
        while self.queue.len() > self.queue_size {
            self.queue.pop_front();
        }
    }

    /// Id of the item within its subscription.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Handle the client uses to identify values of this item.
    pub fn client_handle(&self) -> u32 {
        self.client_handle
    }

    /// The node and attribute being monitored.
    pub fn item_to_monitor(&self) -> &ReadValueId {
        &self.item_to_monitor
    }

    /// Current monitoring mode.
    pub fn monitoring_mode(&self) -> MonitoringMode {
        self.monitoring_mode
    }

    /// Change the monitoring mode. Disabling an item clears its queue.
    pub fn set_monitoring_mode(&mut self, mode: MonitoringMode) {
        if mode == MonitoringMode::Disabled {
            self.queue.clear();
            self.last_value = None;
        }
        self.monitoring_mode = mode;
    }

    /// Revised sampling interval in milliseconds.
    pub fn sampling_interval(&self) -> f64 {
        self.sampling_interval
    }

    /// Revised queue size.
    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    /// Number of queued values.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// `true` if the item watches `attribute_id` of `node_id`.
    pub fn matches(&self, node_id: &NodeId, attribute_id: u32) -> bool {
        self.item_to_monitor.attribute_id == attribute_id && &self.item_to_monitor.node_id == node_id
    }

    /// The result returned to the client for the create request.
    pub fn create_result(&self) -> MonitoredItemCreateResult {
        MonitoredItemCreateResult {
            status_code: StatusCode::Good,
            monitored_item_id: self.id,
            revised_sampling_interval: self.sampling_interval,
            revised_queue_size: self.queue_size as u32,
            filter_result: Default::default(),
        }
    }

    /// Sample a new value. Returns `true` if the value passed the filter
    /// and was queued.
    pub fn notify(&mut self, mut value: DataValue) -> bool {
        if self.monitoring_mode == MonitoringMode::Disabled {
            return false;
        }
        if !self.index_range.is_none() {
            if let Some(v) = &value.value {
                match v.range_of(&self.index_range) {
                    Ok(v) => value.value = Some(v),
                    Err(status) => {
                        value.value = None;
                        value.status = Some(status);
                    }
                }
            }
        }
        if let Some(last) = &self.last_value {
            if !self.filter.is_changed(last, &value) {
                trace!("Value of monitored item {} filtered out", self.id);
                return false;
            }
        }
        let queued = self.enqueue(self.apply_timestamps(value.clone()));
        if queued {
            self.last_value = Some(value);
        }
        queued
    }

    fn apply_timestamps(&self, mut value: DataValue) -> DataValue {
        match self.timestamps_to_return {
            TimestampsToReturn::Source => {
                value.server_timestamp = None;
                value.server_picoseconds = None;
            }
            TimestampsToReturn::Server => {
                value.source_timestamp = None;
                value.source_picoseconds = None;
            }
            TimestampsToReturn::Neither => {
                value.server_timestamp = None;
                value.server_picoseconds = None;
                value.source_timestamp = None;
                value.source_picoseconds = None;
            }
            TimestampsToReturn::Both | TimestampsToReturn::Invalid => {}
        }
        if matches!(
            self.timestamps_to_return,
            TimestampsToReturn::Server | TimestampsToReturn::Both
        ) && value.server_timestamp.is_none()
        {
            value.server_timestamp = Some(DateTime::now());
        }
        value
    }

    /// Returns `false` if a full queue rejected the value. A queue of one
    /// ignores `discard_oldest` and always takes the new value.
    fn enqueue(&mut self, mut value: DataValue) -> bool {
        // A queue of one always holds the latest value, without the overflow bit.
        if self.queue_size == 1 {
            self.queue.clear();
            self.queue.push_back(value);
            return true;
        }
        if self.queue.len() < self.queue_size {
            self.queue.push_back(value);
            return true;
        }
        if self.discard_oldest {
            self.queue.pop_front();
            if let Some(oldest) = self.queue.front_mut() {
                oldest.status = Some(oldest.status().set_overflow(true));
            } else {
                value.status = Some(value.status().set_overflow(true));
            }
            self.queue.push_back(value);
            true
        } else {
            if let Some(newest) = self.queue.back_mut() {
                newest.status = Some(newest.status().set_overflow(true));
            }
            false
        }
    }

    /// `true` if the item has values to report.
    pub fn has_notifications(&self) -> bool {
        self.monitoring_mode == MonitoringMode::Reporting && !self.queue.is_empty()
    }

    /// Drain the queue into notifications, oldest first. Items that are not
    /// reporting keep their queue.
    pub fn take_notifications(&mut self) -> Vec<MonitoredItemNotification> {
        if self.monitoring_mode != MonitoringMode::Reporting {
            return Vec::new();
        }
        let client_handle = self.client_handle;
        self.queue
            .drain(..)
            .map(|value| MonitoredItemNotification {
                client_handle,
                value,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use ua_types::{
        DataChangeFilter, DataChangeTrigger, DataValue, DeadbandType, ExtensionObject,
        MonitoredItemCreateRequest, MonitoringMode, MonitoringParameters, NodeId, ReadValueId,
        StatusCode, TimestampsToReturn, Variant,
    };

    use super::MonitoredItem;
    use crate::config::SubscriptionLimits;

    fn request(queue_size: u32, discard_oldest: bool) -> MonitoredItemCreateRequest {
        MonitoredItemCreateRequest {
            item_to_monitor: ReadValueId {
                node_id: NodeId::new(2, "Temperature"),
                attribute_id: 13,
                ..Default::default()
            },
            monitoring_mode: MonitoringMode::Reporting,
            requested_parameters: MonitoringParameters {
                client_handle: 77,
                sampling_interval: -1.0,
                filter: ExtensionObject::null(),
                queue_size,
                discard_oldest,
            },
        }
    }

    fn item(queue_size: u32, discard_oldest: bool) -> MonitoredItem {
        MonitoredItem::new(
            1,
            TimestampsToReturn::Neither,
            &request(queue_size, discard_oldest),
            &SubscriptionLimits::default(),
            500.0,
        )
        .unwrap()
    }

    fn values(item: &mut MonitoredItem) -> Vec<(i32, bool)> {
        item.take_notifications()
            .into_iter()
            .map(|n| {
                let Some(Variant::Int32(v)) = n.value.value else {
                    panic!("Expected an Int32 value");
                };
                (v, n.value.status().overflow())
            })
            .collect()
    }

    #[test]
    fn revision() {
        let item = item(0, true);
        assert_eq!(item.sampling_interval(), 500.0);
        assert_eq!(item.queue_size(), 1);
        let result = item.create_result();
        assert_eq!(result.monitored_item_id, 1);
        assert_eq!(result.revised_queue_size, 1);

        let mut limits = SubscriptionLimits::default();
        limits.max_monitored_item_queue_size = 5;
        let mut r = request(100, true);
        r.requested_parameters.sampling_interval = 1.0;
        let item = MonitoredItem::new(2, TimestampsToReturn::Both, &r, &limits, 500.0).unwrap();
        assert_eq!(item.queue_size(), 5);
        assert_eq!(item.sampling_interval(), limits.min_sampling_interval_ms);
    }

    #[test]
    fn invalid_requests() {
        let limits = SubscriptionLimits::default();
        let mut r = request(1, true);
        r.item_to_monitor.attribute_id = 0;
        assert_eq!(
            MonitoredItem::new(1, TimestampsToReturn::Both, &r, &limits, 100.0).unwrap_err(),
            StatusCode::BadAttributeIdInvalid
        );
        let mut r = request(1, true);
        r.item_to_monitor.index_range = "5:2".into();
        assert_eq!(
            MonitoredItem::new(1, TimestampsToReturn::Both, &r, &limits, 100.0).unwrap_err(),
            StatusCode::BadIndexRangeInvalid
        );
        let mut r = request(1, true);
        r.requested_parameters.filter = ExtensionObject::from_message(DataChangeFilter {
            trigger: DataChangeTrigger::StatusValue,
            deadband_type: DeadbandType::Percent as u32,
            deadband_value: 10.0,
        });
        assert_eq!(
            MonitoredItem::new(1, TimestampsToReturn::Both, &r, &limits, 100.0).unwrap_err(),
            StatusCode::BadMonitoredItemFilterUnsupported
        );
    }

    #[test]
    fn overflow_discard_oldest() {
        let mut item = item(3, true);
        for v in 1..=5 {
            assert!(item.notify(DataValue::value_only(v)));
        }
        // 1 and 2 are evicted, the new oldest value carries the overflow bit.
        assert_eq!(values(&mut item), vec![(3, true), (4, false), (5, false)]);
    }

    #[test]
    fn overflow_discard_newest() {
        let mut item = item(3, false);
        let queued: Vec<_> = (1..=5)
            .map(|v| item.notify(DataValue::value_only(v)))
            .collect();
        assert_eq!(queued, vec![true, true, true, false, false]);
        // 4 and 5 are rejected, the newest kept value carries the overflow bit.
        assert_eq!(values(&mut item), vec![(1, false), (2, false), (3, true)]);

        // A rejected value is not the last reported one, so it passes the
        // filter again once there is room.
        assert!(item.notify(DataValue::value_only(5)));
        assert_eq!(values(&mut item), vec![(5, false)]);
    }

    #[test]
    fn queue_of_one_keeps_latest() {
        for discard_oldest in [false, true] {
            let mut item = item(1, discard_oldest);
            for v in 1..=3 {
                assert!(item.notify(DataValue::value_only(v)));
            }
            assert_eq!(values(&mut item), vec![(3, false)]);
        }
    }

    #[test]
    fn unchanged_values_are_filtered() {
        let mut item = item(10, true);
        assert!(item.notify(DataValue::value_only(1)));
        assert!(!item.notify(DataValue::value_only(1)));
        assert!(item.notify(DataValue::value_only(2)));
        assert_eq!(item.queued(), 2);
    }

    #[test]
    fn modes() {
        let mut item = item(10, true);
        item.set_monitoring_mode(MonitoringMode::Sampling);
        item.notify(DataValue::value_only(1));
        assert!(!item.has_notifications());
        assert!(item.take_notifications().is_empty());
        item.set_monitoring_mode(MonitoringMode::Reporting);
        assert!(item.has_notifications());
        item.set_monitoring_mode(MonitoringMode::Disabled);
        assert!(!item.notify(DataValue::value_only(2)));
        assert_eq!(item.queued(), 0);
    }

    #[test]
    fn timestamps_are_stripped() {
        let mut item = item(10, true);
        item.notify(DataValue::new_now(1));
        let n = item.take_notifications().remove(0);
        assert_eq!(n.client_handle, 77);
        assert!(n.value.source_timestamp.is_none());
        assert!(n.value.server_timestamp.is_none());
    }
}
