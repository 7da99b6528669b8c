// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Monitoring filters, parsed from the `ExtensionObject` in a monitored item
//! request, and the data change test they apply.

use crate::{
    DataChangeFilter, DataChangeTrigger, DataValue, DeadbandType, ExtensionObject, StatusCode,
    Variant,
};

/// Deadband of a data change filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deadband {
    /// Any change is reported.
    None,
    /// A change is reported when it exceeds this absolute value.
    Absolute(f64),
}

impl Deadband {
    fn is_changed_option(&self, v1: Option<&Variant>, v2: Option<&Variant>) -> bool {
        match (v1, v2) {
            (Some(_), None) | (None, Some(_)) => true,
            (None, None) => false,
            (Some(v1), Some(v2)) => self.is_changed(v1, v2),
        }
    }

    fn is_changed(&self, v1: &Variant, v2: &Variant) -> bool {
        if let (Some(v1), Some(v2)) = (v1.as_array(), v2.as_array()) {
            // An array is reported whole if its length changes or any element
            // exceeds the deadband.
            if v1.len() != v2.len() {
                return true;
            }
            return v1.iter().zip(v2.iter()).any(|(a, b)| self.is_changed(a, b));
        }
        match self {
            Deadband::None => v1 != v2,
            Deadband::Absolute(deadband) => {
                let (Some(v1), Some(v2)) = (v1.as_f64(), v2.as_f64()) else {
                    return v1 != v2;
                };
                (v1 - v2).abs() > *deadband
            }
        }
    }
}

/// A data change filter that has been checked and can be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDataChangeFilter {
    /// What counts as a change.
    pub trigger: DataChangeTrigger,
    /// Deadband applied to value changes.
    pub deadband: Deadband,
}

impl ParsedDataChangeFilter {
    /// `true` if `v2` should be reported after `v1`.
    pub fn is_changed(&self, v1: &DataValue, v2: &DataValue) -> bool {
        let status_changed = v1.status() != v2.status();
        match self.trigger {
            DataChangeTrigger::Status => status_changed,
            DataChangeTrigger::StatusValue => {
                status_changed
                    || self
                        .deadband
                        .is_changed_option(v1.value.as_ref(), v2.value.as_ref())
            }
            DataChangeTrigger::StatusValueTimestamp => {
                status_changed
                    || v1.source_timestamp != v2.source_timestamp
                    || v1.source_picoseconds != v2.source_picoseconds
                    || self
                        .deadband
                        .is_changed_option(v1.value.as_ref(), v2.value.as_ref())
            }
        }
    }

    /// Check a raw filter. Percent deadbands need the engineering unit range
    /// of the node, which is not available here, so they are rejected.
    pub fn parse(filter: &DataChangeFilter) -> Result<Self, StatusCode> {
        let ty = DeadbandType::try_from(filter.deadband_type)
            .map_err(|_| StatusCode::BadDeadbandFilterInvalid)?;
        let deadband = match ty {
            DeadbandType::None => Deadband::None,
            DeadbandType::Absolute => {
                if filter.deadband_value.is_nan() || filter.deadband_value < 0.0 {
                    return Err(StatusCode::BadDeadbandFilterInvalid);
                }
                Deadband::Absolute(filter.deadband_value)
            }
            DeadbandType::Percent => return Err(StatusCode::BadMonitoredItemFilterUnsupported),
        };
        Ok(Self {
            trigger: filter.trigger,
            deadband,
        })
    }
}

impl Default for ParsedDataChangeFilter {
    fn default() -> Self {
        Self {
            trigger: DataChangeTrigger::StatusValue,
            deadband: Deadband::None,
        }
    }
}

/// The filters a monitored item may carry.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MonitoringFilter {
    /// Report every change of status or value.
    #[default]
    None,
    /// A data change filter.
    DataChange(ParsedDataChangeFilter),
}

impl MonitoringFilter {
    /// Parse the filter of a monitored item request. A null object means no
    /// filter. Anything other than a decoded `DataChangeFilter` is rejected.
    pub fn from_extension_object(filter: &ExtensionObject) -> Result<Self, StatusCode> {
        if filter.is_null() {
            return Ok(MonitoringFilter::None);
        }
        match filter.inner_as::<DataChangeFilter>() {
            Some(f) => Ok(MonitoringFilter::DataChange(ParsedDataChangeFilter::parse(f)?)),
            None => Err(StatusCode::BadMonitoredItemFilterUnsupported),
        }
    }

    /// `true` if `new` should be reported after `old`.
    pub fn is_changed(&self, old: &DataValue, new: &DataValue) -> bool {
        match self {
            MonitoringFilter::None => ParsedDataChangeFilter::default().is_changed(old, new),
            MonitoringFilter::DataChange(f) => f.is_changed(old, new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Deadband, MonitoringFilter};
    use crate::{
        DataChangeFilter, DataChangeTrigger, DataValue, DeadbandType, ExtensionObject, NodeId,
        ReadValueId, StatusCode,
    };

    fn filter(deadband_type: DeadbandType, deadband_value: f64) -> ExtensionObject {
        ExtensionObject::from_message(DataChangeFilter {
            trigger: DataChangeTrigger::StatusValue,
            deadband_type: deadband_type.into(),
            deadband_value,
        })
    }

    #[test]
    fn absolute_deadband() {
        let f = MonitoringFilter::from_extension_object(&filter(DeadbandType::Absolute, 1.0))
            .unwrap();
        let MonitoringFilter::DataChange(parsed) = &f else {
            panic!("Expected a data change filter");
        };
        assert_eq!(parsed.deadband, Deadband::Absolute(1.0));
        let v = |x: f64| DataValue::value_only(x);
        assert!(!f.is_changed(&v(10.0), &v(10.5)));
        assert!(f.is_changed(&v(10.0), &v(11.5)));
        let mut bad = v(10.0);
        bad.status = Some(StatusCode::BadOutOfRange);
        assert!(f.is_changed(&v(10.0), &bad));
    }

    #[test]
    fn rejected_filters() {
        assert_eq!(
            MonitoringFilter::from_extension_object(&filter(DeadbandType::Percent, 5.0)),
            Err(StatusCode::BadMonitoredItemFilterUnsupported)
        );
        assert_eq!(
            MonitoringFilter::from_extension_object(&filter(DeadbandType::Absolute, -1.0)),
            Err(StatusCode::BadDeadbandFilterInvalid)
        );
        let other = ExtensionObject::from_message(ReadValueId {
            node_id: NodeId::new(1, 1u32),
            ..Default::default()
        });
        assert_eq!(
            MonitoringFilter::from_extension_object(&other),
            Err(StatusCode::BadMonitoredItemFilterUnsupported)
        );
        assert_eq!(
            MonitoringFilter::from_extension_object(&ExtensionObject::null()),
            Ok(MonitoringFilter::None)
        );
    }
}
