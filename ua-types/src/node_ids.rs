// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Well known numeric identifiers in namespace 0 used by the runtime.

use crate::{node_id::NodeId, Error};

macro_rules! node_id_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal),* $(,)? }) => {
        $(#[$meta])*
        #[allow(non_camel_case_types, missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum $name {
            $($variant = $value),*
        }

        impl TryFrom<u32> for $name {
            type Error = Error;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)*
                    r => Err(Error::decoding(format!(
                        concat!("Unknown ", stringify!($name), " {}"),
                        r
                    ))),
                }
            }
        }

        impl From<$name> for NodeId {
            fn from(value: $name) -> Self {
                NodeId::new(0, value as u32)
            }
        }

        impl PartialEq<$name> for NodeId {
            fn eq(&self, other: &$name) -> bool {
                self.namespace == 0 && self.as_u32() == Some(*other as u32)
            }
        }
    };
}

node_id_enum!(
    /// Data type nodes.
    DataTypeId {
        Boolean = 1,
        SByte = 2,
        Byte = 3,
        Int16 = 4,
        UInt16 = 5,
        Int32 = 6,
        UInt32 = 7,
        Int64 = 8,
        UInt64 = 9,
        Float = 10,
        Double = 11,
        String = 12,
        DateTime = 13,
        Guid = 14,
        ByteString = 15,
        XmlElement = 16,
        NodeId = 17,
        ExpandedNodeId = 18,
        StatusCode = 19,
        QualifiedName = 20,
        LocalizedText = 21,
        Structure = 22,
        DataValue = 23,
        BaseDataType = 24,
        DiagnosticInfo = 25,
        Enumeration = 29,
        RequestHeader = 389,
        ResponseHeader = 392,
        ServiceFault = 395,
        ChannelSecurityToken = 441,
        OpenSecureChannelRequest = 444,
        OpenSecureChannelResponse = 447,
        CloseSecureChannelRequest = 450,
        CloseSecureChannelResponse = 453,
        ReadValueId = 626,
        MonitoringFilter = 719,
        DataChangeFilter = 722,
        MonitoringParameters = 740,
        MonitoredItemCreateRequest = 743,
        MonitoredItemCreateResult = 746,
        CreateMonitoredItemsRequest = 749,
        CreateMonitoredItemsResponse = 752,
        DeleteMonitoredItemsRequest = 779,
        DeleteMonitoredItemsResponse = 782,
        CreateSubscriptionRequest = 785,
        CreateSubscriptionResponse = 788,
        ModifySubscriptionRequest = 791,
        ModifySubscriptionResponse = 794,
        SetPublishingModeRequest = 797,
        SetPublishingModeResponse = 800,
        NotificationMessage = 803,
        MonitoredItemNotification = 806,
        DataChangeNotification = 809,
        StatusChangeNotification = 818,
        SubscriptionAcknowledgement = 821,
        PublishRequest = 824,
        PublishResponse = 827,
        RepublishRequest = 830,
        RepublishResponse = 833,
        DeleteSubscriptionsRequest = 845,
        DeleteSubscriptionsResponse = 848,
    }
);

node_id_enum!(
    /// Encoding nodes of the structures the runtime registers.
    ObjectId {
        RequestHeader_Encoding_DefaultXml = 390,
        RequestHeader_Encoding_DefaultBinary = 391,
        ResponseHeader_Encoding_DefaultXml = 393,
        ResponseHeader_Encoding_DefaultBinary = 394,
        ServiceFault_Encoding_DefaultXml = 396,
        ServiceFault_Encoding_DefaultBinary = 397,
        ChannelSecurityToken_Encoding_DefaultXml = 442,
        ChannelSecurityToken_Encoding_DefaultBinary = 443,
        OpenSecureChannelRequest_Encoding_DefaultXml = 445,
        OpenSecureChannelRequest_Encoding_DefaultBinary = 446,
        OpenSecureChannelResponse_Encoding_DefaultXml = 448,
        OpenSecureChannelResponse_Encoding_DefaultBinary = 449,
        CloseSecureChannelRequest_Encoding_DefaultXml = 451,
        CloseSecureChannelRequest_Encoding_DefaultBinary = 452,
        CloseSecureChannelResponse_Encoding_DefaultXml = 454,
        CloseSecureChannelResponse_Encoding_DefaultBinary = 455,
        ReadValueId_Encoding_DefaultXml = 627,
        ReadValueId_Encoding_DefaultBinary = 628,
        DataChangeFilter_Encoding_DefaultXml = 723,
        DataChangeFilter_Encoding_DefaultBinary = 724,
        MonitoringParameters_Encoding_DefaultXml = 741,
        MonitoringParameters_Encoding_DefaultBinary = 742,
        MonitoredItemCreateRequest_Encoding_DefaultXml = 744,
        MonitoredItemCreateRequest_Encoding_DefaultBinary = 745,
        MonitoredItemCreateResult_Encoding_DefaultXml = 747,
        MonitoredItemCreateResult_Encoding_DefaultBinary = 748,
        CreateMonitoredItemsRequest_Encoding_DefaultXml = 750,
        CreateMonitoredItemsRequest_Encoding_DefaultBinary = 751,
        CreateMonitoredItemsResponse_Encoding_DefaultXml = 753,
        CreateMonitoredItemsResponse_Encoding_DefaultBinary = 754,
        DeleteMonitoredItemsRequest_Encoding_DefaultXml = 780,
        DeleteMonitoredItemsRequest_Encoding_DefaultBinary = 781,
        DeleteMonitoredItemsResponse_Encoding_DefaultXml = 783,
        DeleteMonitoredItemsResponse_Encoding_DefaultBinary = 784,
        CreateSubscriptionRequest_Encoding_DefaultXml = 786,
        CreateSubscriptionRequest_Encoding_DefaultBinary = 787,
        CreateSubscriptionResponse_Encoding_DefaultXml = 789,
        CreateSubscriptionResponse_Encoding_DefaultBinary = 790,
        ModifySubscriptionRequest_Encoding_DefaultXml = 792,
        ModifySubscriptionRequest_Encoding_DefaultBinary = 793,
        ModifySubscriptionResponse_Encoding_DefaultXml = 795,
        ModifySubscriptionResponse_Encoding_DefaultBinary = 796,
        SetPublishingModeRequest_Encoding_DefaultXml = 798,
        SetPublishingModeRequest_Encoding_DefaultBinary = 799,
        SetPublishingModeResponse_Encoding_DefaultXml = 801,
        SetPublishingModeResponse_Encoding_DefaultBinary = 802,
        NotificationMessage_Encoding_DefaultXml = 804,
        NotificationMessage_Encoding_DefaultBinary = 805,
        MonitoredItemNotification_Encoding_DefaultXml = 807,
        MonitoredItemNotification_Encoding_DefaultBinary = 808,
        DataChangeNotification_Encoding_DefaultXml = 810,
        DataChangeNotification_Encoding_DefaultBinary = 811,
        StatusChangeNotification_Encoding_DefaultXml = 819,
        StatusChangeNotification_Encoding_DefaultBinary = 820,
        SubscriptionAcknowledgement_Encoding_DefaultXml = 822,
        SubscriptionAcknowledgement_Encoding_DefaultBinary = 823,
        PublishRequest_Encoding_DefaultXml = 825,
        PublishRequest_Encoding_DefaultBinary = 826,
        PublishResponse_Encoding_DefaultXml = 828,
        PublishResponse_Encoding_DefaultBinary = 829,
        RepublishRequest_Encoding_DefaultXml = 831,
        RepublishRequest_Encoding_DefaultBinary = 832,
        RepublishResponse_Encoding_DefaultXml = 834,
        RepublishResponse_Encoding_DefaultBinary = 835,
        DeleteSubscriptionsRequest_Encoding_DefaultXml = 846,
        DeleteSubscriptionsRequest_Encoding_DefaultBinary = 847,
        DeleteSubscriptionsResponse_Encoding_DefaultXml = 849,
        DeleteSubscriptionsResponse_Encoding_DefaultBinary = 850,
    }
);
