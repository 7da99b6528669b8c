// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The request, response and notification structures the runtime itself
//! produces and consumes. All of them are entered in the core type registry.

mod channel;
mod enums;
mod monitored_item;
mod subscription;

pub use channel::*;
pub use enums::*;
pub use monitored_item::*;
pub use subscription::*;

use crate::{
    node_ids::{DataTypeId, ObjectId},
    EncodingIds, RegistryError, RequestHeader, ResponseHeader, TypeRegistryBuilder,
};

/// Response sent instead of the expected one when a service fails as a whole.
#[crate::ua_encodable]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceFault {
    /// Carries the failure in `service_result`.
    pub response_header: ResponseHeader,
}

impl ServiceFault {
    /// A fault answering the request with handle `request_handle`.
    pub fn new(request_handle: u32, service_result: crate::StatusCode) -> Self {
        Self {
            response_header: ResponseHeader::new_for_handle(request_handle, service_result),
        }
    }
}

macro_rules! register_types {
    ($builder:ident, $($name:ident => $binary:ident, $xml:ident;)*) => {
        $(
            $builder.register::<$name>(
                stringify!($name),
                EncodingIds::new(ObjectId::$binary, ObjectId::$xml),
                Some(DataTypeId::$name.into()),
            )?;
        )*
    };
}

/// Enter every structure of this module, and the request and response
/// headers, in `builder`.
pub(crate) fn register_core_types(builder: &mut TypeRegistryBuilder) -> Result<(), RegistryError> {
    register_types!(builder,
        RequestHeader => RequestHeader_Encoding_DefaultBinary, RequestHeader_Encoding_DefaultXml;
        ResponseHeader => ResponseHeader_Encoding_DefaultBinary, ResponseHeader_Encoding_DefaultXml;
        ServiceFault => ServiceFault_Encoding_DefaultBinary, ServiceFault_Encoding_DefaultXml;
        ChannelSecurityToken => ChannelSecurityToken_Encoding_DefaultBinary, ChannelSecurityToken_Encoding_DefaultXml;
        OpenSecureChannelRequest => OpenSecureChannelRequest_Encoding_DefaultBinary, OpenSecureChannelRequest_Encoding_DefaultXml;
        OpenSecureChannelResponse => OpenSecureChannelResponse_Encoding_DefaultBinary, OpenSecureChannelResponse_Encoding_DefaultXml;
        CloseSecureChannelRequest => CloseSecureChannelRequest_Encoding_DefaultBinary, CloseSecureChannelRequest_Encoding_DefaultXml;
        CloseSecureChannelResponse => CloseSecureChannelResponse_Encoding_DefaultBinary, CloseSecureChannelResponse_Encoding_DefaultXml;
        ReadValueId => ReadValueId_Encoding_DefaultBinary, ReadValueId_Encoding_DefaultXml;
        DataChangeFilter => DataChangeFilter_Encoding_DefaultBinary, DataChangeFilter_Encoding_DefaultXml;
        MonitoringParameters => MonitoringParameters_Encoding_DefaultBinary, MonitoringParameters_Encoding_DefaultXml;
        MonitoredItemCreateRequest => MonitoredItemCreateRequest_Encoding_DefaultBinary, MonitoredItemCreateRequest_Encoding_DefaultXml;
        MonitoredItemCreateResult => MonitoredItemCreateResult_Encoding_DefaultBinary, MonitoredItemCreateResult_Encoding_DefaultXml;
        CreateMonitoredItemsRequest => CreateMonitoredItemsRequest_Encoding_DefaultBinary, CreateMonitoredItemsRequest_Encoding_DefaultXml;
        CreateMonitoredItemsResponse => CreateMonitoredItemsResponse_Encoding_DefaultBinary, CreateMonitoredItemsResponse_Encoding_DefaultXml;
        DeleteMonitoredItemsRequest => DeleteMonitoredItemsRequest_Encoding_DefaultBinary, DeleteMonitoredItemsRequest_Encoding_DefaultXml;
        DeleteMonitoredItemsResponse => DeleteMonitoredItemsResponse_Encoding_DefaultBinary, DeleteMonitoredItemsResponse_Encoding_DefaultXml;
        CreateSubscriptionRequest => CreateSubscriptionRequest_Encoding_DefaultBinary, CreateSubscriptionRequest_Encoding_DefaultXml;
        CreateSubscriptionResponse => CreateSubscriptionResponse_Encoding_DefaultBinary, CreateSubscriptionResponse_Encoding_DefaultXml;
        ModifySubscriptionRequest => ModifySubscriptionRequest_Encoding_DefaultBinary, ModifySubscriptionRequest_Encoding_DefaultXml;
        ModifySubscriptionResponse => ModifySubscriptionResponse_Encoding_DefaultBinary, ModifySubscriptionResponse_Encoding_DefaultXml;
        SetPublishingModeRequest => SetPublishingModeRequest_Encoding_DefaultBinary, SetPublishingModeRequest_Encoding_DefaultXml;
        SetPublishingModeResponse => SetPublishingModeResponse_Encoding_DefaultBinary, SetPublishingModeResponse_Encoding_DefaultXml;
        NotificationMessage => NotificationMessage_Encoding_DefaultBinary, NotificationMessage_Encoding_DefaultXml;
        MonitoredItemNotification => MonitoredItemNotification_Encoding_DefaultBinary, MonitoredItemNotification_Encoding_DefaultXml;
        DataChangeNotification => DataChangeNotification_Encoding_DefaultBinary, DataChangeNotification_Encoding_DefaultXml;
        StatusChangeNotification => StatusChangeNotification_Encoding_DefaultBinary, StatusChangeNotification_Encoding_DefaultXml;
        SubscriptionAcknowledgement => SubscriptionAcknowledgement_Encoding_DefaultBinary, SubscriptionAcknowledgement_Encoding_DefaultXml;
        PublishRequest => PublishRequest_Encoding_DefaultBinary, PublishRequest_Encoding_DefaultXml;
        PublishResponse => PublishResponse_Encoding_DefaultBinary, PublishResponse_Encoding_DefaultXml;
        RepublishRequest => RepublishRequest_Encoding_DefaultBinary, RepublishRequest_Encoding_DefaultXml;
        RepublishResponse => RepublishResponse_Encoding_DefaultBinary, RepublishResponse_Encoding_DefaultXml;
        DeleteSubscriptionsRequest => DeleteSubscriptionsRequest_Encoding_DefaultBinary, DeleteSubscriptionsRequest_Encoding_DefaultXml;
        DeleteSubscriptionsResponse => DeleteSubscriptionsResponse_Encoding_DefaultBinary, DeleteSubscriptionsResponse_Encoding_DefaultXml;
    );
    Ok(())
}
