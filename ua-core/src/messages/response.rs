// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::io::{Read, Write};

use ua_types::{
    BinaryDecodable, BinaryEncodable, CloseSecureChannelResponse, Context,
    CreateMonitoredItemsResponse, CreateSubscriptionResponse, DeleteMonitoredItemsResponse,
    DeleteSubscriptionsResponse, EncodingResult, Error, ModifySubscriptionResponse, ObjectId,
    OpenSecureChannelResponse, PublishResponse, RepublishResponse, RequestHeader,
    ResponseHeader, ServiceFault, SetPublishingModeResponse, StatusCode,
};

use super::Message;

macro_rules! response_enum {
    ($($name:ident: $value:ident; $enc:ident),*,) => {
        #[derive(Debug, PartialEq, Clone)]
        /// Enum of all possible _response_ service messages.
        pub enum ResponseMessage {
            $(
                #[doc = stringify!($name)]
                $name(Box<$value>),
            )*
        }
        $(
            impl From<$value> for ResponseMessage {
                fn from(value: $value) -> Self {
                    Self::$name(Box::new(value))
                }
            }
        )*
        impl BinaryEncodable for ResponseMessage {
            fn byte_len(&self, ctx: &Context<'_>) -> usize {
                match self {
                    $( Self::$name(value) => value.byte_len(ctx), )*
                }
            }

            fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
                match self {
                    $( Self::$name(value) => value.encode(stream, ctx), )*
                }
            }
        }

        impl ResponseMessage {
            /// Get the response header.
            pub fn response_header(&self) -> &ResponseHeader {
                match self {
                    $( Self::$name(value) => &value.response_header, )*
                }
            }
        }

        impl Message for ResponseMessage {
            fn request_handle(&self) -> u32 {
                self.response_header().request_handle
            }

            fn decode_by_object_id<S: Read>(
                stream: &mut S,
                object_id: ObjectId,
                ctx: &Context<'_>
            ) -> EncodingResult<Self> {
                match object_id {
                    $( ObjectId::$enc => {
                        Ok(<$value as BinaryDecodable>::decode(stream, ctx)?.into())
                    }, )*
                    _ => {
                        Err(Error::new(
                            StatusCode::BadServiceUnsupported,
                            format!("decoding unsupported for object id {:?}", object_id),
                        ))
                    }
                }
            }

            fn encoding_id(&self) -> ObjectId {
                match self {
                    $( Self::$name(_) => ObjectId::$enc, )*
                }
            }
        }
    };
}

impl ResponseMessage {
    /// A service fault answering `request_header`.
    pub fn service_fault(request_header: &RequestHeader, status: StatusCode) -> Self {
        Self::for_handle(request_header.request_handle, status)
    }

    /// A service fault answering the request with the given handle.
    pub fn for_handle(request_handle: u32, status: StatusCode) -> Self {
        ServiceFault::new(request_handle, status).into()
    }

    /// Service result of the response.
    pub fn service_result(&self) -> StatusCode {
        self.response_header().service_result
    }

    /// `true` if this is a service fault.
    pub fn is_service_fault(&self) -> bool {
        matches!(self, Self::ServiceFault(_))
    }
}

response_enum! {
    OpenSecureChannel: OpenSecureChannelResponse; OpenSecureChannelResponse_Encoding_DefaultBinary,
    CloseSecureChannel: CloseSecureChannelResponse; CloseSecureChannelResponse_Encoding_DefaultBinary,
    ServiceFault: ServiceFault; ServiceFault_Encoding_DefaultBinary,
    CreateSubscription: CreateSubscriptionResponse; CreateSubscriptionResponse_Encoding_DefaultBinary,
    ModifySubscription: ModifySubscriptionResponse; ModifySubscriptionResponse_Encoding_DefaultBinary,
    SetPublishingMode: SetPublishingModeResponse; SetPublishingModeResponse_Encoding_DefaultBinary,
    DeleteSubscriptions: DeleteSubscriptionsResponse; DeleteSubscriptionsResponse_Encoding_DefaultBinary,
    Publish: PublishResponse; PublishResponse_Encoding_DefaultBinary,
    Republish: RepublishResponse; RepublishResponse_Encoding_DefaultBinary,
    CreateMonitoredItems: CreateMonitoredItemsResponse; CreateMonitoredItemsResponse_Encoding_DefaultBinary,
    DeleteMonitoredItems: DeleteMonitoredItemsResponse; DeleteMonitoredItemsResponse_Encoding_DefaultBinary,
}
