// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! [RequestMessage] and [ResponseMessage], and utilities for working with these.
//!
//! A message travels in the body of a secured message as the `NodeId` of its
//! binary encoding followed by the encoded message.

use std::io::{Cursor, Read};

use ua_types::{
    BinaryDecodable, BinaryEncodable, Context, EncodingResult, Error, NodeId, ObjectId,
    StatusCode,
};

mod request;
mod response;

pub use request::RequestMessage;
pub use response::ResponseMessage;

/// Trait implemented by messages.
pub trait Message: BinaryEncodable {
    /// Get the message request handle.
    fn request_handle(&self) -> u32;

    /// Decode the message by the object id of its binary encoding.
    fn decode_by_object_id<S: Read>(
        stream: &mut S,
        object_id: ObjectId,
        ctx: &Context<'_>,
    ) -> EncodingResult<Self>
    where
        Self: Sized;

    /// Object id of the binary encoding of the message.
    fn encoding_id(&self) -> ObjectId;

    /// Get the type ID of the message.
    fn type_id(&self) -> NodeId {
        self.encoding_id().into()
    }

    /// Encode the message, prefixed by its encoding id, as the body of a
    /// secured message.
    fn encode_body(&self, ctx: &Context<'_>) -> EncodingResult<Vec<u8>> {
        let type_id = self.type_id();
        let mut stream = Cursor::new(Vec::with_capacity(
            BinaryEncodable::byte_len(&type_id, ctx) + self.byte_len(ctx),
        ));
        BinaryEncodable::encode(&type_id, &mut stream, ctx)?;
        self.encode(&mut stream, ctx)?;
        Ok(stream.into_inner())
    }

    /// Decode a message from the body of a secured message.
    fn decode_body(body: &[u8], ctx: &Context<'_>) -> EncodingResult<Self>
    where
        Self: Sized,
    {
        let mut stream = Cursor::new(body);
        let type_id = <NodeId as BinaryDecodable>::decode(&mut stream, ctx)?;
        let object_id = match (type_id.namespace, type_id.as_u32()) {
            (0, Some(id)) => ObjectId::try_from(id).map_err(|_| {
                Error::new(
                    StatusCode::BadServiceUnsupported,
                    format!("No message is encoded with {type_id}"),
                )
            })?,
            _ => {
                return Err(Error::new(
                    StatusCode::BadServiceUnsupported,
                    format!("No message is encoded with {type_id}"),
                ))
            }
        };
        Self::decode_by_object_id(&mut stream, object_id, ctx)
    }
}
