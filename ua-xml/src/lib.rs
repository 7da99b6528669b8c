// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

#![warn(missing_docs)]

//! Streaming XML primitives for the OPC UA XML encoding.
//!
//! Reading and writing is done with `quick-xml`. The reader expands empty
//! elements, so `<Foo/>` is seen as a start event followed by an end event.

mod reader;
mod writer;

pub use quick_xml::events;
pub use reader::{XmlReadError, XmlStreamReader};
pub use writer::{XmlStreamWriter, XmlWriteError};
