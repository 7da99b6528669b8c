// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

#![warn(missing_docs)]

//! The core module holds functionality shared by servers and clients: the
//! secure channel and its token lifecycle, the secured message envelope, the
//! request and response message enums, and the boundary to service handlers.

/// Contains debugging utility helper functions
pub mod debug {
    use log::{log_enabled, trace};

    /// Prints out the content of a slice in hex and visible char format to aid debugging.
    pub fn log_buffer(message: &str, buf: &[u8]) {
        // No point doing anything unless trace level is on
        if !log_enabled!(target: "hex", log::Level::Trace) {
            return;
        }

        let line_len = 32;
        trace!(target: "hex", "{}", message);
        for (line, chunk) in buf.chunks(line_len).enumerate() {
            let hex: String = chunk.iter().map(|b| format!(" {:02x}", b)).collect();
            let chars: String = chunk
                .iter()
                .map(|b| {
                    if (32..=126).contains(b) {
                        *b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            trace!(target: "hex", "{:08x}:{:<96} {}", line * line_len, hex, chars);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests;

pub mod comms;
pub mod config;
pub mod errors;
pub mod handle;
pub mod messages;
pub mod service;

pub use errors::ChannelError;
pub use messages::{Message, RequestMessage, ResponseMessage};

/// Common synchronous locks. Re-exports locks from parking_lot used internally.
pub mod sync {
    /// Read-write lock. Use this if you usually only need to read the value.
    pub type RwLock<T> = parking_lot::RwLock<T>;
    /// Mutually exclusive lock. Use this if you need both read and write often.
    pub type Mutex<T> = parking_lot::Mutex<T>;
}
