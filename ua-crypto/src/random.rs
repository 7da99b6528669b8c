// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Random bytes for nonces and opaque handles.

use rand::RngCore;
use ua_types::ByteString;

/// Fill `bytes` with cryptographically strong random data.
pub fn bytes(bytes: &mut [u8]) {
    rand::thread_rng().fill_bytes(bytes);
}

/// A byte string of `number_of_bytes` random bytes.
pub fn byte_string(number_of_bytes: usize) -> ByteString {
    let mut data = vec![0u8; number_of_bytes];
    bytes(&mut data);
    ByteString::from(data)
}
