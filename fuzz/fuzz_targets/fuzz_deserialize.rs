// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

#![no_main]
#![cfg(feature = "nightly")]
use libfuzzer_sys::fuzz_target;

use std::io::Cursor;
use ua_types::{BinaryDecodable, ContextOwned, ExtensionObject, Variant};

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must return a value or an error, never panic.
    let ctx = ContextOwned::default();
    let _ = Variant::decode(&mut Cursor::new(data), &ctx.context());
    let _ = ExtensionObject::decode(&mut Cursor::new(data), &ctx.context());
});
