// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Binary encoding of the primitive scalar types.

use std::io::{Read, Write};

use crate::{encoding::*, DecodingOptions, EncodingResult};

impl SimpleBinaryEncodable for bool {
    fn byte_len(&self) -> usize {
        1
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        write_u8(stream, u8::from(*self))
    }
}

impl SimpleBinaryDecodable for bool {
    fn decode<S: Read + ?Sized>(stream: &mut S, _: &DecodingOptions) -> EncodingResult<Self> {
        // Any non-zero byte is true.
        Ok(read_u8(stream)? != 0)
    }
}

impl SimpleBinaryEncodable for u8 {
    fn byte_len(&self) -> usize {
        1
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        write_u8(stream, *self)
    }
}

impl SimpleBinaryDecodable for u8 {
    fn decode<S: Read + ?Sized>(stream: &mut S, _: &DecodingOptions) -> EncodingResult<Self> {
        read_u8(stream)
    }
}

impl SimpleBinaryEncodable for i8 {
    fn byte_len(&self) -> usize {
        1
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        write_u8(stream, *self as u8)
    }
}

impl SimpleBinaryDecodable for i8 {
    fn decode<S: Read + ?Sized>(stream: &mut S, _: &DecodingOptions) -> EncodingResult<Self> {
        Ok(read_u8(stream)? as i8)
    }
}

macro_rules! scalar_binary {
    ($t:ty, $len:expr, $write:ident, $read:ident) => {
        impl SimpleBinaryEncodable for $t {
            fn byte_len(&self) -> usize {
                $len
            }

            fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
                $write(stream, *self)
            }
        }

        impl SimpleBinaryDecodable for $t {
            fn decode<S: Read + ?Sized>(
                stream: &mut S,
                _: &DecodingOptions,
            ) -> EncodingResult<Self> {
                $read(stream)
            }
        }
    };
}

scalar_binary!(i16, 2, write_i16, read_i16);
scalar_binary!(u16, 2, write_u16, read_u16);
scalar_binary!(i32, 4, write_i32, read_i32);
scalar_binary!(u32, 4, write_u32, read_u32);
scalar_binary!(i64, 8, write_i64, read_i64);
scalar_binary!(u64, 8, write_u64, read_u64);
scalar_binary!(f32, 4, write_f32, read_f32);
scalar_binary!(f64, 8, write_f64, read_f64);
