// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The `BinaryEncodable` and `BinaryDecodable` traits, decoding limits, and
//! helpers for reading and writing little-endian scalars.

use std::{
    error::Error as StdError,
    fmt::{Debug, Display},
    io::{Cursor, Read, Write},
    sync::atomic::{AtomicU64, Ordering},
};

use byteorder::{ByteOrder, LittleEndian};
use log::error;

use crate::{constants, status_code::StatusCode, Context};

/// Result of an encoding or decoding operation.
pub type EncodingResult<T> = std::result::Result<T, Error>;

/// Error raised by the codec.
///
/// Carries a status code, the underlying cause, and, when it was possible to
/// recover them before the failure, the request id and request handle of the
/// message being processed.
#[derive(Debug)]
pub struct Error {
    status: StatusCode,
    request_id: Option<u32>,
    request_handle: Option<u32>,
    context: Box<dyn StdError + Send + Sync>,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status(), self.context)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.context)
    }
}

impl Error {
    /// Create a new error with the given status code and cause.
    pub fn new(status: StatusCode, context: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            status,
            request_handle: None,
            request_id: None,
            context: context.into(),
        }
    }

    /// Create a `BadDecodingError`.
    pub fn decoding(context: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::new(StatusCode::BadDecodingError, context)
    }

    /// Create a `BadEncodingError`.
    pub fn encoding(context: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::new(StatusCode::BadEncodingError, context)
    }

    /// Attach the request id of the message this error belongs to.
    pub fn with_request_id(mut self, id: u32) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Attach the request handle of the message this error belongs to.
    pub fn with_request_handle(mut self, handle: u32) -> Self {
        self.request_handle = Some(handle);
        self
    }

    /// Prefix the cause with where the error happened.
    pub fn with_context(mut self, location: impl Display) -> Self {
        self.context = format!("{location}: {}", self.context).into();
        self
    }

    /// Status code of the error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Request id, if known.
    pub fn request_id(&self) -> Option<u32> {
        self.request_id
    }

    /// Request handle, if known.
    pub fn request_handle(&self) -> Option<u32> {
        self.request_handle
    }
}

impl From<Error> for StatusCode {
    fn from(value: Error) -> Self {
        error!("{}", value);
        value.status()
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::decoding(value)
    }
}

impl From<StatusCode> for Error {
    fn from(value: StatusCode) -> Self {
        Self::new(value, value.to_string())
    }
}

/// Holds one level on a [`DepthGauge`] and releases it when dropped, including
/// during unwinding.
#[derive(Debug)]
pub struct DepthLock<'a> {
    depth_gauge: &'a DepthGauge,
}

impl Drop for DepthLock<'_> {
    fn drop(&mut self) {
        self.depth_gauge
            .current_depth
            .fetch_sub(1, Ordering::Release);
    }
}

impl<'a> DepthLock<'a> {
    /// Enter one level of nesting, failing if the gauge is already at its maximum.
    pub fn obtain(depth_gauge: &'a DepthGauge) -> EncodingResult<DepthLock<'a>> {
        let current = depth_gauge.current_depth.fetch_add(1, Ordering::Acquire);
        let lock = Self { depth_gauge };
        if current >= depth_gauge.max_depth {
            Err(Error::decoding(
                "Decoding aborted, maximum recursion depth reached",
            ))
        } else {
            Ok(lock)
        }
    }
}

/// Recursion limit for nested values such as `Variant`, `DiagnosticInfo` and
/// `ExtensionObject`.
#[derive(Debug)]
pub struct DepthGauge {
    max_depth: u64,
    current_depth: AtomicU64,
}

// A cloned gauge starts from zero.
impl Clone for DepthGauge {
    fn clone(&self) -> Self {
        Self::new(self.max_depth)
    }
}

impl Default for DepthGauge {
    fn default() -> Self {
        Self::new(constants::MAX_DECODING_DEPTH)
    }
}

impl DepthGauge {
    /// Create a gauge allowing `max_depth` nested levels.
    pub fn new(max_depth: u64) -> Self {
        Self {
            max_depth,
            current_depth: AtomicU64::new(0),
        }
    }

    /// Maximum depth of the gauge.
    pub fn max_depth(&self) -> u64 {
        self.max_depth
    }

    /// Current depth of the gauge.
    pub fn current_depth(&self) -> u64 {
        self.current_depth.load(Ordering::Relaxed)
    }
}

/// Limits applied while decoding data from an untrusted peer.
#[derive(Clone, Debug)]
pub struct DecodingOptions {
    /// Maximum size of a message in bytes. 0 means no limit.
    pub max_message_size: usize,
    /// Maximum length in bytes of a string.
    pub max_string_length: usize,
    /// Maximum length in bytes of a byte string.
    pub max_byte_string_length: usize,
    /// Maximum number of elements in an array.
    pub max_array_length: usize,
    /// Recursion limit.
    pub decoding_depth_gauge: DepthGauge,
}

impl Default for DecodingOptions {
    fn default() -> Self {
        DecodingOptions {
            max_message_size: constants::MAX_MESSAGE_SIZE,
            max_string_length: constants::MAX_STRING_LENGTH,
            max_byte_string_length: constants::MAX_BYTE_STRING_LENGTH,
            max_array_length: constants::MAX_ARRAY_LENGTH,
            decoding_depth_gauge: DepthGauge::default(),
        }
    }
}

impl DecodingOptions {
    /// Small limits, for payloads that are not expected to be large.
    pub fn minimal() -> Self {
        DecodingOptions {
            max_string_length: 8192,
            max_byte_string_length: 8192,
            max_array_length: 8192,
            decoding_depth_gauge: DepthGauge::new(1),
            ..Default::default()
        }
    }

    /// Enter one level of nesting. The level is released when the lock drops.
    pub fn depth_lock(&self) -> EncodingResult<DepthLock<'_>> {
        DepthLock::obtain(&self.decoding_depth_gauge)
    }
}

/// OPC UA binary encoding.
///
/// `byte_len` must return exactly the number of bytes `encode` writes.
/// Implementations should normally be derived with `#[derive(BinaryEncodable)]`.
pub trait BinaryEncodable {
    /// Exact encoded length in bytes.
    fn byte_len(&self, ctx: &Context<'_>) -> usize;

    /// Write the value to the stream.
    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()>;

    /// Encode into a new buffer.
    fn encode_to_vec(&self, ctx: &Context<'_>) -> EncodingResult<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::with_capacity(self.byte_len(ctx)));
        self.encode(&mut buffer, ctx)?;
        Ok(buffer.into_inner())
    }
}

/// OPC UA binary decoding. Implementations must enforce the limits in
/// [`DecodingOptions`] and fail with `BadDecodingError` as early as possible.
pub trait BinaryDecodable: Sized {
    /// Read a value from the stream.
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self>;
}

/// Binary encoding for types that never contain registry-dependent values.
pub trait SimpleBinaryEncodable {
    /// Exact encoded length in bytes.
    fn byte_len(&self) -> usize;

    /// Write the value to the stream.
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()>;
}

impl<T> BinaryEncodable for T
where
    T: SimpleBinaryEncodable,
{
    fn byte_len(&self, _ctx: &Context<'_>) -> usize {
        SimpleBinaryEncodable::byte_len(self)
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, _ctx: &Context<'_>) -> EncodingResult<()> {
        SimpleBinaryEncodable::encode(self, stream)
    }
}

/// Binary decoding for types that only need the decoding limits.
pub trait SimpleBinaryDecodable: Sized {
    /// Read a value from the stream.
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self>;
}

impl<T> BinaryDecodable for T
where
    T: SimpleBinaryDecodable,
{
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self> {
        SimpleBinaryDecodable::decode(stream, ctx.options())
    }
}

/// Map an IO error while encoding.
pub fn process_encode_io_result(result: std::io::Result<()>) -> EncodingResult<()> {
    result.map_err(Error::encoding)
}

/// Map an IO error while decoding.
pub fn process_decode_io_result<T>(result: std::io::Result<T>) -> EncodingResult<T>
where
    T: Debug,
{
    result.map_err(Error::decoding)
}

/// Upper bound on capacity reserved up front for length-prefixed data. Larger
/// payloads grow as bytes actually arrive.
pub(crate) const PREALLOC_LIMIT: usize = 4096;

/// Validate an `Int32` length prefix. Returns `None` for `-1`, the null value.
pub fn check_length_prefix(len: i32, limit: usize, what: &str) -> EncodingResult<Option<usize>> {
    match len {
        -1 => Ok(None),
        l if l < -1 => Err(Error::decoding(format!(
            "{what} length {l} is negative and not -1"
        ))),
        l if l as usize > limit => Err(Error::new(
            StatusCode::BadEncodingLimitsExceeded,
            format!("{what} length {l} exceeds decoding limit {limit}"),
        )),
        l => Ok(Some(l as usize)),
    }
}

/// Read exactly `len` bytes. The buffer grows with the data that is actually
/// present, so a bogus length on a short stream fails without allocating `len`.
pub fn read_exact_bounded<R: Read + ?Sized>(stream: &mut R, len: usize) -> EncodingResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(PREALLOC_LIMIT));
    let read = Read::take(&mut *stream, len as u64).read_to_end(&mut buf)?;
    if read != len {
        return Err(Error::decoding(format!(
            "Expected {len} bytes, stream ended after {read}"
        )));
    }
    Ok(buf)
}

impl<T> BinaryEncodable for Option<Vec<T>>
where
    T: BinaryEncodable,
{
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        byte_len_array(self, ctx)
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> EncodingResult<()> {
        match self {
            Some(values) => {
                write_i32(stream, values.len() as i32)?;
                for value in values {
                    value.encode(stream, ctx)?;
                }
            }
            None => write_i32(stream, -1)?,
        }
        Ok(())
    }
}

impl<T> BinaryDecodable for Option<Vec<T>>
where
    T: BinaryDecodable,
{
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> EncodingResult<Self> {
        let len = read_i32(stream)?;
        let Some(len) = check_length_prefix(len, ctx.options().max_array_length, "Array")? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(len.min(PREALLOC_LIMIT));
        for _ in 0..len {
            values.push(T::decode(stream, ctx)?);
        }
        Ok(Some(values))
    }
}

/// Encoded length of an optional array.
pub fn byte_len_array<T: BinaryEncodable>(values: &Option<Vec<T>>, ctx: &Context<'_>) -> usize {
    4 + values
        .iter()
        .flatten()
        .map(|v| v.byte_len(ctx))
        .sum::<usize>()
}

macro_rules! write_scalar {
    ($name:ident, $t:ty, $n:expr, $w:ident) => {
        #[doc = concat!("Write a little-endian `", stringify!($t), "`.")]
        pub fn $name<T, W: Write + ?Sized>(stream: &mut W, value: T) -> EncodingResult<()>
        where
            T: Into<$t>,
        {
            let mut buf = [0u8; $n];
            LittleEndian::$w(&mut buf, value.into());
            process_encode_io_result(stream.write_all(&buf))
        }
    };
}

macro_rules! read_scalar {
    ($name:ident, $t:ty, $n:expr, $r:ident) => {
        #[doc = concat!("Read a little-endian `", stringify!($t), "`.")]
        pub fn $name<R: Read + ?Sized>(stream: &mut R) -> EncodingResult<$t> {
            let mut buf = [0u8; $n];
            process_decode_io_result(stream.read_exact(&mut buf))?;
            Ok(LittleEndian::$r(&buf))
        }
    };
}

write_scalar!(write_i16, i16, 2, write_i16);
write_scalar!(write_u16, u16, 2, write_u16);
write_scalar!(write_i32, i32, 4, write_i32);
write_scalar!(write_u32, u32, 4, write_u32);
write_scalar!(write_i64, i64, 8, write_i64);
write_scalar!(write_u64, u64, 8, write_u64);
write_scalar!(write_f32, f32, 4, write_f32);
write_scalar!(write_f64, f64, 8, write_f64);

read_scalar!(read_i16, i16, 2, read_i16);
read_scalar!(read_u16, u16, 2, read_u16);
read_scalar!(read_i32, i32, 4, read_i32);
read_scalar!(read_u32, u32, 4, read_u32);
read_scalar!(read_i64, i64, 8, read_i64);
read_scalar!(read_u64, u64, 8, read_u64);
read_scalar!(read_f32, f32, 4, read_f32);
read_scalar!(read_f64, f64, 8, read_f64);

/// Write a single byte.
pub fn write_u8<T, W: Write + ?Sized>(stream: &mut W, value: T) -> EncodingResult<()>
where
    T: Into<u8>,
{
    process_encode_io_result(stream.write_all(&[value.into()]))
}

/// Read a single byte.
pub fn read_u8<R: Read + ?Sized>(stream: &mut R) -> EncodingResult<u8> {
    let mut buf = [0u8];
    process_decode_io_result(stream.read_exact(&mut buf))?;
    Ok(buf[0])
}

/// Fill `buf` from the stream.
pub fn read_bytes<R: Read + ?Sized>(stream: &mut R, buf: &mut [u8]) -> EncodingResult<usize> {
    process_decode_io_result(stream.read_exact(buf))?;
    Ok(buf.len())
}

/// Skip `bytes` bytes in the stream.
pub fn skip_bytes<R: Read + ?Sized>(stream: &mut R, bytes: u64) -> EncodingResult<()> {
    let skipped = std::io::copy(&mut Read::take(&mut *stream, bytes), &mut std::io::sink())?;
    if skipped != bytes {
        return Err(Error::decoding("Stream ended while skipping bytes"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{check_length_prefix, read_exact_bounded, DepthGauge, DepthLock};
    use crate::{constants, BinaryDecodable, ContextOwned, StatusCode};

    #[test]
    fn depth_gauge() {
        let dg = DepthGauge::default();
        let max_depth = dg.max_depth();
        assert_eq!(max_depth, constants::MAX_DECODING_DEPTH);

        {
            let mut v = Vec::new();
            for _ in 0..max_depth {
                v.push(DepthLock::obtain(&dg).unwrap());
            }
            assert_eq!(dg.current_depth(), max_depth);
            assert_eq!(
                DepthLock::obtain(&dg).unwrap_err().status(),
                StatusCode::BadDecodingError
            );
        }

        assert_eq!(dg.current_depth(), 0);
    }

    #[test]
    fn length_prefix_rules() {
        assert_eq!(check_length_prefix(-1, 10, "x").unwrap(), None);
        assert_eq!(check_length_prefix(0, 10, "x").unwrap(), Some(0));
        assert!(check_length_prefix(-2, 10, "x").is_err());
        assert_eq!(
            check_length_prefix(11, 10, "x").unwrap_err().status(),
            StatusCode::BadEncodingLimitsExceeded
        );
    }

    #[test]
    fn bounded_read_short_stream() {
        let mut stream = Cursor::new(vec![1u8, 2, 3]);
        let err = read_exact_bounded(&mut stream, 1_000_000).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadDecodingError);
    }

    #[test]
    fn array_length_past_buffer() {
        let ctx = ContextOwned::default();
        // Array of i32 claiming 1000 elements, with only two present.
        let mut data = 1000i32.to_le_bytes().to_vec();
        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&2i32.to_le_bytes());
        let mut stream = Cursor::new(data);
        assert!(Option::<Vec<i32>>::decode(&mut stream, &ctx.context()).is_err());
    }
}
