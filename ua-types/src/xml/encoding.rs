// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::{
    io::{Read, Write},
    str::{from_utf8, Utf8Error},
};

use ua_xml::{events::Event, XmlReadError, XmlStreamReader, XmlStreamWriter, XmlWriteError};

use crate::{Context, EncodingResult, Error};

impl From<XmlReadError> for Error {
    fn from(value: XmlReadError) -> Self {
        Self::decoding(value)
    }
}

impl From<XmlWriteError> for Error {
    fn from(value: XmlWriteError) -> Self {
        Self::encoding(value)
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Self::decoding(value)
    }
}

/// Name of the element a value is written as when it appears inside a list
/// or a variant.
pub trait XmlType {
    /// Static element name.
    const TAG: &'static str;

    /// Element name of this instance. Only differs from `TAG` for values whose
    /// concrete type is decided at runtime.
    fn tag(&self) -> &str {
        Self::TAG
    }
}

/// Decode a value from the element whose start tag was just read. The
/// implementation must consume the matching end tag.
pub trait XmlDecodable {
    /// Decode a value from an XML stream.
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, ctx: &Context<'_>) -> EncodingResult<Self>
    where
        Self: Sized;
}

/// Encode the content of a value. The surrounding element is written by the
/// caller.
pub trait XmlEncodable {
    /// Encode a value to an XML stream.
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()>;
}

/// Helpers on the writer.
pub trait XmlWriteExt {
    /// Write `value` wrapped in an element named `tag`.
    fn encode_child<T: XmlEncodable + ?Sized>(
        &mut self,
        tag: &str,
        value: &T,
        ctx: &Context<'_>,
    ) -> EncodingResult<()>;
}

impl XmlWriteExt for XmlStreamWriter<&mut dyn Write> {
    fn encode_child<T: XmlEncodable + ?Sized>(
        &mut self,
        tag: &str,
        value: &T,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        self.write_start(tag)?;
        value.encode(self, ctx)?;
        self.write_end(tag)?;
        Ok(())
    }
}

/// Helpers on the reader.
pub trait XmlReadExt {
    /// Call `process` for every child element of the current element, then
    /// consume its end tag. `process` must consume the child it is given.
    fn iter_children(
        &mut self,
        process: impl FnMut(String, &mut Self, &Context<'_>) -> EncodingResult<()>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()>;

    /// Run `cb` on the first child named `tag`, skipping every other child.
    fn get_single_child<T>(
        &mut self,
        tag: &str,
        cb: impl FnOnce(&mut Self, &Context<'_>) -> EncodingResult<T>,
        ctx: &Context<'_>,
    ) -> EncodingResult<Option<T>>;

    /// Decode the first child named `tag`, skipping every other child.
    fn decode_single_child<T: XmlDecodable>(
        &mut self,
        tag: &str,
        ctx: &Context<'_>,
    ) -> EncodingResult<Option<T>>;
}

impl XmlReadExt for XmlStreamReader<&mut dyn Read> {
    fn iter_children(
        &mut self,
        mut process: impl FnMut(String, &mut Self, &Context<'_>) -> EncodingResult<()>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        loop {
            match self.next_event()? {
                Event::Start(s) => {
                    let name = from_utf8(s.local_name().into_inner())?.to_owned();
                    process(name, self, ctx)?;
                }
                Event::End(_) => return Ok(()),
                Event::Eof => return Err(Error::decoding(XmlReadError::UnexpectedEof)),
                _ => (),
            }
        }
    }

    fn get_single_child<T>(
        &mut self,
        tag: &str,
        cb: impl FnOnce(&mut Self, &Context<'_>) -> EncodingResult<T>,
        ctx: &Context<'_>,
    ) -> EncodingResult<Option<T>> {
        let mut cb = Some(cb);
        let mut res = None;
        self.iter_children(
            |key, reader, ctx| {
                match cb.take() {
                    Some(f) if key == tag => res = Some(f(reader, ctx)?),
                    other => {
                        cb = other;
                        reader.skip_value()?;
                    }
                }
                Ok(())
            },
            ctx,
        )?;
        Ok(res)
    }

    fn decode_single_child<T: XmlDecodable>(
        &mut self,
        tag: &str,
        ctx: &Context<'_>,
    ) -> EncodingResult<Option<T>> {
        self.get_single_child(tag, |reader, ctx| T::decode(reader, ctx), ctx)
    }
}
