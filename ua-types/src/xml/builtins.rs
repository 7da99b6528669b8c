// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::io::{Read, Write};

use ua_xml::{XmlStreamReader, XmlStreamWriter};

use super::encoding::{XmlDecodable, XmlEncodable, XmlReadExt, XmlType, XmlWriteExt};
use crate::{Context, EncodingResult, Error};

macro_rules! xml_enc_number {
    ($t:ty, $name:expr) => {
        impl XmlType for $t {
            const TAG: &'static str = $name;
        }

        impl XmlEncodable for $t {
            fn encode(
                &self,
                writer: &mut XmlStreamWriter<&mut dyn Write>,
                _ctx: &Context<'_>,
            ) -> EncodingResult<()> {
                writer.write_text(&self.to_string())?;
                Ok(())
            }
        }

        impl XmlDecodable for $t {
            fn decode(
                read: &mut XmlStreamReader<&mut dyn Read>,
                _ctx: &Context<'_>,
            ) -> EncodingResult<Self> {
                Ok(read.consume_content()?)
            }
        }
    };
}

const VALUE_INFINITY: &str = "INF";
const VALUE_NEG_INFINITY: &str = "-INF";
const VALUE_NAN: &str = "NaN";

macro_rules! xml_enc_float {
    ($t:ty, $name:expr) => {
        impl XmlType for $t {
            const TAG: &'static str = $name;
        }

        impl XmlEncodable for $t {
            fn encode(
                &self,
                writer: &mut XmlStreamWriter<&mut dyn Write>,
                _ctx: &Context<'_>,
            ) -> EncodingResult<()> {
                if self.is_nan() {
                    writer.write_text(VALUE_NAN)?;
                } else if self.is_infinite() && self.is_sign_positive() {
                    writer.write_text(VALUE_INFINITY)?;
                } else if self.is_infinite() {
                    writer.write_text(VALUE_NEG_INFINITY)?;
                } else {
                    writer.write_text(&self.to_string())?;
                }
                Ok(())
            }
        }

        impl XmlDecodable for $t {
            fn decode(
                read: &mut XmlStreamReader<&mut dyn Read>,
                _ctx: &Context<'_>,
            ) -> EncodingResult<Self> {
                let val = read.consume_as_text()?;
                match val.as_str() {
                    VALUE_INFINITY => Ok(Self::INFINITY),
                    VALUE_NEG_INFINITY => Ok(Self::NEG_INFINITY),
                    VALUE_NAN => Ok(Self::NAN),
                    _ => val.parse().map_err(Error::decoding),
                }
            }
        }
    };
}

xml_enc_number!(u8, "Byte");
xml_enc_number!(u16, "UInt16");
xml_enc_number!(u32, "UInt32");
xml_enc_number!(u64, "UInt64");
xml_enc_number!(i8, "SByte");
xml_enc_number!(i16, "Int16");
xml_enc_number!(i32, "Int32");
xml_enc_number!(i64, "Int64");
xml_enc_float!(f32, "Float");
xml_enc_float!(f64, "Double");

impl XmlType for String {
    const TAG: &'static str = "String";
}

impl XmlDecodable for String {
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, _ctx: &Context<'_>) -> EncodingResult<Self> {
        Ok(read.consume_as_text()?)
    }
}

impl XmlEncodable for String {
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        _ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        writer.write_text(self)?;
        Ok(())
    }
}

impl XmlType for bool {
    const TAG: &'static str = "Boolean";
}

impl XmlDecodable for bool {
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, _ctx: &Context<'_>) -> EncodingResult<Self> {
        let val = read.consume_as_text()?;
        match val.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(Error::decoding(format!("Invalid boolean value: {val}"))),
        }
    }
}

impl XmlEncodable for bool {
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        _ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        writer.write_text(if *self { "true" } else { "false" })?;
        Ok(())
    }
}

impl<T> XmlType for Box<T>
where
    T: XmlType,
{
    const TAG: &'static str = T::TAG;
    fn tag(&self) -> &str {
        self.as_ref().tag()
    }
}

impl<T> XmlDecodable for Box<T>
where
    T: XmlDecodable,
{
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, ctx: &Context<'_>) -> EncodingResult<Self> {
        Ok(Box::new(T::decode(read, ctx)?))
    }
}

impl<T> XmlEncodable for Box<T>
where
    T: XmlEncodable,
{
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        self.as_ref().encode(writer, ctx)
    }
}

impl<T> XmlType for Vec<T>
where
    T: XmlType,
{
    const TAG: &'static str = T::TAG;
    fn tag(&self) -> &str {
        self.first().map(|v| v.tag()).unwrap_or(Self::TAG)
    }
}

impl<T> XmlDecodable for Vec<T>
where
    T: XmlDecodable,
{
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, ctx: &Context<'_>) -> EncodingResult<Self> {
        let mut vec = Vec::new();
        read.iter_children(
            |_, reader, ctx| {
                vec.push(T::decode(reader, ctx)?);
                Ok(())
            },
            ctx,
        )?;
        Ok(vec)
    }
}

impl<T> XmlEncodable for Vec<T>
where
    T: XmlEncodable + XmlType,
{
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        for item in self {
            writer.encode_child(item.tag(), item, ctx)?;
        }
        Ok(())
    }
}

impl<T> XmlType for Option<T>
where
    T: XmlType,
{
    const TAG: &'static str = T::TAG;
    fn tag(&self) -> &str {
        self.as_ref().map(|v| v.tag()).unwrap_or(Self::TAG)
    }
}

// A missing element is `None`, so reaching the decoder means the value is present.
impl<T> XmlDecodable for Option<T>
where
    T: XmlDecodable,
{
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, ctx: &Context<'_>) -> EncodingResult<Self> {
        Ok(Some(T::decode(read, ctx)?))
    }
}

impl<T> XmlEncodable for Option<T>
where
    T: XmlEncodable,
{
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        if let Some(value) = self {
            value.encode(writer, ctx)?;
        }
        Ok(())
    }
}
