// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

#[derive(Debug, Error)]
/// Error returned when writing XML.
pub enum XmlWriteError {
    #[error("{0}")]
    /// quick-xml rejected the event.
    Xml(#[from] quick_xml::Error),
    #[error("Failed to write to stream: {0}")]
    /// The underlying stream failed.
    Io(#[from] std::io::Error),
}

/// Push writer for OPC UA XML. Values are written as nested elements with
/// escaped text leaves.
pub struct XmlStreamWriter<T> {
    writer: quick_xml::Writer<T>,
}

impl<T: Write> XmlStreamWriter<T> {
    /// Create a new writer around `writer`.
    pub fn new(writer: T) -> Self {
        Self {
            writer: quick_xml::Writer::new(writer),
        }
    }

    /// Write a start tag.
    pub fn write_start(&mut self, tag: &str) -> Result<(), XmlWriteError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(tag)))?;
        Ok(())
    }

    /// Write a start tag carrying a single attribute.
    pub fn write_start_with_attr(
        &mut self,
        tag: &str,
        attr: (&str, &str),
    ) -> Result<(), XmlWriteError> {
        let mut start = BytesStart::new(tag);
        start.push_attribute(attr);
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    /// Write an end tag.
    pub fn write_end(&mut self, tag: &str) -> Result<(), XmlWriteError> {
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    /// Write a self-closing tag.
    pub fn write_empty(&mut self, tag: &str) -> Result<(), XmlWriteError> {
        self.writer
            .write_event(Event::Empty(BytesStart::new(tag)))?;
        Ok(())
    }

    /// Write escaped text content.
    pub fn write_text(&mut self, text: &str) -> Result<(), XmlWriteError> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// Write `<tag>text</tag>`.
    pub fn write_text_element(&mut self, tag: &str, text: &str) -> Result<(), XmlWriteError> {
        self.write_start(tag)?;
        self.write_text(text)?;
        self.write_end(tag)
    }

    /// Write bytes straight to the output. The caller is responsible for the
    /// data being well formed XML.
    pub fn write_raw(&mut self, data: &[u8]) -> Result<(), XmlWriteError> {
        self.writer.get_mut().write_all(data)?;
        Ok(())
    }

    /// Unwrap the inner stream.
    pub fn into_inner(self) -> T {
        self.writer.into_inner()
    }
}
