// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use std::{
    io::{BufReader, Read},
    num::{ParseFloatError, ParseIntError},
    str::FromStr,
};

use quick_xml::events::Event;
use thiserror::Error;

#[derive(Debug, Error)]
/// Error produced when reading XML.
pub enum XmlReadError {
    #[error("{0}")]
    /// The document is not well formed.
    Xml(#[from] quick_xml::Error),
    #[error("Unexpected end of document")]
    /// The document ended inside an element.
    UnexpectedEof,
    #[error("Failed to parse integer: {0}")]
    /// Element content is not an integer.
    ParseInt(#[from] ParseIntError),
    #[error("Failed to parse float: {0}")]
    /// Element content is not a float.
    ParseFloat(#[from] ParseFloatError),
    #[error("Failed to parse value: {0}")]
    /// Element content could not be parsed for some other reason.
    Parse(String),
    #[error("Element content exceeds the limit of {0} bytes")]
    /// Text or raw content of an element was larger than the configured limit.
    TooLarge(usize),
}

/// Pull reader over an XML document, tuned for the OPC UA XML encoding where
/// values are nested elements and leaf values are element text.
pub struct XmlStreamReader<T> {
    reader: quick_xml::Reader<BufReader<T>>,
    buffer: Vec<u8>,
    max_content: usize,
}

impl<T: Read> XmlStreamReader<T> {
    /// Create a new reader with no limit on element content size.
    pub fn new(reader: T) -> Self {
        Self::with_limit(reader, usize::MAX)
    }

    /// Create a new reader that refuses to accumulate more than `max_content`
    /// bytes of text or raw markup for a single element.
    pub fn with_limit(reader: T, max_content: usize) -> Self {
        let mut reader = quick_xml::Reader::from_reader(BufReader::new(reader));
        reader.config_mut().expand_empty_elements = true;
        Self {
            reader,
            buffer: Vec::new(),
            max_content,
        }
    }

    /// Get the next event from the stream.
    pub fn next_event(&mut self) -> Result<Event<'_>, XmlReadError> {
        self.buffer.clear();
        Ok(self.reader.read_event_into(&mut self.buffer)?)
    }

    /// Advance to the next start tag and return its local name, or `None` if
    /// an end tag or the end of the document is reached first.
    pub fn next_start(&mut self) -> Result<Option<String>, XmlReadError> {
        loop {
            match self.next_event()? {
                Event::Start(s) => {
                    let name = std::str::from_utf8(s.local_name().into_inner())
                        .map_err(|e| XmlReadError::Parse(e.to_string()))?;
                    return Ok(Some(name.to_owned()));
                }
                Event::End(_) | Event::Eof => return Ok(None),
                _ => (),
            }
        }
    }

    /// Skip the element whose start tag was just read, including all children.
    pub fn skip_value(&mut self) -> Result<(), XmlReadError> {
        let mut depth = 1u32;
        loop {
            match self.next_event()? {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Event::Eof => return Err(XmlReadError::UnexpectedEof),
                _ => {}
            }
        }
    }

    /// Consume the element whose start tag was just read and return its direct
    /// text content, trimmed. Text inside child elements is ignored, and
    /// multiple text nodes are concatenated.
    pub fn consume_as_text(&mut self) -> Result<String, XmlReadError> {
        let max = self.max_content;
        let mut text = String::new();
        let mut depth = 1u32;
        loop {
            match self.next_event()? {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        let trimmed = text.trim_ascii_end().len();
                        text.truncate(trimmed);
                        return Ok(text);
                    }
                }
                Event::Text(e) if depth == 1 => {
                    let chunk = e.unescape()?;
                    let chunk: &str = if text.is_empty() {
                        chunk.trim_ascii_start()
                    } else {
                        &chunk
                    };
                    if text.len() + chunk.len() > max {
                        return Err(XmlReadError::TooLarge(max));
                    }
                    text.push_str(chunk);
                }
                Event::CData(e) if depth == 1 => {
                    let chunk = std::str::from_utf8(&e)
                        .map_err(|e| XmlReadError::Parse(e.to_string()))?;
                    if text.len() + chunk.len() > max {
                        return Err(XmlReadError::TooLarge(max));
                    }
                    text.push_str(chunk);
                }
                Event::Eof => return Err(XmlReadError::UnexpectedEof),
                _ => (),
            }
        }
    }

    /// Consume the element whose start tag was just read and return its inner
    /// markup unchanged, apart from empty elements, which come back in their
    /// expanded `<a></a>` form.
    pub fn consume_raw(&mut self) -> Result<Vec<u8>, XmlReadError> {
        let max = self.max_content;
        let mut out = Vec::new();
        let mut depth = 1u32;
        loop {
            match self.next_event()? {
                Event::Start(s) => {
                    depth += 1;
                    out.push(b'<');
                    out.extend_from_slice(&s);
                    out.push(b'>');
                }
                Event::End(s) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.extend_from_slice(b"</");
                    out.extend_from_slice(&s);
                    out.push(b'>');
                }
                Event::Empty(s) => {
                    out.push(b'<');
                    out.extend_from_slice(&s);
                    out.extend_from_slice(b"/>");
                }
                Event::Text(s) => out.extend_from_slice(&s),
                Event::CData(s) => {
                    out.extend_from_slice(b"<![CDATA[");
                    out.extend_from_slice(&s);
                    out.extend_from_slice(b"]]>");
                }
                Event::Comment(s) => {
                    out.extend_from_slice(b"<!--");
                    out.extend_from_slice(&s);
                    out.extend_from_slice(b"-->");
                }
                Event::PI(s) => {
                    out.extend_from_slice(b"<?");
                    out.extend_from_slice(&s);
                    out.extend_from_slice(b"?>");
                }
                // Declarations and doctypes cannot appear inside an element.
                Event::Decl(_) | Event::DocType(_) => (),
                Event::Eof => return Err(XmlReadError::UnexpectedEof),
            }
            if out.len() > max {
                return Err(XmlReadError::TooLarge(max));
            }
        }
    }

    /// Consume the current element as text and parse it.
    pub fn consume_content<R: FromStr>(&mut self) -> Result<R, XmlReadError>
    where
        XmlReadError: From<<R as FromStr>::Err>,
    {
        let text = self.consume_as_text()?;
        Ok(text.parse()?)
    }
}
