//! Gateway reply documents.
//!
//! Every part becomes its own `<Message>`:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Response><Message><Body format="html">&lt;p&gt;Hi&lt;/p&gt;</Body></Message><Message><Media>https://host/storage/a.gif</Media></Message></Response>
//! ```

use std::fmt::Display;

use escapade_core::error::EngineError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use crate::block::ReplyPart;

const RESPONSE: &str = "Response";
const MESSAGE: &str = "Message";
const BODY: &str = "Body";
const MEDIA: &str = "Media";

/// Errors raised while reading a reply document back.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document is not well-formed XML.
    #[error("malformed reply document: {0}")]
    Malformed(String),

    /// The document is well-formed but does not follow the reply shape.
    #[error("unexpected element <{0}> in reply document")]
    UnexpectedElement(String),
}

/// Serialises reply parts as a gateway reply document.
///
/// # Errors
///
/// Returns `EngineError::TransportError` if the document cannot be written.
pub fn write_reply(parts: &[ReplyPart]) -> Result<String, EngineError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(transport)?;
    writer
        .write_event(Event::Text(BytesText::from_escaped("\n")))
        .map_err(transport)?;
    writer
        .write_event(Event::Start(BytesStart::new(RESPONSE)))
        .map_err(transport)?;

    for part in parts {
        writer
            .write_event(Event::Start(BytesStart::new(MESSAGE)))
            .map_err(transport)?;
        match part {
            ReplyPart::Text { body, html } => {
                let mut start = BytesStart::new(BODY);
                if *html {
                    start.push_attribute(("format", "html"));
                }
                write_element(&mut writer, start, BODY, body)?;
            }
            ReplyPart::Media { url } => {
                write_element(&mut writer, BytesStart::new(MEDIA), MEDIA, url)?;
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(MESSAGE)))
            .map_err(transport)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(RESPONSE)))
        .map_err(transport)?;
    String::from_utf8(writer.into_inner()).map_err(transport)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart<'_>,
    name: &str,
    content: &str,
) -> Result<(), EngineError> {
    writer.write_event(Event::Start(start)).map_err(transport)?;
    writer
        .write_event(Event::Text(BytesText::new(content)))
        .map_err(transport)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(transport)
}

fn transport(e: impl Display) -> EngineError {
    EngineError::TransportError(e.to_string())
}

fn malformed(e: impl Display) -> DocumentError {
    DocumentError::Malformed(e.to_string())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Body { html: bool },
    Media,
}

/// Reads a reply document back into its ordered parts.
///
/// # Errors
///
/// Returns `DocumentError` if the document is malformed or contains
/// elements outside the reply shape.
pub fn parse_reply(xml: &str) -> Result<Vec<ReplyPart>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut parts = Vec::new();
    let mut field: Option<Field> = None;
    let mut content = String::new();

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => {
                let name = element_name(&start)?;
                match name.as_str() {
                    RESPONSE | MESSAGE => {}
                    BODY => {
                        field = Some(Field::Body {
                            html: is_html(&start)?,
                        });
                        content.clear();
                    }
                    MEDIA => {
                        field = Some(Field::Media);
                        content.clear();
                    }
                    _ => return Err(DocumentError::UnexpectedElement(name)),
                }
            }
            Event::Empty(start) => {
                let name = element_name(&start)?;
                match name.as_str() {
                    BODY => parts.push(ReplyPart::Text {
                        body: String::new(),
                        html: is_html(&start)?,
                    }),
                    MESSAGE => {}
                    _ => return Err(DocumentError::UnexpectedElement(name)),
                }
            }
            Event::Text(text) if field.is_some() => {
                content.push_str(&text.unescape().map_err(malformed)?);
            }
            Event::CData(data) if field.is_some() => {
                let raw = data.into_inner();
                content.push_str(std::str::from_utf8(&raw).map_err(malformed)?);
            }
            Event::End(end) => {
                let name = std::str::from_utf8(end.name().as_ref())
                    .map_err(malformed)?
                    .to_owned();
                match (name.as_str(), field.take()) {
                    (BODY, Some(Field::Body { html })) => parts.push(ReplyPart::Text {
                        body: std::mem::take(&mut content),
                        html,
                    }),
                    (MEDIA, Some(Field::Media)) => parts.push(ReplyPart::Media {
                        url: std::mem::take(&mut content),
                    }),
                    (_, previous) => field = previous,
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parts)
}

fn element_name(start: &BytesStart<'_>) -> Result<String, DocumentError> {
    std::str::from_utf8(start.name().as_ref())
        .map(ToOwned::to_owned)
        .map_err(malformed)
}

fn is_html(start: &BytesStart<'_>) -> Result<bool, DocumentError> {
    let format = start.try_get_attribute("format").map_err(malformed)?;
    Ok(format.is_some_and(|attr| attr.value.as_ref() == b"html"))
}
