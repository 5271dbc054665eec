use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ExtractionError;
use crate::processor::{DocumentProcessor, MediaKind};

const KIND: &str = "Word";
const DOCUMENT_PART: &str = "word/document.xml";

/// Raw text from OOXML word-processing documents. Legacy binary `.doc`
/// files are not zip archives and fail to parse.
pub struct DocxProcessor;

impl DocxProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentProcessor for DocxProcessor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let _span = tracing::info_span!("processor.docx", bytes = bytes.len()).entered();

        let mut archive =
            zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractionError::parse(KIND, e))?;

        let mut part = archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| ExtractionError::parse(KIND, e))?;

        let mut xml = Vec::new();
        part.read_to_end(&mut xml)
            .map_err(|e| ExtractionError::parse(KIND, e))?;

        parse_document_xml(&xml)
    }

    fn supports(&self, kind: MediaKind) -> bool {
        matches!(kind, MediaKind::Word)
    }
}

/// Collects the contents of `w:t` runs. Paragraphs and breaks become
/// newlines, tabs become `\t`; everything else is dropped.
fn parse_document_xml(xml: &[u8]) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_reader(xml);

    let mut text = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"t" => {
                in_text_element = true;
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text_element => {
                text.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::CData(ref e)) if in_text_element => {
                text.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::GeneralRef(ref e)) if in_text_element => {
                let name = String::from_utf8_lossy(e);
                match resolve_entity(&name) {
                    Some(c) => text.push(c),
                    None => {
                        return Err(ExtractionError::parse(
                            KIND,
                            format!("unknown entity '&{};'", name),
                        ))
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractionError::parse(KIND, e)),
            _ => {}
        }
    }

    Ok(text)
}

/// Resolves the predefined XML entities and numeric character references.
fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
