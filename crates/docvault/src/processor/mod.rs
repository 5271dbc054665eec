//! Text extraction, dispatched on the declared media type.

pub mod docx;
pub mod pdf;
pub mod text;

use crate::config::schema::{MIME_DOCX, MIME_MSWORD, MIME_PDF};
use crate::error::ExtractionError;

/// Content families the registry knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Text,
    Pdf,
    Word,
}

impl MediaKind {
    /// Classifies a declared media type. Parameters such as `; charset=utf-8`
    /// are ignored and matching is case-insensitive. Content is never sniffed.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence.starts_with("text/") && essence.len() > "text/".len() {
            return Some(MediaKind::Text);
        }
        match essence.as_str() {
            MIME_PDF => Some(MediaKind::Pdf),
            MIME_MSWORD | MIME_DOCX => Some(MediaKind::Word),
            _ => None,
        }
    }
}

pub trait DocumentProcessor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
    fn supports(&self, kind: MediaKind) -> bool;
}

pub struct ProcessorRegistry {
    processors: Vec<Box<dyn DocumentProcessor>>,
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: vec![
                Box::new(text::TextProcessor::new()),
                Box::new(pdf::PdfProcessor::new()),
                Box::new(docx::DocxProcessor::new()),
            ],
        }
    }

    /// Turns `bytes` into plain text according to `mime_type`.
    pub fn extract(&self, bytes: &[u8], mime_type: &str) -> Result<String, ExtractionError> {
        let kind = MediaKind::from_mime(mime_type)
            .ok_or_else(|| ExtractionError::UnsupportedType(mime_type.to_string()))?;

        for processor in &self.processors {
            if processor.supports(kind) {
                return processor.extract(bytes);
            }
        }

        Err(ExtractionError::UnsupportedType(mime_type.to_string()))
    }
}
