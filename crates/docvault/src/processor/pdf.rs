use crate::error::ExtractionError;
use crate::processor::{DocumentProcessor, MediaKind};

/// Reads the text layer of a PDF. Layout is discarded; no OCR is attempted.
pub struct PdfProcessor;

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentProcessor for PdfProcessor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let _span = tracing::info_span!("processor.pdf", bytes = bytes.len()).entered();

        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| ExtractionError::parse("PDF", e.to_string()))?;

        extract_text_from_pdf(&doc)
    }

    fn supports(&self, kind: MediaKind) -> bool {
        matches!(kind, MediaKind::Pdf)
    }
}

/// Concatenates page text in page order. Pages whose content cannot be
/// decoded are skipped, unless no page could be read at all.
fn extract_text_from_pdf(doc: &lopdf::Document) -> Result<String, ExtractionError> {
    let pages = doc.get_pages();
    let mut text = String::new();
    let mut last_error = None;
    let mut readable = 0usize;

    for page_num in pages.keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => {
                readable += 1;
                text.push_str(&page_text);
                if !page_text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Err(e) => {
                tracing::debug!(page = page_num, error = %e, "skipping unreadable PDF page");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if readable == 0 => Err(ExtractionError::parse("PDF", e.to_string())),
        _ => Ok(text),
    }
}
