use crate::error::ExtractionError;
use crate::processor::{DocumentProcessor, MediaKind};

pub struct TextProcessor;

impl TextProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentProcessor for TextProcessor {
    /// Decodes as UTF-8. Invalid sequences become U+FFFD instead of failing.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let text = String::from_utf8_lossy(bytes);
        if let std::borrow::Cow::Owned(_) = text {
            tracing::debug!("text upload contained invalid UTF-8; replaced lossily");
        }
        Ok(text.into_owned())
    }

    fn supports(&self, kind: MediaKind) -> bool {
        matches!(kind, MediaKind::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_text_only() {
        let processor = TextProcessor::new();
        assert!(processor.supports(MediaKind::Text));
        assert!(!processor.supports(MediaKind::Pdf));
        assert!(!processor.supports(MediaKind::Word));
    }

    #[test]
    fn test_extract_verbatim() {
        let processor = TextProcessor::new();
        let input = "Line one\r\n  indented\ttab\nÜnïcödé ✓\n";
        assert_eq!(processor.extract(input.as_bytes()).unwrap(), input);
    }

    #[test]
    fn test_extract_empty() {
        let processor = TextProcessor::new();
        assert_eq!(processor.extract(b"").unwrap(), "");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let processor = TextProcessor::new();
        let text = processor.extract(b"ok \xff\xfe end").unwrap();
        assert!(text.starts_with("ok "));
        assert!(text.ends_with(" end"));
        assert!(text.contains('\u{FFFD}'));
    }
}
