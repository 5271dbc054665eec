//! Helpers for keeping user-supplied names out of span attributes and
//! deriving safe storage keys from them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Longest extension carried over from an uploaded file name.
const MAX_EXTENSION_LEN: usize = 10;

/// Replaces a file name with `<hash>.<ext>` for span fields, so logs can
/// correlate uploads without recording what the user called them.
pub fn redact_filename(name: &str) -> String {
    let hash = hash_name(name);
    match file_extension(name) {
        Some(ext) => format!("{}{}", &hash[..8], ext),
        None => hash[..8].to_string(),
    }
}

/// Short deterministic hash of a name for correlation.
pub fn hash_name(name: &str) -> String {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Returns the lower-cased extension of `name` including the leading dot,
/// or `None` when it is missing or contains anything but ASCII alphanumerics.
pub fn file_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

/// Extension for a new blob: the uploaded name's extension when usable,
/// otherwise the first extension registered for the declared media type.
pub fn storage_extension(original_name: &str, mime_type: &str) -> String {
    file_extension(original_name)
        .or_else(|| {
            mime_guess::get_mime_extensions_str(mime_type)
                .and_then(|exts| exts.first())
                .map(|ext| format!(".{}", ext))
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("report.PDF").as_deref(), Some(".pdf"));
        assert_eq!(file_extension("notes.txt").as_deref(), Some(".txt"));
        assert_eq!(file_extension("archive.tar.gz").as_deref(), Some(".gz"));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("weird.p/df"), None);
        assert_eq!(file_extension("evil.ex e"), None);
    }

    #[test]
    fn test_storage_extension_prefers_original_name() {
        assert_eq!(storage_extension("thesis.docx", "application/pdf"), ".docx");
    }

    #[test]
    fn test_storage_extension_falls_back_to_mime() {
        assert_eq!(storage_extension("scan", "application/pdf"), ".pdf");
        assert_eq!(storage_extension("scan", "application/x-unknown-thing"), "");
    }

    #[test]
    fn test_redact_filename_hides_name() {
        let redacted = redact_filename("Salary negotiation 2026.pdf");
        assert!(!redacted.contains("Salary"));
        assert!(redacted.ends_with(".pdf"));
        assert_eq!(redacted.len(), 12);
    }

    #[test]
    fn test_hash_name_deterministic() {
        assert_eq!(hash_name("a.txt"), hash_name("a.txt"));
        assert_ne!(hash_name("a.txt"), hash_name("b.txt"));
        assert_eq!(hash_name("a.txt").len(), 16);
    }
}
