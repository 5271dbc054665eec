use crate::config::UploadConfig;
use crate::error::ValidationError;

/// An upload as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub original_name: String,
    pub mime_type: String,
    /// Size the caller declared, in bytes.
    pub size: u64,
}

impl UploadRequest {
    /// Builds a request whose declared size is the length of `bytes`.
    pub fn new(bytes: Vec<u8>, original_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        let size = bytes.len() as u64;
        Self {
            bytes,
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            size,
        }
    }

    /// Checks the request against the upload limits. Nothing has been
    /// written when this fails.
    pub fn validate(&self, limits: &UploadConfig) -> Result<(), ValidationError> {
        if self.original_name.trim().is_empty() {
            return Err(ValidationError::MissingFileName);
        }

        let actual = self.bytes.len() as u64;
        let largest = self.size.max(actual);
        if largest > limits.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size: largest,
                max: limits.max_file_size,
            });
        }

        if !is_allowed(&self.mime_type, &limits.allowed_mime_types) {
            return Err(ValidationError::UnsupportedMediaType(self.mime_type.clone()));
        }

        if self.size != actual {
            return Err(ValidationError::SizeMismatch {
                declared: self.size,
                actual,
            });
        }

        Ok(())
    }
}

/// Matches the type's essence (parameters dropped) case-insensitively.
fn is_allowed(mime_type: &str, allowed: &[String]) -> bool {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    allowed.iter().any(|a| a.eq_ignore_ascii_case(essence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{MIB, MIME_DOCX, MIME_PDF};

    fn limits() -> UploadConfig {
        UploadConfig::default()
    }

    #[test]
    fn test_accepts_allowed_types() {
        for mime in ["text/plain", MIME_PDF, "application/msword", MIME_DOCX] {
            let request = UploadRequest::new(b"data".to_vec(), "a.bin", mime);
            assert_eq!(request.validate(&limits()), Ok(()), "{}", mime);
        }
    }

    #[test]
    fn test_mime_parameters_and_case_ignored() {
        let request = UploadRequest::new(b"hi".to_vec(), "a.txt", "Text/Plain; charset=utf-8");
        assert_eq!(request.validate(&limits()), Ok(()));
    }

    #[test]
    fn test_rejects_unlisted_type() {
        let request = UploadRequest::new(b"\x89PNG".to_vec(), "a.png", "image/png");
        assert_eq!(
            request.validate(&limits()),
            Err(ValidationError::UnsupportedMediaType("image/png".into()))
        );
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let exact = UploadRequest::new(vec![b'a'; (10 * MIB) as usize], "big.txt", "text/plain");
        assert_eq!(exact.validate(&limits()), Ok(()));

        let over = UploadRequest::new(vec![b'a'; (10 * MIB) as usize + 1], "big.txt", "text/plain");
        assert_eq!(
            over.validate(&limits()),
            Err(ValidationError::FileTooLarge {
                size: 10 * MIB + 1,
                max: 10 * MIB
            })
        );
    }

    #[test]
    fn test_declared_size_must_match() {
        let mut request = UploadRequest::new(b"hello".to_vec(), "a.txt", "text/plain");
        request.size = 4;
        assert_eq!(
            request.validate(&limits()),
            Err(ValidationError::SizeMismatch {
                declared: 4,
                actual: 5
            })
        );
    }

    #[test]
    fn test_oversized_declaration_is_too_large() {
        let mut request = UploadRequest::new(b"hello".to_vec(), "a.txt", "text/plain");
        request.size = 20 * MIB;
        assert!(matches!(
            request.validate(&limits()),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_requires_name() {
        let request = UploadRequest::new(b"hello".to_vec(), "  ", "text/plain");
        assert_eq!(
            request.validate(&limits()),
            Err(ValidationError::MissingFileName)
        );
    }
}
