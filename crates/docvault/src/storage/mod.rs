//! Raw byte storage for uploaded files.

use std::path::PathBuf;

use crate::error::StorageError;

pub mod filesystem;

pub use filesystem::FileStorage;

/// Blob store keyed by generated storage keys.
///
/// Implementations must never overwrite an existing blob and must report a
/// missing key as [`StorageError::NotFound`].
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under `key` and returns the location they were written to.
    fn save(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, StorageError>;

    fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    fn delete(&self, key: &str) -> Result<(), StorageError>;
}
