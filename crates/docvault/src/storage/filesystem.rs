use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::BlobStore;
use crate::error::StorageError;

/// Stores blobs as flat files inside one directory.
pub struct FileStorage {
    directory: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn ensure_directory(&self) -> Result<(), StorageError> {
        if !self.directory.exists() {
            std::fs::create_dir_all(&self.directory).map_err(|e| {
                StorageError::CreateDirectory {
                    path: self.directory.clone(),
                    source: e,
                }
            })?;
        }
        Ok(())
    }

    /// Resolves a key to a path inside the storage directory. Keys are single
    /// file names; anything that could escape the directory is rejected.
    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let invalid = key.is_empty()
            || key == "."
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
            || key.contains('\0');
        if invalid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.directory.join(key))
    }
}

impl BlobStore for FileStorage {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.path_for(key)?;
        self.ensure_directory()?;

        // create_new fails if the file exists, so a key is never overwritten.
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::FileExists(path));
            }
            Err(e) => return Err(StorageError::WriteFile { path, source: e }),
        };

        if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
            drop(file);
            if let Err(cleanup) = std::fs::remove_file(&path) {
                log::warn!(
                    "Failed to remove partial blob {}: {}",
                    path.display(),
                    cleanup
                );
            }
            return Err(StorageError::WriteFile { path, source: e });
        }

        log::debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }

    fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::ReadFile { path, source: e },
        })
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::remove_file(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::DeleteFile { path, source: e },
        })?;
        log::debug!("Deleted blob {}", key);
        Ok(())
    }
}
