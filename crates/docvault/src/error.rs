use std::path::PathBuf;
use thiserror::Error;

use crate::generation::GenerationError;

#[derive(Error, Debug)]
pub enum DocvaultError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Document with ID {0} not found")]
    NotFound(String),

    #[error("Uploads need the processing pipeline, which is not running")]
    ProcessingUnavailable,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Rejections of caller-supplied parameters. Nothing is persisted when one
/// of these is returned.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File is too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("File type {0} not supported")]
    UnsupportedMediaType(String),

    #[error("Declared size {declared} does not match received {actual} bytes")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("Original file name is required")]
    MissingFileName,

    #[error("Page must be at least 1")]
    InvalidPage,

    #[error("Limit must be between 1 and {max}, got {value}")]
    InvalidLimit { value: u32, max: u32 },

    #[error("Unsupported sort field '{0}' (expected uploadedAt, originalName or size)")]
    InvalidSortField(String),

    #[error("Unsupported sort order '{0}' (expected ASC or DESC)")]
    InvalidSortOrder(String),
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Failed to parse {kind} document: {source}")]
    ParseFailure {
        kind: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ExtractionError {
    pub(crate) fn parse<E>(kind: &'static str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::ParseFailure {
            kind,
            source: source.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete file '{path}': {source}")]
    DeleteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored file not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Pipeline queue is closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, DocvaultError>;
