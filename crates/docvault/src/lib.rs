pub mod app;
pub mod config;
pub mod db;
pub mod document;
pub mod engine;
pub mod error;
pub mod generation;
pub mod logging;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod secrets;
pub mod service;
pub mod storage;
pub mod worker;

pub use app::{open_documents, Docvault};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use document::{Document, DocumentDetail, DocumentSummary, ProcessingRecord, ProcessingStatus};
pub use error::{
    ConfigError, DocvaultError, ExtractionError, Result, StorageError, ValidationError, WorkerError,
};
pub use generation::{GenerationError, Generator};
pub use pipeline::{Pipeline, RunEvent, RunOutcome};
pub use secrets::{resolve_secret, SecretError};
pub use service::{DocumentService, DownloadedFile, PageQuery, UploadRequest};
pub use worker::PipelineQueue;
