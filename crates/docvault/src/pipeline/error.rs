use thiserror::Error;

use crate::engine::Artifact;
use crate::generation::GenerationError;

/// Why a pipeline run failed. The `Display` text is what gets stored as the
/// record's error message.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Extraction(#[from] crate::error::ExtractionError),

    #[error("Failed to generate {artifact}: {source}")]
    Generation {
        artifact: Artifact,
        #[source]
        source: GenerationError,
    },

    #[error("Failed to read uploaded file: {0}")]
    Storage(#[from] crate::error::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Document {0} no longer exists")]
    DocumentMissing(String),

    #[error("Background task failed: {0}")]
    TaskPanicked(String),
}
