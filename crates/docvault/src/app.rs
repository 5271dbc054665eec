use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::db::{default_database_path, Database};
use crate::engine::ArtifactEngine;
use crate::error::{ConfigError, Result};
use crate::generation::{build_generator, Generator};
use crate::pipeline::{Pipeline, RunEvent};
use crate::processor::ProcessorRegistry;
use crate::service::DocumentService;
use crate::storage::{BlobStore, FileStorage};
use crate::worker::PipelineQueue;

/// A fully wired instance: persistence, storage, the generation backend,
/// the pipeline queue and the document service on top of them.
pub struct Docvault {
    pipeline: Arc<Pipeline>,
    queue: Arc<PipelineQueue>,
    documents: DocumentService,
}

impl Docvault {
    /// Builds every component from `config`. Must be called inside a tokio
    /// runtime because the pipeline queue is started immediately.
    pub fn from_config(config: &Config) -> Result<Self> {
        let generator = build_generator(&config.ai)?;
        let (db, storage) = open_stores(config)?;
        Ok(Self::with_parts(config, db, storage, generator))
    }

    /// Wires injected collaborators. Used by tests and embedders.
    pub fn with_parts(
        config: &Config,
        db: Database,
        storage: Arc<dyn BlobStore>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let engine = ArtifactEngine::new(generator, config.generation);
        let pipeline = Arc::new(Pipeline::new(
            db.clone(),
            Arc::clone(&storage),
            Arc::new(ProcessorRegistry::new()),
            engine,
        ));
        let queue = Arc::new(PipelineQueue::start(Arc::clone(&pipeline), &config.worker));
        let documents = DocumentService::new(
            db,
            storage,
            Arc::clone(&queue),
            config.upload.clone(),
        );

        Self {
            pipeline,
            queue,
            documents,
        }
    }

    pub fn documents(&self) -> &DocumentService {
        &self.documents
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn queue(&self) -> &PipelineQueue {
        &self.queue
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.queue.subscribe()
    }

    /// Shuts the queue down according to its policy.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}

/// Opens the database and blob storage only, without a generation backend
/// or pipeline queue. Listing, lookup, delete and download work; uploads are
/// rejected. Needs no API key and no runtime.
pub fn open_documents(config: &Config) -> Result<DocumentService> {
    let (db, storage) = open_stores(config)?;
    Ok(DocumentService::read_only(db, storage, config.upload.clone()))
}

fn open_stores(config: &Config) -> Result<(Database, Arc<dyn BlobStore>)> {
    let db_path = match &config.database_path {
        Some(path) => PathBuf::from(path),
        None => default_database_path().ok_or_else(|| ConfigError::Validation {
            message: "databasePath is not set and no home directory was found".to_string(),
        })?,
    };
    let db = Database::open(&db_path)?;
    let storage: Arc<dyn BlobStore> = Arc::new(FileStorage::new(&config.storage_directory));
    Ok((db, storage))
}
