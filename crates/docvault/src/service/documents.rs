use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::db::{document_repo, Database};
use crate::document::{Document, DocumentDetail, DocumentSummary, ProcessingRecord};
use crate::error::{DocvaultError, Result, StorageError};
use crate::sanitize;
use crate::storage::BlobStore;
use crate::worker::PipelineQueue;

use super::pagination::{Page, PageMeta, PageQuery};
use super::upload::UploadRequest;

/// Raw bytes of an upload plus what is needed to serve them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    pub original_name: String,
    pub mime_type: String,
}

/// Upload, listing, lookup, delete and download of documents.
///
/// A service built with [`DocumentService::read_only`] has no queue and
/// rejects uploads; everything else works the same.
pub struct DocumentService {
    db: Database,
    storage: Arc<dyn BlobStore>,
    queue: Option<Arc<PipelineQueue>>,
    limits: UploadConfig,
}

impl DocumentService {
    pub fn new(
        db: Database,
        storage: Arc<dyn BlobStore>,
        queue: Arc<PipelineQueue>,
        limits: UploadConfig,
    ) -> Self {
        Self {
            db,
            storage,
            queue: Some(queue),
            limits,
        }
    }

    pub fn read_only(db: Database, storage: Arc<dyn BlobStore>, limits: UploadConfig) -> Self {
        Self {
            db,
            storage,
            queue: None,
            limits,
        }
    }

    /// Stores an upload, records it as PENDING and schedules its pipeline
    /// run. Returns as soon as both rows are written.
    pub fn submit(&self, request: UploadRequest) -> Result<DocumentDetail> {
        request.validate(&self.limits)?;
        let queue = self
            .queue
            .as_ref()
            .ok_or(DocvaultError::ProcessingUnavailable)?;

        let id = Uuid::new_v4().to_string();
        let filename = format!(
            "{}{}",
            Uuid::new_v4(),
            sanitize::storage_extension(&request.original_name, &request.mime_type)
        );
        let _span = info_span!(
            "submit",
            document_id = %id,
            filename = %sanitize::redact_filename(&request.original_name),
        )
        .entered();

        let location = self.storage.save(&filename, &request.bytes)?;

        let document = Document {
            id,
            filename,
            original_name: request.original_name,
            mime_type: request.mime_type,
            size: request.size,
            storage_key: location.display().to_string(),
            // Stored with millisecond precision.
            uploaded_at: Utc::now().trunc_subsecs(3),
        };

        if let Err(e) = document_repo::insert_with_record(&self.db, &document) {
            match self.storage.delete(&document.filename) {
                Ok(()) => debug!("removed blob of failed upload"),
                Err(cleanup) => warn!(error = %cleanup, "failed to remove blob of failed upload"),
            }
            return Err(e.into());
        }

        if let Err(e) = queue.enqueue(&document.id) {
            warn!(error = %e, "document stored but its pipeline run was not scheduled");
        }

        info!(size = document.size, mime_type = %document.mime_type, "document uploaded");
        Ok(DocumentDetail {
            content: ProcessingRecord::pending(&document.id),
            document,
        })
    }

    pub fn list(&self, query: PageQuery) -> Result<Page<DocumentSummary>> {
        let (data, total) = document_repo::find_page(&self.db, &query)?;
        Ok(Page {
            data,
            meta: PageMeta::new(query.page(), query.limit(), total),
        })
    }

    /// The document with its processing record and artifacts.
    pub fn get(&self, id: &str) -> Result<DocumentDetail> {
        document_repo::find_detail(&self.db, id)?
            .ok_or_else(|| DocvaultError::NotFound(id.to_string()))
    }

    /// Removes the document and its record. The blob is removed best-effort.
    pub fn delete(&self, id: &str) -> Result<()> {
        let document = document_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| DocvaultError::NotFound(id.to_string()))?;

        if let Err(e) = self.storage.delete(&document.filename) {
            warn!(document_id = %id, error = %e, "failed to delete stored file");
        }

        if !document_repo::delete(&self.db, id)? {
            return Err(DocvaultError::NotFound(id.to_string()));
        }
        info!(document_id = %id, "document deleted");
        Ok(())
    }

    pub fn download(&self, id: &str) -> Result<DownloadedFile> {
        let document = document_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| DocvaultError::NotFound(id.to_string()))?;

        let bytes = match self.storage.fetch(&document.filename) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => {
                warn!(document_id = %id, "stored file is missing");
                return Err(DocvaultError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(DownloadedFile {
            bytes,
            original_name: document.original_name,
            mime_type: document.mime_type,
        })
    }
}
