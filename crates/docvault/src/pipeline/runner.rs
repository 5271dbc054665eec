use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::db::{document_repo, record_repo, Database, DatabaseError};
use crate::document::Document;
use crate::engine::{ArtifactEngine, Artifacts};
use crate::processor::ProcessorRegistry;
use crate::sanitize;
use crate::storage::BlobStore;

use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter};
use super::status::{RunOutcome, RunPhase};

/// Drives one document from PENDING to COMPLETED or FAILED.
pub struct Pipeline {
    db: Database,
    storage: Arc<dyn BlobStore>,
    processor: Arc<ProcessorRegistry>,
    engine: ArtifactEngine,
}

impl Pipeline {
    pub fn new(
        db: Database,
        storage: Arc<dyn BlobStore>,
        processor: Arc<ProcessorRegistry>,
        engine: ArtifactEngine,
    ) -> Self {
        Self {
            db,
            storage,
            processor,
            engine,
        }
    }

    /// Runs the pipeline for `document_id`.
    ///
    /// The run first takes the document's lease; if another run holds it (or
    /// the record is no longer PENDING) nothing is touched and
    /// [`RunOutcome::Skipped`] is returned. Errors never escape: they end up
    /// in the record's error message, or in the outcome when the record
    /// itself cannot be written.
    pub async fn run(&self, document_id: &str, progress: &dyn ProgressReporter) -> RunOutcome {
        self.run_leased(document_id, progress)
            .instrument(info_span!("pipeline", document_id = %document_id))
            .await
    }

    async fn run_leased(&self, document_id: &str, progress: &dyn ProgressReporter) -> RunOutcome {
        let lease = Uuid::new_v4().to_string();
        let acquired = {
            let (id, lease) = (document_id.to_string(), lease.clone());
            self.with_db(move |db| record_repo::try_acquire_lease(db, &id, &lease))
                .await
        };
        match acquired {
            Ok(true) => debug!("lease acquired"),
            Ok(false) => {
                debug!("lease not available, skipping run");
                progress.report(ProgressEvent::Skipped);
                return RunOutcome::Skipped;
            }
            Err(e) => {
                error!(error = %e, "failed to acquire lease");
                let error = e.to_string();
                progress.report(ProgressEvent::Failed {
                    error: error.clone(),
                });
                return RunOutcome::Unrecorded { error };
            }
        }

        let produced = self.produce(document_id, progress).await;

        progress.report(ProgressEvent::Phase {
            phase: RunPhase::Finalizing,
            message: RunPhase::Finalizing.to_string(),
        });
        let outcome = async {
            match produced {
                Ok(artifacts) => self.record_success(document_id, lease, artifacts).await,
                Err(e) => self.record_failure(document_id, lease, e).await,
            }
        }
        .instrument(info_span!("finalize"))
        .await;

        match &outcome {
            RunOutcome::Completed => progress.report(ProgressEvent::Completed),
            RunOutcome::Failed { error } | RunOutcome::Unrecorded { error } => {
                progress.report(ProgressEvent::Failed {
                    error: error.clone(),
                })
            }
            RunOutcome::Skipped => {}
        }
        outcome
    }

    /// Extraction followed by both generation branches.
    async fn produce(
        &self,
        document_id: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<Artifacts, PipelineError> {
        let id = document_id.to_string();
        let document = self
            .with_db(move |db| document_repo::find_by_id(db, &id))
            .await?
            .ok_or_else(|| PipelineError::DocumentMissing(document_id.to_string()))?;

        progress.report(ProgressEvent::Phase {
            phase: RunPhase::Extracting,
            message: RunPhase::Extracting.to_string(),
        });
        let text = self.extract(document).await?;

        progress.report(ProgressEvent::Phase {
            phase: RunPhase::Generating,
            message: RunPhase::Generating.to_string(),
        });
        self.engine
            .generate_artifacts(&text)
            .await
            .into_artifacts()
            .map_err(|(artifact, source)| PipelineError::Generation { artifact, source })
    }

    /// Fetches the blob and extracts its text on the blocking pool.
    async fn extract(&self, document: Document) -> Result<String, PipelineError> {
        let storage = Arc::clone(&self.storage);
        let processor = Arc::clone(&self.processor);
        let span = info_span!(
            "extract",
            filename = %sanitize::redact_filename(&document.original_name),
            mime_type = %document.mime_type,
            size = document.size,
        );

        tokio::task::spawn_blocking(move || {
            let _step = span.entered();
            let bytes = storage.fetch(&document.filename)?;
            let text = processor.extract(&bytes, &document.mime_type)?;
            debug!(chars = text.chars().count(), "text extracted");
            Ok::<_, PipelineError>(text)
        })
        .await
        .map_err(|e| PipelineError::TaskPanicked(e.to_string()))?
    }

    /// Runs a database call on the blocking pool, inside the current span.
    async fn with_db<T, F>(&self, f: F) -> Result<T, PipelineError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, DatabaseError> + Send + 'static,
    {
        let db = self.db.clone();
        let span = Span::current();
        let result = tokio::task::spawn_blocking(move || span.in_scope(|| f(&db)))
            .await
            .map_err(|e| PipelineError::TaskPanicked(e.to_string()))?;
        Ok(result?)
    }

    async fn record_success(
        &self,
        document_id: &str,
        lease: String,
        artifacts: Artifacts,
    ) -> RunOutcome {
        let id = document_id.to_string();
        let stored = self
            .with_db(move |db| {
                record_repo::complete(
                    db,
                    &id,
                    &lease,
                    &artifacts.summary,
                    &artifacts.markdown,
                    Utc::now(),
                )
            })
            .await;

        match stored {
            Ok(true) => {
                info!("document processed");
                RunOutcome::Completed
            }
            Ok(false) => {
                warn!("record changed under the lease, result discarded");
                RunOutcome::Unrecorded {
                    error: format!("Processing record for {} is no longer leased", document_id),
                }
            }
            Err(e) => {
                error!(error = %e, "failed to store artifacts");
                RunOutcome::Unrecorded {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn record_failure(
        &self,
        document_id: &str,
        lease: String,
        cause: PipelineError,
    ) -> RunOutcome {
        let message = cause.to_string();
        warn!(error = %message, "document processing failed");

        let (id, stored_message) = (document_id.to_string(), message.clone());
        let stored = self
            .with_db(move |db| record_repo::fail(db, &id, &lease, &stored_message))
            .await;

        match stored {
            Ok(true) => RunOutcome::Failed { error: message },
            Ok(false) => {
                warn!("record changed under the lease, failure not stored");
                RunOutcome::Unrecorded { error: message }
            }
            Err(e) => {
                error!(error = %e, "failed to store failure");
                RunOutcome::Unrecorded { error: message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::document::ProcessingStatus;
    use crate::generation::{GenerationError, Generator};
    use crate::pipeline::progress::NoopProgress;
    use crate::storage::FileStorage;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    struct FixedGenerator {
        failure: Option<GenerationError>,
    }

    #[async_trait]
    impl Generator for FixedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            match &self.failure {
                Some(err) if prompt.contains("concise summary") => Err(err.clone()),
                _ => Ok(format!("generated {} chars", prompt.len())),
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed-1"
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct Fixture {
        _dir: TempDir,
        db: Database,
        storage: Arc<FileStorage>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let storage = Arc::new(FileStorage::new(dir.path()));
            Self {
                db: Database::open_in_memory().unwrap(),
                storage,
                _dir: dir,
            }
        }

        fn pipeline(&self, failure: Option<GenerationError>) -> Pipeline {
            let engine = ArtifactEngine::new(
                Arc::new(FixedGenerator { failure }),
                GenerationConfig::default(),
            );
            Pipeline::new(
                self.db.clone(),
                self.storage.clone(),
                Arc::new(ProcessorRegistry::new()),
                engine,
            )
        }

        fn upload(&self, id: &str, mime_type: &str, bytes: Option<&[u8]>) {
            let filename = format!("{}.bin", id);
            let storage_key = match bytes {
                Some(bytes) => self.storage.save(&filename, bytes).unwrap(),
                None => self.storage.directory().join(&filename),
            };
            let document = Document {
                id: id.to_string(),
                filename,
                original_name: "notes.txt".to_string(),
                mime_type: mime_type.to_string(),
                size: bytes.map(|b| b.len() as u64).unwrap_or(0),
                storage_key: storage_key.display().to_string(),
                uploaded_at: Utc::now(),
            };
            document_repo::insert_with_record(&self.db, &document).unwrap();
        }

        fn record(&self, id: &str) -> crate::document::ProcessingRecord {
            record_repo::find(&self.db, id).unwrap().unwrap()
        }
    }

    #[tokio::test]
    async fn test_run_completes_and_reports_phases() {
        let fixture = Fixture::new();
        fixture.upload("doc-1", "text/plain", Some(b"hello world"));
        let progress = RecordingProgress::default();

        let outcome = fixture.pipeline(None).run("doc-1", &progress).await;
        assert_eq!(outcome, RunOutcome::Completed);

        let record = fixture.record("doc-1");
        assert_eq!(record.status, ProcessingStatus::Completed);
        assert!(record.summary.is_some());
        assert!(record.markdown.is_some());
        assert!(record.processed_at.is_some());
        assert!(record.error_message.is_none());

        let events = progress.events.lock().unwrap().clone();
        let phases: Vec<RunPhase> = events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Phase { phase, .. } => Some(*phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![RunPhase::Extracting, RunPhase::Generating, RunPhase::Finalizing]
        );
        assert_eq!(events.last(), Some(&ProgressEvent::Completed));
    }

    #[tokio::test]
    async fn test_generation_failure_marks_failed() {
        let fixture = Fixture::new();
        fixture.upload("doc-1", "text/plain", Some(b"hello world"));

        let outcome = fixture
            .pipeline(Some(GenerationError::RateLimited("too many requests".into())))
            .run("doc-1", &NoopProgress)
            .await;

        let record = fixture.record("doc-1");
        assert_eq!(record.status, ProcessingStatus::Failed);
        assert!(record.summary.is_none());
        assert!(record.markdown.is_none());
        let message = record.error_message.unwrap();
        assert!(message.starts_with("Failed to generate summary"), "got {}", message);
        assert_eq!(outcome, RunOutcome::Failed { error: message });
    }

    #[tokio::test]
    async fn test_missing_blob_marks_failed() {
        let fixture = Fixture::new();
        fixture.upload("doc-1", "text/plain", None);

        let outcome = fixture.pipeline(None).run("doc-1", &NoopProgress).await;
        match outcome {
            RunOutcome::Failed { error } => {
                assert!(error.starts_with("Failed to read uploaded file"), "got {}", error)
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert_eq!(fixture.record("doc-1").status, ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn test_unsupported_type_marks_failed() {
        let fixture = Fixture::new();
        fixture.upload("doc-1", "image/png", Some(b"\x89PNG"));

        fixture.pipeline(None).run("doc-1", &NoopProgress).await;
        let record = fixture.record("doc-1");
        assert_eq!(record.status, ProcessingStatus::Failed);
        assert_eq!(
            record.error_message.as_deref(),
            Some("Unsupported file type: image/png")
        );
    }

    #[tokio::test]
    async fn test_second_run_is_skipped() {
        let fixture = Fixture::new();
        fixture.upload("doc-1", "text/plain", Some(b"hello world"));
        let pipeline = fixture.pipeline(None);

        assert_eq!(pipeline.run("doc-1", &NoopProgress).await, RunOutcome::Completed);
        let before = fixture.record("doc-1");

        let progress = RecordingProgress::default();
        assert_eq!(pipeline.run("doc-1", &progress).await, RunOutcome::Skipped);
        assert_eq!(fixture.record("doc-1"), before);
        assert_eq!(
            progress.events.lock().unwrap().clone(),
            vec![ProgressEvent::Skipped]
        );
    }

    #[tokio::test]
    async fn test_unknown_document_is_skipped() {
        let fixture = Fixture::new();
        let outcome = fixture.pipeline(None).run("missing", &NoopProgress).await;
        assert_eq!(outcome, RunOutcome::Skipped);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_database_waits_leave_the_runtime_free() {
        let fixture = Fixture::new();
        fixture.upload("doc-1", "text/plain", Some(b"hello world"));
        let pipeline = fixture.pipeline(None);

        // Another thread holds the connection while the run starts.
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let db = fixture.db.clone();
        let holder = std::thread::spawn(move || {
            db.with_conn(|_| {
                locked_tx.send(()).unwrap();
                std::thread::sleep(Duration::from_millis(400));
                Ok(())
            })
            .unwrap();
        });
        locked_rx.recv().unwrap();

        let started = Instant::now();
        let (outcome, ticked) = tokio::join!(pipeline.run("doc-1", &NoopProgress), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            started.elapsed()
        });
        holder.join().unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert!(ticked < Duration::from_millis(300), "timer fired after {:?}", ticked);
    }
}
