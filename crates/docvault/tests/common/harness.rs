//! Test harness for isolated end-to-end runs.
//!
//! Each `TestHarness` owns a temp directory for blobs, an in-memory
//! database and a `ScriptedGenerator`, wired together through
//! `Docvault::with_parts`. It must be created inside a tokio runtime.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use docvault::config::Config;
use docvault::document::{DocumentDetail, ProcessingStatus};
use docvault::generation::{GenerationError, Generator};
use docvault::service::{DocumentService, UploadRequest};
use docvault::storage::FileStorage;
use docvault::{Database, Docvault};

/// How long `wait_for_*` helpers poll before giving up.
const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// A `Generator` double. Answers `Generated text #<n>` for the n-th prompt,
/// records every prompt, and fails prompts that contain a configured marker.
pub struct ScriptedGenerator {
    prompts: Mutex<Vec<String>>,
    failures: Vec<(String, GenerationError)>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            failures: Vec::new(),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Prompts containing `marker` fail with `error`.
    pub fn fail_when(mut self, marker: &str, error: GenerationError) -> Self {
        self.failures.push((marker.to_string(), error));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn prompts_containing(&self, needle: &str) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| p.contains(needle))
            .collect()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let n = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        for (marker, error) in &self.failures {
            if prompt.contains(marker.as_str()) {
                return Err(error.clone());
            }
        }
        Ok(format!("Generated text #{}", n))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

/// Isolated docvault instance for integration tests.
pub struct TestHarness {
    temp_dir: TempDir,
    pub storage_dir: PathBuf,
    pub config: Config,
    pub db: Database,
    pub generator: Arc<ScriptedGenerator>,
    pub app: Docvault,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(Config::default(), ScriptedGenerator::new())
    }

    pub fn with_generator(generator: ScriptedGenerator) -> Self {
        Self::build(Config::default(), generator)
    }

    /// Wires a harness from `config`; its storage directory is replaced by
    /// a fresh temp directory.
    pub fn build(mut config: Config, generator: ScriptedGenerator) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let storage_dir = temp_dir.path().join("uploads");
        config.storage_directory = storage_dir.display().to_string();

        let db = Database::open_in_memory().expect("Failed to open database");
        let generator = Arc::new(generator);
        let app = Docvault::with_parts(
            &config,
            db.clone(),
            Arc::new(FileStorage::new(&storage_dir)),
            generator.clone(),
        );

        Self {
            temp_dir,
            storage_dir,
            config,
            db,
            generator,
            app,
        }
    }

    pub fn documents(&self) -> &DocumentService {
        self.app.documents()
    }

    pub fn upload(&self, name: &str, mime_type: &str, bytes: &[u8]) -> DocumentDetail {
        self.documents()
            .submit(UploadRequest::new(bytes.to_vec(), name, mime_type))
            .expect("Upload failed")
    }

    pub fn upload_text(&self, name: &str, text: &str) -> DocumentDetail {
        self.upload(name, "text/plain", text.as_bytes())
    }

    /// Polls until the document's record is COMPLETED or FAILED.
    pub async fn wait_for_terminal(&self, id: &str) -> DocumentDetail {
        self.wait_for_status(id, |s| s.is_terminal()).await
    }

    pub async fn wait_for_status(
        &self,
        id: &str,
        accept: impl Fn(ProcessingStatus) -> bool,
    ) -> DocumentDetail {
        let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
        loop {
            let detail = self.documents().get(id).expect("Document lookup failed");
            if accept(detail.content.status) {
                return detail;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!(
                    "Timed out waiting for document {} (status {})",
                    id, detail.content.status
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Files currently in the storage directory.
    pub fn stored_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.storage_dir) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn blob_path(&self, detail: &DocumentDetail) -> PathBuf {
        self.storage_dir.join(&detail.document.filename)
    }
}
