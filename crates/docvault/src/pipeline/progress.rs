use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::status::RunPhase;

/// Events emitted by a pipeline run. Artifacts are not included (they can
/// be large); read them from the record once the run completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Phase { phase: RunPhase, message: String },
    Completed,
    Failed { error: String },
    Skipped,
}

impl ProgressEvent {
    /// True for the last event a run emits.
    pub fn is_final(&self) -> bool {
        !matches!(self, ProgressEvent::Phase { .. })
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards every event.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// A progress event tagged with its document, as published to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub document_id: String,
    pub event: ProgressEvent,
    pub timestamp: DateTime<Utc>,
}

/// Publishes one document's events on a broadcast channel.
pub struct BroadcastProgress {
    document_id: String,
    sender: broadcast::Sender<RunEvent>,
}

impl BroadcastProgress {
    pub fn new(document_id: impl Into<String>, sender: broadcast::Sender<RunEvent>) -> Self {
        Self {
            document_id: document_id.into(),
            sender,
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        // Sending only fails when nobody is subscribed.
        let _ = self.sender.send(RunEvent {
            document_id: self.document_id.clone(),
            event,
            timestamp: Utc::now(),
        });
    }
}
