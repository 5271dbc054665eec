use serde::{Deserialize, Serialize};

/// Step a run is in while its record is PROCESSING.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Extracting,
    Generating,
    Finalizing,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Extracting => write!(f, "Extracting text"),
            RunPhase::Generating => write!(f, "Generating summary and markdown"),
            RunPhase::Finalizing => write!(f, "Saving results"),
        }
    }
}

/// What a single call to `Pipeline::run` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Record moved to COMPLETED.
    Completed,
    /// Record moved to FAILED with `error` as its message.
    Failed { error: String },
    /// The lease was not available; the record was left untouched.
    Skipped,
    /// The run could not write its result (database failure, or the
    /// record vanished under the lease).
    Unrecorded { error: String },
}
