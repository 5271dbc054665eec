//! Processing record transitions.
//!
//! Every write here is a single conditional `UPDATE`, so the status can only
//! move forward and only the run holding the lease can finish a record.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::document_repo::RecordRow;
use super::{format_timestamp, Database, DatabaseError};
use crate::document::{ProcessingRecord, ProcessingStatus};

/// Finds the processing record for a document.
pub fn find(db: &Database, document_id: &str) -> Result<Option<ProcessingRecord>, DatabaseError> {
    let row = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM processing_records WHERE document_id = ?1",
                params![document_id],
                RecordRow::from_row,
            )
            .optional()?)
    })?;
    row.map(RecordRow::into_record).transpose()
}

/// Status a record must hold for a write that moves it to `next`.
fn guard_for(next: ProcessingStatus) -> Result<&'static str, DatabaseError> {
    ProcessingStatus::predecessor_of(next)
        .map(|status| status.as_str())
        .ok_or(DatabaseError::IllegalTransition(next))
}

/// Moves a PENDING record to PROCESSING and stamps `lease_token` on it.
///
/// Returns `false` when the record is missing or no longer PENDING, meaning
/// another run owns (or already finished) this document.
pub fn try_acquire_lease(
    db: &Database,
    document_id: &str,
    lease_token: &str,
) -> Result<bool, DatabaseError> {
    let required = guard_for(ProcessingStatus::Processing)?;
    let now = format_timestamp(&Utc::now());
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE processing_records
             SET status = ?2, lease_token = ?3, updated_at = ?4
             WHERE document_id = ?1 AND status = ?5",
            params![
                document_id,
                ProcessingStatus::Processing.as_str(),
                lease_token,
                now,
                required,
            ],
        )?;
        Ok(affected == 1)
    })
}

/// PROCESSING -> COMPLETED for the lease holder.
pub fn complete(
    db: &Database,
    document_id: &str,
    lease_token: &str,
    summary: &str,
    markdown: &str,
    processed_at: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let required = guard_for(ProcessingStatus::Completed)?;
    let processed_at = format_timestamp(&processed_at);
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE processing_records
             SET status = ?3, summary = ?4, markdown = ?5, processed_at = ?6,
                 error_message = NULL, updated_at = ?6
             WHERE document_id = ?1 AND lease_token = ?2 AND status = ?7",
            params![
                document_id,
                lease_token,
                ProcessingStatus::Completed.as_str(),
                summary,
                markdown,
                processed_at,
                required,
            ],
        )?;
        Ok(affected == 1)
    })
}

/// PROCESSING -> FAILED for the lease holder. Artifacts are cleared.
pub fn fail(
    db: &Database,
    document_id: &str,
    lease_token: &str,
    error_message: &str,
) -> Result<bool, DatabaseError> {
    let required = guard_for(ProcessingStatus::Failed)?;
    let now = format_timestamp(&Utc::now());
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE processing_records
             SET status = ?3, error_message = ?4, summary = NULL, markdown = NULL,
                 updated_at = ?5
             WHERE document_id = ?1 AND lease_token = ?2 AND status = ?6",
            params![
                document_id,
                lease_token,
                ProcessingStatus::Failed.as_str(),
                error_message,
                now,
                required,
            ],
        )?;
        Ok(affected == 1)
    })
}
