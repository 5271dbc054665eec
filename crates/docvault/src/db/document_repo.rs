//! Document repository: CRUD for the `documents` table and the joined
//! processing record.

use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::document::{
    Document, DocumentDetail, DocumentSummary, ProcessingRecord, ProcessingStatus,
};
use crate::service::pagination::PageQuery;

/// A raw document row joined with its record's status.
#[derive(Debug, Clone)]
struct DocumentRow {
    id: String,
    filename: String,
    original_name: String,
    mime_type: String,
    size: i64,
    storage_key: String,
    uploaded_at: String,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            original_name: row.get("original_name")?,
            mime_type: row.get("mime_type")?,
            size: row.get("size")?,
            storage_key: row.get("storage_key")?,
            uploaded_at: row.get("uploaded_at")?,
        })
    }

    fn into_document(self) -> Result<Document, DatabaseError> {
        let size = u64::try_from(self.size).map_err(|_| DatabaseError::InvalidValue {
            column: "size",
            reason: format!("negative size {}", self.size),
        })?;
        Ok(Document {
            uploaded_at: parse_timestamp("uploaded_at", &self.uploaded_at)?,
            id: self.id,
            filename: self.filename,
            original_name: self.original_name,
            mime_type: self.mime_type,
            size,
            storage_key: self.storage_key,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordRow {
    document_id: String,
    status: String,
    summary: Option<String>,
    markdown: Option<String>,
    processed_at: Option<String>,
    error_message: Option<String>,
}

impl RecordRow {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            document_id: row.get("document_id")?,
            status: row.get("status")?,
            summary: row.get("summary")?,
            markdown: row.get("markdown")?,
            processed_at: row.get("processed_at")?,
            error_message: row.get("error_message")?,
        })
    }

    pub(crate) fn into_record(self) -> Result<ProcessingRecord, DatabaseError> {
        let processed_at = self
            .processed_at
            .as_deref()
            .map(|ts| parse_timestamp("processed_at", ts))
            .transpose()?;
        Ok(ProcessingRecord {
            status: parse_status(&self.status)?,
            document_id: self.document_id,
            summary: self.summary,
            markdown: self.markdown,
            processed_at,
            error_message: self.error_message,
        })
    }
}

fn parse_status(value: &str) -> Result<ProcessingStatus, DatabaseError> {
    value
        .parse()
        .map_err(|reason| DatabaseError::InvalidValue {
            column: "status",
            reason,
        })
}

fn to_sql_size(size: u64) -> Result<i64, DatabaseError> {
    i64::try_from(size).map_err(|_| DatabaseError::InvalidValue {
        column: "size",
        reason: format!("{} does not fit in an SQLite integer", size),
    })
}

/// Inserts a document together with its PENDING processing record in one
/// transaction. Either both rows exist afterwards or neither does.
pub fn insert_with_record(db: &Database, document: &Document) -> Result<(), DatabaseError> {
    let size = to_sql_size(document.size)?;
    let uploaded_at = format_timestamp(&document.uploaded_at);

    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO documents (id, filename, original_name, mime_type, size, storage_key, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                document.id,
                document.filename,
                document.original_name,
                document.mime_type,
                size,
                document.storage_key,
                uploaded_at,
            ],
        )?;
        tx.execute(
            "INSERT INTO processing_records (document_id, status, updated_at)
             VALUES (?1, ?2, ?3)",
            params![document.id, ProcessingStatus::Pending.as_str(), uploaded_at],
        )?;
        tx.commit()?;
        Ok(())
    })
}

/// Finds a document by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Document>, DatabaseError> {
    let row = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM documents WHERE id = ?1",
                params![id],
                DocumentRow::from_row,
            )
            .optional()?)
    })?;
    row.map(DocumentRow::into_document).transpose()
}

/// Finds a document together with its processing record.
pub fn find_detail(db: &Database, id: &str) -> Result<Option<DocumentDetail>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT d.*, r.document_id, r.status, r.summary, r.markdown,
                        r.processed_at, r.error_message
                 FROM documents d
                 JOIN processing_records r ON r.document_id = d.id
                 WHERE d.id = ?1",
                params![id],
                |row| Ok((DocumentRow::from_row(row)?, RecordRow::from_row(row)?)),
            )
            .optional()?)
    })?;

    rows.map(|(document, record)| {
        Ok(DocumentDetail {
            document: document.into_document()?,
            content: record.into_record()?,
        })
    })
    .transpose()
}

/// Returns one page of list items and the total number of documents.
pub fn find_page(
    db: &Database,
    query: &PageQuery,
) -> Result<(Vec<DocumentSummary>, u64), DatabaseError> {
    // Both fragments come from closed enums, never from caller input.
    let sql = format!(
        "SELECT d.*, r.status FROM documents d
         JOIN processing_records r ON r.document_id = d.id
         ORDER BY {column} {order}, d.id {order}
         LIMIT ?1 OFFSET ?2",
        column = query.sort_by.column(),
        order = query.order.keyword(),
    );
    let limit = i64::from(query.limit());
    let offset = i64::try_from(query.offset()).map_err(|_| DatabaseError::InvalidValue {
        column: "offset",
        reason: format!("offset {} out of range", query.offset()),
    })?;

    let (rows, total) = db.with_conn(|conn| {
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit, offset], |row| {
                Ok((DocumentRow::from_row(row)?, row.get::<_, String>("status")?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok((rows, total))
    })?;

    let items = rows
        .into_iter()
        .map(|(row, status)| {
            let document = row.into_document()?;
            Ok(DocumentSummary {
                id: document.id,
                filename: document.filename,
                original_name: document.original_name,
                mime_type: document.mime_type,
                size: document.size,
                uploaded_at: document.uploaded_at,
                processing_status: parse_status(&status)?,
            })
        })
        .collect::<Result<Vec<_>, DatabaseError>>()?;

    Ok((items, u64::try_from(total).unwrap_or_default()))
}

/// Deletes a document; its processing record goes with it via the cascade.
/// Returns `false` if no such document existed.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::pagination::{SortField, SortOrder};
    use chrono::{Duration, TimeZone, Utc};

    fn make_document(id: &str, name: &str, size: u64, minutes: i64) -> Document {
        Document {
            id: id.to_string(),
            filename: format!("{}.txt", id),
            original_name: name.to_string(),
            mime_type: "text/plain".to_string(),
            size,
            storage_key: format!("/tmp/uploads/{}.txt", id),
            uploaded_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = Database::open_in_memory().unwrap();
        let doc = make_document("d1", "notes.txt", 42, 0);
        insert_with_record(&db, &doc).unwrap();

        let found = find_by_id(&db, "d1").unwrap().unwrap();
        assert_eq!(found, doc);

        let detail = find_detail(&db, "d1").unwrap().unwrap();
        assert_eq!(detail.document, doc);
        assert_eq!(detail.content, ProcessingRecord::pending("d1"));
    }

    #[test]
    fn test_find_missing() {
        let db = Database::open_in_memory().unwrap();
        assert!(find_by_id(&db, "nope").unwrap().is_none());
        assert!(find_detail(&db, "nope").unwrap().is_none());
    }

    #[test]
    fn test_insert_is_atomic() {
        let db = Database::open_in_memory().unwrap();
        // A stray record makes the second insert of the transaction fail.
        db.with_conn(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys=OFF;
                 INSERT INTO processing_records (document_id, status, updated_at)
                 VALUES ('d1', 'PENDING', '2026-01-01T00:00:00.000Z');
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
        .unwrap();

        let doc = make_document("d1", "a.txt", 1, 0);
        assert!(insert_with_record(&db, &doc).is_err());
        assert!(find_by_id(&db, "d1").unwrap().is_none());
    }

    #[test]
    fn test_delete_cascades_to_record() {
        let db = Database::open_in_memory().unwrap();
        insert_with_record(&db, &make_document("d1", "a.txt", 1, 0)).unwrap();

        assert!(delete(&db, "d1").unwrap());
        assert!(!delete(&db, "d1").unwrap());

        let records: u32 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM processing_records", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(records, 0);
    }

    #[test]
    fn test_find_page_sorting() {
        let db = Database::open_in_memory().unwrap();
        insert_with_record(&db, &make_document("d1", "beta.txt", 300, 0)).unwrap();
        insert_with_record(&db, &make_document("d2", "alpha.txt", 100, 1)).unwrap();
        insert_with_record(&db, &make_document("d3", "gamma.txt", 200, 2)).unwrap();

        let ids = |query: PageQuery| -> Vec<String> {
            find_page(&db, &query)
                .unwrap()
                .0
                .into_iter()
                .map(|d| d.id)
                .collect()
        };

        assert_eq!(ids(PageQuery::default()), ["d3", "d2", "d1"]);
        assert_eq!(
            ids(PageQuery::new(1, 10, SortField::OriginalName, SortOrder::Asc).unwrap()),
            ["d2", "d1", "d3"]
        );
        assert_eq!(
            ids(PageQuery::new(1, 10, SortField::Size, SortOrder::Desc).unwrap()),
            ["d1", "d3", "d2"]
        );
    }

    #[test]
    fn test_find_page_limits_and_offsets() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            insert_with_record(&db, &make_document(&format!("d{}", i), "x.txt", 1, i)).unwrap();
        }

        let query = PageQuery::new(2, 2, SortField::UploadedAt, SortOrder::Asc).unwrap();
        let (items, total) = find_page(&db, &query).unwrap();
        assert_eq!(total, 5);
        assert_eq!(
            items.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            ["d2", "d3"]
        );
        assert!(items
            .iter()
            .all(|d| d.processing_status == ProcessingStatus::Pending));

        let query = PageQuery::new(4, 2, SortField::UploadedAt, SortOrder::Asc).unwrap();
        let (items, total) = find_page(&db, &query).unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 5);
    }
}
