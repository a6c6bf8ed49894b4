//! Summary storage and document/summary joins.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::document::{row_to_document, DOCUMENT_COLUMNS};
use super::{column_opt_timestamp, column_timestamp, column_uuid};
use crate::storage::db::Database;
use crate::storage::error::StoreResult;
use crate::storage::models::{Document, DocumentSummary, DocumentWithSummary};

/// Queries that span documents and their summaries.
pub struct DocumentQueryDao<'a> {
    db: &'a Database,
}

impl<'a> DocumentQueryDao<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store or replace the summary of a document. Fails with a constraint
    /// error if the document does not exist.
    pub fn upsert_summary(&self, summary: &DocumentSummary) -> StoreResult<()> {
        self.db.conn().execute(
            r#"
            INSERT INTO document_summaries (document_id, summary, generated_at, is_complete)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(document_id) DO UPDATE SET
                summary = ?2,
                generated_at = ?3,
                is_complete = ?4
            "#,
            params![
                summary.document_id.to_string(),
                summary.summary,
                summary.generated_at.to_rfc3339(),
                summary.is_complete,
            ],
        )?;
        Ok(())
    }

    /// Get the summary of a document
    pub fn get_summary(&self, document_id: &Uuid) -> StoreResult<Option<DocumentSummary>> {
        let summary = self
            .db
            .conn()
            .query_row(
                "SELECT document_id, summary, generated_at, is_complete
                 FROM document_summaries WHERE document_id = ?1",
                params![document_id.to_string()],
                |row| {
                    Ok(DocumentSummary {
                        document_id: column_uuid(row, 0)?,
                        summary: row.get(1)?,
                        generated_at: column_timestamp(row, 2)?,
                        is_complete: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }

    /// Remove a summary, leaving the document in place
    pub fn delete_summary(&self, document_id: &Uuid) -> StoreResult<bool> {
        let deleted = self.db.conn().execute(
            "DELETE FROM document_summaries WHERE document_id = ?1",
            params![document_id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// Get a document joined with its summary
    pub fn get_with_summary(&self, id: &Uuid) -> StoreResult<Option<DocumentWithSummary>> {
        let item = self
            .db
            .conn()
            .query_row(
                &format!(
                    "SELECT {DOCUMENT_COLUMNS}, s.summary, s.generated_at, s.is_complete
                     FROM documents d
                     LEFT JOIN document_summaries s ON s.document_id = d.id
                     WHERE d.id = ?1"
                ),
                params![id.to_string()],
                row_to_document_with_summary,
            )
            .optional()?;
        Ok(item)
    }

    /// List every document with its summary, newest first
    pub fn list_with_summaries(&self) -> StoreResult<Vec<DocumentWithSummary>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS}, s.summary, s.generated_at, s.is_complete
             FROM documents d
             LEFT JOIN document_summaries s ON s.document_id = d.id
             ORDER BY d.created_at DESC, d.id"
        ))?;
        let rows = stmt.query_map([], row_to_document_with_summary)?;
        let items = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// List documents that have no summary yet, oldest first
    pub fn list_without_summary(&self) -> StoreResult<Vec<Document>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS}
             FROM documents d
             LEFT JOIN document_summaries s ON s.document_id = d.id
             WHERE s.document_id IS NULL
             ORDER BY d.created_at, d.id"
        ))?;
        let rows = stmt.query_map([], row_to_document)?;
        let docs = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    /// Get total summary count
    pub fn count_summaries(&self) -> StoreResult<i64> {
        let count = self.db.conn().query_row(
            "SELECT COUNT(*) FROM document_summaries",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_document_with_summary(row: &rusqlite::Row) -> rusqlite::Result<DocumentWithSummary> {
    let document = row_to_document(row)?;
    let summary = match row.get::<_, Option<String>>(9)? {
        Some(text) => Some(DocumentSummary {
            document_id: document.id,
            summary: text,
            generated_at: column_opt_timestamp(row, 10)?.unwrap_or(document.updated_at),
            is_complete: row.get::<_, Option<bool>>(11)?.unwrap_or(false),
        }),
        None => None,
    };
    Ok(DocumentWithSummary { document, summary })
}
