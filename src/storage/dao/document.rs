//! Document CRUD.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{column_enum, column_string_list, column_timestamp, column_uuid};
use crate::storage::db::Database;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::models::{Document, DocumentStatus, DocumentType};

pub(crate) const DOCUMENT_COLUMNS: &str =
    "d.id, d.doc_type, d.status, d.title, d.subject, d.remote_id, d.tags, d.created_at, d.updated_at";

/// Insert, update, lookup and delete of [`Document`] rows.
pub struct DocumentDao<'a> {
    db: &'a Database,
}

impl<'a> DocumentDao<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new document. Fails with a constraint error if the ID or
    /// remote ID is already taken.
    pub fn insert(&self, doc: &Document) -> StoreResult<()> {
        let tags = serde_json::to_string(&doc.tags)?;
        self.db.conn().execute(
            r#"
            INSERT INTO documents (id, doc_type, status, title, subject, remote_id, tags, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                doc.id.to_string(),
                doc.doc_type.as_str(),
                doc.status.as_str(),
                doc.title,
                doc.subject,
                doc.remote_id,
                tags,
                doc.created_at.to_rfc3339(),
                doc.updated_at.to_rfc3339(),
            ],
        )?;
        tracing::debug!("Inserted document {}", doc.id);
        Ok(())
    }

    /// Overwrite every mutable field of an existing document.
    pub fn update(&self, doc: &Document) -> StoreResult<()> {
        let tags = serde_json::to_string(&doc.tags)?;
        let changed = self.db.conn().execute(
            r#"
            UPDATE documents
            SET doc_type = ?2, status = ?3, title = ?4, subject = ?5, remote_id = ?6,
                tags = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                doc.id.to_string(),
                doc.doc_type.as_str(),
                doc.status.as_str(),
                doc.title,
                doc.subject,
                doc.remote_id,
                tags,
                doc.updated_at.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("document {}", doc.id)));
        }
        Ok(())
    }

    /// Change a document's status and bump its `updated_at`.
    pub fn update_status(&self, id: &Uuid, status: DocumentStatus) -> StoreResult<()> {
        let changed = self.db.conn().execute(
            "UPDATE documents SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.to_string(), status.as_str(), Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("document {id}")));
        }
        tracing::debug!("Document {} is now {}", id, status);
        Ok(())
    }

    /// Get a document by ID
    pub fn get(&self, id: &Uuid) -> StoreResult<Option<Document>> {
        let doc = self
            .db
            .conn()
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents d WHERE d.id = ?1"),
                params![id.to_string()],
                row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    /// Find the local copy of a remote document
    pub fn find_by_remote_id(&self, remote_id: &str) -> StoreResult<Option<Document>> {
        let doc = self
            .db
            .conn()
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents d WHERE d.remote_id = ?1"),
                params![remote_id],
                row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    /// List all documents, newest first
    pub fn list_all(&self) -> StoreResult<Vec<Document>> {
        self.list_where("1 = 1", params![])
    }

    /// List documents with the given status, newest first
    pub fn list_by_status(&self, status: DocumentStatus) -> StoreResult<Vec<Document>> {
        self.list_where("d.status = ?1", params![status.as_str()])
    }

    /// List documents of the given type, newest first
    pub fn list_by_type(&self, doc_type: DocumentType) -> StoreResult<Vec<Document>> {
        self.list_where("d.doc_type = ?1", params![doc_type.as_str()])
    }

    fn list_where(&self, filter: &str, args: &[&dyn rusqlite::ToSql]) -> StoreResult<Vec<Document>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents d WHERE {filter} ORDER BY d.created_at DESC, d.id"
        ))?;
        let rows = stmt.query_map(args, row_to_document)?;
        let docs = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    /// Insert or refresh a document mirrored from the remote store, keyed by
    /// `remote_id`. An existing row keeps its local ID and status. Returns
    /// true if a new row was created.
    pub fn upsert_remote(&self, doc: &Document) -> StoreResult<bool> {
        let remote_id = doc
            .remote_id
            .as_deref()
            .ok_or_else(|| StoreError::InvalidData("remote document without remote_id".into()))?;
        let tags = serde_json::to_string(&doc.tags)?;

        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM documents WHERE remote_id = ?1",
                params![remote_id],
                |row| row.get(0),
            )
            .optional()?;

        let created = match existing {
            Some(id) => {
                tx.execute(
                    r#"
                    UPDATE documents
                    SET doc_type = ?2, title = ?3, subject = ?4, tags = ?5, updated_at = ?6
                    WHERE id = ?1
                    "#,
                    params![
                        id,
                        doc.doc_type.as_str(),
                        doc.title,
                        doc.subject,
                        tags,
                        doc.updated_at.to_rfc3339(),
                    ],
                )?;
                false
            }
            None => {
                tx.execute(
                    r#"
                    INSERT INTO documents (id, doc_type, status, title, subject, remote_id, tags, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                    params![
                        doc.id.to_string(),
                        doc.doc_type.as_str(),
                        doc.status.as_str(),
                        doc.title,
                        doc.subject,
                        remote_id,
                        tags,
                        doc.created_at.to_rfc3339(),
                        doc.updated_at.to_rfc3339(),
                    ],
                )?;
                true
            }
        };

        tx.commit()?;
        Ok(created)
    }

    /// Delete a document and its summary in one transaction.
    ///
    /// The summary also goes through the foreign key's `ON DELETE CASCADE`;
    /// removing it explicitly keeps the guarantee when enforcement is off.
    /// Returns false if no such document existed.
    pub fn delete(&self, id: &Uuid) -> StoreResult<bool> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM document_summaries WHERE document_id = ?1",
            params![id.to_string()],
        )?;
        let deleted = tx.execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])?;

        tx.commit()?;

        if deleted > 0 {
            tracing::debug!("Deleted document {}", id);
        }
        Ok(deleted > 0)
    }

    /// Get total document count
    pub fn count(&self) -> StoreResult<i64> {
        let count = self
            .db
            .conn()
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Maps the first nine columns (see [`DOCUMENT_COLUMNS`]) to a [`Document`].
pub(crate) fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    Ok(Document {
        id: column_uuid(row, 0)?,
        doc_type: column_enum(row, 1)?,
        status: column_enum(row, 2)?,
        title: row.get(3)?,
        subject: row.get(4)?,
        remote_id: row.get(5)?,
        tags: column_string_list(row, 6)?,
        created_at: column_timestamp(row, 7)?,
        updated_at: column_timestamp(row, 8)?,
    })
}
