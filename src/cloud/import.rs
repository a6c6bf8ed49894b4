//! Mirrors remote document metadata into the local store.

use chrono::Utc;
use uuid::Uuid;

use super::{RemoteDocument, RemoteStore};
use crate::storage::models::{Document, DocumentStatus};
use crate::storage::Database;

/// Outcome of an import run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    /// Documents seen for the first time.
    pub created: usize,
    /// Documents already present locally and refreshed.
    pub updated: usize,
}

/// Lists the remote store and upserts every document by remote ID.
///
/// New documents start as [`DocumentStatus::Imported`]; existing ones keep
/// their local ID and status. The first failed write stops the run.
pub fn import_remote(db: &Database, remote: &dyn RemoteStore) -> anyhow::Result<ImportReport> {
    let documents = remote.list_documents()?;
    let mut report = ImportReport::default();

    for remote_doc in &documents {
        let doc = to_local(remote_doc);
        if db.documents().upsert_remote(&doc)? {
            report.created += 1;
        } else {
            report.updated += 1;
        }
    }

    tracing::info!(
        "Imported {} remote documents ({} new, {} refreshed)",
        documents.len(),
        report.created,
        report.updated
    );
    Ok(report)
}

fn to_local(remote: &RemoteDocument) -> Document {
    Document {
        id: Uuid::new_v4(),
        doc_type: remote.doc_type,
        status: DocumentStatus::Imported,
        title: remote.title.clone(),
        subject: remote.subject.clone(),
        remote_id: Some(remote.id.clone()),
        tags: remote.tags.clone(),
        created_at: Utc::now(),
        updated_at: remote.modified_at,
    }
}
