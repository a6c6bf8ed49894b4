//! Integration tests for studydeck
//!
//! The first half exercises the store through the public library API using
//! temporary databases; the second half drives the `studydeck` binary.

use assert_cmd::Command;
use chrono::Utc;
use predicates::prelude::*;
use rusqlite::Connection;
use std::path::Path;
use studydeck::storage::migrations::{self, BASE_VERSION, CURRENT_VERSION};
use studydeck::storage::{
    ChatSession, Database, Document, DocumentStatus, DocumentSummary, DocumentType, MessageRole,
    OpenOptions,
};
use tempfile::tempdir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Creates a test database in a temporary directory.
/// Returns the Database instance and the temp directory (which must be kept alive).
fn create_test_db() -> (Database, tempfile::TempDir) {
    let dir = tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).expect("Failed to open test database");
    (db, dir)
}

/// Writes a version-1 store containing the given document titles.
fn create_version_one_store(path: &Path, titles: &[&str]) {
    let mut conn = Connection::open(path).expect("Failed to open raw connection");
    migrations::create_base_schema(&mut conn).expect("Failed to create base schema");
    for (i, title) in titles.iter().enumerate() {
        conn.execute(
            "INSERT INTO documents (id, doc_type, status, title, tags, created_at, updated_at)
             VALUES (?1, 'exam_paper', 'ready', ?2, '[\"legacy\"]', ?3, ?3)",
            rusqlite::params![
                uuid::Uuid::new_v4().to_string(),
                title,
                (Utc::now() - chrono::Duration::minutes(i as i64)).to_rfc3339(),
            ],
        )
        .expect("Failed to insert legacy document");
    }
}

fn summary_for(document_id: uuid::Uuid) -> DocumentSummary {
    DocumentSummary {
        document_id,
        summary: "Key formulas and worked examples".to_string(),
        generated_at: Utc::now(),
        is_complete: true,
    }
}

// =============================================================================
// Store Lifecycle Tests
// =============================================================================

mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_upgrade_preserves_documents_and_adds_summaries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        create_version_one_store(&path, &["Algebra 2019", "Algebra 2020", "Algebra 2021"]);

        let db = Database::open(&path).expect("Upgrade should succeed");

        assert_eq!(db.report().from_version, BASE_VERSION);
        assert_eq!(db.schema_version().unwrap(), CURRENT_VERSION);
        let docs = db.documents().list_all().unwrap();
        assert_eq!(docs.len(), 3, "No pre-existing documents may be lost");
        assert!(docs.iter().all(|d| d.tags == vec!["legacy".to_string()]));

        // The new table works against migrated rows.
        db.document_queries()
            .upsert_summary(&summary_for(docs[0].id))
            .expect("Summary table should accept rows after upgrade");
        assert_eq!(db.document_queries().list_without_summary().unwrap().len(), 2);
    }

    #[test]
    fn test_reopening_current_store_runs_no_migrations() {
        let (db, dir) = create_test_db();
        drop(db);

        let db = Database::open(&dir.path().join("test.db")).unwrap();

        let report = db.report();
        assert!(!report.created);
        assert_eq!(report.from_version, report.version);
    }

    #[test]
    fn test_destructive_fallback_is_opt_in() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.db");
        {
            let conn = Connection::open(&path).unwrap();
            migrations::write_version(&conn, CURRENT_VERSION + 1).unwrap();
        }

        assert!(
            Database::open(&path).is_err(),
            "Without the fallback a newer store must not be opened"
        );

        let db = Database::open_with(&path, &OpenOptions::default().fallback_to_destructive(true))
            .expect("Fallback should rebuild the store");
        assert!(db.was_reset());
    }
}

// =============================================================================
// Document Tests
// =============================================================================

mod document_tests {
    use super::*;

    #[test]
    fn test_cascade_for_documents_with_and_without_summary() {
        let (db, _dir) = create_test_db();
        let mut ids = Vec::new();
        for i in 0..6 {
            let doc = Document::new(format!("Lecture {i}"), DocumentType::Lecture);
            db.documents().insert(&doc).unwrap();
            if i % 2 == 0 {
                db.document_queries().upsert_summary(&summary_for(doc.id)).unwrap();
            }
            ids.push(doc.id);
        }
        assert_eq!(db.document_queries().count_summaries().unwrap(), 3);

        for id in &ids {
            assert!(db.documents().delete(id).unwrap());
        }

        assert_eq!(db.documents().count().unwrap(), 0);
        assert_eq!(
            db.document_queries().count_summaries().unwrap(),
            0,
            "No orphan summaries may remain"
        );
    }

    #[test]
    fn test_status_lifecycle() {
        let (db, _dir) = create_test_db();
        let doc = Document::new("Compilers Project", DocumentType::Project);
        db.documents().insert(&doc).unwrap();

        db.documents()
            .update_status(&doc.id, DocumentStatus::Processing)
            .unwrap();
        assert_eq!(
            db.documents()
                .list_by_status(DocumentStatus::Processing)
                .unwrap()
                .len(),
            1
        );

        db.documents()
            .update_status(&doc.id, DocumentStatus::Ready)
            .unwrap();
        assert!(db
            .documents()
            .list_by_status(DocumentStatus::Processing)
            .unwrap()
            .is_empty());
    }
}

// =============================================================================
// Chat Tests
// =============================================================================

mod chat_tests {
    use super::*;

    #[test]
    fn test_session_must_exist_before_messages() {
        let (db, _dir) = create_test_db();
        let session = ChatSession::new(Some("Revision".to_string()));

        let err = db
            .chat()
            .append_message(&session.id, MessageRole::User, "Too early")
            .unwrap_err();
        assert!(err.is_constraint());

        db.chat().create_session(&session).unwrap();
        let message = db
            .chat()
            .append_message(&session.id, MessageRole::User, "Now it works")
            .unwrap();
        assert_eq!(message.index, 0);
    }

    #[test]
    fn test_messages_survive_reopen_in_order() {
        let (db, dir) = create_test_db();
        let session = ChatSession::new(None);
        db.chat().create_session(&session).unwrap();
        for text in ["one", "two", "three", "four"] {
            db.chat()
                .append_message(&session.id, MessageRole::User, text)
                .unwrap();
        }
        drop(db);

        let db = Database::open(&dir.path().join("test.db")).unwrap();
        let contents: Vec<String> = db
            .chat()
            .get_messages(&session.id)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();

        assert_eq!(contents, vec!["one", "two", "three", "four"]);
    }
}

// =============================================================================
// Binary Tests
// =============================================================================

mod binary_tests {
    use super::*;

    /// Runs the binary against a temp store with HOME pointed at the temp dir.
    fn studydeck(dir: &Path) -> Command {
        let mut cmd = Command::cargo_bin("studydeck").expect("Binary should build");
        cmd.env("HOME", dir)
            .env("STUDYDECK_DB", dir.join("cli.db"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    #[test]
    fn test_status_on_fresh_store() {
        let dir = tempdir().unwrap();

        studydeck(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Documents:      0"));

        assert!(dir.path().join("cli.db").exists(), "Store file should be created");
    }

    #[test]
    fn test_add_and_list_documents_as_json() {
        let dir = tempdir().unwrap();

        studydeck(dir.path())
            .args(["docs", "add", "Databases Exam 2023", "--type", "exam-paper", "--tag", "sql"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Added"));

        let output = studydeck(dir.path())
            .args(["docs", "list", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let docs: Vec<Document> = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Databases Exam 2023");
        assert_eq!(docs[0].doc_type, DocumentType::ExamPaper);
        assert_eq!(docs[0].tags, vec!["sql".to_string()]);
    }

    #[test]
    fn test_list_filters_by_type() {
        let dir = tempdir().unwrap();
        for (title, doc_type) in [("Week 1", "lecture"), ("Midterm", "exam-paper")] {
            studydeck(dir.path())
                .args(["docs", "add", title, "--type", doc_type])
                .assert()
                .success();
        }

        let output = studydeck(dir.path())
            .args(["docs", "list", "--type", "lecture", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let docs: Vec<Document> = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Week 1");
    }

    #[test]
    fn test_db_info_reports_schema_version() {
        let dir = tempdir().unwrap();

        studydeck(dir.path())
            .args(["db", "info"])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!(
                "{CURRENT_VERSION} (this build reads {CURRENT_VERSION})"
            )))
            .stdout(predicate::str::contains("add_document_summaries"));
    }

    #[test]
    fn test_cli_upgrades_legacy_store() {
        let dir = tempdir().unwrap();
        create_version_one_store(&dir.path().join("cli.db"), &["Old Paper"]);

        studydeck(dir.path())
            .args(["db", "info"])
            .assert()
            .success()
            .stdout(predicate::str::contains("migrated from version 1"));
    }

    #[test]
    fn test_unknown_document_prefix_fails() {
        let dir = tempdir().unwrap();

        studydeck(dir.path())
            .args(["docs", "show", "zzzz"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No document found"));
    }

    #[test]
    fn test_sync_without_token_fails() {
        let dir = tempdir().unwrap();

        studydeck(dir.path())
            .arg("sync")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Not logged in"));
    }

    #[test]
    fn test_chat_round_trip() {
        let dir = tempdir().unwrap();

        studydeck(dir.path())
            .args(["chat", "new", "--title", "Exam prep"])
            .assert()
            .success();

        let db = Database::open(&dir.path().join("cli.db")).unwrap();
        let session = db.chat().list_sessions().unwrap().remove(0);
        drop(db);
        let prefix = session.id.to_string()[..8].to_string();

        studydeck(dir.path())
            .args(["chat", "send", &prefix, "What is normalization?"])
            .assert()
            .success();

        studydeck(dir.path())
            .args(["chat", "show", &prefix])
            .assert()
            .success()
            .stdout(predicate::str::contains("What is normalization?"));
    }
}
