//! Schema definition and the versioned migration chain.
//!
//! The schema version lives in SQLite's `PRAGMA user_version`. A brand new
//! file gets [`BASE_SCHEMA`] (version 1) and is then walked up the same
//! migration chain as an upgraded file, so fresh and upgraded stores end up
//! with identical schemas.
//!
//! Migrations are append-only and purely additive. Every statement uses
//! `IF NOT EXISTS` so a step that was partially applied can be re-run.

use rusqlite::Connection;

use super::error::{StoreError, StoreResult};

/// Schema version this build reads and writes.
pub const CURRENT_VERSION: i64 = 2;

/// Version produced by [`BASE_SCHEMA`].
pub const BASE_VERSION: i64 = 1;

/// Version-1 schema: documents and chat.
pub const BASE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        doc_type TEXT NOT NULL,
        status TEXT NOT NULL,
        title TEXT NOT NULL,
        subject TEXT,
        remote_id TEXT UNIQUE,
        tags TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chat_sessions (
        id TEXT PRIMARY KEY,
        title TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chat_messages (
        id TEXT PRIMARY KEY,
        session_id TEXT NOT NULL,
        idx INTEGER NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        UNIQUE (session_id, idx),
        FOREIGN KEY (session_id) REFERENCES chat_sessions(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);
    CREATE INDEX IF NOT EXISTS idx_documents_doc_type ON documents(doc_type);
    CREATE INDEX IF NOT EXISTS idx_chat_messages_session_id ON chat_messages(session_id);
"#;

/// A single schema step from one version to the next.
#[derive(Debug)]
pub struct Migration {
    /// Version the step starts from
    pub from: i64,
    /// Version the step produces
    pub to: i64,
    /// Short name used in logs
    pub name: &'static str,
    /// Statements executed in order
    pub statements: &'static [&'static str],
}

impl Migration {
    /// Executes every statement of this step against `conn`.
    pub fn apply(&self, conn: &Connection) -> rusqlite::Result<()> {
        for statement in self.statements {
            conn.execute_batch(statement)?;
        }
        Ok(())
    }
}

/// 1 -> 2: per-document summaries.
const ADD_DOCUMENT_SUMMARIES: Migration = Migration {
    from: 1,
    to: 2,
    name: "add_document_summaries",
    statements: &[
        r#"
        CREATE TABLE IF NOT EXISTS document_summaries (
            document_id TEXT NOT NULL PRIMARY KEY,
            summary TEXT NOT NULL,
            generated_at TEXT NOT NULL,
            is_complete INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (document_id) REFERENCES documents(id)
                ON UPDATE NO ACTION ON DELETE CASCADE
        )
        "#,
        "CREATE INDEX IF NOT EXISTS index_document_summaries_document_id \
         ON document_summaries(document_id)",
    ],
};

static MIGRATIONS: &[Migration] = &[ADD_DOCUMENT_SUMMARIES];

/// Returns every registered migration in ascending order.
pub fn all_migrations() -> &'static [Migration] {
    MIGRATIONS
}

/// Resolves the chain of migrations that takes a store from `from` to `to`.
///
/// At each version the step reaching furthest without overshooting `to` is
/// chosen. Returns [`StoreError::MissingMigration`] if any gap is left
/// unbridged; an empty chain is returned when `from == to`.
pub fn migration_path(from: i64, to: i64) -> StoreResult<Vec<&'static Migration>> {
    if from > to {
        return Err(StoreError::MissingMigration { from, to });
    }

    let mut path = Vec::new();
    let mut current = from;
    while current < to {
        let step = all_migrations()
            .iter()
            .filter(|m| m.from == current && m.to > current && m.to <= to)
            .max_by_key(|m| m.to)
            .ok_or(StoreError::MissingMigration { from, to })?;
        path.push(step);
        current = step.to;
    }
    Ok(path)
}

/// Reads the stored schema version (0 for a file that was never initialized).
pub fn read_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Writes the stored schema version.
pub fn write_version(conn: &Connection, version: i64) -> rusqlite::Result<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {version}"))
}

/// Creates the version-1 schema and stamps it, in one transaction.
pub fn create_base_schema(conn: &mut Connection) -> StoreResult<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(BASE_SCHEMA)?;
    write_version(&tx, BASE_VERSION)?;
    tx.commit()?;
    Ok(())
}

/// Applies the chain from `from` to `to`, one transaction per step.
///
/// Each step and its version bump commit together, so a failure leaves the
/// store at the last fully applied version.
pub fn run_migrations(conn: &mut Connection, from: i64, to: i64) -> StoreResult<i64> {
    let path = migration_path(from, to)?;
    let mut version = from;

    for migration in path {
        tracing::info!(
            "Applying migration {} ({} -> {})",
            migration.name,
            migration.from,
            migration.to
        );

        let tx = conn.transaction()?;
        migration
            .apply(&tx)
            .map_err(|source| StoreError::Migration {
                from: migration.from,
                to: migration.to,
                source,
            })?;
        write_version(&tx, migration.to)?;
        tx.commit()?;

        version = migration.to;
    }

    Ok(version)
}

/// Drops every user table and view, leaving an empty version-0 file.
///
/// This is the lossy recovery path used by the destructive fallback.
/// Indexes and triggers go with their tables.
pub fn drop_all(conn: &mut Connection) -> StoreResult<()> {
    let objects: Vec<(String, String)> = {
        let mut stmt = conn.prepare(
            "SELECT type, name FROM sqlite_master
             WHERE type IN ('view', 'table') AND name NOT LIKE 'sqlite_%'
             ORDER BY type DESC",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let objects = rows.collect::<Result<Vec<_>, _>>()?;
        objects
    };

    // Children reference parents, so enforcement is suspended while dropping.
    conn.execute_batch("PRAGMA foreign_keys = OFF")?;
    let tx = conn.transaction()?;
    for (kind, name) in &objects {
        let keyword = if kind == "view" { "VIEW" } else { "TABLE" };
        tx.execute_batch(&format!(
            "DROP {keyword} IF EXISTS \"{}\"",
            name.replace('"', "\"\"")
        ))?;
    }
    write_version(&tx, 0)?;
    tx.commit()?;
    conn.execute_batch("PRAGMA foreign_keys = ON")?;

    tracing::warn!(
        "Dropped {} tables and views during destructive reset",
        objects.len()
    );
    Ok(())
}
