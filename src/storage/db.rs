//! SQLite storage layer for studydeck
//!
//! [`Database`] owns the single connection to the store file. Opening it
//! creates the schema on a new file, walks an existing file up the
//! migration chain, and optionally falls back to a destructive rebuild
//! when the chain cannot be applied.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::dao::{ChatDao, DocumentDao, DocumentQueryDao};
use super::error::{StoreError, StoreResult};
use super::migrations::{self, BASE_VERSION, CURRENT_VERSION};

/// File name of the store inside the data directory.
pub const DATABASE_NAME: &str = "studydeck_v1.db";

/// Get the default data directory (`~/.studydeck`)
pub fn default_data_dir() -> StoreResult<PathBuf> {
    let dir = dirs::home_dir()
        .ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "Could not find home directory")
        })?
        .join(".studydeck");
    Ok(dir)
}

/// Get the default database path
pub fn default_db_path() -> StoreResult<PathBuf> {
    Ok(default_data_dir()?.join(DATABASE_NAME))
}

/// Lifecycle hooks fired by the store.
///
/// `on_create` runs once, when the file is created for the first time or
/// rebuilt by a destructive reset. The store handle schedules it on the
/// background runtime. `on_open` runs synchronously on every open, after
/// migrations.
pub trait StoreCallback: Send + Sync {
    fn on_create(&self, _db: &Database) -> StoreResult<()> {
        Ok(())
    }

    fn on_open(&self, _db: &Database) -> StoreResult<()> {
        Ok(())
    }
}

/// Callback that does nothing. No default rows are seeded.
pub struct NoopCallback;

impl StoreCallback for NoopCallback {}

/// Settings applied when opening a [`Database`].
#[derive(Clone)]
pub struct OpenOptions {
    /// Drop and rebuild the store if the migration chain cannot be applied.
    /// Lossy: every row is discarded.
    pub destructive_fallback: bool,
    /// Lifecycle hooks
    pub callback: Arc<dyn StoreCallback>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            destructive_fallback: false,
            callback: Arc::new(NoopCallback),
        }
    }
}

impl OpenOptions {
    /// Enables or disables the destructive fallback.
    pub fn fallback_to_destructive(mut self, enabled: bool) -> Self {
        self.destructive_fallback = enabled;
        self
    }

    /// Sets the lifecycle callback.
    pub fn callback(mut self, callback: Arc<dyn StoreCallback>) -> Self {
        self.callback = callback;
        self
    }
}

/// What happened while a store was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenReport {
    /// The file had no schema and was created from scratch
    pub created: bool,
    /// The destructive fallback discarded all existing data
    pub reset: bool,
    /// Schema version found on disk before opening (0 for a new file)
    pub from_version: i64,
    /// Schema version after opening
    pub version: i64,
}

/// Database connection wrapper
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    report: OpenReport,
}

impl Database {
    /// Open or create the database with default options
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_with(path, &OpenOptions::default())
    }

    /// Open or create the database
    pub fn open_with(path: &Path, options: &OpenOptions) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn, Some(path.to_path_buf()), options)
    }

    /// Open a private in-memory store
    pub fn open_in_memory(options: &OpenOptions) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None, options)
    }

    fn from_connection(
        mut conn: Connection,
        path: Option<PathBuf>,
        options: &OpenOptions,
    ) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let report = match prepare_schema(&mut conn) {
            Ok(report) => report,
            Err(err) if options.destructive_fallback && is_schema_failure(&err) => {
                tracing::error!(
                    "Could not bring the store to schema version {}: {}. \
                     Destructive fallback is enabled: ALL STORED DATA IS BEING DISCARDED.",
                    CURRENT_VERSION,
                    err
                );
                migrations::drop_all(&mut conn)?;
                let mut report = prepare_schema(&mut conn)?;
                report.reset = true;
                report
            }
            Err(err) => return Err(err),
        };

        if report.created {
            tracing::info!("Created new store at schema version {}", report.version);
        } else if report.from_version != report.version && !report.reset {
            tracing::info!(
                "Migrated store from schema version {} to {}",
                report.from_version,
                report.version
            );
        }

        let db = Self {
            conn: Mutex::new(conn),
            path,
            report,
        };
        options.callback.on_open(&db)?;
        Ok(db)
    }

    /// Locks the connection for one operation.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-operation leaves SQLite consistent; keep serving.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Path of the store file, or `None` for an in-memory store
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// What happened while this store was opened
    pub fn report(&self) -> OpenReport {
        self.report
    }

    /// True if the destructive fallback discarded data during open
    pub fn was_reset(&self) -> bool {
        self.report.reset
    }

    /// True if `on_create` is owed for this open (new or rebuilt file)
    pub fn needs_on_create(&self) -> bool {
        self.report.created
    }

    /// Reads the schema version currently stamped in the file
    pub fn schema_version(&self) -> StoreResult<i64> {
        Ok(migrations::read_version(&self.conn())?)
    }

    // ==================== Access objects ====================

    /// Document CRUD
    pub fn documents(&self) -> DocumentDao<'_> {
        DocumentDao::new(self)
    }

    /// Document queries and summaries
    pub fn document_queries(&self) -> DocumentQueryDao<'_> {
        DocumentQueryDao::new(self)
    }

    /// Chat sessions and messages
    pub fn chat(&self) -> ChatDao<'_> {
        ChatDao::new(self)
    }

    // ==================== Maintenance ====================

    /// Size of the store file in bytes, `None` for in-memory stores
    pub fn file_size(&self) -> StoreResult<Option<u64>> {
        match &self.path {
            Some(path) => Ok(Some(std::fs::metadata(path)?.len())),
            None => Ok(None),
        }
    }

    /// Rebuild the file to reclaim unused space
    pub fn vacuum(&self) -> StoreResult<()> {
        self.conn().execute_batch("VACUUM;")?;
        Ok(())
    }
}

/// Brings `conn` to [`CURRENT_VERSION`], creating the schema if needed.
fn prepare_schema(conn: &mut Connection) -> StoreResult<OpenReport> {
    let stored = migrations::read_version(conn)?;
    if stored > CURRENT_VERSION {
        return Err(StoreError::VersionTooNew {
            found: stored,
            supported: CURRENT_VERSION,
        });
    }

    let created = stored == 0;
    if created {
        migrations::create_base_schema(conn)?;
    }

    let from = if created { BASE_VERSION } else { stored };
    let version = migrations::run_migrations(conn, from, CURRENT_VERSION)?;

    Ok(OpenReport {
        created,
        reset: false,
        from_version: stored,
        version,
    })
}

/// Errors the destructive fallback is allowed to recover from.
fn is_schema_failure(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::Migration { .. }
            | StoreError::MissingMigration { .. }
            | StoreError::VersionTooNew { .. }
    )
}
