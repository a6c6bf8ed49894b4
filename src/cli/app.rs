//! Application shell: owns the background runtime and the lazily opened
//! store for the lifetime of one CLI invocation.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use studydeck::config::Config;
use studydeck::storage::{get_database, with_database, Database, StoreResult};

pub struct App {
    runtime: Runtime,
    config: Config,
    db_override: Option<PathBuf>,
    reset_reported: AtomicBool,
}

impl App {
    /// Builds the background runtime and loads configuration. The store is
    /// not opened until a command asks for it.
    pub fn new(db_override: Option<PathBuf>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("studydeck-bg")
            .enable_all()
            .build()
            .context("Failed to start background runtime")?;
        let config = Config::load()?;

        Ok(Self {
            runtime,
            config,
            db_override,
            reset_reported: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of the store this invocation uses.
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.db_override {
            Some(path) => Ok(path.clone()),
            None => self.config.store_path(),
        }
    }

    /// Returns the shared store, opening it on first use.
    pub fn database(&self) -> Result<Arc<Database>> {
        let path = self.store_path()?;
        let options = self.config.open_options();
        let handle = self.runtime.handle().clone();

        let db = self
            .runtime
            .block_on(async { get_database(&path, &options, &handle).await })
            .with_context(|| format!("Failed to open store at {}", path.display()))?;

        if db.was_reset() && !self.reset_reported.swap(true, Ordering::SeqCst) {
            eprintln!(
                "warning: the store at {} could not be migrated and was rebuilt EMPTY \
                 (destructive_fallback is enabled)",
                path.display()
            );
        }
        Ok(db)
    }

    /// Runs a store operation on the background runtime and waits for it.
    pub fn store<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.database()?;
        let value = self.runtime.block_on(with_database(&db, f))?;
        Ok(value)
    }

    /// Runs blocking non-store work (such as remote calls) on the runtime.
    pub fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.runtime
            .block_on(tokio::task::spawn_blocking(f))
            .context("Background task failed")?
    }

    /// Tears down the runtime, giving in-flight background work a moment
    /// to finish.
    pub fn shutdown(self) {
        self.runtime.shutdown_timeout(Duration::from_secs(2));
    }
}
