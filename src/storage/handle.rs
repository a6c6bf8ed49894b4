//! Process-wide store handle.
//!
//! The store is opened lazily, at most once per [`StoreCell`], no matter how
//! many callers race for it. Construction runs in a task on the background
//! runtime rather than in the caller's future, so a caller that is dropped
//! mid-open (timeout, `select!`) neither aborts the open nor loses the
//! `on_create` callback: the task finishes, fills the cell and later callers
//! pick up the result. A failed construction leaves the cell empty so the
//! next caller retries.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::runtime::Handle;
use tokio::sync::OnceCell;

use super::db::{Database, OpenOptions};
use super::error::{StoreError, StoreResult};

/// A lazily opened, shared [`Database`].
pub struct StoreCell {
    cell: Arc<OnceCell<Arc<Database>>>,
}

impl Default for StoreCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreCell {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// Returns the store if it has already been opened.
    pub fn get(&self) -> Option<Arc<Database>> {
        self.cell.get().cloned()
    }

    /// Returns the store, opening it on first use.
    ///
    /// `runtime` is the background scope: the open runs on its blocking
    /// pool, and when the file is new the `on_create` callback is spawned
    /// there without being awaited. `path` and `options` only matter for
    /// the call that actually constructs the store.
    pub async fn get_or_open(
        &self,
        path: &Path,
        options: &OpenOptions,
        runtime: &Handle,
    ) -> StoreResult<Arc<Database>> {
        if let Some(db) = self.cell.get() {
            return Ok(Arc::clone(db));
        }

        let cell = Arc::clone(&self.cell);
        let path = path.to_path_buf();
        let options = options.clone();
        let background = runtime.clone();
        // Dropping the JoinHandle detaches the task; it still runs to the end.
        let task = runtime.spawn(async move {
            cell.get_or_try_init(|| construct(path, options, &background))
                .await
                .map(Arc::clone)
        });
        task.await?
    }
}

async fn construct(
    path: PathBuf,
    options: OpenOptions,
    runtime: &Handle,
) -> StoreResult<Arc<Database>> {
    tracing::debug!("Opening store at {}", path.display());

    let callback = Arc::clone(&options.callback);
    let db = runtime
        .spawn_blocking(move || Database::open_with(&path, &options))
        .await??;
    let db = Arc::new(db);

    if db.was_reset() {
        tracing::warn!("Store was rebuilt empty by the destructive fallback");
    }

    if db.needs_on_create() {
        let seed_db = Arc::clone(&db);
        runtime.spawn_blocking(move || {
            if let Err(e) = callback.on_create(&seed_db) {
                tracing::error!("Store on_create callback failed: {}", e);
            }
        });
    }

    Ok(db)
}

static DATABASE: LazyLock<StoreCell> = LazyLock::new(StoreCell::new);

/// Returns the process-wide store, opening it on first use.
///
/// Every caller in the process receives the same instance; arguments passed
/// after the first successful open are ignored.
pub async fn get_database(
    path: &Path,
    options: &OpenOptions,
    runtime: &Handle,
) -> StoreResult<Arc<Database>> {
    DATABASE.get_or_open(path, options, runtime).await
}

/// Runs a blocking store operation on tokio's blocking pool.
pub async fn with_database<F, T>(db: &Arc<Database>, f: F) -> StoreResult<T>
where
    F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(StoreError::from)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::StoreCallback;
    use crate::storage::migrations::{self, CURRENT_VERSION};
    use crate::storage::models::{Document, DocumentType};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Barrier, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    struct RecordingCallback {
        creates: AtomicUsize,
        opens: AtomicUsize,
        open_delay: Duration,
        created_tx: mpsc::UnboundedSender<()>,
    }

    impl RecordingCallback {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
            Self::with_open_delay(Duration::ZERO)
        }

        /// `on_open` sleeps for `open_delay`, keeping construction in flight.
        fn with_open_delay(open_delay: Duration) -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
            let (created_tx, created_rx) = mpsc::unbounded_channel();
            let callback = Arc::new(Self {
                creates: AtomicUsize::new(0),
                opens: AtomicUsize::new(0),
                open_delay,
                created_tx,
            });
            (callback, created_rx)
        }
    }

    impl StoreCallback for RecordingCallback {
        fn on_create(&self, _db: &Database) -> StoreResult<()> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            let _ = self.created_tx.send(());
            Ok(())
        }

        fn on_open(&self, _db: &Database) -> StoreResult<()> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.open_delay);
            Ok(())
        }
    }

    /// `on_create` parks until the test releases it.
    struct ParkedCreate {
        started_tx: mpsc::UnboundedSender<()>,
        release: Mutex<std::sync::mpsc::Receiver<()>>,
        finished: AtomicBool,
    }

    impl StoreCallback for ParkedCreate {
        fn on_create(&self, _db: &Database) -> StoreResult<()> {
            let _ = self.started_tx.send(());
            let release = self.release.lock().unwrap();
            let _ = release.recv_timeout(Duration::from_secs(10));
            self.finished.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn expect_signal(rx: &mut mpsc::UnboundedReceiver<()>, what: &str) {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap_or_else(|_| panic!("{what} should happen"))
            .expect("Channel closed");
    }

    #[test]
    fn test_concurrent_first_access_constructs_once() {
        const THREADS: usize = 16;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .expect("Failed to build runtime");
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let (callback, _created_rx) = RecordingCallback::new();
        let options = OpenOptions::default().callback(callback.clone());
        let cell = Arc::new(StoreCell::new());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let barrier = Arc::clone(&barrier);
                let handle = runtime.handle().clone();
                let path = path.clone();
                let options = options.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    handle
                        .block_on(cell.get_or_open(&path, &options, &handle))
                        .expect("Open should succeed")
                })
            })
            .collect();

        let instances: Vec<Arc<Database>> = handles
            .into_iter()
            .map(|h| h.join().expect("Thread panicked"))
            .collect();

        assert_eq!(
            callback.opens.load(Ordering::SeqCst),
            1,
            "Store must be constructed exactly once"
        );
        for db in &instances {
            assert!(Arc::ptr_eq(db, &instances[0]), "All callers share one instance");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_on_create_fires_once_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let (callback, mut created_rx) = RecordingCallback::new();
        let options = OpenOptions::default().callback(callback.clone());
        let runtime = Handle::current();

        let doc = Document::new("Networks Midterm", DocumentType::ExamPaper);
        {
            let cell = StoreCell::new();
            let db = cell.get_or_open(&path, &options, &runtime).await.unwrap();

            expect_signal(&mut created_rx, "on_create").await;
            assert_eq!(callback.creates.load(Ordering::SeqCst), 1);

            let inserted = doc.clone();
            with_database(&db, move |db| db.documents().insert(&inserted))
                .await
                .unwrap();
        }

        // Fresh cell over the same file: a process restart.
        let cell = StoreCell::new();
        let db = cell.get_or_open(&path, &options, &runtime).await.unwrap();

        assert!(!db.needs_on_create());
        let id = doc.id;
        let stored = with_database(&db, move |db| db.documents().get(&id))
            .await
            .unwrap();
        assert_eq!(stored.map(|d| d.title), Some(doc.title));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            callback.creates.load(Ordering::SeqCst),
            1,
            "on_create must not fire on reopen"
        );
        assert!(created_rx.try_recv().is_err());
        assert_eq!(callback.opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancelled_first_caller_does_not_abort_construction() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let (callback, mut created_rx) =
            RecordingCallback::with_open_delay(Duration::from_millis(300));
        let options = OpenOptions::default().callback(callback.clone());
        let runtime = Handle::current();
        let cell = StoreCell::new();

        let first = tokio::time::timeout(
            Duration::from_millis(50),
            cell.get_or_open(&path, &options, &runtime),
        )
        .await;
        assert!(first.is_err(), "First caller should give up before the open finishes");

        // Nobody is waiting, yet the open completes and on_create fires.
        expect_signal(&mut created_rx, "on_create after a cancelled caller").await;
        let mut stored = cell.get();
        for _ in 0..200 {
            if stored.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            stored = cell.get();
        }
        let stored = stored.expect("Construction should fill the cell on its own");

        let db = cell.get_or_open(&path, &options, &runtime).await.unwrap();
        assert!(Arc::ptr_eq(&db, &stored));
        assert!(db.needs_on_create(), "The shared store is the one that created the file");
        assert_eq!(callback.opens.load(Ordering::SeqCst), 1, "Store must be opened once");
        assert_eq!(callback.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_caller_waits_for_cancelled_construction() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let (callback, mut created_rx) =
            RecordingCallback::with_open_delay(Duration::from_millis(300));
        let options = OpenOptions::default().callback(callback.clone());
        let runtime = Handle::current();
        let cell = StoreCell::new();

        let _ = tokio::time::timeout(
            Duration::from_millis(50),
            cell.get_or_open(&path, &options, &runtime),
        )
        .await;
        let db = cell.get_or_open(&path, &options, &runtime).await.unwrap();

        assert!(db.needs_on_create());
        expect_signal(&mut created_rx, "on_create").await;
        assert_eq!(callback.opens.load(Ordering::SeqCst), 1);
        assert_eq!(callback.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_on_create_does_not_block_callers() {
        let dir = tempdir().unwrap();
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let callback = Arc::new(ParkedCreate {
            started_tx,
            release: Mutex::new(release_rx),
            finished: AtomicBool::new(false),
        });
        let options = OpenOptions::default().callback(callback.clone());
        let runtime = Handle::current();
        let cell = StoreCell::new();

        let db = tokio::time::timeout(
            Duration::from_secs(5),
            cell.get_or_open(&dir.path().join("store.db"), &options, &runtime),
        )
        .await
        .expect("get_or_open must not wait for on_create")
        .unwrap();
        expect_signal(&mut started_rx, "on_create start").await;

        let count = tokio::time::timeout(
            Duration::from_secs(5),
            with_database(&db, |db| db.documents().count()),
        )
        .await
        .expect("Queries must not wait for on_create")
        .unwrap();
        assert_eq!(count, 0);
        assert!(
            !callback.finished.load(Ordering::SeqCst),
            "on_create should still be parked"
        );

        release_tx.send(()).unwrap();
        for _ in 0..200 {
            if callback.finished.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(callback.finished.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_destructive_reset_fires_on_create_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            migrations::write_version(&conn, CURRENT_VERSION + 1).unwrap();
        }
        let (callback, mut created_rx) = RecordingCallback::new();
        let options = OpenOptions::default()
            .fallback_to_destructive(true)
            .callback(callback.clone());
        let runtime = Handle::current();
        let cell = StoreCell::new();

        let db = cell.get_or_open(&path, &options, &runtime).await.unwrap();
        assert!(db.was_reset());
        expect_signal(&mut created_rx, "on_create after reset").await;

        let again = cell.get_or_open(&path, &options, &runtime).await.unwrap();
        assert!(Arc::ptr_eq(&db, &again));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(callback.creates.load(Ordering::SeqCst), 1);
        assert!(created_rx.try_recv().is_err());
        assert_eq!(db.schema_version().unwrap(), CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_failed_open_leaves_cell_empty() {
        let dir = tempdir().unwrap();
        let options = OpenOptions::default();
        let runtime = Handle::current();
        let cell = StoreCell::new();

        // A directory cannot be opened as a database file.
        let result = cell.get_or_open(dir.path(), &options, &runtime).await;

        assert!(result.is_err());
        assert!(cell.get().is_none(), "Failed construction must not be cached");

        let db = cell
            .get_or_open(&dir.path().join("store.db"), &options, &runtime)
            .await
            .expect("Retry should succeed");
        assert!(Arc::ptr_eq(&db, &cell.get().unwrap()));
    }

    #[tokio::test]
    async fn test_global_handle_returns_same_instance() {
        let dir = tempdir().unwrap();
        let options = OpenOptions::default();
        let runtime = Handle::current();

        let first = get_database(&dir.path().join("global.db"), &options, &runtime)
            .await
            .unwrap();
        let second = get_database(&dir.path().join("ignored.db"), &options, &runtime)
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }
}
