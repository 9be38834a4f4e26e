//! The `MediaDb` owner: open/close lifecycle, the optimizer gate, and
//! background thread bookkeeping.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use mediadex_common::{CancelToken, Error, OptimizationStatus, Result};
use tracing::{info, warn};

use crate::config;
use crate::db_err;
use crate::maintenance;
use crate::optimize::{self, OptimizeNotify, Optimizer};
use crate::pool::{self, DbPool, PooledConnection};
use crate::writer::IndexTransaction;

/// An open media index database.
///
/// Reads run concurrently through pooled connections; writes go through
/// [`begin_index`](Self::begin_index). The optimizer runs on a background
/// thread tracked here so [`close`](Self::close) can wait for it.
pub struct MediaDb {
    pool: DbPool,
    optimizing: Arc<AtomicBool>,
    cancel: CancelToken,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl MediaDb {
    /// Open (creating if missing) the database at `path`, apply pending
    /// migrations, and resume an interrupted optimization run if the
    /// persisted status calls for it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Self::from_pool(pool::init_pool(path)?);
        db.post_open()?;
        Ok(db)
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self> {
        let db = Self::from_pool(pool::init_memory_pool()?);
        db.post_open()?;
        Ok(db)
    }

    fn from_pool(pool: DbPool) -> Self {
        Self {
            pool,
            optimizing: Arc::new(AtomicBool::new(false)),
            cancel: CancelToken::new(),
            background: Mutex::new(Vec::new()),
        }
    }

    fn post_open(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("PRAGMA optimize;")
            .map_err(|e| db_err("pragma optimize", e))?;

        let status = config::optimization_status(&conn)?;
        drop(conn);

        if optimize::should_resume(status) {
            info!(?status, "resuming optimization at open");
            self.optimize(None)?;
        }
        Ok(())
    }

    /// The underlying pool, for callers composing their own queries.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get a read connection from the pool.
    pub fn conn(&self) -> Result<PooledConnection> {
        pool::get_conn(&self.pool)
    }

    /// Begin an indexing transaction.
    ///
    /// Refused while the optimizer runs; callers retry once optimization
    /// finishes. Indexing transactions are not queued here.
    pub fn begin_index(&self) -> Result<IndexTransaction> {
        if self.is_optimizing() {
            return Err(Error::busy("optimization in progress"));
        }
        IndexTransaction::begin(&self.pool)
    }

    /// Kick off the optimization sequence on a background thread. Returns
    /// once the thread is spawned; a run already in flight makes the new
    /// thread a no-op.
    pub fn optimize(&self, notify: Option<OptimizeNotify>) -> Result<()> {
        let optimizer = Optimizer::new(
            self.pool.clone(),
            Arc::clone(&self.optimizing),
            self.cancel.clone(),
        );
        let handle = std::thread::spawn(move || {
            if let Err(e) = optimizer.run(notify) {
                warn!(error = %e, "background optimization failed");
            }
        });
        self.background.lock().unwrap().push(handle);
        Ok(())
    }

    /// Whether an optimization run currently holds the gate.
    pub fn is_optimizing(&self) -> bool {
        self.optimizing.load(Ordering::Acquire)
    }

    /// Persisted optimization status.
    pub fn optimization_status(&self) -> Result<OptimizationStatus> {
        config::optimization_status(&*self.conn()?)
    }

    /// Delete all indexed content. See [`maintenance::truncate`].
    pub fn truncate(&self) -> Result<()> {
        maintenance::truncate(&*self.conn()?, &self.cancel)
    }

    /// Delete the given systems and their content. See
    /// [`maintenance::truncate_systems`].
    pub fn truncate_systems(&self, system_ids: &[String]) -> Result<()> {
        maintenance::truncate_systems(&*self.conn()?, system_ids, &self.cancel)
    }

    /// Cancel background work and wait for it before releasing the pool.
    pub fn close(self) -> Result<()> {
        self.cancel.cancel();
        let handles = std::mem::take(&mut *self.background.lock().unwrap());
        for handle in handles {
            if handle.join().is_err() {
                warn!("background thread panicked during close");
            }
        }
        Ok(())
    }
}
