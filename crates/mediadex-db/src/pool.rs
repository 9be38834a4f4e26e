//! Database connection pool management.
//!
//! Connection pooling for SQLite using r2d2. Every connection gets the
//! write-optimized pragma block applied before use; the pool initializer
//! also runs pending migrations.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use mediadex_common::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pragmas applied to every connection. Autocheckpointing is disabled, so
/// the writer checkpoints explicitly after each commit; page size only
/// takes effect on databases created by this connection.
const CONNECTION_PRAGMAS: &str = "\
    PRAGMA busy_timeout = 5000;
    PRAGMA page_size = 8192;
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA wal_autocheckpoint = 0;
    PRAGMA cache_spill = OFF;
    PRAGMA cache_size = -65536;
    PRAGMA temp_store = MEMORY;
    PRAGMA mmap_size = 67108864;
    PRAGMA foreign_keys = ON;
";

/// Initialize a new database pool with the given file path.
///
/// Creates the SQLite database file if it doesn't exist, applies the
/// pragma block on every connection, and runs pending migrations.
pub fn init_pool<P: AsRef<Path>>(db_path: P) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path.as_ref())
        .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
    build_pool(manager)
}

/// Initialize an in-memory database pool for testing.
///
/// All pooled connections share the same in-memory database; it is lost
/// when the pool is dropped.
pub fn init_memory_pool() -> Result<DbPool> {
    let manager =
        SqliteConnectionManager::memory().with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
    build_pool(manager)
}

fn build_pool(manager: SqliteConnectionManager) -> Result<DbPool> {
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::storage(format!("create connection pool: {}", e)))?;

    let conn = pool
        .get()
        .map_err(|e| Error::storage(format!("get connection for migrations: {}", e)))?;

    migrations::run_migrations(&conn)
        .map_err(|e| Error::storage(format!("run migrations: {}", e)))?;

    Ok(pool)
}

/// Get a connection from the pool.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::storage(format!("get connection from pool: {}", e)))
}
