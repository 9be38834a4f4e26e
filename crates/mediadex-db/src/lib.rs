//! Mediadex-DB: the media indexing and query engine.
//!
//! SQLite-backed storage for large catalogs of media artifacts organized by
//! system, with normalized-slug search, tag filtering, a batched
//! transactional writer, derived caches, and a background optimization
//! lifecycle.
//!
//! # Modules
//!
//! - `pool` - Connection pool with write-optimized pragmas
//! - `migrations` - Embedded forward-only schema migrations
//! - `models` - Row and result types
//! - `batch` - Per-table batched inserts with dependency ordering
//! - `tagfilter` - Structured tag predicates lowered to SQL
//! - `writer` - The indexing transaction and its upsert helpers
//! - `queries` - Path, slug, filtered, random, and metadata queries
//! - `caches` - SystemTagsCache, SlugResolutionCache, MediaCountCache
//! - `optimize` - Background ANALYZE/VACUUM lifecycle with resume
//! - `maintenance` - Truncation, orphan cleanup, duplicate detection
//! - `config` - Typed access to the DBConfig key-value table
//! - `db` - The `MediaDb` owner tying the above together
//!
//! # Example
//!
//! ```no_run
//! use mediadex_db::MediaDb;
//! use mediadex_db::queries::search;
//!
//! let db = MediaDb::open("/var/lib/mediadex/index.db").unwrap();
//! let conn = db.conn().unwrap();
//! let results = search::search_media_path_exact(
//!     &conn,
//!     &["NES".to_string()],
//!     "/roms/nes/metroid.nes",
//! )
//! .unwrap();
//! println!("{} hit(s)", results.len());
//! ```

pub mod batch;
pub mod caches;
pub mod config;
pub mod db;
pub mod maintenance;
pub mod migrations;
pub mod models;
pub mod optimize;
pub mod pool;
pub mod queries;
pub mod tagfilter;
pub mod writer;

pub use db::MediaDb;
pub use models::*;
pub use pool::{DbPool, PooledConnection};
pub use writer::IndexTransaction;

use mediadex_common::Error;

/// Map a rusqlite error to the common error type, prefixing the failed
/// operation. Busy/locked conditions keep their own category so callers can
/// decide to retry.
pub(crate) fn db_err(op: &str, e: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(ffi, _) = &e {
        if matches!(
            ffi.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ) {
            return Error::busy(format!("{}: {}", op, e));
        }
    }
    Error::storage(format!("{}: {}", op, e))
}
