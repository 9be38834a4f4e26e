//! The indexing transaction.
//!
//! All catalog writes go through one `IndexTransaction`: a dedicated pooled
//! connection holding an immediate write transaction. The fixed insert
//! statements are prepared up front through the connection's statement
//! cache and reused for every row. Commit checkpoints the WAL explicitly
//! because autocheckpointing is disabled at the connection.

use std::cell::RefCell;
use std::collections::HashSet;

use mediadex_common::{Error, MediaType, Result};
use mediadex_slug::slug_with_metadata;
use rusqlite::{params, Connection};
use tracing::warn;

use crate::batch::BatchInserter;
use crate::db_err;
use crate::pool::{get_conn, DbPool, PooledConnection};
use crate::{caches, config};

const INSERT_SYSTEM: &str = "INSERT OR IGNORE INTO Systems (SystemID, Name) VALUES (?, ?)";
const SELECT_SYSTEM: &str = "SELECT DBID FROM Systems WHERE SystemID = ?";
const INSERT_MEDIA_TITLE: &str = "INSERT OR IGNORE INTO MediaTitles \
     (SystemDBID, Slug, SecondarySlug, Name, SlugLength, SlugWordCount) \
     VALUES (?, ?, ?, ?, ?, ?)";
const SELECT_MEDIA_TITLE: &str =
    "SELECT DBID FROM MediaTitles WHERE SystemDBID = ? AND Slug = ?";
const INSERT_MEDIA: &str =
    "INSERT OR IGNORE INTO Media (MediaTitleDBID, SystemDBID, Path) VALUES (?, ?, ?)";
const SELECT_MEDIA: &str = "SELECT DBID FROM Media WHERE Path = ?";
const INSERT_TAG_TYPE: &str = "INSERT OR IGNORE INTO TagTypes (Type) VALUES (?)";
const SELECT_TAG_TYPE: &str = "SELECT DBID FROM TagTypes WHERE Type = ?";
const INSERT_TAG: &str = "INSERT OR IGNORE INTO Tags (TypeDBID, Tag) VALUES (?, ?)";
const SELECT_TAG: &str = "SELECT DBID FROM Tags WHERE TypeDBID = ? AND Tag = ?";
const INSERT_MEDIA_TAG: &str =
    "INSERT OR IGNORE INTO MediaTags (MediaDBID, TagDBID) VALUES (?, ?)";
const INSERT_MEDIA_TITLE_TAG: &str =
    "INSERT OR IGNORE INTO MediaTitleTags (MediaTitleDBID, TagDBID) VALUES (?, ?)";
const INSERT_SUPPORTING_MEDIA: &str = "INSERT OR IGNORE INTO SupportingMedia \
     (MediaTitleDBID, TagDBID, Path) VALUES (?, ?, ?)";

/// Statements warmed at begin so a broken schema surfaces before any write.
const PREPARED_STATEMENTS: &[&str] = &[
    INSERT_SYSTEM,
    INSERT_MEDIA_TITLE,
    INSERT_MEDIA,
    INSERT_TAG_TYPE,
    INSERT_TAG,
    INSERT_MEDIA_TAG,
];

/// A write transaction over the catalog.
///
/// Commit and rollback consume the transaction; dropping an uncommitted
/// transaction rolls it back.
pub struct IndexTransaction {
    conn: PooledConnection,
    active: bool,
    touched_systems: RefCell<HashSet<i64>>,
}

impl IndexTransaction {
    /// Take a connection from the pool and open an immediate write
    /// transaction, preparing the fixed insert statements. Preparation
    /// failure rolls the transaction back.
    pub fn begin(pool: &DbPool) -> Result<Self> {
        let conn = get_conn(pool)?;
        conn.set_prepared_statement_cache_capacity(32);
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| db_err("begin index transaction", e))?;

        for sql in PREPARED_STATEMENTS {
            if let Err(e) = conn.prepare_cached(sql) {
                if let Err(rb) = conn.execute_batch("ROLLBACK") {
                    warn!(error = %rb, "rollback after failed statement preparation");
                }
                return Err(db_err("prepare index statements", e));
            }
        }

        Ok(Self {
            conn,
            active: true,
            touched_systems: RefCell::new(HashSet::new()),
        })
    }

    /// The underlying connection, for batch inserters and ad-hoc statements
    /// inside the transaction.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create a batch inserter running inside this transaction.
    pub fn batch_inserter(
        &self,
        table: &str,
        columns: &[&str],
        batch_size: usize,
        or_ignore: bool,
    ) -> Result<BatchInserter<'_>> {
        BatchInserter::new(&self.conn, table, columns, batch_size, or_ignore)
    }

    /// Insert a system if missing and return its DBID.
    pub fn upsert_system(&self, system_id: &str, name: &str) -> Result<i64> {
        self.conn
            .prepare_cached(INSERT_SYSTEM)
            .and_then(|mut stmt| stmt.execute(params![system_id, name]))
            .map_err(|e| db_err("insert system", e))?;

        let dbid = self
            .conn
            .prepare_cached(SELECT_SYSTEM)
            .and_then(|mut stmt| stmt.query_row([system_id], |row| row.get(0)))
            .map_err(|e| db_err("select system", e))?;

        self.touched_systems.borrow_mut().insert(dbid);
        Ok(dbid)
    }

    /// Normalize a raw title under the system's media type, insert the
    /// title row if missing, and return its DBID.
    pub fn upsert_media_title(
        &self,
        system_dbid: i64,
        media_type: MediaType,
        name: &str,
    ) -> Result<i64> {
        let meta = slug_with_metadata(media_type, name);

        self.conn
            .prepare_cached(INSERT_MEDIA_TITLE)
            .and_then(|mut stmt| {
                stmt.execute(params![
                    system_dbid,
                    meta.slug,
                    meta.secondary_slug,
                    name,
                    meta.slug_length,
                    meta.slug_word_count,
                ])
            })
            .map_err(|e| db_err("insert media title", e))?;

        let dbid = self
            .conn
            .prepare_cached(SELECT_MEDIA_TITLE)
            .and_then(|mut stmt| {
                stmt.query_row(params![system_dbid, meta.slug], |row| row.get(0))
            })
            .map_err(|e| db_err("select media title", e))?;

        self.touched_systems.borrow_mut().insert(system_dbid);
        Ok(dbid)
    }

    /// Insert a media row if missing and return its DBID.
    pub fn add_media(&self, media_title_dbid: i64, system_dbid: i64, path: &str) -> Result<i64> {
        self.conn
            .prepare_cached(INSERT_MEDIA)
            .and_then(|mut stmt| stmt.execute(params![media_title_dbid, system_dbid, path]))
            .map_err(|e| db_err("insert media", e))?;

        let dbid = self
            .conn
            .prepare_cached(SELECT_MEDIA)
            .and_then(|mut stmt| stmt.query_row([path], |row| row.get(0)))
            .map_err(|e| db_err("select media", e))?;

        self.touched_systems.borrow_mut().insert(system_dbid);
        Ok(dbid)
    }

    /// Insert a tag (and its type) if missing and return the tag DBID.
    pub fn upsert_tag(&self, tag_type: &str, tag: &str) -> Result<i64> {
        self.conn
            .prepare_cached(INSERT_TAG_TYPE)
            .and_then(|mut stmt| stmt.execute([tag_type]))
            .map_err(|e| db_err("insert tag type", e))?;

        let type_dbid: i64 = self
            .conn
            .prepare_cached(SELECT_TAG_TYPE)
            .and_then(|mut stmt| stmt.query_row([tag_type], |row| row.get(0)))
            .map_err(|e| db_err("select tag type", e))?;

        self.conn
            .prepare_cached(INSERT_TAG)
            .and_then(|mut stmt| stmt.execute(params![type_dbid, tag]))
            .map_err(|e| db_err("insert tag", e))?;

        self.conn
            .prepare_cached(SELECT_TAG)
            .and_then(|mut stmt| stmt.query_row(params![type_dbid, tag], |row| row.get(0)))
            .map_err(|e| db_err("select tag", e))
    }

    /// Link a tag to a media row.
    pub fn tag_media(&self, media_dbid: i64, tag_dbid: i64) -> Result<()> {
        self.conn
            .prepare_cached(INSERT_MEDIA_TAG)
            .and_then(|mut stmt| stmt.execute(params![media_dbid, tag_dbid]))
            .map_err(|e| db_err("insert media tag", e))?;
        Ok(())
    }

    /// Link a tag to a media title.
    pub fn tag_media_title(&self, media_title_dbid: i64, tag_dbid: i64) -> Result<()> {
        self.conn
            .prepare_cached(INSERT_MEDIA_TITLE_TAG)
            .and_then(|mut stmt| stmt.execute(params![media_title_dbid, tag_dbid]))
            .map_err(|e| db_err("insert media title tag", e))?;
        Ok(())
    }

    /// Attach an auxiliary file (screenshot, manual) to a title, keyed by a
    /// kind tag.
    pub fn add_supporting_media(
        &self,
        media_title_dbid: i64,
        kind_tag_dbid: i64,
        path: &str,
    ) -> Result<()> {
        self.conn
            .prepare_cached(INSERT_SUPPORTING_MEDIA)
            .and_then(|mut stmt| stmt.execute(params![media_title_dbid, kind_tag_dbid, path]))
            .map_err(|e| db_err("insert supporting media", e))?;
        Ok(())
    }

    /// Commit the transaction.
    ///
    /// Derived caches covering the touched systems are invalidated inside
    /// the transaction, the generation timestamp is stamped, and after a
    /// successful commit the WAL is checkpointed. Commit failure triggers a
    /// rollback attempt whose own failure is merged into the error.
    pub fn commit(mut self) -> Result<()> {
        let invalidation = self.invalidate_derived_caches();
        if let Err(e) = invalidation {
            let _ = self.conn.execute_batch("ROLLBACK");
            self.active = false;
            return Err(e);
        }

        if let Err(e) = self.conn.execute_batch("COMMIT") {
            let commit_err = db_err("commit index transaction", e);
            self.active = false;
            return match self.conn.execute_batch("ROLLBACK") {
                Ok(()) => Err(commit_err),
                Err(rb) => Err(Error::storage(format!(
                    "{}; rollback also failed: {}",
                    commit_err, rb
                ))),
            };
        }
        self.active = false;

        // Autocheckpointing is off; bound the WAL here. A checkpoint
        // failure is logged, never surfaced.
        if let Err(e) = self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);") {
            warn!(error = %e, "WAL checkpoint after commit failed");
        }

        Ok(())
    }

    /// Roll the transaction back, discarding all buffered writes.
    pub fn rollback(mut self) -> Result<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| db_err("rollback index transaction", e))?;
        self.active = false;
        Ok(())
    }

    fn invalidate_derived_caches(&self) -> Result<()> {
        let touched: Vec<i64> = self.touched_systems.borrow().iter().copied().collect();
        caches::system_tags::invalidate_dbids(&self.conn, &touched)?;
        caches::media_count::invalidate(&self.conn)?;
        config::touch_last_generated_at(&self.conn)?;
        Ok(())
    }
}

impl Drop for IndexTransaction {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "rollback of dropped index transaction failed");
            }
            self.active = false;
        }
    }
}
