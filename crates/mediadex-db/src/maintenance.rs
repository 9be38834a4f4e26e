//! Truncation, orphan cleanup, and duplicate audit support.

use mediadex_common::{CancelToken, Error, Result};
use rusqlite::{params_from_iter, Connection};
use tracing::warn;

use crate::caches::{media_count, slug_resolution, system_tags};
use crate::db_err;
use crate::queries::placeholders;
use crate::config;

/// Content tables in reverse dependency order (children first). TagTypes
/// are global infrastructure and survive truncation.
const TRUNCATE_ORDER: &[&str] = &[
    "SlugResolutionCache",
    "SystemTagsCache",
    "MediaCountCache",
    "SupportingMedia",
    "MediaTitleTags",
    "MediaTags",
    "Media",
    "MediaTitles",
    "Systems",
    "Tags",
];

/// Delete all indexed content.
///
/// Foreign keys are disabled for the sweep so the deletes need not be
/// transactionally interleaved with cascade bookkeeping; the fixed
/// children-first order keeps the data consistent anyway.
pub fn truncate(conn: &Connection, cancel: &CancelToken) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = OFF")
        .map_err(|e| db_err("disable foreign keys", e))?;

    let result = truncate_tables(conn, cancel);

    if let Err(e) = conn.execute_batch("PRAGMA foreign_keys = ON") {
        warn!(error = %e, "re-enabling foreign keys failed");
    }
    result?;

    for key in [
        config::LAST_GENERATED_AT,
        config::INDEXING_STATUS,
        config::LAST_INDEXED_SYSTEM,
        config::INDEXING_SYSTEMS,
    ] {
        config::unset(conn, key)?;
    }
    Ok(())
}

fn truncate_tables(conn: &Connection, cancel: &CancelToken) -> Result<()> {
    for table in TRUNCATE_ORDER {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        conn.execute(&format!("DELETE FROM {table}"), [])
            .map_err(|e| db_err(&format!("truncate {table}"), e))?;
    }
    Ok(())
}

/// Delete the given systems and everything under them.
///
/// Child rows go through the declared cascades. Tags left unreferenced by
/// any link table are cleaned up afterwards; TagTypes are never deleted.
/// Cache invalidation failures are logged, never surfaced.
pub fn truncate_systems(
    conn: &Connection,
    system_ids: &[String],
    cancel: &CancelToken,
) -> Result<()> {
    if system_ids.is_empty() {
        return Err(Error::invalid_argument("no systems provided"));
    }
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let sql = format!(
        "DELETE FROM Systems WHERE SystemID IN ({})",
        placeholders(system_ids.len())
    );
    conn.execute(&sql, params_from_iter(system_ids.iter()))
        .map_err(|e| db_err("delete systems", e))?;

    cleanup_orphan_tags(conn)?;

    if let Err(e) = media_count::invalidate(conn) {
        warn!(error = %e, "media count cache invalidation failed");
    }
    if let Err(e) = system_tags::invalidate(conn, system_ids) {
        warn!(error = %e, "system tags cache invalidation failed");
    }
    if let Err(e) = slug_resolution::invalidate_for_systems(conn, system_ids) {
        warn!(error = %e, "slug resolution cache invalidation failed");
    }
    Ok(())
}

/// Delete tags no link table references anymore.
pub fn cleanup_orphan_tags(conn: &Connection) -> Result<()> {
    conn.execute(
        "DELETE FROM Tags WHERE DBID NOT IN (SELECT TagDBID FROM MediaTags) \
         AND DBID NOT IN (SELECT TagDBID FROM MediaTitleTags) \
         AND DBID NOT IN (SELECT TagDBID FROM SupportingMedia)",
        [],
    )
    .map_err(|e| db_err("cleanup orphan tags", e))?;
    Ok(())
}
