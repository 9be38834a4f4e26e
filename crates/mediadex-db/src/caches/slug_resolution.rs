//! Request-fingerprint cache for slug resolution.
//!
//! Keys fingerprint the whole resolution request: system id, normalized
//! slug, and the tag filter set, all case- and whitespace-insensitive and
//! independent of tag order. Entries reference Media with ON DELETE
//! CASCADE, so content removal invalidates them for free.

use mediadex_common::{Result, TagFilter};
use rusqlite::{params, params_from_iter, Connection};
use sha2::{Digest, Sha256};

use crate::db_err;
use crate::queries::placeholders;

const FIELD_SEPARATOR: u8 = 0x1f;

/// Compute the 64-hex cache key for a resolution request.
pub fn cache_key(system_id: &str, slug: &str, tags: &[TagFilter]) -> String {
    let mut serialized: Vec<String> = tags
        .iter()
        .map(|f| {
            format!(
                "{}={}:{}",
                f.tag_type.trim().to_lowercase(),
                f.value.trim().to_lowercase(),
                f.op
            )
        })
        .collect();
    serialized.sort();

    let mut hasher = Sha256::new();
    hasher.update(system_id.trim().to_lowercase().as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(slug.trim().to_lowercase().as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(serialized.join("\u{1f}").as_bytes());
    hex::encode(hasher.finalize())
}

/// Look up a cached resolution: `(media_dbid, strategy)`.
pub fn get(conn: &Connection, key: &str) -> Result<Option<(i64, String)>> {
    match conn.query_row(
        "SELECT MediaDBID, Strategy FROM SlugResolutionCache WHERE KeyHash = ?",
        [key],
        |row| Ok((row.get(0)?, row.get(1)?)),
    ) {
        Ok(hit) => Ok(Some(hit)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(db_err("read slug resolution cache", e)),
    }
}

/// Store a resolution, replacing any entry under the same key.
pub fn set(
    conn: &Connection,
    key: &str,
    system_id: &str,
    media_dbid: i64,
    strategy: &str,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO SlugResolutionCache (KeyHash, SystemID, MediaDBID, Strategy) \
         VALUES (?, ?, ?, ?)",
        params![key, system_id, media_dbid, strategy],
    )
    .map_err(|e| db_err("write slug resolution cache", e))?;
    Ok(())
}

/// Drop entries recorded for the given systems.
pub fn invalidate_for_systems(conn: &Connection, system_ids: &[String]) -> Result<()> {
    if system_ids.is_empty() {
        return Ok(());
    }
    let sql = format!(
        "DELETE FROM SlugResolutionCache WHERE SystemID IN ({})",
        placeholders(system_ids.len())
    );
    conn.execute(&sql, params_from_iter(system_ids.iter()))
        .map_err(|e| db_err("invalidate slug resolution cache", e))?;
    Ok(())
}

/// Drop every entry.
pub fn clear(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM SlugResolutionCache", [])
        .map_err(|e| db_err("clear slug resolution cache", e))?;
    Ok(())
}
