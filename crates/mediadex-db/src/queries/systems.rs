//! System and catalog metadata queries.

use mediadex_common::{Error, Result};
use rusqlite::Connection;
use tracing::warn;

use super::{attach_tags, map_result_row, RESULT_COLUMNS, RESULT_FROM};
use crate::caches::media_count;
use crate::db_err;
use crate::models::{DuplicateGroup, SearchResult, SupportingMediaRow, System};

/// All systems present in the index.
pub fn indexed_systems(conn: &Connection) -> Result<Vec<System>> {
    let mut stmt = conn
        .prepare("SELECT DBID, SystemID, Name FROM Systems ORDER BY SystemID")
        .map_err(|e| db_err("list systems", e))?;
    let systems = stmt
        .query_map([], |row| {
            Ok(System {
                dbid: row.get(0)?,
                system_id: row.get(1)?,
                name: row.get(2)?,
            })
        })
        .map_err(|e| db_err("list systems", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| db_err("list systems", e))?;
    Ok(systems)
}

/// Whether a system has been indexed.
pub fn system_indexed(conn: &Connection, system_id: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM Systems WHERE SystemID = ?",
            [system_id],
            |row| row.get(0),
        )
        .map_err(|e| db_err("check system indexed", e))?;
    Ok(count > 0)
}

/// Total number of media rows, served through MediaCountCache. A cache
/// store failure is logged; the freshly computed count is still returned.
pub fn total_media_count(conn: &Connection) -> Result<i64> {
    if let Some(cached) = media_count::get(conn)? {
        return Ok(cached);
    }

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM Media", [], |row| row.get(0))
        .map_err(|e| db_err("count media", e))?;

    if let Err(e) = media_count::set(conn, count) {
        warn!(error = %e, "media count cache store failed");
    }
    Ok(count)
}

/// Look up one media row by DBID. Missing rows are an error, unlike
/// empty-result searches.
pub fn media_by_dbid(conn: &Connection, dbid: i64) -> Result<SearchResult> {
    let sql = format!("SELECT {RESULT_COLUMNS} {RESULT_FROM} WHERE Media.DBID = ?");
    let mut result = match conn.query_row(&sql, [dbid], map_result_row) {
        Ok(result) => result,
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            return Err(Error::not_found(format!("media {}", dbid)))
        }
        Err(e) => return Err(db_err("media by dbid", e)),
    };
    attach_tags(conn, std::slice::from_mut(&mut result))?;
    Ok(result)
}

/// Auxiliary files attached to a title, with their kind tags resolved.
pub fn supporting_media(conn: &Connection, media_title_dbid: i64) -> Result<Vec<SupportingMediaRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT SupportingMedia.DBID, SupportingMedia.MediaTitleDBID, \
             TagTypes.Type, Tags.Tag, SupportingMedia.Path \
             FROM SupportingMedia \
             INNER JOIN Tags ON Tags.DBID = SupportingMedia.TagDBID \
             INNER JOIN TagTypes ON TagTypes.DBID = Tags.TypeDBID \
             WHERE SupportingMedia.MediaTitleDBID = ? \
             ORDER BY SupportingMedia.DBID",
        )
        .map_err(|e| db_err("list supporting media", e))?;
    let rows = stmt
        .query_map([media_title_dbid], |row| {
            Ok(SupportingMediaRow {
                dbid: row.get(0)?,
                media_title_dbid: row.get(1)?,
                kind_type: row.get(2)?,
                kind: row.get(3)?,
                path: row.get(4)?,
            })
        })
        .map_err(|e| db_err("list supporting media", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| db_err("list supporting media", e))?;
    Ok(rows)
}

/// `(system, slug)` groups owning more than one media row, for audit.
pub fn duplicate_titles(conn: &Connection) -> Result<Vec<DuplicateGroup>> {
    let mut stmt = conn
        .prepare(
            "SELECT MediaTitles.SystemDBID, MediaTitles.Slug, COUNT(Media.DBID) \
             FROM MediaTitles \
             INNER JOIN Media ON Media.MediaTitleDBID = MediaTitles.DBID \
             GROUP BY MediaTitles.SystemDBID, MediaTitles.Slug \
             HAVING COUNT(Media.DBID) > 1 \
             ORDER BY COUNT(Media.DBID) DESC",
        )
        .map_err(|e| db_err("find duplicates", e))?;
    let groups = stmt
        .query_map([], |row| {
            Ok(DuplicateGroup {
                system_dbid: row.get(0)?,
                slug: row.get(1)?,
                count: row.get(2)?,
            })
        })
        .map_err(|e| db_err("find duplicates", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| db_err("find duplicates", e))?;
    Ok(groups)
}
