//! Read-side query operations.
//!
//! All searches share one joined row shape (Media × MediaTitles × Systems)
//! and a second pass that attaches tags to the returned rows in a single
//! IN query. The two-pass split avoids per-row temporary B-trees on large
//! catalogs; the contract is primary results first, tags best-effort.

pub mod random;
pub mod search;
pub mod slugs;
pub mod systems;

use std::collections::HashMap;

use mediadex_common::Result;
use rusqlite::{params_from_iter, Connection};

use crate::db_err;
use crate::models::{SearchResult, TagPair};

pub(crate) const RESULT_COLUMNS: &str = "Media.DBID, Media.MediaTitleDBID, Systems.SystemID, \
     MediaTitles.Name, MediaTitles.Slug, MediaTitles.SecondarySlug, Media.Path";

pub(crate) const RESULT_FROM: &str = "FROM Media \
     INNER JOIN MediaTitles ON MediaTitles.DBID = Media.MediaTitleDBID \
     INNER JOIN Systems ON Systems.DBID = Media.SystemDBID";

pub(crate) fn map_result_row(row: &rusqlite::Row) -> rusqlite::Result<SearchResult> {
    Ok(SearchResult {
        media_dbid: row.get(0)?,
        media_title_dbid: row.get(1)?,
        system_id: row.get(2)?,
        name: row.get(3)?,
        slug: row.get(4)?,
        secondary_slug: row.get(5)?,
        path: row.get(6)?,
        tags: Vec::new(),
        year: None,
    })
}

pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Fetch and attach tags for the given results in one IN query. The first
/// valid 4-digit year tag surfaces on the result's `year` field.
pub(crate) fn attach_tags(conn: &Connection, results: &mut [SearchResult]) -> Result<()> {
    if results.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = results.iter().map(|r| r.media_dbid).collect();
    let sql = format!(
        "SELECT MediaTags.MediaDBID, TagTypes.Type, Tags.Tag FROM MediaTags \
         INNER JOIN Tags ON Tags.DBID = MediaTags.TagDBID \
         INNER JOIN TagTypes ON TagTypes.DBID = Tags.TypeDBID \
         WHERE MediaTags.MediaDBID IN ({}) ORDER BY Tags.DBID",
        placeholders(ids.len())
    );

    let mut stmt = conn.prepare(&sql).map_err(|e| db_err("attach tags", e))?;
    let rows = stmt
        .query_map(params_from_iter(ids.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                TagPair {
                    tag_type: row.get(1)?,
                    tag: row.get(2)?,
                },
            ))
        })
        .map_err(|e| db_err("attach tags", e))?;

    let mut by_media: HashMap<i64, Vec<TagPair>> = HashMap::new();
    for row in rows {
        let (media_dbid, pair) = row.map_err(|e| db_err("attach tags", e))?;
        by_media.entry(media_dbid).or_default().push(pair);
    }

    for result in results.iter_mut() {
        result.tags = by_media.remove(&result.media_dbid).unwrap_or_default();
        result.year = extract_year(&result.tags);
    }
    Ok(())
}

fn valid_year(value: &str) -> bool {
    value.len() == 4
        && value.bytes().all(|b| b.is_ascii_digit())
        && matches!(value.as_bytes()[0], b'1' | b'2')
}

/// First valid 4-digit year among the tags, preferring year-typed tags.
pub(crate) fn extract_year(tags: &[TagPair]) -> Option<String> {
    tags.iter()
        .find(|t| t.tag_type == "year" && valid_year(&t.tag))
        .or_else(|| tags.iter().find(|t| valid_year(&t.tag)))
        .map(|t| t.tag.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(tag_type: &str, tag: &str) -> TagPair {
        TagPair {
            tag_type: tag_type.into(),
            tag: tag.into(),
        }
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn test_extract_year_prefers_year_type() {
        let tags = vec![pair("code", "1234"), pair("year", "1994")];
        assert_eq!(extract_year(&tags).as_deref(), Some("1994"));
    }

    #[test]
    fn test_extract_year_falls_back_to_any_type() {
        let tags = vec![pair("release", "1997"), pair("region", "usa")];
        assert_eq!(extract_year(&tags).as_deref(), Some("1997"));
    }

    #[test]
    fn test_extract_year_rejects_invalid() {
        let tags = vec![
            pair("year", "94"),
            pair("year", "19944"),
            pair("year", "abcd"),
            pair("year", "0999"),
        ];
        assert_eq!(extract_year(&tags), None);
    }
}
