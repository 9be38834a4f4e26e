//! Row models matching the database schema, plus search result shapes.

use mediadex_common::Error;
use serde::{Deserialize, Serialize};

/// A platform partition (e.g. "NES").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct System {
    pub dbid: i64,
    pub system_id: String,
    pub name: String,
}

/// A canonical, system-scoped title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaTitle {
    pub dbid: i64,
    pub system_dbid: i64,
    pub slug: String,
    pub secondary_slug: Option<String>,
    pub name: String,
    pub slug_length: i64,
    pub slug_word_count: i64,
}

/// A single on-disk artifact belonging to a title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaRow {
    pub dbid: i64,
    pub media_title_dbid: i64,
    pub system_dbid: i64,
    pub path: String,
}

/// A `(type, value)` tag pair attached to a search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagPair {
    #[serde(rename = "type")]
    pub tag_type: String,
    pub tag: String,
}

/// One search hit, joined across Media, MediaTitles, and Systems. The media
/// DBID doubles as the pagination cursor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub media_dbid: i64,
    pub media_title_dbid: i64,
    pub system_id: String,
    pub name: String,
    pub slug: String,
    pub secondary_slug: Option<String>,
    pub path: String,
    pub tags: Vec<TagPair>,
    /// First valid 4-digit year among the attached tags.
    pub year: Option<String>,
}

/// Result of a filtered search: primary rows, plus the tag-attachment error
/// when the second pass failed. Rows are always usable; tags are
/// best-effort.
#[derive(Debug)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub tag_error: Option<Error>,
}

impl SearchPage {
    /// Cursor for the next page: the largest media DBID on this page.
    pub fn next_cursor(&self) -> Option<i64> {
        self.results.iter().map(|r| r.media_dbid).max()
    }
}

/// An auxiliary file (screenshot, manual) attached to a title, keyed by a
/// kind tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupportingMediaRow {
    pub dbid: i64,
    pub media_title_dbid: i64,
    pub kind_type: String,
    pub kind: String,
    pub path: String,
}

/// A `(system, slug)` group owning more than one media row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub system_dbid: i64,
    pub slug: String,
    pub count: i64,
}

/// Outcome of canonical slug resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub media_dbid: i64,
    /// Free-form label naming the strategy that produced the hit
    /// ("exact", "secondary", "prefix").
    pub strategy: String,
    pub from_cache: bool,
}

/// One row of the per-system distinct tag projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemTag {
    pub system_dbid: i64,
    pub tag_dbid: i64,
    pub tag_type: String,
    pub tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_cursor() {
        let page = SearchPage {
            results: vec![],
            tag_error: None,
        };
        assert_eq!(page.next_cursor(), None);

        let result = |dbid| SearchResult {
            media_dbid: dbid,
            media_title_dbid: 1,
            system_id: "NES".into(),
            name: "x".into(),
            slug: "x".into(),
            secondary_slug: None,
            path: format!("/roms/{dbid}"),
            tags: vec![],
            year: None,
        };
        let page = SearchPage {
            results: vec![result(3), result(9), result(5)],
            tag_error: None,
        };
        assert_eq!(page.next_cursor(), Some(9));
    }

    #[test]
    fn test_tag_pair_wire_shape() {
        let pair = TagPair {
            tag_type: "region".into(),
            tag: "usa".into(),
        };
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"{"type":"region","tag":"usa"}"#);
    }
}
