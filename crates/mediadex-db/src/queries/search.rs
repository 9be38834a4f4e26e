//! Path-exact and multi-word filtered search.

use mediadex_common::{Error, Result, TagFilter};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::{attach_tags, map_result_row, placeholders, RESULT_COLUMNS, RESULT_FROM};
use crate::db_err;
use crate::models::{SearchPage, SearchResult};
use crate::tagfilter;

/// Parameters for [`search_media_with_filters`].
///
/// `variant_groups` is an AND-of-ORs: for each word position the media
/// must match at least one variant against its slug or secondary slug.
/// `raw_words` carries the unnormalized word per position for the
/// `include_name` widening used by non-Latin queries.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub systems: Vec<String>,
    pub variant_groups: Vec<Vec<String>>,
    pub raw_words: Vec<String>,
    pub tags: Vec<TagFilter>,
    /// Leading-character filter on the display name: "0-9", "#"
    /// (non-alphanumeric), or a specific letter.
    pub letter: Option<String>,
    /// Keyset cursor: only media with a DBID above this are returned.
    pub cursor: Option<i64>,
    pub limit: u32,
    /// Also match raw words against `Name`. Used for non-Latin scripts
    /// where slug variants lose too much information.
    pub include_name: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            systems: Vec::new(),
            variant_groups: Vec::new(),
            raw_words: Vec::new(),
            tags: Vec::new(),
            letter: None,
            cursor: None,
            limit: 100,
            include_name: false,
        }
    }
}

/// Exact, case-sensitive path lookup within the given systems. Paths are
/// unique, so this returns at most one row.
pub fn search_media_path_exact(
    conn: &Connection,
    systems: &[String],
    path: &str,
) -> Result<Vec<SearchResult>> {
    if systems.is_empty() {
        return Err(Error::invalid_argument("no systems provided"));
    }

    let sql = format!(
        "SELECT {RESULT_COLUMNS} {RESULT_FROM} \
         WHERE Systems.SystemID IN ({}) AND Media.Path = ? LIMIT 1",
        placeholders(systems.len())
    );

    let mut args: Vec<Value> = systems.iter().map(|s| Value::Text(s.clone())).collect();
    args.push(Value::Text(path.to_string()));

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| db_err("search media by path", e))?;
    let mut results: Vec<SearchResult> = stmt
        .query_map(params_from_iter(args.iter()), map_result_row)
        .map_err(|e| db_err("search media by path", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| db_err("search media by path", e))?;

    attach_tags(conn, &mut results)?;
    Ok(results)
}

/// Build the WHERE clause shared by filtered search and random-with-query.
/// Returns the clause text (without the WHERE keyword) and its args;
/// cursor and limit are left to the caller.
pub(crate) fn build_search_where(query: &SearchQuery) -> Result<(String, Vec<Value>)> {
    if query.systems.is_empty() {
        return Err(Error::invalid_argument("no systems provided"));
    }

    let mut sql = format!("Systems.SystemID IN ({})", placeholders(query.systems.len()));
    let mut args: Vec<Value> = query
        .systems
        .iter()
        .map(|s| Value::Text(s.clone()))
        .collect();

    for (position, group) in query.variant_groups.iter().enumerate() {
        if group.is_empty() {
            continue;
        }
        let mut alternatives = Vec::with_capacity(group.len() * 2 + 1);
        for variant in group {
            alternatives.push("MediaTitles.Slug LIKE ?");
            args.push(Value::Text(format!("%{}%", variant)));
            alternatives.push("MediaTitles.SecondarySlug LIKE ?");
            args.push(Value::Text(format!("%{}%", variant)));
        }
        if query.include_name {
            if let Some(raw) = query.raw_words.get(position) {
                alternatives.push("MediaTitles.Name LIKE ?");
                args.push(Value::Text(format!("%{}%", raw)));
            }
        }
        sql.push_str(&format!(" AND ({})", alternatives.join(" OR ")));
    }

    if let Some(letter) = query.letter.as_deref() {
        match letter {
            "0-9" => sql.push_str(" AND substr(MediaTitles.Name, 1, 1) BETWEEN '0' AND '9'"),
            "#" => sql.push_str(
                " AND upper(substr(MediaTitles.Name, 1, 1)) NOT BETWEEN 'A' AND 'Z' \
                 AND substr(MediaTitles.Name, 1, 1) NOT BETWEEN '0' AND '9'",
            ),
            _ => {
                sql.push_str(" AND upper(substr(MediaTitles.Name, 1, 1)) = ?");
                args.push(Value::Text(letter.to_uppercase()));
            }
        }
    }

    let (tag_clauses, tag_args) = tagfilter::compile(&query.tags);
    for clause in &tag_clauses {
        sql.push_str(" AND ");
        sql.push_str(clause);
    }
    args.extend(tag_args.into_iter().map(Value::Text));

    Ok((sql, args))
}

/// Tokenized slug search with tag filters, letter filter, and keyset
/// pagination.
///
/// The primary query returns at most `limit` rows ordered by media DBID; a
/// second pass attaches tags. When the tag pass fails the primary rows are
/// still returned, with the error alongside.
pub fn search_media_with_filters(conn: &Connection, query: &SearchQuery) -> Result<SearchPage> {
    let (where_sql, mut args) = build_search_where(query)?;

    let mut sql = format!("SELECT {RESULT_COLUMNS} {RESULT_FROM} WHERE {where_sql}");
    if let Some(cursor) = query.cursor {
        sql.push_str(" AND Media.DBID > ?");
        args.push(Value::Integer(cursor));
    }
    sql.push_str(" ORDER BY Media.DBID LIMIT ?");
    args.push(Value::Integer(i64::from(query.limit)));

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| db_err("search media", e))?;
    let mut results: Vec<SearchResult> = stmt
        .query_map(params_from_iter(args.iter()), map_result_row)
        .map_err(|e| db_err("search media", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| db_err("search media", e))?;

    match attach_tags(conn, &mut results) {
        Ok(()) => Ok(SearchPage {
            results,
            tag_error: None,
        }),
        Err(e) => Ok(SearchPage {
            results,
            tag_error: Some(e),
        }),
    }
}
