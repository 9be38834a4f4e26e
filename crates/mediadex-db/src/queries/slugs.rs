//! Canonical slug resolution within a single system.
//!
//! Inputs are re-slugified under the owning system's media type so the
//! lookup always compares stored forms. Resolution results feed the
//! SlugResolutionCache; the cache is purely an accelerator and its absence
//! never changes the outcome.

use mediadex_common::{Error, Result, SystemDefs, TagFilter};
use mediadex_slug::slugify;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::warn;

use super::{attach_tags, map_result_row, placeholders, RESULT_COLUMNS, RESULT_FROM};
use crate::caches::slug_resolution;
use crate::db_err;
use crate::models::{Resolution, SearchResult};
use crate::tagfilter;

/// Strategy labels recorded in the resolution cache.
pub const STRATEGY_EXACT: &str = "exact";
pub const STRATEGY_SECONDARY: &str = "secondary";
pub const STRATEGY_PREFIX: &str = "prefix";

fn lookup_media_type(
    defs: &dyn SystemDefs,
    system_id: &str,
) -> Result<mediadex_common::MediaType> {
    defs.media_type(system_id)
        .ok_or_else(|| Error::not_found(format!("system {}", system_id)))
}

fn run_slug_query(
    conn: &Connection,
    system_id: &str,
    slug_clause: &str,
    slug_args: Vec<Value>,
    tags: &[TagFilter],
) -> Result<Vec<SearchResult>> {
    let mut sql = format!(
        "SELECT {RESULT_COLUMNS} {RESULT_FROM} WHERE Systems.SystemID = ? AND {slug_clause}"
    );
    let mut args: Vec<Value> = vec![Value::Text(system_id.to_string())];
    args.extend(slug_args);

    let (tag_clauses, tag_args) = tagfilter::compile(tags);
    for clause in &tag_clauses {
        sql.push_str(" AND ");
        sql.push_str(clause);
    }
    args.extend(tag_args.into_iter().map(Value::Text));
    sql.push_str(" ORDER BY Media.DBID");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| db_err("search media by slug", e))?;
    let mut results: Vec<SearchResult> = stmt
        .query_map(params_from_iter(args.iter()), map_result_row)
        .map_err(|e| db_err("search media by slug", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| db_err("search media by slug", e))?;

    attach_tags(conn, &mut results)?;
    Ok(results)
}

/// Exact slug match.
pub fn search_media_by_slug(
    conn: &Connection,
    defs: &dyn SystemDefs,
    system_id: &str,
    query: &str,
    tags: &[TagFilter],
) -> Result<Vec<SearchResult>> {
    let media_type = lookup_media_type(defs, system_id)?;
    let slug = slugify(media_type, query);
    run_slug_query(
        conn,
        system_id,
        "MediaTitles.Slug = ?",
        vec![Value::Text(slug)],
        tags,
    )
}

/// Exact match against the post-separator secondary slug.
pub fn search_media_by_secondary_slug(
    conn: &Connection,
    defs: &dyn SystemDefs,
    system_id: &str,
    query: &str,
    tags: &[TagFilter],
) -> Result<Vec<SearchResult>> {
    let media_type = lookup_media_type(defs, system_id)?;
    let slug = slugify(media_type, query);
    run_slug_query(
        conn,
        system_id,
        "MediaTitles.SecondarySlug = ?",
        vec![Value::Text(slug)],
        tags,
    )
}

/// Slug prefix match. Slugs contain no LIKE metacharacters, so the prefix
/// can be appended directly.
pub fn search_media_by_slug_prefix(
    conn: &Connection,
    defs: &dyn SystemDefs,
    system_id: &str,
    query: &str,
    tags: &[TagFilter],
) -> Result<Vec<SearchResult>> {
    let media_type = lookup_media_type(defs, system_id)?;
    let slug = slugify(media_type, query);
    run_slug_query(
        conn,
        system_id,
        "MediaTitles.Slug LIKE ?",
        vec![Value::Text(format!("{}%", slug))],
        tags,
    )
}

/// Match any of the given inputs after normalization.
pub fn search_media_by_slug_in(
    conn: &Connection,
    defs: &dyn SystemDefs,
    system_id: &str,
    queries: &[String],
    tags: &[TagFilter],
) -> Result<Vec<SearchResult>> {
    if queries.is_empty() {
        return Ok(Vec::new());
    }
    let media_type = lookup_media_type(defs, system_id)?;
    let clause = format!("MediaTitles.Slug IN ({})", placeholders(queries.len()));
    let args: Vec<Value> = queries
        .iter()
        .map(|q| Value::Text(slugify(media_type, q)))
        .collect();
    run_slug_query(conn, system_id, &clause, args, tags)
}

/// Resolve a query to a single media row for launching.
///
/// Consults the resolution cache first, then falls through exact →
/// secondary → prefix, caching the winning strategy. A cache write failure
/// is logged and ignored: the cache only accelerates, it never decides.
pub fn resolve_slug(
    conn: &Connection,
    defs: &dyn SystemDefs,
    system_id: &str,
    query: &str,
    tags: &[TagFilter],
) -> Result<Option<Resolution>> {
    let media_type = lookup_media_type(defs, system_id)?;
    let slug = slugify(media_type, query);
    let key = slug_resolution::cache_key(system_id, &slug, tags);

    if let Some((media_dbid, strategy)) = slug_resolution::get(conn, &key)? {
        return Ok(Some(Resolution {
            media_dbid,
            strategy,
            from_cache: true,
        }));
    }

    let hit = first_of(conn, defs, system_id, query, tags)?;
    let Some((media_dbid, strategy)) = hit else {
        return Ok(None);
    };

    if let Err(e) = slug_resolution::set(conn, &key, system_id, media_dbid, strategy) {
        warn!(error = %e, system_id, "slug resolution cache write failed");
    }

    Ok(Some(Resolution {
        media_dbid,
        strategy: strategy.to_string(),
        from_cache: false,
    }))
}

fn first_of(
    conn: &Connection,
    defs: &dyn SystemDefs,
    system_id: &str,
    query: &str,
    tags: &[TagFilter],
) -> Result<Option<(i64, &'static str)>> {
    if let Some(hit) = search_media_by_slug(conn, defs, system_id, query, tags)?.first() {
        return Ok(Some((hit.media_dbid, STRATEGY_EXACT)));
    }
    if let Some(hit) =
        search_media_by_secondary_slug(conn, defs, system_id, query, tags)?.first()
    {
        return Ok(Some((hit.media_dbid, STRATEGY_SECONDARY)));
    }
    if let Some(hit) = search_media_by_slug_prefix(conn, defs, system_id, query, tags)?.first() {
        return Ok(Some((hit.media_dbid, STRATEGY_PREFIX)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediadex_common::{MapSystemDefs, MediaType};
    use crate::pool::{get_conn, init_memory_pool, DbPool};
    use crate::writer::IndexTransaction;

    fn defs() -> MapSystemDefs {
        [("NES", MediaType::Game)].into_iter().collect()
    }

    fn seed() -> DbPool {
        let pool = init_memory_pool().unwrap();
        let tx = IndexTransaction::begin(&pool).unwrap();
        let nes = tx.upsert_system("NES", "Nintendo").unwrap();
        let zelda = tx
            .upsert_media_title(nes, MediaType::Game, "The Legend of Zelda: Ocarina of Time")
            .unwrap();
        let mario = tx
            .upsert_media_title(nes, MediaType::Game, "Super Mario Bros.")
            .unwrap();
        tx.add_media(zelda, nes, "/roms/nes/zelda-oot.nes").unwrap();
        tx.add_media(mario, nes, "/roms/nes/mario.nes").unwrap();
        tx.commit().unwrap();
        pool
    }

    #[test]
    fn test_unknown_system_is_not_found() {
        let pool = seed();
        let conn = get_conn(&pool).unwrap();
        let err = search_media_by_slug(&conn, &defs(), "C64", "mario", &[]).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_exact_slug_via_reslugify() {
        let pool = seed();
        let conn = get_conn(&pool).unwrap();

        // Raw title input normalizes to the stored slug.
        let hits =
            search_media_by_slug(&conn, &defs(), "NES", "Super Mario Bros.", &[]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "/roms/nes/mario.nes");

        // Already-normalized input matches too.
        let hits = search_media_by_slug(&conn, &defs(), "NES", "super mario bros", &[]).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_secondary_slug_lookup() {
        let pool = seed();
        let conn = get_conn(&pool).unwrap();
        let hits =
            search_media_by_secondary_slug(&conn, &defs(), "NES", "Ocarina of Time", &[])
                .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "/roms/nes/zelda-oot.nes");
    }

    #[test]
    fn test_prefix_and_in_lookup() {
        let pool = seed();
        let conn = get_conn(&pool).unwrap();

        let hits = search_media_by_slug_prefix(&conn, &defs(), "NES", "super mario", &[]).unwrap();
        assert_eq!(hits.len(), 1);

        let hits = search_media_by_slug_in(
            &conn,
            &defs(),
            "NES",
            &["Super Mario Bros.".to_string(), "nothing".to_string()],
            &[],
        )
        .unwrap();
        assert_eq!(hits.len(), 1);

        let hits = search_media_by_slug_in(&conn, &defs(), "NES", &[], &[]).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_resolve_populates_cache() {
        let pool = seed();
        let conn = get_conn(&pool).unwrap();

        let first = resolve_slug(&conn, &defs(), "NES", "Super Mario Bros.", &[])
            .unwrap()
            .unwrap();
        assert_eq!(first.strategy, STRATEGY_EXACT);
        assert!(!first.from_cache);

        let second = resolve_slug(&conn, &defs(), "NES", "Super Mario Bros.", &[])
            .unwrap()
            .unwrap();
        assert_eq!(second.media_dbid, first.media_dbid);
        assert_eq!(second.strategy, STRATEGY_EXACT);
        assert!(second.from_cache);
    }

    #[test]
    fn test_resolve_falls_through_strategies() {
        let pool = seed();
        let conn = get_conn(&pool).unwrap();

        let by_secondary = resolve_slug(&conn, &defs(), "NES", "Ocarina of Time", &[])
            .unwrap()
            .unwrap();
        assert_eq!(by_secondary.strategy, STRATEGY_SECONDARY);

        let by_prefix = resolve_slug(&conn, &defs(), "NES", "super mario", &[])
            .unwrap()
            .unwrap();
        assert_eq!(by_prefix.strategy, STRATEGY_PREFIX);

        let miss = resolve_slug(&conn, &defs(), "NES", "does not exist", &[]).unwrap();
        assert!(miss.is_none());
    }
}
