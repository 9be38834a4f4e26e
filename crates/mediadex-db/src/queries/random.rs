//! Uniform random selection without table scans.
//!
//! Selection samples a target DBID in `[min, max]` and resolves it in
//! O(log n): an exact hit wins; a target landing in a DBID gap wraps to
//! the last row below it; a target below the first matching row falls
//! forward to the first row at or above. On densely packed DBIDs every
//! row is an exact hit, which keeps the draw uniform.

use mediadex_common::{Error, Result};
use rand::Rng;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::search::{build_search_where, SearchQuery};
use super::{attach_tags, map_result_row, placeholders, RESULT_COLUMNS, RESULT_FROM};
use crate::db_err;
use crate::models::SearchResult;

struct Bounds {
    min: i64,
    max: i64,
}

fn query_bounds(conn: &Connection, where_sql: &str, args: &[Value]) -> Result<Option<Bounds>> {
    let sql = format!(
        "SELECT COUNT(Media.DBID), MIN(Media.DBID), MAX(Media.DBID) {RESULT_FROM} \
         WHERE {where_sql}"
    );
    let (count, min, max): (i64, Option<i64>, Option<i64>) = conn
        .query_row(&sql, params_from_iter(args.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .map_err(|e| db_err("random selection bounds", e))?;

    match (count, min, max) {
        (0, _, _) => Ok(None),
        (_, Some(min), Some(max)) => Ok(Some(Bounds { min, max })),
        _ => Ok(None),
    }
}

fn query_one(
    conn: &Connection,
    where_sql: &str,
    args: &[Value],
    suffix: &str,
    target: i64,
) -> Result<Option<SearchResult>> {
    let sql = format!("SELECT {RESULT_COLUMNS} {RESULT_FROM} WHERE {where_sql} {suffix}");
    let mut full_args: Vec<Value> = args.to_vec();
    full_args.push(Value::Integer(target));

    let mut stmt = conn.prepare(&sql).map_err(|e| db_err("random selection", e))?;
    let mut rows = stmt
        .query_map(params_from_iter(full_args.iter()), map_result_row)
        .map_err(|e| db_err("random selection", e))?;

    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| db_err("random selection", e))?)),
        None => Ok(None),
    }
}

/// Resolve a sampled target DBID against the filtered row set.
pub(crate) fn select_by_target(
    conn: &Connection,
    where_sql: &str,
    args: &[Value],
    target: i64,
) -> Result<Option<SearchResult>> {
    if let Some(hit) = query_one(conn, where_sql, args, "AND Media.DBID = ?", target)? {
        return Ok(Some(hit));
    }
    if let Some(hit) = query_one(
        conn,
        where_sql,
        args,
        "AND Media.DBID < ? ORDER BY Media.DBID DESC LIMIT 1",
        target,
    )? {
        return Ok(Some(hit));
    }
    query_one(
        conn,
        where_sql,
        args,
        "AND Media.DBID >= ? ORDER BY Media.DBID LIMIT 1",
        target,
    )
}

fn random_from_where(
    conn: &Connection,
    where_sql: &str,
    args: &[Value],
) -> Result<Option<SearchResult>> {
    let Some(bounds) = query_bounds(conn, where_sql, args)? else {
        return Ok(None);
    };

    let target = rand::thread_rng().gen_range(bounds.min..=bounds.max);
    let Some(mut result) = select_by_target(conn, where_sql, args, target)? else {
        return Ok(None);
    };

    attach_tags(conn, std::slice::from_mut(&mut result))?;
    Ok(Some(result))
}

/// Pick one media row uniformly from the given systems.
pub fn random_media(conn: &Connection, systems: &[String]) -> Result<Option<SearchResult>> {
    if systems.is_empty() {
        return Err(Error::invalid_argument("no systems provided"));
    }
    let where_sql = format!("Systems.SystemID IN ({})", placeholders(systems.len()));
    let args: Vec<Value> = systems.iter().map(|s| Value::Text(s.clone())).collect();
    random_from_where(conn, &where_sql, &args)
}

/// Pick one media row uniformly from the rows matching a search query.
/// Cursor and limit on the query are ignored.
pub fn random_media_with_query(
    conn: &Connection,
    query: &SearchQuery,
) -> Result<Option<SearchResult>> {
    let (where_sql, args) = build_search_where(query)?;
    random_from_where(conn, &where_sql, &args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediadex_common::MediaType;
    use crate::pool::{get_conn, init_memory_pool, DbPool};
    use crate::writer::IndexTransaction;

    /// Seed media rows with explicit, gappy DBIDs.
    fn seed_with_dbids(dbids: &[i64]) -> DbPool {
        let pool = init_memory_pool().unwrap();
        let tx = IndexTransaction::begin(&pool).unwrap();
        let nes = tx.upsert_system("NES", "Nintendo").unwrap();
        let title = tx.upsert_media_title(nes, MediaType::Game, "Metroid").unwrap();
        for dbid in dbids {
            tx.connection()
                .execute(
                    "INSERT INTO Media (DBID, MediaTitleDBID, SystemDBID, Path) \
                     VALUES (?, ?, ?, ?)",
                    rusqlite::params![dbid, title, nes, format!("/roms/nes/m{dbid}.nes")],
                )
                .unwrap();
        }
        tx.commit().unwrap();
        pool
    }

    #[test]
    fn test_empty_systems_rejected() {
        let pool = seed_with_dbids(&[1]);
        let conn = get_conn(&pool).unwrap();
        assert!(random_media(&conn, &[]).is_err());
    }

    #[test]
    fn test_empty_result_set_is_none() {
        let pool = seed_with_dbids(&[1]);
        let conn = get_conn(&pool).unwrap();
        let pick = random_media(&conn, &["SNES".to_string()]).unwrap();
        assert!(pick.is_none());
    }

    #[test]
    fn test_exact_target_hit() {
        let pool = seed_with_dbids(&[10, 11, 50]);
        let conn = get_conn(&pool).unwrap();
        let args = vec![Value::Text("NES".to_string())];

        let hit = select_by_target(&conn, "Systems.SystemID IN (?)", &args, 11)
            .unwrap()
            .unwrap();
        assert_eq!(hit.media_dbid, 11);
    }

    #[test]
    fn test_gap_target_wraps_to_predecessor() {
        let pool = seed_with_dbids(&[10, 11, 50]);
        let conn = get_conn(&pool).unwrap();
        let args = vec![Value::Text("NES".to_string())];

        // Target 30 falls in the 11..50 gap and wraps back to 11.
        let hit = select_by_target(&conn, "Systems.SystemID IN (?)", &args, 30)
            .unwrap()
            .unwrap();
        assert_eq!(hit.media_dbid, 11);
    }

    #[test]
    fn test_target_below_first_row_falls_forward() {
        let pool = seed_with_dbids(&[10, 11, 50]);
        let conn = get_conn(&pool).unwrap();
        let args = vec![Value::Text("NES".to_string())];

        let hit = select_by_target(&conn, "Systems.SystemID IN (?)", &args, 5)
            .unwrap()
            .unwrap();
        assert_eq!(hit.media_dbid, 10);
    }

    #[test]
    fn test_random_media_always_lands_on_a_row() {
        let pool = seed_with_dbids(&[10, 11, 50]);
        let conn = get_conn(&pool).unwrap();
        for _ in 0..50 {
            let pick = random_media(&conn, &["NES".to_string()]).unwrap().unwrap();
            assert!([10, 11, 50].contains(&pick.media_dbid));
        }
    }

    #[test]
    fn test_random_with_query_respects_filters() {
        let pool = init_memory_pool().unwrap();
        let tx = IndexTransaction::begin(&pool).unwrap();
        let nes = tx.upsert_system("NES", "Nintendo").unwrap();
        let zelda = tx
            .upsert_media_title(nes, MediaType::Game, "The Legend of Zelda")
            .unwrap();
        let mario = tx
            .upsert_media_title(nes, MediaType::Game, "Super Mario Bros.")
            .unwrap();
        tx.add_media(zelda, nes, "/roms/nes/zelda.nes").unwrap();
        tx.add_media(mario, nes, "/roms/nes/mario.nes").unwrap();
        tx.commit().unwrap();

        let conn = get_conn(&pool).unwrap();
        let query = SearchQuery {
            systems: vec!["NES".into()],
            variant_groups: vec![vec!["zelda".into()]],
            ..Default::default()
        };
        for _ in 0..10 {
            let pick = random_media_with_query(&conn, &query).unwrap().unwrap();
            assert_eq!(pick.slug, "legend zelda");
        }
    }
}
