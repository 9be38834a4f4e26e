//! Materialized distinct tag set per system.
//!
//! The cache equals the distinct `(type, tag)` projection over a system's
//! tag graph (Systems → MediaTitles → Media → MediaTags → Tags →
//! TagTypes). Reads self-heal: a miss for the requested systems triggers a
//! selective repopulation.

use mediadex_common::{Error, Result};
use rusqlite::{params_from_iter, Connection};

use crate::db_err;
use crate::queries::placeholders;
use crate::models::SystemTag;

const PROJECTION: &str = "SELECT DISTINCT Systems.DBID, Tags.DBID, TagTypes.Type, Tags.Tag \
     FROM Systems \
     INNER JOIN MediaTitles ON MediaTitles.SystemDBID = Systems.DBID \
     INNER JOIN Media ON Media.MediaTitleDBID = MediaTitles.DBID \
     INNER JOIN MediaTags ON MediaTags.MediaDBID = Media.DBID \
     INNER JOIN Tags ON Tags.DBID = MediaTags.TagDBID \
     INNER JOIN TagTypes ON TagTypes.DBID = Tags.TypeDBID";

fn system_dbids(conn: &Connection, system_ids: &[String]) -> Result<Vec<i64>> {
    if system_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT DBID FROM Systems WHERE SystemID IN ({})",
        placeholders(system_ids.len())
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| db_err("resolve systems", e))?;
    let dbids = stmt
        .query_map(params_from_iter(system_ids.iter()), |row| row.get(0))
        .map_err(|e| db_err("resolve systems", e))?
        .collect::<std::result::Result<Vec<i64>, _>>()
        .map_err(|e| db_err("resolve systems", e))?;
    Ok(dbids)
}

/// Full refresh: clear the cache and re-derive it for every system.
pub fn populate(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM SystemTagsCache", [])
        .map_err(|e| db_err("clear system tags cache", e))?;
    conn.execute(
        &format!(
            "INSERT OR IGNORE INTO SystemTagsCache (SystemDBID, TagDBID, TagType, Tag) \
             {PROJECTION}"
        ),
        [],
    )
    .map_err(|e| db_err("populate system tags cache", e))?;
    Ok(())
}

/// Selective refresh: delete and re-derive rows for the given systems only.
pub fn populate_for_systems(conn: &Connection, system_ids: &[String]) -> Result<()> {
    if system_ids.is_empty() {
        return Err(Error::invalid_argument("no systems provided"));
    }
    let dbids = system_dbids(conn, system_ids)?;
    if dbids.is_empty() {
        return Ok(());
    }

    invalidate_dbids(conn, &dbids)?;

    let sql = format!(
        "INSERT OR IGNORE INTO SystemTagsCache (SystemDBID, TagDBID, TagType, Tag) \
         {PROJECTION} WHERE Systems.DBID IN ({})",
        placeholders(dbids.len())
    );
    conn.execute(&sql, params_from_iter(dbids.iter()))
        .map_err(|e| db_err("populate system tags cache", e))?;
    Ok(())
}

/// Read the distinct tag set for the given systems. On a cache miss the
/// rows are re-derived before the read is retried.
pub fn get(conn: &Connection, system_ids: &[String]) -> Result<Vec<SystemTag>> {
    if system_ids.is_empty() {
        return Err(Error::invalid_argument("no systems provided"));
    }

    let rows = read(conn, system_ids)?;
    if !rows.is_empty() {
        return Ok(rows);
    }

    populate_for_systems(conn, system_ids)?;
    read(conn, system_ids)
}

fn read(conn: &Connection, system_ids: &[String]) -> Result<Vec<SystemTag>> {
    let sql = format!(
        "SELECT SystemTagsCache.SystemDBID, SystemTagsCache.TagDBID, \
         SystemTagsCache.TagType, SystemTagsCache.Tag \
         FROM SystemTagsCache \
         INNER JOIN Systems ON Systems.DBID = SystemTagsCache.SystemDBID \
         WHERE Systems.SystemID IN ({}) \
         ORDER BY SystemTagsCache.TagType, SystemTagsCache.Tag",
        placeholders(system_ids.len())
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| db_err("read system tags cache", e))?;
    let rows = stmt
        .query_map(params_from_iter(system_ids.iter()), |row| {
            Ok(SystemTag {
                system_dbid: row.get(0)?,
                tag_dbid: row.get(1)?,
                tag_type: row.get(2)?,
                tag: row.get(3)?,
            })
        })
        .map_err(|e| db_err("read system tags cache", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| db_err("read system tags cache", e))?;
    Ok(rows)
}

/// Drop cache rows for the given systems.
pub fn invalidate(conn: &Connection, system_ids: &[String]) -> Result<()> {
    let dbids = system_dbids(conn, system_ids)?;
    invalidate_dbids(conn, &dbids)
}

pub(crate) fn invalidate_dbids(conn: &Connection, dbids: &[i64]) -> Result<()> {
    if dbids.is_empty() {
        return Ok(());
    }
    let sql = format!(
        "DELETE FROM SystemTagsCache WHERE SystemDBID IN ({})",
        placeholders(dbids.len())
    );
    conn.execute(&sql, params_from_iter(dbids.iter()))
        .map_err(|e| db_err("invalidate system tags cache", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediadex_common::MediaType;
    use crate::pool::{get_conn, init_memory_pool, DbPool};
    use crate::writer::IndexTransaction;

    fn seed() -> DbPool {
        let pool = init_memory_pool().unwrap();
        let tx = IndexTransaction::begin(&pool).unwrap();
        let nes = tx.upsert_system("NES", "Nintendo").unwrap();
        let snes = tx.upsert_system("SNES", "Super Nintendo").unwrap();

        let zelda = tx
            .upsert_media_title(nes, MediaType::Game, "Zelda")
            .unwrap();
        let m1 = tx.add_media(zelda, nes, "/roms/nes/z1.nes").unwrap();
        let m2 = tx.add_media(zelda, nes, "/roms/nes/z2.nes").unwrap();

        let metroid = tx
            .upsert_media_title(snes, MediaType::Game, "Metroid")
            .unwrap();
        let m3 = tx.add_media(metroid, snes, "/roms/snes/m.sfc").unwrap();

        let usa = tx.upsert_tag("region", "usa").unwrap();
        let action = tx.upsert_tag("genre", "action").unwrap();
        tx.tag_media(m1, usa).unwrap();
        tx.tag_media(m2, usa).unwrap();
        tx.tag_media(m3, action).unwrap();
        tx.commit().unwrap();
        pool
    }

    #[test]
    fn test_populate_derives_distinct_projection() {
        let pool = seed();
        let conn = get_conn(&pool).unwrap();

        populate(&conn).unwrap();

        // Two media share the same (region, usa) tag: one cache row.
        let nes_tags = read(&conn, &["NES".to_string()]).unwrap();
        assert_eq!(nes_tags.len(), 1);
        assert_eq!(nes_tags[0].tag_type, "region");
        assert_eq!(nes_tags[0].tag, "usa");

        let snes_tags = read(&conn, &["SNES".to_string()]).unwrap();
        assert_eq!(snes_tags.len(), 1);
        assert_eq!(snes_tags[0].tag, "action");
    }

    #[test]
    fn test_get_self_heals() {
        let pool = seed();
        let conn = get_conn(&pool).unwrap();

        // Cache is empty (writes invalidate); get repopulates on demand.
        let tags = get(&conn, &["NES".to_string()]).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].tag, "usa");
    }

    #[test]
    fn test_selective_populate_leaves_other_systems() {
        let pool = seed();
        let conn = get_conn(&pool).unwrap();
        populate(&conn).unwrap();

        invalidate(&conn, &["NES".to_string()]).unwrap();
        assert!(read(&conn, &["NES".to_string()]).unwrap().is_empty());
        assert_eq!(read(&conn, &["SNES".to_string()]).unwrap().len(), 1);

        populate_for_systems(&conn, &["NES".to_string()]).unwrap();
        assert_eq!(read(&conn, &["NES".to_string()]).unwrap().len(), 1);
        assert_eq!(read(&conn, &["SNES".to_string()]).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_systems_rejected() {
        let pool = seed();
        let conn = get_conn(&pool).unwrap();
        assert!(get(&conn, &[]).is_err());
        assert!(populate_for_systems(&conn, &[]).is_err());
    }
}
