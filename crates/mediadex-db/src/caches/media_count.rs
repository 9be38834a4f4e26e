//! Scalar cache for the total media count.

use mediadex_common::Result;
use rusqlite::Connection;

use crate::db_err;

const TOTAL_MEDIA: &str = "TotalMedia";

pub fn get(conn: &Connection) -> Result<Option<i64>> {
    match conn.query_row(
        "SELECT Value FROM MediaCountCache WHERE Name = ?",
        [TOTAL_MEDIA],
        |row| row.get(0),
    ) {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(db_err("read media count cache", e)),
    }
}

pub fn set(conn: &Connection, count: i64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO MediaCountCache (Name, Value) VALUES (?, ?)",
        rusqlite::params![TOTAL_MEDIA, count],
    )
    .map_err(|e| db_err("write media count cache", e))?;
    Ok(())
}

pub fn invalidate(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM MediaCountCache", [])
        .map_err(|e| db_err("invalidate media count cache", e))?;
    Ok(())
}
