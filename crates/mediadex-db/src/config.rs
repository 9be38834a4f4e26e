//! Typed access to the DBConfig key-value table.
//!
//! Lifecycle scalars (optimization status and checkpoint, indexing run
//! bookkeeping, last generation time) live here. Values are plain strings
//! in the table; this module owns the parsing.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use mediadex_common::{IndexingStatus, OptimizationStatus, OptimizationStep, Result};

use crate::db_err;

pub const LAST_GENERATED_AT: &str = "LastGeneratedAt";
pub const OPTIMIZATION_STATUS: &str = "OptimizationStatus";
pub const OPTIMIZATION_STEP: &str = "OptimizationStep";
pub const INDEXING_STATUS: &str = "IndexingStatus";
pub const LAST_INDEXED_SYSTEM: &str = "LastIndexedSystem";
pub const INDEXING_SYSTEMS: &str = "IndexingSystems";

/// Read a raw config value.
pub fn get(conn: &Connection, name: &str) -> Result<Option<String>> {
    match conn.query_row("SELECT Value FROM DBConfig WHERE Name = ?", [name], |row| {
        row.get(0)
    }) {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(db_err("read config", e)),
    }
}

/// Write a raw config value, replacing any existing one.
pub fn set(conn: &Connection, name: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO DBConfig (Name, Value) VALUES (?, ?)",
        [name, value],
    )
    .map_err(|e| db_err("write config", e))?;
    Ok(())
}

/// Delete a config key. Missing keys are fine.
pub fn unset(conn: &Connection, name: &str) -> Result<()> {
    conn.execute("DELETE FROM DBConfig WHERE Name = ?", [name])
        .map_err(|e| db_err("delete config", e))?;
    Ok(())
}

pub fn optimization_status(conn: &Connection) -> Result<OptimizationStatus> {
    let raw = get(conn, OPTIMIZATION_STATUS)?.unwrap_or_default();
    Ok(raw.parse().unwrap_or(OptimizationStatus::Unset))
}

pub fn set_optimization_status(conn: &Connection, status: OptimizationStatus) -> Result<()> {
    set(conn, OPTIMIZATION_STATUS, &status.to_string())
}

/// Persisted optimization checkpoint; `None` when the step is cleared.
pub fn optimization_step(conn: &Connection) -> Result<Option<OptimizationStep>> {
    let raw = get(conn, OPTIMIZATION_STEP)?.unwrap_or_default();
    Ok(raw.parse().ok())
}

pub fn set_optimization_step(conn: &Connection, step: Option<OptimizationStep>) -> Result<()> {
    let value = step.map(|s| s.to_string()).unwrap_or_default();
    set(conn, OPTIMIZATION_STEP, &value)
}

pub fn indexing_status(conn: &Connection) -> Result<Option<IndexingStatus>> {
    let raw = get(conn, INDEXING_STATUS)?.unwrap_or_default();
    Ok(raw.parse().ok())
}

pub fn set_indexing_status(conn: &Connection, status: IndexingStatus) -> Result<()> {
    set(conn, INDEXING_STATUS, &status.to_string())
}

pub fn last_indexed_system(conn: &Connection) -> Result<Option<String>> {
    get(conn, LAST_INDEXED_SYSTEM)
}

pub fn set_last_indexed_system(conn: &Connection, system_id: &str) -> Result<()> {
    set(conn, LAST_INDEXED_SYSTEM, system_id)
}

/// System ids of the indexing run in progress, stored as a JSON array.
pub fn indexing_systems(conn: &Connection) -> Result<Vec<String>> {
    match get(conn, INDEXING_SYSTEMS)? {
        Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_default()),
        None => Ok(Vec::new()),
    }
}

pub fn set_indexing_systems(conn: &Connection, systems: &[String]) -> Result<()> {
    let json = serde_json::to_string(systems)
        .map_err(|e| mediadex_common::Error::storage(format!("encode indexing systems: {}", e)))?;
    set(conn, INDEXING_SYSTEMS, &json)
}

pub fn last_generated_at(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
    Ok(get(conn, LAST_GENERATED_AT)?.and_then(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }))
}

/// Stamp the catalog generation time with now.
pub fn touch_last_generated_at(conn: &Connection) -> Result<()> {
    set(conn, LAST_GENERATED_AT, &Utc::now().to_rfc3339())
}
