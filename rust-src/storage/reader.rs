//! Read-only queries over the snapshot store.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use crate::models::{
    Entity, EntityKind, Fragment, HistoryKey, HistoryPoint, RunRecord, COLLECTED_AT_FORMAT, DAY_FORMAT,
};


/// Open an existing store read-only. Returns `None` when there is no store yet.
pub fn open_read_only(db_path: &Path) -> Result<Option<Connection>> {
    if !db_path.exists() {
        return Ok(None);
    }

    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

    Ok(Some(conn))
}


/// Current inventory, ordered by schema then name.
pub fn load_inventory(conn: &Connection) -> Result<Vec<Entity>> {
    let mut stmt = conn.prepare(
        "SELECT name, schema_name, table_type, actual_rows, is_compressed, table_size
         FROM tables ORDER BY schema_name, name",
    )?;

    let entities = stmt
        .query_map([], |row| {
            let kind: String = row.get(2)?;
            Ok(Entity {
                name: row.get(0)?,
                schema: row.get(1)?,
                kind: EntityKind::parse(&kind).ok_or_else(|| conversion_error(2, &kind))?,
                estimated_rows: int_or_zero(row, 3)?,
                compressed: row.get::<_, Option<bool>>(4)?.unwrap_or(false),
                size_bytes: int_or_zero(row, 5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entities)
}


/// Current chunk list, ordered by schema, owning hypertable, then name.
pub fn load_fragments(conn: &Connection) -> Result<Vec<Fragment>> {
    let mut stmt = conn.prepare(
        "SELECT chunk_name, schema_name, hypertable_name, actual_rows, is_compressed, table_size
         FROM chunks ORDER BY schema_name, hypertable_name, chunk_name",
    )?;

    let fragments = stmt
        .query_map([], |row| {
            Ok(Fragment {
                name: row.get(0)?,
                schema: row.get(1)?,
                hypertable: row.get(2)?,
                estimated_rows: int_or_zero(row, 3)?,
                compressed: row.get::<_, Option<bool>>(4)?.unwrap_or(false),
                size_bytes: int_or_zero(row, 5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(fragments)
}


/// History of one entity, oldest day first.
pub fn load_history(conn: &Connection, schema: &str, name: &str) -> Result<Vec<HistoryPoint>> {
    let mut stmt = conn.prepare(
        "SELECT schema_name, table_name, date, row_count, table_size, sample_count
         FROM table_logs WHERE schema_name = ?1 AND table_name = ?2 ORDER BY date",
    )?;

    let points = stmt
        .query_map(params![schema, name], history_point)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(points)
}


/// History of every entity currently in the inventory, grouped by identity
/// and ordered by date.
pub fn load_inventory_history(conn: &Connection) -> Result<Vec<HistoryPoint>> {
    let mut stmt = conn.prepare(
        "SELECT l.schema_name, l.table_name, l.date, l.row_count, l.table_size, l.sample_count
         FROM table_logs l
         JOIN tables t ON t.schema_name = l.schema_name AND t.name = l.table_name
         ORDER BY l.schema_name, l.table_name, l.date",
    )?;

    let points = stmt
        .query_map([], history_point)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(points)
}


/// All history points recorded for `day`, keyed by identity.
pub fn load_history_for_day(conn: &Connection, day: NaiveDate) -> Result<HashMap<HistoryKey, HistoryPoint>> {
    let mut stmt = conn.prepare(
        "SELECT schema_name, table_name, date, row_count, table_size, sample_count
         FROM table_logs WHERE date = ?1",
    )?;

    let points = stmt
        .query_map(params![day.format(DAY_FORMAT).to_string()], history_point)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(points.into_iter().map(|p| (p.key(), p)).collect())
}


/// Provenance of the last run, if any run has completed.
pub fn load_run_record(conn: &Connection) -> Result<Option<RunRecord>> {
    let run = conn
        .query_row(
            "SELECT collected_at, mode, db_host, db_name FROM run_info LIMIT 1",
            [],
            |row| {
                let raw: String = row.get(0)?;
                let collected_at = NaiveDateTime::parse_from_str(&raw, COLLECTED_AT_FORMAT)
                    .map_err(|_| conversion_error(0, &raw))?
                    .and_utc();
                Ok(RunRecord {
                    collected_at,
                    mode: row.get(1)?,
                    db_host: row.get(2)?,
                    db_name: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(run)
}


fn history_point(row: &Row<'_>) -> rusqlite::Result<HistoryPoint> {
    let raw_day: String = row.get(2)?;
    let day = NaiveDate::parse_from_str(&raw_day, DAY_FORMAT).map_err(|_| conversion_error(2, &raw_day))?;

    Ok(HistoryPoint {
        schema: row.get(0)?,
        name: row.get(1)?,
        day,
        avg_rows: int_or_zero(row, 3)?,
        avg_size_bytes: int_or_zero(row, 4)?,
        sample_count: row.get::<_, Option<i64>>(5)?.unwrap_or(1),
    })
}


fn int_or_zero(row: &Row<'_>, idx: usize) -> rusqlite::Result<i64> {
    Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or(0))
}


fn conversion_error(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unexpected value {value:?}").into(),
    )
}
