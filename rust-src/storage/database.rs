//! SQLite snapshot store: schema and the per-run writer.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Transaction};

use super::reader::load_history_for_day;
use crate::history::accumulate;
use crate::models::{Entity, Fragment, HistoryPoint, RunRecord};


/// Everything one collection run commits.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub entities: Vec<Entity>,
    pub fragments: Vec<Fragment>,
    /// Calendar day the history samples belong to.
    pub day: NaiveDate,
    pub run: RunRecord,
}


/// Counts of what a snapshot write touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub tables: usize,
    pub chunks: usize,
    pub history_created: usize,
    pub history_updated: usize,
}


/// Open (creating if needed) the store at `db_path` and ensure its schema.
pub fn open_store(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
    init_database(&conn)?;

    Ok(conn)
}


/// Create the store tables if missing and migrate older layouts.
pub fn init_database(conn: &Connection) -> Result<()> {
    // Current inventory: hypertables and plain tables
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tables (
            name TEXT,
            schema_name TEXT,
            table_type TEXT,
            actual_rows INTEGER,
            is_compressed BOOLEAN DEFAULT FALSE,
            table_size INTEGER
        )",
        [],
    )?;

    // Chunks are stored apart and never summed into `tables`
    conn.execute(
        "CREATE TABLE IF NOT EXISTS chunks (
            chunk_name TEXT,
            schema_name TEXT,
            hypertable_name TEXT,
            actual_rows INTEGER,
            is_compressed BOOLEAN DEFAULT FALSE,
            table_size INTEGER
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS table_logs (
            table_name TEXT,
            schema_name TEXT,
            date TEXT,
            row_count INTEGER,
            table_size INTEGER,
            sample_count INTEGER DEFAULT 1
        )",
        [],
    )?;

    if !has_column(conn, "table_logs", "sample_count")? {
        conn.execute(
            "ALTER TABLE table_logs ADD COLUMN sample_count INTEGER DEFAULT 1",
            [],
        )?;
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_table_logs_identity
         ON table_logs(schema_name, table_name, date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS run_info (
            collected_at TEXT,
            mode TEXT,
            db_host TEXT,
            db_name TEXT
        )",
        [],
    )?;

    Ok(())
}


/// Commit one run's snapshot atomically.
///
/// `tables`, `chunks` and `run_info` are fully replaced, `table_logs` is
/// upserted per (table, schema, day). Either every change lands or none does.
pub fn write_snapshot(conn: &mut Connection, snapshot: &Snapshot) -> Result<WriteSummary> {
    let tx = conn.transaction().context("Failed to start snapshot transaction")?;

    replace_tables(&tx, &snapshot.entities)?;
    replace_chunks(&tx, &snapshot.fragments)?;

    let existing = load_history_for_day(&tx, snapshot.day)?;
    let points = accumulate(&snapshot.entities, &existing, snapshot.day);
    let (history_created, history_updated) = upsert_history(&tx, &points)?;

    replace_run_info(&tx, &snapshot.run)?;

    tx.commit().context("Failed to commit snapshot")?;

    Ok(WriteSummary {
        tables: snapshot.entities.len(),
        chunks: snapshot.fragments.len(),
        history_created,
        history_updated,
    })
}


fn replace_tables(tx: &Transaction<'_>, entities: &[Entity]) -> Result<()> {
    tx.execute("DELETE FROM tables", [])?;

    let mut stmt = tx.prepare(
        "INSERT INTO tables (name, schema_name, table_type, actual_rows, is_compressed, table_size)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for e in entities {
        stmt.execute(params![
            e.name,
            e.schema,
            e.kind.as_str(),
            e.estimated_rows,
            e.compressed,
            e.size_bytes,
        ])?;
    }

    Ok(())
}


fn replace_chunks(tx: &Transaction<'_>, fragments: &[Fragment]) -> Result<()> {
    tx.execute("DELETE FROM chunks", [])?;

    let mut stmt = tx.prepare(
        "INSERT INTO chunks (chunk_name, schema_name, hypertable_name, actual_rows, is_compressed, table_size)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for f in fragments {
        stmt.execute(params![
            f.name,
            f.schema,
            f.hypertable,
            f.estimated_rows,
            f.compressed,
            f.size_bytes,
        ])?;
    }

    Ok(())
}


/// Update each point in place, inserting it when no row matches.
///
/// Returns `(created, updated)`.
fn upsert_history(tx: &Transaction<'_>, points: &[HistoryPoint]) -> Result<(usize, usize)> {
    let mut update = tx.prepare(
        "UPDATE table_logs SET row_count = ?1, table_size = ?2, sample_count = ?3
         WHERE table_name = ?4 AND schema_name = ?5 AND date = ?6",
    )?;
    let mut insert = tx.prepare(
        "INSERT INTO table_logs (table_name, schema_name, date, row_count, table_size, sample_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    let mut created = 0;
    let mut updated = 0;
    for p in points {
        let day = p.day_key();
        let changed = update.execute(params![
            p.avg_rows,
            p.avg_size_bytes,
            p.sample_count,
            p.name,
            p.schema,
            day,
        ])?;

        if changed == 0 {
            insert.execute(params![p.name, p.schema, day, p.avg_rows, p.avg_size_bytes, p.sample_count])?;
            created += 1;
        } else {
            updated += 1;
        }
    }

    Ok((created, updated))
}


fn replace_run_info(tx: &Transaction<'_>, run: &RunRecord) -> Result<()> {
    tx.execute("DELETE FROM run_info", [])?;
    tx.execute(
        "INSERT INTO run_info (collected_at, mode, db_host, db_name) VALUES (?1, ?2, ?3, ?4)",
        params![run.collected_at_key(), run.mode, run.db_host, run.db_name],
    )?;
    Ok(())
}


fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names.iter().any(|n| n == column))
}
