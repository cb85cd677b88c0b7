//! Report input: the persisted snapshot shaped for display.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::models::{EntityKind, RunRecord};
use crate::storage::{load_inventory, load_inventory_history, load_run_record, open_read_only};


const BYTES_PER_GB: f64 = (1u64 << 30) as f64;


/// One inventory row in display units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub name: String,
    pub schema: String,
    pub kind: EntityKind,
    pub rows: i64,
    pub compressed: bool,
    pub size_gb: f64,
}


/// One day of an entity's history in display units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogPoint {
    pub date: String,
    pub rows: i64,
    pub size_gb: f64,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportStats {
    pub total_tables: usize,
    pub total_rows: i64,
    pub total_size_gb: f64,
}


/// Everything the renderer needs. Built without mutating the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportData {
    pub tables: Vec<TableView>,
    pub stats: ReportStats,
    /// History keyed by `schema.name`.
    pub logs: BTreeMap<String, Vec<LogPoint>>,
    pub run: Option<RunRecord>,
}


/// Convert bytes to GB rounded to 2 decimal places.
pub fn bytes_to_gb(bytes: i64) -> f64 {
    if bytes <= 0 {
        return 0.0;
    }
    round2(bytes as f64 / BYTES_PER_GB)
}


fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}


/// Load report data from the store at `db_path`.
///
/// A store that does not exist yet produces an empty report.
pub fn load_report_data(db_path: &Path) -> Result<ReportData> {
    let Some(conn) = open_read_only(db_path)? else {
        return Ok(ReportData::default());
    };

    let tables: Vec<TableView> = load_inventory(&conn)?
        .into_iter()
        .map(|e| TableView {
            size_gb: bytes_to_gb(e.size_bytes),
            name: e.name,
            schema: e.schema,
            kind: e.kind,
            rows: e.estimated_rows,
            compressed: e.compressed,
        })
        .collect();

    // Chunks are not part of `tables`, so a plain sum is the full footprint.
    let stats = ReportStats {
        total_tables: tables.len(),
        total_rows: tables.iter().map(|t| t.rows).sum(),
        total_size_gb: round2(tables.iter().map(|t| t.size_gb).sum()),
    };

    let mut logs: BTreeMap<String, Vec<LogPoint>> = tables
        .iter()
        .map(|t| (format!("{}.{}", t.schema, t.name), Vec::new()))
        .collect();
    for point in load_inventory_history(&conn)? {
        logs.entry(format!("{}.{}", point.schema, point.name))
            .or_default()
            .push(LogPoint {
                date: point.day_key(),
                rows: point.avg_rows,
                size_gb: bytes_to_gb(point.avg_size_bytes),
            });
    }

    Ok(ReportData {
        tables,
        stats,
        logs,
        run: load_run_record(&conn)?,
    })
}
