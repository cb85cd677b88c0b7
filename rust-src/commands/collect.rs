//! Collect command: snapshot the source catalog into the local store.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::catalog::{CatalogSource, PostgresCatalog};
use crate::config::RunConfig;
use crate::inventory::{reconcile, Degradation};
use crate::models::RunRecord;
use crate::storage::{open_store, write_snapshot, Snapshot, WriteSummary};


/// Outcome of one collection run.
#[derive(Debug, Clone)]
pub struct CollectSummary {
    pub write: WriteSummary,
    pub degradations: Vec<Degradation>,
}


/// Run the collect command.
pub fn run(config: &RunConfig) -> Result<()> {
    let source = &config.source;
    info!(host = %source.host, database = %source.database, "connecting to source");

    let mut catalog = PostgresCatalog::connect(source)
        .with_context(|| format!("Failed to connect to {}:{}/{}", source.host, source.port, source.database))?;

    println!("Connected to DB. Starting collection...");

    let run = RunRecord {
        collected_at: Utc::now(),
        mode: config.mode.clone(),
        db_host: source.host.clone(),
        db_name: source.database.clone(),
    };
    let today = Local::now().date_naive();

    let summary = collect(&mut catalog, run, today, || open_store(&config.store_path))?;

    println!(
        "Success: Collected {} main tables and {} chunks.",
        summary.write.tables, summary.write.chunks
    );
    if !summary.degradations.is_empty() {
        println!("Completed with {} warning(s):", summary.degradations.len());
        for d in &summary.degradations {
            println!("  - {d}");
        }
    }
    println!("Database: {}", config.store_path.display());

    Ok(())
}


/// Reconcile `source` and commit the snapshot for `day`.
///
/// The store is only opened once the catalog has been fully read, so a
/// failing source never touches it. Losing the connection midway aborts the
/// run and leaves the previous snapshot in place.
pub fn collect<F>(
    source: &mut dyn CatalogSource,
    run: RunRecord,
    day: NaiveDate,
    open: F,
) -> Result<CollectSummary>
where
    F: FnOnce() -> Result<Connection>,
{
    let reconciled = reconcile(source).context("Lost connection to the source during collection")?;
    info!(
        tables = reconciled.entities.len(),
        hypertables = reconciled.hypertable_count(),
        chunks = reconciled.fragments.len(),
        warnings = reconciled.degradations.len(),
        "catalog reconciled"
    );

    let mut conn = open()?;
    let snapshot = Snapshot {
        entities: reconciled.entities,
        fragments: reconciled.fragments,
        day,
        run,
    };
    let write = write_snapshot(&mut conn, &snapshot).context("Failed to write snapshot")?;
    info!(
        history_created = write.history_created,
        history_updated = write.history_updated,
        "snapshot committed"
    );

    Ok(CollectSummary {
        write,
        degradations: reconciled.degradations,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::catalog::fake::{chunk, hypertable, table, FakeCatalog};
    use crate::storage::{load_fragments, load_inventory, load_inventory_history, load_run_record};

    fn run_record(host: &str) -> RunRecord {
        RunRecord {
            collected_at: Utc::now(),
            mode: "prod".to_string(),
            db_host: host.to_string(),
            db_name: "metrics".to_string(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn catalog(metric_bytes: i64) -> FakeCatalog {
        FakeCatalog {
            chunks: Some(vec![chunk("_timescaledb_internal", "_hyper_1_1_chunk", "metrics", true)]),
            hypertables: Some(vec![hypertable("public", "metrics", true)]),
            tables: Some(vec![table("public", "metrics", 0, 0), table("public", "users", 10, 4096)]),
            ..Default::default()
        }
        .with_footprint("public", "metrics", 100, metric_bytes)
        .with_footprint("_timescaledb_internal", "_hyper_1_1_chunk", 100, metric_bytes)
    }

    #[test]
    fn test_collect_end_to_end() {
        let tmp_dir = TempDir::new().unwrap();
        let db_path = tmp_dir.path().join("store.sqlite");

        let summary = collect(&mut catalog(1000), run_record("db.internal"), day(15), || open_store(&db_path)).unwrap();

        assert_eq!(summary.write.tables, 2);
        assert_eq!(summary.write.chunks, 1);
        assert!(summary.degradations.is_empty());

        let conn = open_store(&db_path).unwrap();
        assert_eq!(load_inventory(&conn).unwrap().len(), 2);
        assert_eq!(load_fragments(&conn).unwrap().len(), 1);
        assert_eq!(load_run_record(&conn).unwrap().unwrap().db_host, "db.internal");
    }

    #[test]
    fn test_repeated_collect_is_full_replace() {
        let tmp_dir = TempDir::new().unwrap();
        let db_path = tmp_dir.path().join("store.sqlite");

        collect(&mut catalog(1000), run_record("a"), day(15), || open_store(&db_path)).unwrap();
        let conn = open_store(&db_path).unwrap();
        let first = (load_inventory(&conn).unwrap(), load_fragments(&conn).unwrap());

        collect(&mut catalog(1000), run_record("b"), day(15), || open_store(&db_path)).unwrap();
        let second = (load_inventory(&conn).unwrap(), load_fragments(&conn).unwrap());

        assert_eq!(first, second);
        assert_eq!(load_run_record(&conn).unwrap().unwrap().db_host, "b");

        let history = load_inventory_history(&conn).unwrap();
        assert!(history.iter().all(|p| p.sample_count == 2));
    }

    #[test]
    fn test_same_day_collects_average_sizes() {
        let tmp_dir = TempDir::new().unwrap();
        let db_path = tmp_dir.path().join("store.sqlite");

        for bytes in [1000, 1000, 1600] {
            collect(&mut catalog(bytes), run_record("a"), day(15), || open_store(&db_path)).unwrap();
        }

        let conn = open_store(&db_path).unwrap();
        let metrics = load_inventory_history(&conn)
            .unwrap()
            .into_iter()
            .find(|p| p.name == "metrics")
            .unwrap();
        assert_eq!(metrics.avg_size_bytes, 1200);
        assert_eq!(metrics.sample_count, 3);

        // The inventory itself holds the latest sample, not the average.
        let inventory = load_inventory(&conn).unwrap();
        assert_eq!(inventory.iter().find(|e| e.name == "metrics").unwrap().size_bytes, 1600);
    }

    #[test]
    fn test_collect_without_timescale_still_succeeds() {
        let tmp_dir = TempDir::new().unwrap();
        let db_path = tmp_dir.path().join("store.sqlite");

        let mut plain = FakeCatalog::plain(vec![table("public", "users", 10, 4096)]);
        let summary = collect(&mut plain, run_record("a"), day(15), || open_store(&db_path)).unwrap();

        assert_eq!(summary.write.tables, 1);
        assert_eq!(summary.degradations.len(), 2);
    }

    #[test]
    fn test_lost_connection_keeps_previous_snapshot() {
        let tmp_dir = TempDir::new().unwrap();
        let db_path = tmp_dir.path().join("store.sqlite");

        collect(&mut catalog(1000), run_record("a"), day(15), || open_store(&db_path)).unwrap();

        let mut dead = FakeCatalog {
            disconnected: true,
            ..catalog(2000)
        };
        let result = collect(&mut dead, run_record("b"), day(15), || open_store(&db_path));
        assert!(result.is_err());

        let conn = open_store(&db_path).unwrap();
        assert_eq!(load_inventory(&conn).unwrap().len(), 2);
        assert_eq!(load_fragments(&conn).unwrap().len(), 1);
        assert_eq!(load_run_record(&conn).unwrap().unwrap().db_host, "a");
        assert!(load_inventory_history(&conn).unwrap().iter().all(|p| p.sample_count == 1));
    }

    #[test]
    fn test_connection_lost_mid_run_never_opens_store() {
        let mut catalog = catalog(1000);
        catalog.disconnect_at = Some(("public".to_string(), "metrics".to_string()));

        let result = collect(&mut catalog, run_record("a"), day(15), || {
            panic!("store must not be opened")
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_store_failure_is_fatal() {
        let result = collect(&mut catalog(1000), run_record("a"), day(15), || {
            anyhow::bail!("disk full")
        });
        assert!(result.is_err());
    }
}
