//! Stats command - terminal summary of the persisted snapshot.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;

use crate::models::{Entity, Fragment, HistoryPoint, RunRecord};
use crate::report::{bytes_to_gb, format_gb, format_number};
use crate::storage::{load_fragments, load_history, load_inventory, load_run_record, open_read_only};


/// Run the stats command.
///
/// With `table` set (`schema.name`, schema defaults to `public`), prints that
/// entity's daily history instead. History outlives the entity, so dropped
/// tables can still be looked up.
pub fn run(store_path: &Path, table: Option<&str>, top: usize) -> Result<()> {
    let Some(conn) = open_read_only(store_path)? else {
        println!("No snapshot store found at {}.", store_path.display());
        println!("Run 'dbfp collect' to create it.");
        return Ok(());
    };

    if let Some(qualified) = table {
        let (schema, name) = qualified.split_once('.').unwrap_or(("public", qualified));
        let history = load_history(&conn, schema, name)?;
        print!("{}", render_history(&format!("{schema}.{name}"), &history));
        return Ok(());
    }

    let run = load_run_record(&conn)?;
    let inventory = load_inventory(&conn)?;
    let fragments = load_fragments(&conn)?;
    print!("{}", render_summary(run.as_ref(), &inventory, &fragments, top));

    Ok(())
}


fn render_summary(run: Option<&RunRecord>, inventory: &[Entity], fragments: &[Fragment], top: usize) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "=".repeat(60)));
    out.push_str(&format!("{:^60}\n", "Database Storage Statistics"));
    out.push_str(&format!("{}\n\n", "=".repeat(60)));

    match run {
        Some(run) => {
            out.push_str(&format!("  Last Run:            {}\n", run.collected_at_key()));
            out.push_str(&format!("  Source:              {}/{} ({})\n", run.db_host, run.db_name, run.mode));
        }
        None => out.push_str("  Last Run:            never\n"),
    }

    let total_rows: i64 = inventory.iter().map(|e| e.estimated_rows).sum();
    let total_bytes: i64 = inventory.iter().map(|e| e.size_bytes).sum();
    let hypertables = inventory.iter().filter(|e| e.is_hypertable()).count();

    out.push_str("\nSUMMARY\n");
    out.push_str(&format!("{}\n", "-".repeat(40)));
    out.push_str(&format!("  Tables:              {:>15}\n", format_number(inventory.len() as i64)));
    out.push_str(&format!("  Hypertables:         {:>15}\n", format_number(hypertables as i64)));
    out.push_str(&format!("  Chunks:              {:>15}\n", format_number(fragments.len() as i64)));
    out.push_str(&format!("  Estimated Rows:      {:>15}\n", format_number(total_rows)));
    out.push_str(&format!("  Total Size (GB):     {:>15}\n", format_gb(bytes_to_gb(total_bytes))));

    if !inventory.is_empty() {
        let mut by_size: Vec<&Entity> = inventory.iter().collect();
        by_size.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.identity().cmp(&b.identity())));

        out.push_str("\nLARGEST TABLES\n");
        out.push_str(&format!("{}\n", "-".repeat(60)));
        for e in by_size.iter().take(top) {
            out.push_str(&format!(
                "  {:32} {:>10} {:>14} GB\n",
                e.qualified_name(),
                e.kind.as_str(),
                format_gb(bytes_to_gb(e.size_bytes)),
            ));
        }
    }

    // Chunk counts are diagnostic only; their sizes are already in the hypertables.
    // A chunk records its owner by name only, its own schema is internal.
    let mut chunks_per_owner: BTreeMap<&str, usize> = BTreeMap::new();
    for f in fragments {
        *chunks_per_owner.entry(f.hypertable.as_str()).or_default() += 1;
    }
    if !chunks_per_owner.is_empty() {
        out.push_str("\nCHUNKS PER HYPERTABLE\n");
        out.push_str(&format!("{}\n", "-".repeat(40)));
        for (hypertable, count) in chunks_per_owner {
            out.push_str(&format!("  {:32} {:>5}\n", hypertable, count));
        }
    }

    out
}


fn render_history(qualified: &str, history: &[HistoryPoint]) -> String {
    if history.is_empty() {
        return format!("No history recorded for {qualified}.\n");
    }

    let mut out = format!("\nHISTORY: {qualified}\n{}\n", "-".repeat(60));
    out.push_str(&format!("  {:10} {:>18} {:>14} {:>8}\n", "Date", "Avg Rows", "Avg GB", "Samples"));
    for p in history {
        out.push_str(&format!(
            "  {:10} {:>18} {:>14} {:>8}\n",
            p.day_key(),
            format_number(p.avg_rows),
            format_gb(bytes_to_gb(p.avg_size_bytes)),
            p.sample_count,
        ));
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::{EntityKind, Footprint};

    const GB: i64 = 1 << 30;

    fn inventory() -> Vec<Entity> {
        vec![
            Entity::new("public", "metrics", EntityKind::Hypertable, true, Footprint::new(1_000_000, 3 * GB)),
            Entity::new("public", "users", EntityKind::Table, false, Footprint::new(120, GB)),
        ]
    }

    #[test]
    fn test_summary_sums_inventory_only() {
        let fragments = vec![
            Fragment::new("_timescaledb_internal", "_hyper_1_1_chunk", "metrics", true, Footprint::new(500_000, 2 * GB)),
            Fragment::new("_timescaledb_internal", "_hyper_1_2_chunk", "metrics", false, Footprint::new(500_000, GB)),
        ];

        let out = render_summary(None, &inventory(), &fragments, 10);

        let size_line = out.lines().find(|l| l.contains("Total Size (GB):")).unwrap();
        assert!(size_line.trim_end().ends_with("4.00"));
        assert!(out.contains("1,000,120"));
        assert!(out.contains("never"));
    }

    #[test]
    fn test_chunks_grouped_by_owning_hypertable() {
        let fragments = vec![
            Fragment::new("_timescaledb_internal", "_hyper_1_1_chunk", "metrics", true, Footprint::new(1, 1)),
            Fragment::new("_timescaledb_internal", "_hyper_1_2_chunk", "metrics", false, Footprint::new(1, 1)),
            Fragment::new("_timescaledb_internal", "_hyper_2_3_chunk", "events", false, Footprint::new(1, 1)),
        ];

        let out = render_summary(None, &inventory(), &fragments, 10);
        let section: Vec<&str> = out
            .lines()
            .skip_while(|l| *l != "CHUNKS PER HYPERTABLE")
            .skip(2)
            .map(str::split_whitespace)
            .map(|mut parts| parts.next().unwrap_or_default())
            .collect();

        assert_eq!(section, vec!["events", "metrics"]);
        assert!(out.lines().any(|l| l.trim_start().starts_with("metrics") && l.trim_end().ends_with('2')));
        assert!(!out.contains("_timescaledb_internal"));
    }

    #[test]
    fn test_largest_tables_respects_top() {
        let out = render_summary(None, &inventory(), &[], 1);

        assert!(out.contains("public.metrics"));
        assert!(!out.contains("public.users"));
    }

    #[test]
    fn test_render_history() {
        let history = vec![HistoryPoint {
            schema: "public".to_string(),
            name: "users".to_string(),
            day: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            avg_rows: 1500,
            avg_size_bytes: GB,
            sample_count: 3,
        }];

        let out = render_history("public.users", &history);
        assert!(out.contains("2026-10-15"));
        assert!(out.contains("1,500"));
        assert!(out.contains("1.00"));

        assert_eq!(render_history("public.none", &[]), "No history recorded for public.none.\n");
    }
}
