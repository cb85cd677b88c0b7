//! Static HTML report rendering.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use super::data::{LogPoint, ReportData};
use super::format::{escape_html, format_gb, format_number};


// Color scheme
const BG: &str = "#1f2328";
const PANEL: &str = "#2b3036";
const TEXT: &str = "#e6edf3";
const TEXT_SECONDARY: &str = "#9da7b3";
const BORDER: &str = "#3d444d";
const ACCENT: &str = "#4aa3df";
const HYPERTABLE: &str = "#d6a04a";

// Sparkline dimensions
const SPARK_WIDTH: f64 = 120.0;
const SPARK_HEIGHT: f64 = 24.0;
const SPARK_PAD: f64 = 2.0;

/// Click-to-sort for every table header. Numeric-aware.
const SORT_SCRIPT: &str = r#"<script>
(function () {
  function cellValue(tr, idx) {
    return tr.children[idx].innerText.trim();
  }

  function comparer(idx, asc) {
    return function (a, b) {
      const v1 = cellValue(asc ? a : b, idx);
      const v2 = cellValue(asc ? b : a, idx);
      const n1 = parseFloat(v1.replace(/[^0-9.-]/g, ''));
      const n2 = parseFloat(v2.replace(/[^0-9.-]/g, ''));
      if (!isNaN(n1) && !isNaN(n2)) return n1 - n2;
      return v1.localeCompare(v2, undefined, {numeric: true, sensitivity: 'base'});
    };
  }

  document.addEventListener('DOMContentLoaded', function () {
    document.querySelectorAll('table thead th').forEach(function (th, idx) {
      let asc = true;
      th.style.cursor = 'pointer';
      th.addEventListener('click', function () {
        const tbody = th.closest('table').querySelector('tbody');
        Array.from(tbody.querySelectorAll('tr'))
          .sort(comparer(idx, asc = !asc))
          .forEach(tr => tbody.appendChild(tr));
      });
    });
  });
})();
</script>"#;


/// Render the full report page.
pub fn render_html(data: &ReportData) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Database Storage Report</title>\n");
    html.push_str(&stylesheet());
    html.push_str("</head>\n<body>\n");

    html.push_str("<h1>Database Storage Report</h1>\n");
    html.push_str(&render_run_line(data));
    html.push_str(&render_summary(data));
    html.push_str(&render_inventory(data));
    html.push_str(&render_history_json(data));

    html.push_str("</body>\n</html>\n");

    inject_sorting_js(&html)
}


/// Render and write the report to `output_path`.
pub fn write_report(data: &ReportData, output_path: &Path) -> Result<()> {
    std::fs::write(output_path, render_html(data))
        .with_context(|| format!("Failed to write report to {}", output_path.display()))
}


fn stylesheet() -> String {
    format!(
        "<style>
  body {{ background: {BG}; color: {TEXT}; font: 14px -apple-system, 'Segoe UI', sans-serif; margin: 24px; }}
  h1 {{ font-size: 20px; margin: 0 0 4px; }}
  .run {{ color: {TEXT_SECONDARY}; margin-bottom: 16px; }}
  .cards {{ display: flex; gap: 12px; margin-bottom: 20px; }}
  .card {{ background: {PANEL}; border: 1px solid {BORDER}; border-radius: 6px; padding: 12px 16px; min-width: 160px; }}
  .card .label {{ color: {TEXT_SECONDARY}; font-size: 12px; }}
  .card .value {{ font-size: 22px; font-weight: bold; }}
  table {{ border-collapse: collapse; width: 100%; }}
  th, td {{ border-bottom: 1px solid {BORDER}; padding: 6px 10px; text-align: left; }}
  th {{ color: {TEXT_SECONDARY}; font-weight: normal; }}
  td.num {{ text-align: right; font-variant-numeric: tabular-nums; }}
  .hypertable {{ color: {HYPERTABLE}; }}
  .empty {{ color: {TEXT_SECONDARY}; padding: 24px 0; }}
</style>\n"
    )
}


fn render_run_line(data: &ReportData) -> String {
    match &data.run {
        Some(run) => format!(
            "<div class=\"run\">Collected {} from {}/{} ({})</div>\n",
            escape_html(&run.collected_at_key()),
            escape_html(&run.db_host),
            escape_html(&run.db_name),
            escape_html(&run.mode),
        ),
        None => "<div class=\"run\">No collection run recorded yet.</div>\n".to_string(),
    }
}


fn render_summary(data: &ReportData) -> String {
    let cards = [
        ("Tables", format_number(data.stats.total_tables as i64)),
        ("Estimated rows", format_number(data.stats.total_rows)),
        ("Total size (GB)", format_gb(data.stats.total_size_gb)),
    ];

    let mut out = String::from("<div class=\"cards\">\n");
    for (label, value) in cards {
        let _ = writeln!(
            out,
            "  <div class=\"card\"><div class=\"label\">{label}</div><div class=\"value\">{value}</div></div>"
        );
    }
    out.push_str("</div>\n");
    out
}


fn render_inventory(data: &ReportData) -> String {
    if data.tables.is_empty() {
        return "<div class=\"empty\">No tables collected.</div>\n".to_string();
    }

    let mut out = String::from(
        "<table>\n<thead><tr><th>Schema</th><th>Name</th><th>Type</th><th>Rows</th>\
         <th>Compressed</th><th>Size (GB)</th><th>Trend</th></tr></thead>\n<tbody>\n",
    );

    for table in &data.tables {
        let key = format!("{}.{}", table.schema, table.name);
        let history = data.logs.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td class=\"{}\">{}</td><td>{}</td><td class=\"num\">{}</td>\
             <td>{}</td><td class=\"num\">{}</td><td>{}</td></tr>",
            escape_html(&table.schema),
            table.kind.as_str(),
            escape_html(&table.name),
            table.kind.as_str(),
            format_number(table.rows),
            if table.compressed { "yes" } else { "no" },
            format_gb(table.size_gb),
            sparkline(history),
        );
    }

    out.push_str("</tbody>\n</table>\n");
    out
}


/// Inline SVG polyline of daily average size.
fn sparkline(points: &[LogPoint]) -> String {
    if points.is_empty() {
        return String::new();
    }

    let max = points.iter().map(|p| p.size_gb).fold(0.0_f64, f64::max);
    let min = points.iter().map(|p| p.size_gb).fold(f64::INFINITY, f64::min);
    let span = if max > min { max - min } else { 1.0 };
    let usable_w = SPARK_WIDTH - 2.0 * SPARK_PAD;
    let usable_h = SPARK_HEIGHT - 2.0 * SPARK_PAD;
    let step = if points.len() > 1 { usable_w / (points.len() - 1) as f64 } else { 0.0 };

    let coords: Vec<String> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let x = SPARK_PAD + step * i as f64;
            let y = SPARK_PAD + usable_h - ((p.size_gb - min) / span) * usable_h;
            format!("{x:.1},{y:.1}")
        })
        .collect();

    let title = points
        .last()
        .map(|p| format!("{}: {} GB", p.date, format_gb(p.size_gb)))
        .unwrap_or_default();

    let shape = if coords.len() == 1 {
        let (x, y) = coords[0].split_once(',').unwrap_or(("0", "0"));
        format!(r#"<circle cx="{x}" cy="{y}" r="2" fill="{ACCENT}"/>"#)
    } else {
        format!(
            r#"<polyline points="{}" fill="none" stroke="{ACCENT}" stroke-width="1.5"/>"#,
            coords.join(" ")
        )
    };

    format!(
        r#"<svg width="{SPARK_WIDTH}" height="{SPARK_HEIGHT}" xmlns="http://www.w3.org/2000/svg"><title>{}</title>{shape}</svg>"#,
        escape_html(&title)
    )
}


/// Per-entity history for client-side use.
fn render_history_json(data: &ReportData) -> String {
    let json = serde_json::to_string(&data.logs).unwrap_or_else(|_| "{}".to_string());
    // Keep the payload from closing its own script element.
    let json = json.replace("</", "<\\/");
    format!("<script type=\"application/json\" id=\"history-data\">{json}</script>\n")
}


/// Inject the sortable table script before `</body>`.
fn inject_sorting_js(html: &str) -> String {
    html.replacen("</body>", &format!("{SORT_SCRIPT}\n</body>"), 1)
}
