//! Daily history points and run provenance.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::inventory::Entity;


/// Date format used for `table_logs.date`.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Timestamp format used for `run_info.collected_at`.
pub const COLLECTED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";


/// Identity of a history point: entity plus calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoryKey {
    pub schema: String,
    pub name: String,
    pub day: NaiveDate,
}


impl HistoryKey {
    pub fn for_entity(entity: &Entity, day: NaiveDate) -> Self {
        Self {
            schema: entity.schema.clone(),
            name: entity.name.clone(),
            day,
        }
    }
}


/// Running daily average for one entity.
///
/// `avg_rows` and `avg_size_bytes` are the mean of every sample folded into
/// this day so far, truncated at each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPoint {
    pub schema: String,
    pub name: String,
    pub day: NaiveDate,
    pub avg_rows: i64,
    pub avg_size_bytes: i64,
    pub sample_count: i64,
}


impl HistoryPoint {
    /// First sample of the day for an entity.
    pub fn first(entity: &Entity, day: NaiveDate) -> Self {
        Self {
            schema: entity.schema.clone(),
            name: entity.name.clone(),
            day,
            avg_rows: entity.estimated_rows,
            avg_size_bytes: entity.size_bytes,
            sample_count: 1,
        }
    }

    pub fn key(&self) -> HistoryKey {
        HistoryKey {
            schema: self.schema.clone(),
            name: self.name.clone(),
            day: self.day,
        }
    }

    /// Fold a new sample into this point.
    pub fn fold(&self, rows: i64, size_bytes: i64) -> Self {
        let count = self.sample_count.max(1);
        Self {
            schema: self.schema.clone(),
            name: self.name.clone(),
            day: self.day,
            avg_rows: fold_mean(self.avg_rows, count, rows),
            avg_size_bytes: fold_mean(self.avg_size_bytes, count, size_bytes),
            sample_count: count + 1,
        }
    }

    pub fn day_key(&self) -> String {
        self.day.format(DAY_FORMAT).to_string()
    }
}


/// `floor((avg * count + sample) / (count + 1))`.
///
/// Truncation happens at every fold, so over many samples the result can sit
/// slightly below the true mean. Stored history depends on this rounding.
pub fn fold_mean(avg: i64, count: i64, sample: i64) -> i64 {
    let total = avg as i128 * count as i128 + sample as i128;
    total.div_euclid(count as i128 + 1) as i64
}


/// Provenance of the most recent collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    pub collected_at: DateTime<Utc>,
    pub mode: String,
    pub db_host: String,
    pub db_name: String,
}


impl RunRecord {
    pub fn collected_at_key(&self) -> String {
        self.collected_at.format(COLLECTED_AT_FORMAT).to_string()
    }
}
