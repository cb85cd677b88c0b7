//! Fold today's samples into the per-entity daily history.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{Entity, HistoryKey, HistoryPoint};


/// Compute the history points to persist for `day`.
///
/// Each entity either starts a fresh point (`sample_count = 1`) or is folded
/// into its existing point for the same day. Points for other days, and points
/// of entities missing from `entities`, are never touched.
pub fn accumulate(
    entities: &[Entity],
    existing: &HashMap<HistoryKey, HistoryPoint>,
    day: NaiveDate,
) -> Vec<HistoryPoint> {
    entities
        .iter()
        .map(|entity| match existing.get(&HistoryKey::for_entity(entity, day)) {
            Some(point) => point.fold(entity.estimated_rows, entity.size_bytes),
            None => HistoryPoint::first(entity, day),
        })
        .collect()
}
