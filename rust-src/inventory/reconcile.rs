//! Reconcile catalog listings into one deduplicated inventory.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, warn};

use crate::catalog::{CatalogCategory, CatalogError, CatalogSource, TableRow};
use crate::models::{Entity, EntityKind, Fragment};


/// Something the run had to skip. Never fatal on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// A whole category could not be listed and was treated as empty.
    SourceUnavailable { category: CatalogCategory, reason: String },
    /// A single relation could not be resolved and was left out.
    ResolutionMiss { category: CatalogCategory, relation: String, reason: String },
}


impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::SourceUnavailable { category, reason } => {
                write!(f, "failed to collect {category}: {reason}")
            }
            Degradation::ResolutionMiss { category, relation, reason } => {
                write!(f, "skipped {category} entry {relation}: {reason}")
            }
        }
    }
}


/// Result of listing one catalog category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome<T> {
    Collected(Vec<T>),
    Degraded { reason: String },
}


impl<T> CategoryOutcome<T> {
    /// Classify a listing result. A lost connection is passed through as an
    /// error; any other failure degrades the category.
    pub fn from_result(result: Result<Vec<T>, CatalogError>) -> Result<Self, CatalogError> {
        match result {
            Ok(rows) => Ok(CategoryOutcome::Collected(rows)),
            Err(e) if e.is_connection_lost() => Err(e),
            Err(e) => Ok(CategoryOutcome::Degraded { reason: e.to_string() }),
        }
    }

    /// Rows of the category, empty when degraded. Records the degradation.
    fn into_rows(self, category: CatalogCategory, degradations: &mut Vec<Degradation>) -> Vec<T> {
        match self {
            CategoryOutcome::Collected(rows) => rows,
            CategoryOutcome::Degraded { reason } => {
                warn!(%category, error = %reason, "catalog category unavailable, treating as empty");
                degradations.push(Degradation::SourceUnavailable { category, reason });
                Vec::new()
            }
        }
    }
}


/// Deduplicated inventory plus the separate chunk list.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub entities: Vec<Entity>,
    pub fragments: Vec<Fragment>,
    pub degradations: Vec<Degradation>,
}


impl Reconciliation {
    pub fn hypertable_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_hypertable()).count()
    }
}


/// Read all three categories from `source` and merge them.
///
/// Hypertables are taken with their fragment-inclusive size. Plain tables
/// that are also hypertables are dropped. Chunks are kept apart and never
/// added to any entity.
///
/// Fails only when the connection to the source is lost, at any point.
pub fn reconcile(source: &mut dyn CatalogSource) -> Result<Reconciliation, CatalogError> {
    let mut degradations = Vec::new();

    let fragments = collect_fragments(source, &mut degradations)?;

    let hypertable_rows = CategoryOutcome::from_result(source.list_hypertables())?
        .into_rows(CatalogCategory::Hypertables, &mut degradations);

    let hypertable_ids: HashSet<(String, String)> = hypertable_rows
        .iter()
        .map(|h| (h.schema.clone(), h.name.clone()))
        .collect();

    let mut entities = Vec::with_capacity(hypertable_rows.len());
    for row in &hypertable_rows {
        let resolved = source.resolve_hypertable(&row.schema, &row.name);
        let relation = format!("{}.{}", row.schema, row.name);
        let Some(footprint) = resolved_or_skip(resolved, CatalogCategory::Hypertables, relation, &mut degradations)? else {
            continue;
        };
        entities.push(Entity::new(
            &row.schema,
            &row.name,
            EntityKind::Hypertable,
            row.compression_enabled,
            footprint,
        ));
    }

    let table_rows = CategoryOutcome::from_result(source.list_tables())?
        .into_rows(CatalogCategory::Tables, &mut degradations);
    entities.extend(plain_tables(table_rows, &hypertable_ids));

    Ok(Reconciliation {
        entities,
        fragments,
        degradations,
    })
}


/// Plain-table entities whose identity is not a known hypertable.
pub fn plain_tables(
    rows: Vec<TableRow>,
    hypertable_ids: &HashSet<(String, String)>,
) -> impl Iterator<Item = Entity> + '_ {
    rows.into_iter()
        .filter(|row| !hypertable_ids.contains(&(row.schema.clone(), row.name.clone())))
        .map(|row| Entity::new(row.schema, row.name, EntityKind::Table, false, row.footprint))
}


fn collect_fragments(
    source: &mut dyn CatalogSource,
    degradations: &mut Vec<Degradation>,
) -> Result<Vec<Fragment>, CatalogError> {
    let rows = CategoryOutcome::from_result(source.list_chunks())?
        .into_rows(CatalogCategory::Chunks, degradations);

    let mut fragments = Vec::with_capacity(rows.len());
    for row in rows {
        let resolved = source.resolve_chunk(&row.schema, &row.name);
        let relation = format!("{}.{}", row.schema, row.name);
        let Some(footprint) = resolved_or_skip(resolved, CatalogCategory::Chunks, relation, degradations)? else {
            continue;
        };
        fragments.push(Fragment::new(row.schema, row.name, row.hypertable, row.compressed, footprint));
    }
    Ok(fragments)
}


fn resolved_or_skip<T>(
    resolved: Result<Option<T>, CatalogError>,
    category: CatalogCategory,
    relation: String,
    degradations: &mut Vec<Degradation>,
) -> Result<Option<T>, CatalogError> {
    let reason = match resolved {
        Ok(Some(value)) => {
            debug!(%category, %relation, "resolved footprint");
            return Ok(Some(value));
        }
        Ok(None) => "no catalog row".to_string(),
        Err(e) if e.is_connection_lost() => return Err(e),
        Err(e) => e.to_string(),
    };

    warn!(%category, %relation, error = %reason, "could not resolve footprint, skipping");
    degradations.push(Degradation::ResolutionMiss { category, relation, reason });
    Ok(None)
}
