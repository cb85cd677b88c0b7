//! Catalog source abstraction.

use std::fmt;

use thiserror::Error;

use crate::models::Footprint;


/// Error talking to the source catalog.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("PostgreSQL: {0}")]
    Connection(String),

    #[error("PostgreSQL query error: {0}")]
    Query(String),
}


impl CatalogError {
    /// The link to the source is gone. Aborts the run instead of degrading it.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, CatalogError::Connection(_))
    }
}


/// The three independently-queried catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogCategory {
    Chunks,
    Hypertables,
    Tables,
}


impl fmt::Display for CatalogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CatalogCategory::Chunks => "chunks",
            CatalogCategory::Hypertables => "hypertables",
            CatalogCategory::Tables => "tables",
        })
    }
}


/// A chunk as listed by the catalog, before its footprint is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRow {
    pub schema: String,
    pub name: String,
    pub hypertable: String,
    pub compressed: bool,
}


/// A hypertable as listed by the catalog, before its footprint is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HypertableRow {
    pub schema: String,
    pub name: String,
    pub compression_enabled: bool,
}


/// A plain table candidate. Footprint comes with the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub schema: String,
    pub name: String,
    pub footprint: Footprint,
}


/// Read-only view of a source database's storage catalog.
///
/// Each listing may fail on its own (e.g. the TimescaleDB extension is not
/// installed). Resolvers return `Ok(None)` when the relation has no catalog row.
/// Errors on a dead connection must be reported as [`CatalogError::Connection`].
pub trait CatalogSource {
    fn list_chunks(&mut self) -> Result<Vec<ChunkRow>, CatalogError>;

    fn resolve_chunk(&mut self, schema: &str, name: &str) -> Result<Option<Footprint>, CatalogError>;

    fn list_hypertables(&mut self) -> Result<Vec<HypertableRow>, CatalogError>;

    /// Footprint of a hypertable, inclusive of all its chunks.
    fn resolve_hypertable(&mut self, schema: &str, name: &str)
        -> Result<Option<Footprint>, CatalogError>;

    fn list_tables(&mut self) -> Result<Vec<TableRow>, CatalogError>;
}
