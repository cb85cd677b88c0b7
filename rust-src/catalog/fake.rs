//! In-memory catalog for tests.

use std::collections::HashMap;

use super::source::{CatalogError, CatalogSource, ChunkRow, HypertableRow, TableRow};
use crate::models::Footprint;


/// Catalog with canned listings. A `None` listing fails as if the
/// category were unavailable on the server. `disconnected` fails every call
/// as a lost connection, `disconnect_at` only the resolution of that relation.
#[derive(Debug, Clone, Default)]
pub struct FakeCatalog {
    pub chunks: Option<Vec<ChunkRow>>,
    pub hypertables: Option<Vec<HypertableRow>>,
    pub tables: Option<Vec<TableRow>>,
    pub footprints: HashMap<(String, String), Footprint>,
    pub failing_resolves: Vec<(String, String)>,
    pub disconnect_at: Option<(String, String)>,
    pub disconnected: bool,
}


impl FakeCatalog {
    /// Catalog without the TimescaleDB extension.
    pub fn plain(tables: Vec<TableRow>) -> Self {
        Self {
            tables: Some(tables),
            ..Default::default()
        }
    }

    pub fn with_footprint(mut self, schema: &str, name: &str, rows: i64, bytes: i64) -> Self {
        self.footprints
            .insert((schema.to_string(), name.to_string()), Footprint::new(rows, bytes));
        self
    }

    fn lookup(&self, schema: &str, name: &str) -> Result<Option<Footprint>, CatalogError> {
        self.check_link()?;
        let key = (schema.to_string(), name.to_string());
        if self.disconnect_at.as_ref() == Some(&key) {
            return Err(connection_closed());
        }
        if self.failing_resolves.contains(&key) {
            return Err(CatalogError::Query(format!("ERROR: relation \"{schema}.{name}\" does not exist")));
        }
        Ok(self.footprints.get(&key).copied())
    }

    fn check_link(&self) -> Result<(), CatalogError> {
        if self.disconnected {
            return Err(connection_closed());
        }
        Ok(())
    }

    fn listing<T: Clone>(&self, rows: &Option<Vec<T>>, relation: &str) -> Result<Vec<T>, CatalogError> {
        self.check_link()?;
        rows.clone().ok_or_else(|| {
            CatalogError::Query(format!("ERROR: relation \"{relation}\" does not exist"))
        })
    }
}


fn connection_closed() -> CatalogError {
    CatalogError::Connection("connection closed".to_string())
}


impl CatalogSource for FakeCatalog {
    fn list_chunks(&mut self) -> Result<Vec<ChunkRow>, CatalogError> {
        self.listing(&self.chunks, "timescaledb_information.chunks")
    }

    fn resolve_chunk(&mut self, schema: &str, name: &str) -> Result<Option<Footprint>, CatalogError> {
        self.lookup(schema, name)
    }

    fn list_hypertables(&mut self) -> Result<Vec<HypertableRow>, CatalogError> {
        self.listing(&self.hypertables, "timescaledb_information.hypertables")
    }

    fn resolve_hypertable(&mut self, schema: &str, name: &str) -> Result<Option<Footprint>, CatalogError> {
        self.lookup(schema, name)
    }

    fn list_tables(&mut self) -> Result<Vec<TableRow>, CatalogError> {
        self.listing(&self.tables, "pg_class")
    }
}


pub fn table(schema: &str, name: &str, rows: i64, bytes: i64) -> TableRow {
    TableRow {
        schema: schema.to_string(),
        name: name.to_string(),
        footprint: Footprint::new(rows, bytes),
    }
}


pub fn hypertable(schema: &str, name: &str, compression_enabled: bool) -> HypertableRow {
    HypertableRow {
        schema: schema.to_string(),
        name: name.to_string(),
        compression_enabled,
    }
}


pub fn chunk(schema: &str, name: &str, hypertable: &str, compressed: bool) -> ChunkRow {
    ChunkRow {
        schema: schema.to_string(),
        name: name.to_string(),
        hypertable: hypertable.to_string(),
        compressed,
    }
}
