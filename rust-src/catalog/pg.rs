//! PostgreSQL / TimescaleDB catalog reader.

use postgres::{Client, NoTls, Row};
use tracing::debug;

use super::source::{CatalogError, CatalogSource, ChunkRow, HypertableRow, TableRow};
use crate::config::SourceConfig;
use crate::models::Footprint;


const LIST_CHUNKS_SQL: &str = "
    SELECT chunk_schema::text, chunk_name::text, hypertable_name::text,
           COALESCE(is_compressed, false)
    FROM timescaledb_information.chunks
    WHERE chunk_schema NOT IN ('pg_catalog', 'information_schema')";

const RESOLVE_CHUNK_SQL: &str = "
    SELECT COALESCE(c.reltuples::bigint, 0),
           COALESCE(pg_total_relation_size(c.oid), 0)
    FROM pg_class c
    JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relname = $2
    LIMIT 1";

const LIST_HYPERTABLES_SQL: &str = "
    SELECT hypertable_schema::text, hypertable_name::text,
           COALESCE(compression_enabled, false)
    FROM timescaledb_information.hypertables
    WHERE hypertable_schema NOT IN ('pg_catalog', 'information_schema')";

// hypertable_size() already includes every chunk of the hypertable.
const RESOLVE_HYPERTABLE_SQL: &str = "
    SELECT COALESCE(c.reltuples::bigint, 0),
           COALESCE(hypertable_size(c.oid::regclass), 0)
    FROM pg_class c
    JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relname = $2
    LIMIT 1";

const LIST_TABLES_SQL: &str = "
    SELECT n.nspname::text, c.relname::text,
           COALESCE(c.reltuples::bigint, 0),
           pg_total_relation_size(c.oid)
    FROM pg_class c
    JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE c.relkind = 'r'
      AND n.nspname NOT IN ('pg_catalog', 'information_schema')
      AND n.nspname NOT LIKE 'pg_toast%'
      AND n.nspname NOT LIKE '\\_timescaledb\\_%'";


/// Catalog reader backed by a live PostgreSQL connection.
pub struct PostgresCatalog {
    client: Client,
}


impl PostgresCatalog {
    /// Connect to the source database. Failure here aborts the run.
    pub fn connect(config: &SourceConfig) -> Result<Self, CatalogError> {
        let client = Client::connect(&config.connection_string(), NoTls)
            .map_err(|e| CatalogError::Connection(format_postgres_error(&e)))?;
        debug!(host = %config.host, database = %config.database, "connected to source");
        Ok(Self { client })
    }

    fn query(&mut self, sql: &str, schema: Option<(&str, &str)>) -> Result<Vec<Row>, CatalogError> {
        let result = match schema {
            Some((schema, name)) => self.client.query(sql, &[&schema, &name]),
            None => self.client.query(sql, &[]),
        };
        result.map_err(|e| query_error(&e))
    }

    fn resolve(&mut self, sql: &str, schema: &str, name: &str) -> Result<Option<Footprint>, CatalogError> {
        let rows = self.query(sql, Some((schema, name)))?;
        rows.first().map(parse_footprint).transpose()
    }
}


impl CatalogSource for PostgresCatalog {
    fn list_chunks(&mut self) -> Result<Vec<ChunkRow>, CatalogError> {
        self.query(LIST_CHUNKS_SQL, None)?
            .iter()
            .map(|row| {
                Ok(ChunkRow {
                    schema: get(row, 0)?,
                    name: get(row, 1)?,
                    hypertable: get(row, 2)?,
                    compressed: get(row, 3)?,
                })
            })
            .collect()
    }

    fn resolve_chunk(&mut self, schema: &str, name: &str) -> Result<Option<Footprint>, CatalogError> {
        self.resolve(RESOLVE_CHUNK_SQL, schema, name)
    }

    fn list_hypertables(&mut self) -> Result<Vec<HypertableRow>, CatalogError> {
        self.query(LIST_HYPERTABLES_SQL, None)?
            .iter()
            .map(|row| {
                Ok(HypertableRow {
                    schema: get(row, 0)?,
                    name: get(row, 1)?,
                    compression_enabled: get(row, 2)?,
                })
            })
            .collect()
    }

    fn resolve_hypertable(&mut self, schema: &str, name: &str) -> Result<Option<Footprint>, CatalogError> {
        self.resolve(RESOLVE_HYPERTABLE_SQL, schema, name)
    }

    fn list_tables(&mut self) -> Result<Vec<TableRow>, CatalogError> {
        self.query(LIST_TABLES_SQL, None)?
            .iter()
            .map(|row| {
                Ok(TableRow {
                    schema: get(row, 0)?,
                    name: get(row, 1)?,
                    footprint: Footprint::new(
                        get::<Option<i64>>(row, 2)?.unwrap_or(0),
                        get::<Option<i64>>(row, 3)?.unwrap_or(0),
                    ),
                })
            })
            .collect()
    }
}


fn get<'a, T: postgres::types::FromSql<'a>>(row: &'a Row, idx: usize) -> Result<T, CatalogError> {
    row.try_get(idx)
        .map_err(|e| CatalogError::Query(format_postgres_error(&e)))
}


/// Map a query-time error, keeping a dropped connection distinct from a
/// failed statement.
fn query_error(e: &postgres::Error) -> CatalogError {
    if e.is_closed() {
        CatalogError::Connection(format_postgres_error(e))
    } else {
        CatalogError::Query(format_postgres_error(e))
    }
}


fn parse_footprint(row: &Row) -> Result<Footprint, CatalogError> {
    Ok(Footprint::new(
        get::<Option<i64>>(row, 0)?.unwrap_or(0),
        get::<Option<i64>>(row, 1)?.unwrap_or(0),
    ))
}


/// Condense a PostgreSQL error into a single readable line.
pub(crate) fn format_postgres_error(e: &postgres::Error) -> String {
    if let Some(db_error) = e.as_db_error() {
        return format!("{}: {}", db_error.severity(), db_error.message());
    }

    let msg = e.to_string();
    if msg.contains("Connection refused") {
        "connection refused".to_string()
    } else if msg.contains("password authentication failed") {
        "password authentication failed".to_string()
    } else {
        msg
    }
}
