//! Inventory models: tables, hypertables and their chunks.

use std::fmt;

use serde::Serialize;


/// Kind of an inventory entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Ordinary heap table.
    Table,
    /// TimescaleDB hypertable. Its size already includes every chunk.
    Hypertable,
}


impl EntityKind {
    /// Value stored in `tables.table_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Table => "table",
            EntityKind::Hypertable => "hypertable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "table" => Some(EntityKind::Table),
            "hypertable" => Some(EntityKind::Hypertable),
            _ => None,
        }
    }
}


impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Estimated row count and total on-disk size of one relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Footprint {
    pub estimated_rows: i64,
    pub size_bytes: i64,
}


impl Footprint {
    /// Build a footprint, clamping negative catalog values to zero.
    ///
    /// `reltuples` is -1 for relations that were never analyzed.
    pub fn new(estimated_rows: i64, size_bytes: i64) -> Self {
        Self {
            estimated_rows: estimated_rows.max(0),
            size_bytes: size_bytes.max(0),
        }
    }
}


/// One inventory row: a plain table or a hypertable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub schema: String,
    pub name: String,
    pub kind: EntityKind,
    pub estimated_rows: i64,
    pub compressed: bool,
    pub size_bytes: i64,
}


impl Entity {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        kind: EntityKind,
        compressed: bool,
        footprint: Footprint,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind,
            estimated_rows: footprint.estimated_rows,
            compressed,
            size_bytes: footprint.size_bytes,
        }
    }

    /// Identity as `(schema, name)`.
    pub fn identity(&self) -> (&str, &str) {
        (&self.schema, &self.name)
    }

    /// Qualified display name, `schema.name`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn is_hypertable(&self) -> bool {
        self.kind == EntityKind::Hypertable
    }
}


/// One chunk of a hypertable. Informational only, never summed into totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub schema: String,
    pub name: String,
    pub hypertable: String,
    pub estimated_rows: i64,
    pub compressed: bool,
    pub size_bytes: i64,
}


impl Fragment {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        hypertable: impl Into<String>,
        compressed: bool,
        footprint: Footprint,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            hypertable: hypertable.into(),
            estimated_rows: footprint.estimated_rows,
            compressed,
            size_bytes: footprint.size_bytes,
        }
    }
}
