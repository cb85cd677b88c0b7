//! Source catalog access.

mod pg;
mod source;

#[cfg(test)]
pub mod fake;

pub use pg::PostgresCatalog;
pub use source::{CatalogCategory, CatalogError, CatalogSource, TableRow};
