//! CLI command implementations.

pub mod collect;
pub mod report;
pub mod stats;
