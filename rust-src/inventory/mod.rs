//! Inventory reconciliation across tables, hypertables and chunks.

mod reconcile;

pub use reconcile::{reconcile, Degradation};
