//! Storage layer for inventory snapshots and history.

mod database;
mod reader;

pub use database::{open_store, write_snapshot, Snapshot, WriteSummary};
pub use reader::{
    load_fragments,
    load_history,
    load_inventory,
    load_inventory_history,
    load_run_record,
    open_read_only,
};
