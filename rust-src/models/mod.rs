//! Domain models for inventory snapshots and history.

mod history;
mod inventory;

pub use history::{
    HistoryKey,
    HistoryPoint,
    RunRecord,
    COLLECTED_AT_FORMAT,
    DAY_FORMAT,
};
pub use inventory::{Entity, EntityKind, Footprint, Fragment};
