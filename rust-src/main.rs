//! dbfp - storage footprint history for PostgreSQL/TimescaleDB.
//!
//! Snapshots table and hypertable sizes into a local SQLite store and renders
//! the history as a static report.

mod catalog;
mod cli;
mod commands;
mod config;
mod history;
mod inventory;
mod models;
mod report;
mod storage;


fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
