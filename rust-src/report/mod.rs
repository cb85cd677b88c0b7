//! Static report over the persisted snapshot.

mod data;
mod format;
mod html;

pub use data::{bytes_to_gb, load_report_data};
pub use format::{format_gb, format_number};
pub use html::write_report;
