//! Report command: render the persisted snapshot as static HTML.

use std::path::Path;

use anyhow::{Context, Result};

use crate::report::{load_report_data, write_report};


/// Run the report command.
pub fn run(store_path: &Path, output: &Path, should_open: bool) -> Result<()> {
    if !store_path.exists() {
        println!("\x1b[33mNo snapshot store at {}, writing an empty report.\x1b[0m", store_path.display());
    }

    let data = load_report_data(store_path)?;
    write_report(&data, output)?;

    println!(
        "\x1b[32m+ Static HTML generated at {} ({} tables)\x1b[0m",
        output.display(),
        data.stats.total_tables
    );

    if should_open {
        open_file(output)?;
    }

    Ok(())
}


/// Open a file with the platform's default handler.
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    let mut command = std::process::Command::new("open");

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    };

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = std::process::Command::new("xdg-open");

    command
        .arg(path)
        .spawn()
        .with_context(|| format!("Failed to open {}", path.display()))?;

    Ok(())
}
