//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::commands;
use crate::config::{default_store_path, RunConfig, SourceConfig, DEFAULT_MODE};


/// dbfp - storage footprint history for PostgreSQL/TimescaleDB
#[derive(Parser)]
#[command(name = "dbfp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Snapshot store path (default: <data dir>/dbfp/db_monitoring.sqlite)
    #[arg(long, global = true, env = "DBFP_STORE")]
    store: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}


#[derive(Subcommand)]
enum Commands {
    /// Collect a snapshot of table sizes from the source database
    Collect {
        #[command(flatten)]
        source: SourceArgs,

        /// Invocation mode recorded with the run
        #[arg(long, default_value = DEFAULT_MODE)]
        mode: String,
    },

    /// Generate the static HTML report
    Report {
        /// Output file path
        #[arg(short, long, default_value = "index.html")]
        output: PathBuf,

        /// Open file after generating
        #[arg(long)]
        open: bool,
    },

    /// Show the latest snapshot in the terminal
    Stats {
        /// Show daily history for one table (schema.name)
        #[arg(short, long)]
        table: Option<String>,

        /// Number of largest tables to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}


/// Source connection parameters. Required ones are checked before any I/O.
#[derive(Args)]
struct SourceArgs {
    #[arg(long = "db-host", env = "PROD_DB_HOST")]
    host: Option<String>,

    #[arg(long = "db-port", env = "PROD_DB_PORT")]
    port: Option<String>,

    #[arg(long = "db-name", env = "PROD_DB_NAME")]
    database: Option<String>,

    #[arg(long = "db-user", env = "PROD_DB_USER")]
    user: Option<String>,

    #[arg(long = "db-password", env = "PROD_DB_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}


impl SourceArgs {
    fn into_config(self) -> Result<SourceConfig, crate::config::ConfigError> {
        SourceConfig::from_parts(self.host, self.port, self.database, self.user, self.password)
    }
}


/// Run the CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store_path = cli.store.unwrap_or_else(default_store_path);

    match cli.command {
        Some(Commands::Collect { source, mode }) => {
            let config = RunConfig {
                store_path,
                mode,
                source: source.into_config()?,
            };
            commands::collect::run(&config)?;
        }
        Some(Commands::Report { output, open }) => {
            commands::report::run(&store_path, &output, open)?;
        }
        Some(Commands::Stats { table, top }) => {
            commands::stats::run(&store_path, table.as_deref(), top)?;
        }
        None => {
            // No subcommand, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}


/// Log to stderr. Warnings are always shown, `-v` adds progress.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
