//! Tickwork CLI
//!
//! Operator tool for the maintenance scheduler: inspect descriptors and
//! their persisted state, force a job out-of-band, and peek at the
//! auxiliary task queue.

mod commands;

use std::path::Path;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use tickwork_daemon::DaemonConfig;

/// Tickwork CLI — operate the maintenance scheduler.
#[derive(Parser, Debug)]
#[command(name = "tickwork", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        env = "TICKWORK_CONFIG",
        default_value = "tickwork.toml",
        global = true
    )]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print descriptors and their schedules.
    List,
    /// Print persisted job state, for one job or all of them.
    Status {
        /// Job name; omit for every job.
        name: Option<String>,
    },
    /// Synchronously invoke one descriptor's function.
    Run {
        /// Job name.
        name: String,
    },
    /// Print the auxiliary task queue.
    Queue,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DaemonConfig::load(Path::new(&cli.config))?;

    match cli.command {
        Command::List => commands::list::run(),
        Command::Status { name } => commands::status::run(&config, name.as_deref()).await,
        Command::Run { name } => commands::run_job::run(&config, &name).await,
        Command::Queue => commands::queue::run(&config).await,
    }
}
