//! `tickworkd` — the scheduler daemon.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use tickwork_daemon::{DaemonConfig, build_context, build_scheduler};
use tickwork_scheduler::clear_job_cache;

/// Maintenance scheduler daemon for the tickwork market-data stack.
#[derive(Parser, Debug)]
#[command(name = "tickworkd", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "tickwork.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = DaemonConfig::load(Path::new(&cli.config))?;

    let ctx = build_context(&config)?;

    // Stale per-job state from a previous process must not suppress or
    // duplicate today's work.
    clear_job_cache(ctx.state.as_ref()).await?;
    info!("job cache cleared");

    let scheduler = build_scheduler(Arc::clone(&ctx), &config)?;
    let handle = scheduler.start().await;
    info!(jobs = scheduler.jobs().len(), "scheduler started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    handle.shutdown();
    handle.wait_stopped().await;

    Ok(())
}
