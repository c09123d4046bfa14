use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;

use tickwork_daemon::{DaemonConfig, build_context};
use tickwork_scheduler::{jobs, persist};
use tickwork_state::JobStateKind;

/// Synchronously invoke one descriptor's function out-of-band, updating
/// its persisted timestamps on success.
///
/// Single-flight is per-process: a daemon running the same job will
/// skip its own overlapping start, and this invocation runs regardless.
pub async fn run(config: &DaemonConfig, name: &str) -> anyhow::Result<()> {
    let registry = jobs::registry();
    let Some(job) = registry.iter().find(|job| job.name == name) else {
        bail!("unknown job: {name}");
    };

    let ctx = build_context(config).context("failed to build application context")?;
    let now = Utc::now();

    eprintln!("running {name}...");
    let result = (job.function)(Arc::clone(&ctx)).await;

    persist::persist_timestamp(ctx.state.as_ref(), JobStateKind::LastRun, job.name, now).await;

    match result {
        Ok(()) => {
            persist::persist_timestamp(
                ctx.state.as_ref(),
                JobStateKind::LastCompletion,
                job.name,
                now,
            )
            .await;
            persist::write_retry_count(ctx.state.as_ref(), job.name, 0).await;
            println!("{name}: ok");
            Ok(())
        }
        Err(err) => bail!("{name} failed: {err}"),
    }
}
