//! Bounded retry with delayed background re-execution.
//!
//! The controller surfaces the current failure to the executor (so
//! monitoring sees every failed attempt and `last_completion` keeps
//! reflecting reality) while a background task owns the next attempt.
//! The delayed task re-enters through the executor so the single-flight
//! guard, timestamps, and alerting behave identically on every attempt.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use tickwork_core::JobError;

use crate::descriptor::JobDescriptor;
use crate::executor::run_job_once;
use crate::persist;
use crate::scheduler::SchedulerCore;

/// One retry-aware invocation of the job body.
///
/// Reads the persisted attempt counter, invokes the body once, and on a
/// retryable failure increments the counter and schedules the delayed
/// re-try before returning the original failure to the executor.
pub(crate) async fn execute_with_retry(
    core: &Arc<SchedulerCore>,
    job: &Arc<JobDescriptor>,
) -> Result<(), JobError> {
    let attempts = persist::read_retry_count(core.ctx.state.as_ref(), job.name).await;

    let Err(err) = run_job_once(core, job).await else {
        return Ok(());
    };
    if !job.retry_on_failure {
        return Err(err);
    }

    warn!(
        job = job.name,
        attempt = attempts + 1,
        budget = job.max_retries + 1,
        error = %err,
        "job attempt failed"
    );

    if attempts >= job.max_retries {
        error!(job = job.name, "retry budget exhausted, giving up");
        return Err(err);
    }

    persist::write_retry_count(core.ctx.state.as_ref(), job.name, attempts + 1).await;
    spawn_delayed_retry(Arc::clone(core), Arc::clone(job));

    Err(err)
}

/// Wait out `retry_delay`, then re-execute — unless the scheduler shuts
/// down first, in which case the wait is cancelled without executing.
fn spawn_delayed_retry(core: Arc<SchedulerCore>, job: Arc<JobDescriptor>) {
    tokio::spawn(async move {
        tokio::select! {
            () = core.shutdown.cancelled() => {
                info!(job = job.name, "scheduler stopped, cancelling retry");
            }
            () = tokio::time::sleep(job.retry_delay) => {
                if !core.is_running().await {
                    info!(job = job.name, "scheduler stopped, cancelling retry");
                    return;
                }
                crate::executor::execute(&core, &job, Utc::now()).await;
            }
        }
    });
}
