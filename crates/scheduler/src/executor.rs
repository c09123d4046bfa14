//! Runs one job: single-flight enforcement, panic recovery, timing,
//! timestamp persistence, and the failure/success branches.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tracing::{error, info};

use tickwork_core::JobError;
use tickwork_state::JobStateKind;

use crate::descriptor::JobDescriptor;
use crate::persist;
use crate::retry;
use crate::scheduler::SchedulerCore;

/// Execute one descriptor.
///
/// Safe to call concurrently for distinct descriptors and idempotent
/// for the same one: a second call while the body is in flight logs and
/// returns immediately.
pub(crate) async fn execute(
    core: &Arc<SchedulerCore>,
    job: &Arc<JobDescriptor>,
    now: DateTime<Utc>,
) {
    let Some(runtime) = core.runtime(job.name) else {
        error!(job = job.name, "no runtime registered for job");
        return;
    };

    {
        let mut rt = runtime.lock().await;
        if rt.in_flight {
            info!(job = job.name, "job already in flight, skipping");
            if job.retry_on_failure {
                // A long-running attempt must not be re-entered forever
                // through its own pending retry counter.
                persist::write_retry_count(core.ctx.state.as_ref(), job.name, 0).await;
            }
            return;
        }
        rt.in_flight = true;
    }

    let started = Instant::now();
    let result = retry::execute_with_retry(core, job).await;
    let elapsed = started.elapsed();

    {
        let mut rt = runtime.lock().await;
        rt.in_flight = false;
        rt.last_run = Some(now);
    }
    persist::persist_timestamp(core.ctx.state.as_ref(), JobStateKind::LastRun, job.name, now)
        .await;

    match result {
        Err(err) => {
            error!(job = job.name, error = %err, "job failed");
            core.ctx.alerts.log_critical_alert(&err, job.name).await;
        }
        Ok(()) => {
            info!(
                job = job.name,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "job completed"
            );
            if job.retry_on_failure {
                persist::write_retry_count(core.ctx.state.as_ref(), job.name, 0).await;
            }
            {
                let mut rt = runtime.lock().await;
                rt.last_completion = Some(now);
            }
            persist::persist_timestamp(
                core.ctx.state.as_ref(),
                JobStateKind::LastCompletion,
                job.name,
                now,
            )
            .await;
        }
    }
}

/// Invoke the job body once with the panic shim installed.
///
/// A recovered panic is reported to the alert sink with the job name and
/// converted to a failure value so the caller's failure path proceeds
/// normally.
pub(crate) async fn run_job_once(
    core: &Arc<SchedulerCore>,
    job: &JobDescriptor,
) -> Result<(), JobError> {
    let fut = (job.function)(Arc::clone(&core.ctx));
    // AssertUnwindSafe: the context is only reached through Arc'd
    // handles; nothing the body could tear is observed after a panic.
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let err = JobError::Panicked(panic_message(&panic));
            error!(job = job.name, error = %err, "recovered job panic");
            core.ctx.alerts.log_critical_alert(&err, job.name).await;
            Err(err)
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
