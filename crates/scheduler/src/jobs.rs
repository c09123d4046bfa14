//! The production descriptor set.
//!
//! Times are in the scheduler's civil timezone. Ordering between jobs is
//! expressed entirely through disjoint slots; the evening refresh chain
//! (20:00 stop, 20:15 sectors, 21:30 regulators, 21:45 master + OHLCV)
//! is deliberate.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use tickwork_core::JobError;

use crate::context::AppContext;
use crate::descriptor::{JobDescriptor, ScheduleTime, job_fn};

/// Build the static descriptor list. Constructed once at program start.
#[must_use]
pub fn registry() -> Vec<Arc<JobDescriptor>> {
    let hourly_at_five: Vec<ScheduleTime> =
        (0..24).map(|hour| ScheduleTime::new(hour, 5)).collect();

    vec![
        Arc::new(
            JobDescriptor::new("sync-external-pricing", job_fn(sync_external_pricing))
                .at(4, 0)
                .with_retry(5, Duration::from_secs(120)),
        ),
        Arc::new(
            JobDescriptor::new("refresh-security-master", job_fn(refresh_security_master))
                .at(21, 45)
                .skip_on_weekends()
                .with_retry(5, Duration::from_secs(120)),
        ),
        Arc::new(
            JobDescriptor::new("consolidate-daily-ohlcv", job_fn(consolidate_daily_ohlcv))
                .at(21, 45)
                .skip_on_weekends()
                // Consolidation must land before the next session even if
                // the bar source is flaky all night.
                .with_retry(100, Duration::from_secs(300)),
        ),
        Arc::new(
            JobDescriptor::new("start-market-stream", job_fn(start_market_stream))
                .at(3, 58)
                .skip_on_weekends()
                .run_at_init()
                .with_retry(10, Duration::from_secs(300)),
        ),
        Arc::new(
            JobDescriptor::new("start-screener-loop", job_fn(start_screener_loop))
                .at(9, 35)
                .skip_on_weekends()
                .run_at_init()
                .with_retry(10, Duration::from_secs(300)),
        ),
        Arc::new(
            JobDescriptor::new("stop-evening-services", job_fn(stop_evening_services))
                .at(20, 0)
                .skip_on_weekends(),
        ),
        Arc::new(
            JobDescriptor::new(
                "refresh-sector-classifications",
                job_fn(refresh_sector_classifications),
            )
            .at(20, 15)
            .skip_on_weekends()
            .with_retry(5, Duration::from_secs(120)),
        ),
        Arc::new(
            JobDescriptor::new(
                "refresh-regulator-identifiers",
                job_fn(refresh_regulator_identifiers),
            )
            .at(21, 30)
            .skip_on_weekends()
            .with_retry(5, Duration::from_secs(120)),
        ),
        Arc::new(
            JobDescriptor::new(
                "check-coverage-start-services",
                job_fn(check_coverage_start_services),
            )
            .with_schedule(hourly_at_five)
            .with_retry(2, Duration::from_secs(60)),
        ),
        Arc::new(
            JobDescriptor::new("start-worker-monitor", job_fn(start_worker_monitor))
                .at(3, 55)
                .run_at_init()
                .with_retry(5, Duration::from_secs(60)),
        ),
        Arc::new(
            JobDescriptor::new("grant-renewal-credits", job_fn(grant_renewal_credits))
                .at(4, 5)
                .with_retry(5, Duration::from_secs(120)),
        ),
        Arc::new(
            JobDescriptor::new("reconcile-webhook-polling", job_fn(reconcile_webhook_polling))
                .at(0, 0)
                .with_retry(3, Duration::from_secs(120)),
        ),
    ]
}

async fn sync_external_pricing(ctx: Arc<AppContext>) -> Result<(), JobError> {
    ctx.maintenance.sync_external_pricing().await
}

async fn refresh_security_master(ctx: Arc<AppContext>) -> Result<(), JobError> {
    ctx.maintenance.refresh_security_master().await
}

async fn consolidate_daily_ohlcv(ctx: Arc<AppContext>) -> Result<(), JobError> {
    ctx.maintenance.consolidate_daily_ohlcv().await
}

/// Coverage-gated: the probe is the first step, and a failed gate is a
/// retryable failure rather than a dependency edge.
async fn start_market_stream(ctx: Arc<AppContext>) -> Result<(), JobError> {
    if !ctx.coverage.has_partial_ohlcv_coverage().await? {
        return Err(JobError::CoverageNotReady(
            "historical backfill below stream threshold".into(),
        ));
    }
    ctx.stream.start_market_stream().await?;
    ctx.maintenance.set_upstream_webhooks_enabled(true).await
}

/// Coverage-gated like the stream starter.
async fn start_screener_loop(ctx: Arc<AppContext>) -> Result<(), JobError> {
    if !ctx.coverage.has_partial_ohlcv_coverage().await? {
        return Err(JobError::CoverageNotReady(
            "historical backfill below screener threshold".into(),
        ));
    }
    ctx.stream.start_screener_loop().await
}

async fn stop_evening_services(ctx: Arc<AppContext>) -> Result<(), JobError> {
    ctx.stream.stop_market_stream().await;
    ctx.stream.stop_screener_loop().await;
    ctx.maintenance.set_upstream_webhooks_enabled(false).await
}

async fn refresh_sector_classifications(ctx: Arc<AppContext>) -> Result<(), JobError> {
    ctx.maintenance.refresh_sector_classifications().await
}

async fn refresh_regulator_identifiers(ctx: Arc<AppContext>) -> Result<(), JobError> {
    ctx.maintenance.refresh_regulator_identifiers().await
}

/// Hourly safety net: if the gated starters exhausted their retry
/// budgets before coverage arrived, this brings the services up later.
async fn check_coverage_start_services(ctx: Arc<AppContext>) -> Result<(), JobError> {
    if !ctx.coverage.has_partial_ohlcv_coverage().await? {
        info!("coverage still insufficient, leaving gated services stopped");
        return Ok(());
    }
    if !ctx.stream.is_market_stream_running().await {
        info!("coverage reached, starting market stream");
        ctx.stream.start_market_stream().await?;
    }
    if !ctx.stream.is_screener_running().await {
        info!("coverage reached, starting screener loop");
        ctx.stream.start_screener_loop().await?;
    }
    Ok(())
}

async fn start_worker_monitor(ctx: Arc<AppContext>) -> Result<(), JobError> {
    ctx.workers.start().await
}

async fn grant_renewal_credits(ctx: Arc<AppContext>) -> Result<(), JobError> {
    ctx.maintenance.grant_renewal_credits().await
}

async fn reconcile_webhook_polling(ctx: Arc<AppContext>) -> Result<(), JobError> {
    ctx.maintenance.reconcile_webhook_polling().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use tickwork_state_memory::MemoryStateStore;

    use crate::testing::TestHarness;

    fn find(jobs: &[Arc<JobDescriptor>], name: &str) -> Arc<JobDescriptor> {
        jobs.iter()
            .find(|job| job.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("missing descriptor {name}"))
    }

    #[test]
    fn registry_names_are_unique() {
        let jobs = registry();
        let names: HashSet<&str> = jobs.iter().map(|job| job.name).collect();
        assert_eq!(names.len(), jobs.len());
        assert_eq!(jobs.len(), 12);
    }

    #[test]
    fn evening_chain_is_ordered_by_slot() {
        let jobs = registry();
        let slot = |name: &str| find(&jobs, name).schedule[0].minute_of_day();
        assert!(slot("stop-evening-services") < slot("refresh-sector-classifications"));
        assert!(slot("refresh-sector-classifications") < slot("refresh-regulator-identifiers"));
        assert!(slot("refresh-regulator-identifiers") <= slot("refresh-security-master"));
    }

    #[test]
    fn coverage_probe_runs_every_hour_including_weekends() {
        let jobs = registry();
        let probe = find(&jobs, "check-coverage-start-services");
        assert_eq!(probe.schedule.len(), 24);
        assert!(probe.schedule.iter().all(|slot| slot.minute == 5));
        assert!(!probe.skip_on_weekends);
    }

    #[tokio::test]
    async fn gated_starter_fails_without_coverage() {
        let harness = TestHarness::new(std::sync::Arc::new(MemoryStateStore::new()));
        harness.coverage.set_covered(false);

        let err = start_market_stream(std::sync::Arc::clone(&harness.ctx))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "coverage_not_ready");
        assert!(!harness.stream.market_running());
    }

    #[tokio::test]
    async fn gated_starter_starts_stream_and_webhooks_with_coverage() {
        let harness = TestHarness::new(std::sync::Arc::new(MemoryStateStore::new()));
        harness.coverage.set_covered(true);

        start_market_stream(std::sync::Arc::clone(&harness.ctx))
            .await
            .unwrap();
        assert!(harness.stream.market_running());
        assert_eq!(
            harness.maintenance.take_calls(),
            vec!["enable_upstream_webhooks"]
        );
    }

    #[tokio::test]
    async fn coverage_probe_starts_blocked_services() {
        let harness = TestHarness::new(std::sync::Arc::new(MemoryStateStore::new()));

        harness.coverage.set_covered(false);
        check_coverage_start_services(std::sync::Arc::clone(&harness.ctx))
            .await
            .unwrap();
        assert!(!harness.stream.market_running());
        assert!(!harness.stream.screener_running());

        harness.coverage.set_covered(true);
        check_coverage_start_services(std::sync::Arc::clone(&harness.ctx))
            .await
            .unwrap();
        assert!(harness.stream.market_running());
        assert!(harness.stream.screener_running());
    }

    #[tokio::test]
    async fn evening_stop_halts_services_and_webhooks() {
        let harness = TestHarness::new(std::sync::Arc::new(MemoryStateStore::new()));
        harness.stream.force_running();

        stop_evening_services(std::sync::Arc::clone(&harness.ctx))
            .await
            .unwrap();
        assert!(!harness.stream.market_running());
        assert!(!harness.stream.screener_running());
        assert_eq!(
            harness.maintenance.take_calls(),
            vec!["disable_upstream_webhooks"]
        );
    }

    #[tokio::test]
    async fn maintenance_jobs_delegate_to_their_operation() {
        let harness = TestHarness::new(std::sync::Arc::new(MemoryStateStore::new()));

        sync_external_pricing(std::sync::Arc::clone(&harness.ctx))
            .await
            .unwrap();
        grant_renewal_credits(std::sync::Arc::clone(&harness.ctx))
            .await
            .unwrap();
        assert_eq!(
            harness.maintenance.take_calls(),
            vec!["sync_external_pricing", "grant_renewal_credits"]
        );
    }
}
