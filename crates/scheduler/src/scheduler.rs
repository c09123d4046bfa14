//! The scheduler loop and its lifecycle.
//!
//! `idle → starting (boot delay) → running (minute tick) → stopping
//! (cancel retries, stop hooks) → stopped`. The tick is single-threaded;
//! concurrency comes from spawning executions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use tickwork_core::MarketClock;
use tickwork_state::JobStateKind;

use crate::context::AppContext;
use crate::descriptor::JobDescriptor;
use crate::persist;
use crate::runtime::JobRuntime;
use crate::schedule;

/// Tunables for the scheduler loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Pause between `start()` and the first rehydrate/tick.
    pub boot_delay: Duration,
    /// Tick cadence. One minute in production; schedule slots have
    /// minute resolution, so each slot fires at most once per day.
    pub tick_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            boot_delay: Duration::from_secs(5),
            tick_interval: Duration::from_secs(60),
        }
    }
}

/// Errors raised while assembling a scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Two descriptors share a name; registration is a programmer
    /// error, not a runtime condition.
    #[error("duplicate job name: {0}")]
    DuplicateJob(&'static str),
}

/// Handle for signalling and awaiting scheduler shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    shutdown: CancellationToken,
    stopped: CancellationToken,
}

impl ShutdownHandle {
    /// Signal shutdown: the tick stops, pending delayed retries cancel,
    /// and the stop hooks run. Running job bodies are not cancelled.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait until the loop has fully stopped (stop hooks included).
    pub async fn wait_stopped(&self) {
        self.stopped.cancelled().await;
    }
}

/// Shared state behind every spawned execution and retry task.
pub(crate) struct SchedulerCore {
    pub(crate) ctx: Arc<AppContext>,
    pub(crate) clock: MarketClock,
    pub(crate) jobs: Vec<Arc<JobDescriptor>>,
    runtimes: HashMap<&'static str, Arc<Mutex<JobRuntime>>>,
    pub(crate) shutdown: CancellationToken,
    running: Mutex<bool>,
    config: SchedulerConfig,
}

impl SchedulerCore {
    pub(crate) fn runtime(&self, name: &str) -> Option<Arc<Mutex<JobRuntime>>> {
        self.runtimes.get(name).cloned()
    }

    pub(crate) async fn is_running(&self) -> bool {
        *self.running.lock().await
    }

    pub(crate) async fn set_running(&self, running: bool) {
        *self.running.lock().await = running;
    }

    /// Pull persisted timestamps into the in-memory runtimes. Read
    /// failures leave the fields at zero; no catch-up fires this cycle.
    async fn rehydrate(&self) {
        for job in &self.jobs {
            let store = self.ctx.state.as_ref();
            let last_run = persist::read_timestamp(store, JobStateKind::LastRun, job.name).await;
            let last_completion =
                persist::read_timestamp(store, JobStateKind::LastCompletion, job.name).await;
            if let Some(runtime) = self.runtime(job.name) {
                let mut rt = runtime.lock().await;
                rt.last_run = last_run;
                rt.last_completion = last_completion;
            }
            if last_run.is_some() || last_completion.is_some() {
                debug!(job = job.name, "rehydrated job state from store");
            }
        }
    }

    /// The per-tick firing decision for one descriptor.
    pub(crate) async fn should_run(&self, job: &JobDescriptor, now: &DateTime<Tz>) -> bool {
        let Some(runtime) = self.runtime(job.name) else {
            return false;
        };
        let (in_flight, reference) = {
            let rt = runtime.lock().await;
            (rt.in_flight, rt.reference())
        };
        if in_flight {
            return false;
        }
        if schedule::matches_now(&job.schedule, now) {
            return true;
        }
        let Some(reference) = reference else {
            return false;
        };
        schedule::catch_up_due(&job.schedule, now, &self.clock.localize(reference))
    }

    /// Whether the store records a pending retry for this descriptor.
    ///
    /// Always read from the store: the delayed task and the tick are
    /// independent readers and must agree.
    pub(crate) async fn has_pending_retry(&self, job: &JobDescriptor) -> bool {
        if !job.retry_on_failure {
            return false;
        }
        let count = persist::read_retry_count(self.ctx.state.as_ref(), job.name).await;
        count > 0 && count <= job.max_retries
    }

    /// Start the filings ingestion feed and fan its events out to the
    /// process-wide broadcast channel.
    async fn start_filings_fanout(&self) {
        match self.ctx.filings.start().await {
            Ok(mut rx) => {
                let events = self.ctx.filing_events.clone();
                let shutdown = self.shutdown.clone();
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            () = shutdown.cancelled() => break,
                            filing = rx.recv() => {
                                let Some(filing) = filing else { break };
                                debug!(accession = %filing.accession, "broadcasting filing");
                                // Send fails only when nobody subscribes.
                                let _ = events.send(filing);
                            }
                        }
                    }
                });
            }
            Err(err) => error!(error = %err, "failed to start filings feed"),
        }
    }
}

/// One scan over all descriptors. Starts are fire-and-forget; the tick
/// never blocks on a slow job.
pub(crate) async fn check_and_run_jobs(core: &Arc<SchedulerCore>, now: DateTime<Tz>) {
    let now_utc = now.with_timezone(&Utc);
    for job in &core.jobs {
        if job.skip_on_weekends && core.clock.is_weekend(&now) {
            continue;
        }
        if core.should_run(job, &now).await {
            debug!(job = job.name, "schedule due, starting");
            spawn_execution(core, job, now_utc);
        }
        if core.has_pending_retry(job).await {
            debug!(job = job.name, "pending retry, starting");
            spawn_execution(core, job, now_utc);
        }
    }
}

fn spawn_execution(core: &Arc<SchedulerCore>, job: &Arc<JobDescriptor>, now: DateTime<Utc>) {
    let core = Arc::clone(core);
    let job = Arc::clone(job);
    tokio::spawn(async move {
        crate::executor::execute(&core, &job, now).await;
    });
}

/// The single-leader scheduler instance.
pub struct Scheduler {
    core: Arc<SchedulerCore>,
    handle: Mutex<Option<ShutdownHandle>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Assemble a scheduler over a descriptor set.
    ///
    /// Registration is order-independent; duplicate names are rejected.
    pub fn new(
        ctx: Arc<AppContext>,
        clock: MarketClock,
        jobs: Vec<Arc<JobDescriptor>>,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        let mut runtimes = HashMap::with_capacity(jobs.len());
        for job in &jobs {
            if runtimes
                .insert(job.name, Arc::new(Mutex::new(JobRuntime::default())))
                .is_some()
            {
                return Err(SchedulerError::DuplicateJob(job.name));
            }
        }
        Ok(Self {
            core: Arc::new(SchedulerCore {
                ctx,
                clock,
                jobs,
                runtimes,
                shutdown: CancellationToken::new(),
                running: Mutex::new(false),
                config,
            }),
            handle: Mutex::new(None),
        })
    }

    /// The registered descriptors.
    #[must_use]
    pub fn jobs(&self) -> &[Arc<JobDescriptor>] {
        &self.core.jobs
    }

    /// Start the loop. Idempotent: a second call returns the existing
    /// shutdown handle without spawning anything.
    pub async fn start(&self) -> ShutdownHandle {
        let mut slot = self.handle.lock().await;
        if let Some(handle) = slot.as_ref() {
            info!("scheduler already started");
            return handle.clone();
        }
        let handle = ShutdownHandle {
            shutdown: self.core.shutdown.clone(),
            stopped: CancellationToken::new(),
        };
        *slot = Some(handle.clone());
        let core = Arc::clone(&self.core);
        let stopped = handle.stopped.clone();
        tokio::spawn(async move {
            run(core, stopped).await;
        });
        handle
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &Arc<SchedulerCore> {
        &self.core
    }
}

async fn run(core: Arc<SchedulerCore>, stopped: CancellationToken) {
    info!(boot_delay_s = core.config.boot_delay.as_secs(), "scheduler starting");

    tokio::select! {
        () = core.shutdown.cancelled() => {
            info!("scheduler shut down during boot delay");
            stopped.cancel();
            return;
        }
        () = tokio::time::sleep(core.config.boot_delay) => {}
    }

    core.set_running(true).await;
    core.rehydrate().await;

    // Init firings ignore the weekend mask.
    let boot_now = core.clock.now().with_timezone(&Utc);
    for job in &core.jobs {
        if job.run_at_init {
            info!(job = job.name, "running init job");
            spawn_execution(&core, job, boot_now);
        }
    }

    core.start_filings_fanout().await;

    let mut tick = interval(core.config.tick_interval);
    // The first interval tick completes immediately; consume it so the
    // loop fires one full interval after boot.
    tick.tick().await;

    info!("scheduler running");
    loop {
        tokio::select! {
            () = core.shutdown.cancelled() => break,
            _ = tick.tick() => {
                let now = core.clock.now();
                check_and_run_jobs(&core, now).await;
            }
        }
    }

    info!("scheduler stopping");
    core.set_running(false).await;
    core.ctx.stream.stop_market_stream().await;
    core.ctx.workers.stop().await;
    info!("scheduler stopped");
    stopped.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    use tickwork_state_memory::MemoryStateStore;

    use crate::descriptor::job_fn;
    use crate::testing::{TestHarness, counting_job, test_scheduler};

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
        New_York.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let harness = TestHarness::new(Arc::new(MemoryStateStore::new()));
        let jobs = vec![
            Arc::new(JobDescriptor::new("twin", job_fn(|_| async { Ok(()) }))),
            Arc::new(JobDescriptor::new("twin", job_fn(|_| async { Ok(()) }))),
        ];
        let err = Scheduler::new(
            Arc::clone(&harness.ctx),
            MarketClock::new("America/New_York").unwrap(),
            jobs,
            SchedulerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateJob("twin")));
    }

    #[tokio::test]
    async fn weekend_mask_suppresses_tick_firing() {
        let harness = TestHarness::new(Arc::new(MemoryStateStore::new()));
        let invocations = Arc::new(AtomicU32::new(0));
        let job = Arc::new(
            counting_job("masked", &invocations)
                .at(10, 0)
                .skip_on_weekends(),
        );
        let core = test_scheduler(&harness, vec![Arc::clone(&job)]);

        // 2024-06-15 is a Saturday.
        check_and_run_jobs(&core, local(2024, 6, 15, 10, 0)).await;
        settle().await;
        assert_eq!(invocations.load(Ordering::SeqCst), 0);

        // 2024-06-17 is a Monday.
        check_and_run_jobs(&core, local(2024, 6, 17, 10, 0)).await;
        settle().await;
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unmasked_job_fires_on_weekends() {
        let harness = TestHarness::new(Arc::new(MemoryStateStore::new()));
        let invocations = Arc::new(AtomicU32::new(0));
        let job = Arc::new(counting_job("weekend-ok", &invocations).at(3, 55));
        let core = test_scheduler(&harness, vec![Arc::clone(&job)]);

        check_and_run_jobs(&core, local(2024, 6, 15, 3, 55)).await;
        settle().await;
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn catch_up_fires_on_first_tick_after_missed_slot() {
        let store = Arc::new(MemoryStateStore::new());
        let harness = TestHarness::new(store);
        let invocations = Arc::new(AtomicU32::new(0));
        let job = Arc::new(counting_job("catch-up", &invocations).at(9, 30));
        let core = test_scheduler(&harness, vec![Arc::clone(&job)]);

        // Last completion yesterday 09:30; scheduler starts today 11:15.
        let yesterday = local(2024, 6, 16, 9, 30).with_timezone(&Utc);
        persist::persist_timestamp(
            harness.ctx.state.as_ref(),
            JobStateKind::LastCompletion,
            "catch-up",
            yesterday,
        )
        .await;
        core.rehydrate().await;

        check_and_run_jobs(&core, local(2024, 6, 17, 11, 15)).await;
        settle().await;
        assert_eq!(invocations.load(Ordering::SeqCst), 1, "catch-up rule fires");

        // A later tick the same day stays quiet: the reference date is
        // now today.
        check_and_run_jobs(&core, local(2024, 6, 17, 11, 16)).await;
        settle().await;
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_schedule_never_fires_from_tick() {
        let harness = TestHarness::new(Arc::new(MemoryStateStore::new()));
        let invocations = Arc::new(AtomicU32::new(0));
        let job = Arc::new(counting_job("manual-only", &invocations));
        let core = test_scheduler(&harness, vec![Arc::clone(&job)]);

        for minute in 0..5 {
            check_and_run_jobs(&core, local(2024, 6, 17, 10, minute)).await;
        }
        settle().await;
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn long_running_job_is_never_reentered() {
        let harness = TestHarness::new(Arc::new(MemoryStateStore::new()));
        let invocations = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&invocations);
        let job = Arc::new(
            JobDescriptor::new(
                "marathon",
                job_fn(move |_ctx| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        Ok(())
                    }
                }),
            )
            .at(12, 0),
        );
        let core = test_scheduler(&harness, vec![Arc::clone(&job)]);

        check_and_run_jobs(&core, local(2024, 6, 17, 12, 0)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        // The next tick lands while the body is still sleeping.
        check_and_run_jobs(&core, local(2024, 6, 17, 12, 1)).await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tick_executes_pending_retries() {
        let harness = TestHarness::new(Arc::new(MemoryStateStore::new()));
        let invocations = Arc::new(AtomicU32::new(0));
        let job = Arc::new(
            counting_job("retry-tick", &invocations)
                .at(4, 0)
                .with_retry(3, Duration::from_secs(600)),
        );
        let core = test_scheduler(&harness, vec![Arc::clone(&job)]);
        core.set_running(true).await;
        persist::write_retry_count(harness.ctx.state.as_ref(), "retry-tick", 1).await;

        // Off-schedule tick; only the pending retry triggers it.
        check_and_run_jobs(&core, local(2024, 6, 17, 13, 7)).await;
        settle().await;
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(
            persist::read_retry_count(harness.ctx.state.as_ref(), "retry-tick").await,
            0,
            "success clears the pending counter"
        );
    }

    #[tokio::test]
    async fn start_is_idempotent_and_init_jobs_fire() {
        let harness = TestHarness::new(Arc::new(MemoryStateStore::new()));
        let invocations = Arc::new(AtomicU32::new(0));
        let job = Arc::new(
            counting_job("init-job", &invocations)
                .run_at_init()
                .skip_on_weekends(),
        );
        let scheduler = Scheduler::new(
            Arc::clone(&harness.ctx),
            MarketClock::new("America/New_York").unwrap(),
            vec![job],
            SchedulerConfig {
                boot_delay: Duration::from_millis(10),
                tick_interval: Duration::from_secs(3600),
            },
        )
        .unwrap();

        let first = scheduler.start().await;
        let second = scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        // Init firing ran exactly once despite the double start, even if
        // today is a weekend.
        assert_eq!(invocations.load(Ordering::SeqCst), 1);

        first.shutdown();
        second.wait_stopped().await;
    }

    #[tokio::test]
    async fn shutdown_runs_stop_hooks() {
        let harness = TestHarness::new(Arc::new(MemoryStateStore::new()));
        harness.stream.force_running();
        harness.workers.force_running();

        let scheduler = Scheduler::new(
            Arc::clone(&harness.ctx),
            MarketClock::new("America/New_York").unwrap(),
            Vec::new(),
            SchedulerConfig {
                boot_delay: Duration::from_millis(10),
                tick_interval: Duration::from_secs(3600),
            },
        )
        .unwrap();

        let handle = scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.core().is_running().await);

        handle.shutdown();
        handle.wait_stopped().await;

        assert!(!scheduler.core().is_running().await);
        assert!(!harness.stream.market_running());
        assert!(!harness.workers.is_running());
    }

    #[tokio::test]
    async fn shutdown_during_boot_delay_stops_cleanly() {
        let harness = TestHarness::new(Arc::new(MemoryStateStore::new()));
        let scheduler = Scheduler::new(
            Arc::clone(&harness.ctx),
            MarketClock::new("America/New_York").unwrap(),
            Vec::new(),
            SchedulerConfig {
                boot_delay: Duration::from_secs(30),
                tick_interval: Duration::from_secs(3600),
            },
        )
        .unwrap();

        let handle = scheduler.start().await;
        handle.shutdown();
        handle.wait_stopped().await;
        assert!(!scheduler.core().is_running().await);
    }

    #[tokio::test]
    async fn filings_fan_out_reaches_subscribers() {
        let harness = TestHarness::new(Arc::new(MemoryStateStore::new()));
        let mut filings_rx = harness.ctx.subscribe_filings();

        let scheduler = Scheduler::new(
            Arc::clone(&harness.ctx),
            MarketClock::new("America/New_York").unwrap(),
            Vec::new(),
            SchedulerConfig {
                boot_delay: Duration::from_millis(10),
                tick_interval: Duration::from_secs(3600),
            },
        )
        .unwrap();
        let handle = scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        harness
            .feed
            .emit(tickwork_core::Filing {
                accession: "0000000000-24-000001".into(),
                symbol: "MSFT".into(),
                form_type: "8-K".into(),
                filed_at: Utc::now(),
                url: "https://example.invalid/8k.htm".into(),
            })
            .await;

        let received = tokio::time::timeout(Duration::from_secs(1), filings_rx.recv())
            .await
            .expect("fan-out should forward within the timeout")
            .expect("broadcast channel should stay open");
        assert_eq!(received.symbol, "MSFT");

        handle.shutdown();
        handle.wait_stopped().await;
    }
}
