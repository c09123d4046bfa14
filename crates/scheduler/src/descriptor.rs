use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use tickwork_core::JobError;

use crate::context::AppContext;

/// One wall-clock firing slot, minute resolution, in the scheduler's
/// civil timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleTime {
    pub hour: u32,
    pub minute: u32,
}

impl ScheduleTime {
    /// Create a slot. Hours and minutes outside the civil range are a
    /// programmer error.
    #[must_use]
    pub const fn new(hour: u32, minute: u32) -> Self {
        assert!(hour < 24 && minute < 60);
        Self { hour, minute }
    }

    /// Minutes since civil midnight.
    #[must_use]
    pub const fn minute_of_day(self) -> u32 {
        self.hour * 60 + self.minute
    }
}

impl std::fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// A job body: unary over the application context, returning success or
/// a failure value. Bodies own their own I/O and cancellation.
pub type JobFn =
    Arc<dyn Fn(Arc<AppContext>) -> BoxFuture<'static, Result<(), JobError>> + Send + Sync>;

/// Adapt a plain `async fn(Arc<AppContext>) -> Result<(), JobError>`
/// into a [`JobFn`].
pub fn job_fn<F, Fut>(f: F) -> JobFn
where
    F: Fn(Arc<AppContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Immutable declaration of a scheduled job.
///
/// Constructed once at program start; the set of descriptors lives until
/// process exit. Runtime state lives separately in
/// [`JobRuntime`](crate::runtime::JobRuntime).
#[derive(Clone)]
pub struct JobDescriptor {
    /// Unique name, used as the key suffix in the state store.
    pub name: &'static str,
    /// The job body.
    pub function: JobFn,
    /// Unordered set of firing slots; empty means manual-only.
    pub schedule: Vec<ScheduleTime>,
    /// Fire once right after scheduler start, ignoring the weekend mask.
    pub run_at_init: bool,
    /// Suppress scheduled firings on Saturday/Sunday in the scheduler
    /// timezone. Init firings are exempt.
    pub skip_on_weekends: bool,
    /// Whether a failed attempt schedules a delayed re-try.
    pub retry_on_failure: bool,
    /// Attempt ceiling for retries.
    pub max_retries: u32,
    /// Delay before a background re-try.
    pub retry_delay: Duration,
}

impl JobDescriptor {
    /// New manual-only descriptor with retries disabled.
    #[must_use]
    pub fn new(name: &'static str, function: JobFn) -> Self {
        Self {
            name,
            function,
            schedule: Vec::new(),
            run_at_init: false,
            skip_on_weekends: false,
            retry_on_failure: false,
            max_retries: 0,
            retry_delay: Duration::from_secs(60),
        }
    }

    /// Add a firing slot.
    #[must_use]
    pub fn at(mut self, hour: u32, minute: u32) -> Self {
        self.schedule.push(ScheduleTime::new(hour, minute));
        self
    }

    /// Replace the schedule wholesale.
    #[must_use]
    pub fn with_schedule(mut self, schedule: Vec<ScheduleTime>) -> Self {
        self.schedule = schedule;
        self
    }

    /// Fire once at scheduler start.
    #[must_use]
    pub fn run_at_init(mut self) -> Self {
        self.run_at_init = true;
        self
    }

    /// Suppress scheduled firings on weekends.
    #[must_use]
    pub fn skip_on_weekends(mut self) -> Self {
        self.skip_on_weekends = true;
        self
    }

    /// Enable retry with the given attempt ceiling and delay.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.retry_on_failure = true;
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

impl std::fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("run_at_init", &self.run_at_init)
            .field("skip_on_weekends", &self.skip_on_weekends)
            .field("retry_on_failure", &self.retry_on_failure)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> JobFn {
        job_fn(|_ctx| async { Ok(()) })
    }

    #[test]
    fn defaults_are_manual_only() {
        let job = JobDescriptor::new("noop", noop());
        assert!(job.schedule.is_empty());
        assert!(!job.run_at_init);
        assert!(!job.skip_on_weekends);
        assert!(!job.retry_on_failure);
    }

    #[test]
    fn builder_accumulates_slots() {
        let job = JobDescriptor::new("two-slot", noop()).at(9, 30).at(21, 45);
        assert_eq!(
            job.schedule,
            vec![ScheduleTime::new(9, 30), ScheduleTime::new(21, 45)]
        );
    }

    #[test]
    fn with_retry_enables_retry() {
        let job =
            JobDescriptor::new("retried", noop()).with_retry(100, Duration::from_secs(300));
        assert!(job.retry_on_failure);
        assert_eq!(job.max_retries, 100);
        assert_eq!(job.retry_delay, Duration::from_secs(300));
    }

    #[test]
    fn schedule_time_display() {
        assert_eq!(ScheduleTime::new(3, 58).to_string(), "03:58");
        assert_eq!(ScheduleTime::new(21, 5).minute_of_day(), 1265);
    }
}
