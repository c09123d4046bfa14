//! Trait seams to the collaborators the scheduler consumes.
//!
//! Implementations live with the embedding application (the daemon crate
//! wires thin HTTP and SQL adapters); tests substitute scripted fakes.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::JobError;
use crate::filing::Filing;

/// Sink for failures that should page a human.
///
/// Used for panic recoveries and post-retry-ceiling failures. The
/// signature is infallible: an alert sink that can itself fail would need
/// an alert sink.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn log_critical_alert(&self, failure: &JobError, job_name: &str);
}

/// Read-only probe against the data layer answering whether enough
/// historical OHLCV coverage exists to start the live services.
#[async_trait]
pub trait CoverageProbe: Send + Sync {
    async fn has_partial_ohlcv_coverage(&self) -> Result<bool, JobError>;
}

/// Start/stop control over the live market-data stream and the screener
/// update loop. Stops are idempotent and best-effort.
#[async_trait]
pub trait StreamControl: Send + Sync {
    async fn start_market_stream(&self) -> Result<(), JobError>;
    async fn stop_market_stream(&self);
    async fn is_market_stream_running(&self) -> bool;

    async fn start_screener_loop(&self) -> Result<(), JobError>;
    async fn stop_screener_loop(&self);
    async fn is_screener_running(&self) -> bool;
}

/// Supervision of the out-of-process worker pool.
#[async_trait]
pub trait WorkerSupervisor: Send + Sync {
    async fn start(&self) -> Result<(), JobError>;
    /// Idempotent, best-effort.
    async fn stop(&self);
}

/// The periodic maintenance operations the scheduler drives.
///
/// Each method corresponds to one scheduled job; bodies live behind the
/// application's internal service endpoints.
#[async_trait]
pub trait MaintenanceOps: Send + Sync {
    /// Pull billing/pricing state from the external payments provider.
    async fn sync_external_pricing(&self) -> Result<(), JobError>;

    /// Refresh the security master (listings, tickers, metadata).
    async fn refresh_security_master(&self) -> Result<(), JobError>;

    /// Consolidate intraday bars into the daily OHLCV table.
    async fn consolidate_daily_ohlcv(&self) -> Result<(), JobError>;

    /// Refresh sector/industry classifications.
    async fn refresh_sector_classifications(&self) -> Result<(), JobError>;

    /// Refresh the regulator identifier table (CIK-to-ticker map).
    async fn refresh_regulator_identifiers(&self) -> Result<(), JobError>;

    /// Grant subscription renewal credits that came due.
    async fn grant_renewal_credits(&self) -> Result<(), JobError>;

    /// Reconcile upstream webhook polling frequency with plan tiers.
    async fn reconcile_webhook_polling(&self) -> Result<(), JobError>;

    /// Toggle upstream webhooks on or off.
    async fn set_upstream_webhooks_enabled(&self, enabled: bool) -> Result<(), JobError>;
}

/// Long-lived filings ingestion pipeline.
///
/// `start` spawns the feed and hands back its output channel; the
/// scheduler owns fanning the events out to the process-wide broadcast.
#[async_trait]
pub trait FilingsFeed: Send + Sync {
    async fn start(&self) -> Result<mpsc::Receiver<Filing>, JobError>;
}
