//! Wires the application context and scheduler from configuration.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;

use tickwork_core::{ClockError, MarketClock};
use tickwork_scheduler::{AppContext, Credentials, Scheduler, SchedulerConfig, SchedulerError, jobs};
use tickwork_state::StateError;
use tickwork_state_redis::RedisStateStore;

use crate::config::DaemonConfig;
use crate::services::{
    HttpStreamControl, HttpWorkerSupervisor, PollingFilingsFeed, SqlCoverageProbe, UpstreamClient,
    UpstreamMaintenance, WebhookAlerts,
};

/// Errors raised while wiring the process together. All fatal: a daemon
/// that cannot build its context refuses to start.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("state store: {0}")]
    State(#[from] StateError),

    #[error("clock: {0}")]
    Clock(#[from] ClockError),

    #[error("scheduler: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Build the application context handle from configuration.
pub fn build_context(config: &DaemonConfig) -> Result<Arc<AppContext>, BootstrapError> {
    let state = Arc::new(RedisStateStore::new(&config.state)?);
    let db = sqlx::PgPool::connect_lazy(&config.database.url)?;

    let market = UpstreamClient::new(
        &config.upstream.market_data_url,
        &config.credentials.market_data_api_key,
    )?;
    let billing = UpstreamClient::new(
        &config.upstream.billing_url,
        &config.credentials.billing_api_key,
    )?;

    let (filing_events, _) = broadcast::channel(256);

    Ok(Arc::new(AppContext {
        db: db.clone(),
        state,
        credentials: Credentials {
            market_data_api_key: config.credentials.market_data_api_key.clone(),
            billing_api_key: config.credentials.billing_api_key.clone(),
        },
        alerts: Arc::new(WebhookAlerts::new(config.upstream.alert_webhook_url.clone())?),
        coverage: Arc::new(SqlCoverageProbe::new(db, config.upstream.coverage_min_symbols)),
        stream: Arc::new(HttpStreamControl::new(market.clone())),
        workers: Arc::new(HttpWorkerSupervisor::new(market.clone())),
        maintenance: Arc::new(UpstreamMaintenance::new(market.clone(), billing)),
        filings: Arc::new(PollingFilingsFeed::new(
            market,
            Duration::from_secs(config.upstream.filings_poll_secs),
        )),
        filing_events,
    }))
}

/// Build the scheduler over the production job registry.
pub fn build_scheduler(
    ctx: Arc<AppContext>,
    config: &DaemonConfig,
) -> Result<Scheduler, BootstrapError> {
    let clock = MarketClock::new(&config.timezone)?;
    Ok(Scheduler::new(
        ctx,
        clock,
        jobs::registry(),
        SchedulerConfig {
            boot_delay: config.scheduler.boot_delay(),
            tick_interval: config.scheduler.tick_interval(),
        },
    )?)
}
