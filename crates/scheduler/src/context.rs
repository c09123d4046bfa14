use std::sync::Arc;

use tokio::sync::broadcast;

use tickwork_core::{
    AlertSink, CoverageProbe, Filing, FilingsFeed, MaintenanceOps, StreamControl, WorkerSupervisor,
};
use tickwork_state::StateStore;

/// API credentials carried on the application context.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub market_data_api_key: String,
    pub billing_api_key: String,
}

/// The opaque application handle passed to every job function.
///
/// Carries the database pool, the state store client, credentials, and
/// the service seams the jobs drive. The scheduler never inspects it
/// beyond handing it to job functions and the shutdown stop hooks.
#[derive(Clone)]
pub struct AppContext {
    pub db: sqlx::PgPool,
    pub state: Arc<dyn StateStore>,
    pub credentials: Credentials,
    pub alerts: Arc<dyn AlertSink>,
    pub coverage: Arc<dyn CoverageProbe>,
    pub stream: Arc<dyn StreamControl>,
    pub workers: Arc<dyn WorkerSupervisor>,
    pub maintenance: Arc<dyn MaintenanceOps>,
    pub filings: Arc<dyn FilingsFeed>,
    /// Process-wide fan-out of new filings; subscribers include the API
    /// layer's websocket push and the chart annotation cache.
    pub filing_events: broadcast::Sender<Filing>,
}

impl AppContext {
    /// Subscribe to the filing fan-out.
    #[must_use]
    pub fn subscribe_filings(&self) -> broadcast::Receiver<Filing> {
        self.filing_events.subscribe()
    }
}
