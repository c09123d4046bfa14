//! Thin adapters from the scheduler's service seams to the rest of the
//! application: internal HTTP endpoints, the market database, and the
//! alert webhook.

mod alerts;
mod coverage;
mod filings;
mod stream;
mod upstream;
mod workers;

pub use alerts::WebhookAlerts;
pub use coverage::SqlCoverageProbe;
pub use filings::PollingFilingsFeed;
pub use stream::HttpStreamControl;
pub use upstream::{UpstreamClient, UpstreamMaintenance};
pub use workers::HttpWorkerSupervisor;
