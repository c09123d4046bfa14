use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A regulatory filing surfaced by the filings ingestion feed.
///
/// The scheduler only fans these out; interpretation happens in the
/// subscribing subsystems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filing {
    /// Upstream accession identifier, unique per filing.
    pub accession: String,
    /// Ticker symbol the filing is attributed to.
    pub symbol: String,
    /// Form type (e.g. `"8-K"`, `"10-Q"`).
    pub form_type: String,
    /// When the filing was accepted upstream.
    pub filed_at: DateTime<Utc>,
    /// Canonical document URL.
    pub url: String,
}
