use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use tickwork_core::{Filing, FilingsFeed, JobError};

use super::upstream::UpstreamClient;

/// Filings ingestion pipeline: polls the market-data service for recent
/// filings and emits each accession once.
///
/// The poll task exits when the consumer side of the channel is dropped.
pub struct PollingFilingsFeed {
    client: UpstreamClient,
    poll_interval: Duration,
}

impl PollingFilingsFeed {
    #[must_use]
    pub fn new(client: UpstreamClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }
}

#[async_trait]
impl FilingsFeed for PollingFilingsFeed {
    async fn start(&self) -> Result<mpsc::Receiver<Filing>, JobError> {
        let (tx, rx) = mpsc::channel(256);
        let client = self.client.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut seen: HashSet<String> = HashSet::new();
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                let filings: Vec<Filing> =
                    match client.get_json("/internal/filings/recent").await {
                        Ok(filings) => filings,
                        Err(err) => {
                            warn!(error = %err, "filings poll failed");
                            continue;
                        }
                    };
                for filing in filings {
                    if !seen.insert(filing.accession.clone()) {
                        continue;
                    }
                    debug!(accession = %filing.accession, "new filing");
                    if tx.send(filing).await.is_err() {
                        debug!("filings consumer gone, stopping poll loop");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
