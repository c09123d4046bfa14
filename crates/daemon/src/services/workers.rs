use async_trait::async_trait;
use tracing::warn;

use tickwork_core::{JobError, WorkerSupervisor};

use super::upstream::UpstreamClient;

/// Worker-monitor supervision over the market-data internal service.
pub struct HttpWorkerSupervisor {
    client: UpstreamClient,
}

impl HttpWorkerSupervisor {
    #[must_use]
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkerSupervisor for HttpWorkerSupervisor {
    async fn start(&self) -> Result<(), JobError> {
        self.client.post("/internal/workers/start").await
    }

    async fn stop(&self) {
        if let Err(err) = self.client.post("/internal/workers/stop").await {
            warn!(error = %err, "worker monitor stop failed");
        }
    }
}
