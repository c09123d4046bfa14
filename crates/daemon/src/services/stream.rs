use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::warn;

use tickwork_core::{JobError, StreamControl};

use super::upstream::UpstreamClient;

/// Stream control over the market-data internal service.
///
/// Running state is tracked locally: the scheduler is the only actor
/// starting or stopping these services, so the flags stay truthful
/// without a status round-trip on every hourly probe.
pub struct HttpStreamControl {
    client: UpstreamClient,
    market_running: AtomicBool,
    screener_running: AtomicBool,
}

impl HttpStreamControl {
    #[must_use]
    pub fn new(client: UpstreamClient) -> Self {
        Self {
            client,
            market_running: AtomicBool::new(false),
            screener_running: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl StreamControl for HttpStreamControl {
    async fn start_market_stream(&self) -> Result<(), JobError> {
        self.client.post("/internal/stream/start").await?;
        self.market_running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_market_stream(&self) {
        if let Err(err) = self.client.post("/internal/stream/stop").await {
            warn!(error = %err, "market stream stop failed");
        }
        self.market_running.store(false, Ordering::SeqCst);
    }

    async fn is_market_stream_running(&self) -> bool {
        self.market_running.load(Ordering::SeqCst)
    }

    async fn start_screener_loop(&self) -> Result<(), JobError> {
        self.client.post("/internal/screener/start").await?;
        self.screener_running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_screener_loop(&self) {
        if let Err(err) = self.client.post("/internal/screener/stop").await {
            warn!(error = %err, "screener stop failed");
        }
        self.screener_running.store(false, Ordering::SeqCst);
    }

    async fn is_screener_running(&self) -> bool {
        self.screener_running.load(Ordering::SeqCst)
    }
}
