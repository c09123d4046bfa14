use std::time::Duration;

use async_trait::async_trait;

use tickwork_core::{JobError, MaintenanceOps};

/// Authenticated client for one internal service.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl UpstreamClient {
    /// Build a client for the service at `base_url`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
        })
    }

    /// POST to an internal endpoint; any non-2xx is a job failure.
    pub async fn post(&self, path: &str) -> Result<(), JobError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| JobError::Upstream(e.to_string()))?;
        if !response.status().is_success() {
            return Err(JobError::Upstream(format!(
                "{path} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// GET an internal endpoint and deserialize the JSON body.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, JobError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| JobError::Upstream(e.to_string()))?;
        if !response.status().is_success() {
            return Err(JobError::Upstream(format!(
                "{path} returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| JobError::Upstream(e.to_string()))
    }
}

/// Maintenance operations routed to the market-data and billing
/// internal services.
pub struct UpstreamMaintenance {
    market: UpstreamClient,
    billing: UpstreamClient,
}

impl UpstreamMaintenance {
    #[must_use]
    pub fn new(market: UpstreamClient, billing: UpstreamClient) -> Self {
        Self { market, billing }
    }
}

#[async_trait]
impl MaintenanceOps for UpstreamMaintenance {
    async fn sync_external_pricing(&self) -> Result<(), JobError> {
        self.billing.post("/internal/pricing/sync").await
    }

    async fn refresh_security_master(&self) -> Result<(), JobError> {
        self.market.post("/internal/securities/refresh").await
    }

    async fn consolidate_daily_ohlcv(&self) -> Result<(), JobError> {
        self.market.post("/internal/ohlcv/consolidate").await
    }

    async fn refresh_sector_classifications(&self) -> Result<(), JobError> {
        self.market.post("/internal/sectors/refresh").await
    }

    async fn refresh_regulator_identifiers(&self) -> Result<(), JobError> {
        self.market.post("/internal/regulator-ids/refresh").await
    }

    async fn grant_renewal_credits(&self) -> Result<(), JobError> {
        self.billing.post("/internal/credits/renewals").await
    }

    async fn reconcile_webhook_polling(&self) -> Result<(), JobError> {
        self.billing.post("/internal/webhooks/reconcile-polling").await
    }

    async fn set_upstream_webhooks_enabled(&self, enabled: bool) -> Result<(), JobError> {
        let path = if enabled {
            "/internal/webhooks/enable"
        } else {
            "/internal/webhooks/disable"
        };
        self.market.post(path).await
    }
}
