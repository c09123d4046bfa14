use async_trait::async_trait;
use tracing::{error, warn};

use tickwork_core::{AlertSink, JobError};

/// Critical-alert sink: always logs at error level, and optionally
/// forwards to a paging webhook. Never fails — delivery problems are
/// logged and dropped.
pub struct WebhookAlerts {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookAlerts {
    pub fn new(webhook_url: Option<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()?,
            webhook_url,
        })
    }
}

#[async_trait]
impl AlertSink for WebhookAlerts {
    async fn log_critical_alert(&self, failure: &JobError, job_name: &str) {
        error!(job = job_name, code = failure.code(), error = %failure, "critical alert");

        let Some(url) = self.webhook_url.as_deref() else {
            return;
        };
        let payload = serde_json::json!({
            "job": job_name,
            "code": failure.code(),
            "message": failure.to_string(),
        });
        match self.http.post(url).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "alert webhook rejected payload");
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "alert webhook unreachable"),
        }
    }
}
