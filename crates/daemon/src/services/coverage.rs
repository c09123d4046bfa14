use async_trait::async_trait;

use tickwork_core::{CoverageProbe, JobError};

/// Coverage probe over the market database: the gated services may
/// start once enough distinct symbols carry recent daily bars.
pub struct SqlCoverageProbe {
    db: sqlx::PgPool,
    min_symbols: i64,
}

impl SqlCoverageProbe {
    #[must_use]
    pub fn new(db: sqlx::PgPool, min_symbols: i64) -> Self {
        Self { db, min_symbols }
    }
}

#[async_trait]
impl CoverageProbe for SqlCoverageProbe {
    async fn has_partial_ohlcv_coverage(&self) -> Result<bool, JobError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT count(DISTINCT symbol) FROM ohlcv_daily \
             WHERE day >= CURRENT_DATE - INTERVAL '30 days'",
        )
        .fetch_one(&self.db)
        .await
        .map_err(|e| JobError::Data(e.to_string()))?;
        Ok(count >= self.min_symbols)
    }
}
