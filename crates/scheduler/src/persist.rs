//! Durable per-job state: timestamp encoding, write-through helpers,
//! and boot-time cache cleanup.
//!
//! Read failures degrade to "absent" so a flaky cache never blocks a
//! job; write failures are logged and the in-memory runtime stays
//! authoritative until the next rehydrate.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use tickwork_state::{JobStateKey, JobStateKind, StateError, StateStore};

/// Encode an instant as RFC 3339 UTC with fixed microsecond precision.
///
/// Fixed width and a trailing `Z` make the encoding lexicographically
/// sortable, and microseconds round-trip chrono's internal precision for
/// wall-clock purposes exactly.
#[must_use]
pub fn encode_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp written by [`encode_timestamp`]. Garbled payloads
/// decode to `None`.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Read one persisted job timestamp; absent or unreadable means `None`.
pub async fn read_timestamp(
    store: &dyn StateStore,
    kind: JobStateKind,
    job: &str,
) -> Option<DateTime<Utc>> {
    let key = JobStateKey::new(kind, job).canonical();
    match store.get(&key).await {
        Ok(Some(raw)) => parse_timestamp(&raw),
        Ok(None) => None,
        Err(err) => {
            debug!(key = %key, error = %err, "state read failed, treating as absent");
            None
        }
    }
}

/// Write one job timestamp through to the store. Failures are logged and
/// swallowed; they must not abort the enclosing execution.
pub async fn persist_timestamp(
    store: &dyn StateStore,
    kind: JobStateKind,
    job: &str,
    t: DateTime<Utc>,
) {
    let key = JobStateKey::new(kind, job).canonical();
    if let Err(err) = store.set(&key, &encode_timestamp(t)).await {
        warn!(key = %key, error = %err, "failed to persist job timestamp");
    }
}

/// Read the persisted retry attempt counter; absent, unreadable, or
/// garbled payloads count as zero.
pub async fn read_retry_count(store: &dyn StateStore, job: &str) -> u32 {
    let key = JobStateKey::new(JobStateKind::RetryCount, job).canonical();
    match store.get(&key).await {
        Ok(Some(raw)) => raw.trim().parse().unwrap_or(0),
        Ok(None) => 0,
        Err(err) => {
            debug!(key = %key, error = %err, "state read failed, treating retry count as zero");
            0
        }
    }
}

/// Persist the retry attempt counter as decimal text.
pub async fn write_retry_count(store: &dyn StateStore, job: &str, count: u32) {
    let key = JobStateKey::new(JobStateKind::RetryCount, job).canonical();
    if let Err(err) = store.set(&key, &count.to_string()).await {
        warn!(key = %key, error = %err, "failed to persist retry count");
    }
}

/// Delete every key under the three scheduler namespaces.
///
/// Called once at program start, before the scheduler is constructed.
/// Each prefix is enumerated explicitly so unrelated cache keys are
/// never touched.
pub async fn clear_job_cache(store: &dyn StateStore) -> Result<(), StateError> {
    for kind in JobStateKind::all() {
        let keys = store.keys(&kind.prefix()).await?;
        if keys.is_empty() {
            continue;
        }
        let removed = store.delete(&keys).await?;
        debug!(namespace = %kind, removed, "cleared job cache namespace");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use tickwork_state_memory::MemoryStateStore;

    #[test]
    fn timestamp_roundtrip_exact() {
        let t = Utc.with_ymd_and_hms(2024, 6, 17, 21, 45, 3).unwrap()
            + chrono::Duration::microseconds(123_456);
        let encoded = encode_timestamp(t);
        assert_eq!(encoded, "2024-06-17T21:45:03.123456Z");
        assert_eq!(parse_timestamp(&encoded), Some(t));
    }

    #[test]
    fn timestamp_encoding_sorts_lexicographically() {
        let earlier = Utc.with_ymd_and_hms(2024, 6, 17, 9, 30, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 17, 21, 45, 0).unwrap();
        assert!(encode_timestamp(earlier) < encode_timestamp(later));
    }

    #[test]
    fn garbled_timestamp_is_none() {
        assert_eq!(parse_timestamp("not-a-time"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[tokio::test]
    async fn retry_count_roundtrip_and_garbage() {
        let store = MemoryStateStore::new();
        write_retry_count(&store, "job-a", 7).await;
        assert_eq!(read_retry_count(&store, "job-a").await, 7);

        store
            .set("job:retrycount:job-b", "seven")
            .await
            .unwrap();
        assert_eq!(read_retry_count(&store, "job-b").await, 0);
        assert_eq!(read_retry_count(&store, "job-missing").await, 0);
    }

    #[tokio::test]
    async fn clear_job_cache_spares_unrelated_keys() {
        let store: Arc<MemoryStateStore> = Arc::new(MemoryStateStore::new());
        let now = Utc::now();
        persist_timestamp(store.as_ref(), JobStateKind::LastRun, "a", now).await;
        persist_timestamp(store.as_ref(), JobStateKind::LastCompletion, "a", now).await;
        write_retry_count(store.as_ref(), "a", 2).await;
        store.set("session:abc", "token").await.unwrap();
        store.set("jobless:other", "keep").await.unwrap();

        clear_job_cache(store.as_ref()).await.unwrap();

        assert!(store.get("job:lastrun:a").await.unwrap().is_none());
        assert!(store.get("job:lastcompletion:a").await.unwrap().is_none());
        assert!(store.get("job:retrycount:a").await.unwrap().is_none());
        assert_eq!(
            store.get("session:abc").await.unwrap().as_deref(),
            Some("token")
        );
        assert_eq!(
            store.get("jobless:other").await.unwrap().as_deref(),
            Some("keep")
        );
    }
}
