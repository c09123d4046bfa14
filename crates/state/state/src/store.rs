use async_trait::async_trait;

use crate::error::StateError;

/// Trait for the shared key-value cache backing job state.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Single-key operations are atomic; the scheduler is the single writer of
/// its own namespaces, so no cross-key transactionality is required.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the value for a key. Returns `None` if not found.
    async fn get(&self, key: &str) -> Result<Option<String>, StateError>;

    /// Set a value with unbounded TTL, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StateError>;

    /// Enumerate keys starting with `prefix`.
    ///
    /// This operation may be expensive on some backends; the scheduler
    /// only uses it for boot-time cleanup.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StateError>;

    /// Delete the given keys. Returns how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, StateError>;

    /// Add `member` to the sorted set `set` with `score`, replacing the
    /// score of an existing member.
    ///
    /// Sorted-set operations are used by sibling subsystems (the auxiliary
    /// task queue) and the operator CLI, not by the scheduler core.
    async fn zadd(&self, set: &str, member: &str, score: f64) -> Result<(), StateError>;

    /// Return members of the sorted set by rank range, ascending by
    /// score. `stop = -1` means "through the end".
    async fn zrange(
        &self,
        set: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StateError>;

    /// Remove members with `min <= score <= max`. Returns how many were
    /// removed.
    async fn zrem_by_score(&self, set: &str, min: f64, max: f64) -> Result<u64, StateError>;
}
