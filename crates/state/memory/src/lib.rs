//! In-memory [`StateStore`] backend.
//!
//! Backs unit tests and local simulation; everything lives in process
//! memory and vanishes on drop.

use async_trait::async_trait;
use dashmap::DashMap;

use tickwork_state::{StateError, StateStore};

/// In-memory implementation of [`StateStore`].
///
/// Plain keys live in one map, sorted sets in another. Sorted-set entries
/// are kept ordered by score on insert so reads are a plain slice walk.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: DashMap<String, String>,
    sorted_sets: DashMap<String, Vec<(f64, String)>>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StateError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StateError> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StateError> {
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn zadd(&self, set: &str, member: &str, score: f64) -> Result<(), StateError> {
        let mut members = self.sorted_sets.entry(set.to_owned()).or_default();
        members.retain(|(_, m)| m != member);
        let at = members.partition_point(|(s, _)| *s <= score);
        members.insert(at, (score, member.to_owned()));
        Ok(())
    }

    async fn zrange(
        &self,
        set: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StateError> {
        let Some(members) = self.sorted_sets.get(set) else {
            return Ok(Vec::new());
        };
        let len = isize::try_from(members.len()).unwrap_or(isize::MAX);
        let clamp = |idx: isize| -> usize {
            let resolved = if idx < 0 { len + idx } else { idx };
            usize::try_from(resolved.clamp(0, len)).unwrap_or(0)
        };
        let from = clamp(start);
        // Rank ranges are inclusive of `stop`.
        let to = clamp(stop).saturating_add(1).min(members.len());
        if from >= to {
            return Ok(Vec::new());
        }
        Ok(members[from..to].iter().map(|(_, m)| m.clone()).collect())
    }

    async fn zrem_by_score(&self, set: &str, min: f64, max: f64) -> Result<u64, StateError> {
        let Some(mut members) = self.sorted_sets.get_mut(set) else {
            return Ok(0);
        };
        let before = members.len();
        members.retain(|(score, _)| *score < min || *score > max);
        Ok(u64::try_from(before - members.len()).unwrap_or(u64::MAX))
    }
}
