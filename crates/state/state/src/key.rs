use serde::{Deserialize, Serialize};

/// The kind of per-job state being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStateKind {
    /// Timestamp of the most recent attempt that reached the job body.
    LastRun,
    /// Timestamp of the most recent successful finish.
    LastCompletion,
    /// Pending retry attempt counter; zero in steady state.
    RetryCount,
}

impl JobStateKind {
    /// Return a string representation of the key kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LastRun => "job:lastrun",
            Self::LastCompletion => "job:lastcompletion",
            Self::RetryCount => "job:retrycount",
        }
    }

    /// Key prefix for enumerating every entry of this kind.
    #[must_use]
    pub fn prefix(self) -> String {
        format!("{}:", self.as_str())
    }

    /// All scheduler-owned namespaces, in the order boot-time cleanup
    /// clears them.
    #[must_use]
    pub fn all() -> [Self; 3] {
        [Self::LastRun, Self::LastCompletion, Self::RetryCount]
    }
}

impl std::fmt::Display for JobStateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key addressing one job's durable state entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobStateKey {
    pub kind: JobStateKind,
    pub job: String,
}

impl JobStateKey {
    /// Create a new job state key.
    #[must_use]
    pub fn new(kind: JobStateKind, job: impl Into<String>) -> Self {
        Self {
            kind,
            job: job.into(),
        }
    }

    /// Canonical string representation: `job:<kind>:<name>`.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.kind, self.job)
    }
}

impl std::fmt::Display for JobStateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_as_str() {
        assert_eq!(JobStateKind::LastRun.as_str(), "job:lastrun");
        assert_eq!(JobStateKind::LastCompletion.as_str(), "job:lastcompletion");
        assert_eq!(JobStateKind::RetryCount.as_str(), "job:retrycount");
    }

    #[test]
    fn canonical_matches_wire_schema() {
        let key = JobStateKey::new(JobStateKind::LastRun, "sync-external-pricing");
        assert_eq!(key.canonical(), "job:lastrun:sync-external-pricing");
    }

    #[test]
    fn prefix_covers_canonical() {
        let key = JobStateKey::new(JobStateKind::RetryCount, "consolidate-daily-ohlcv");
        assert!(key.canonical().starts_with(&JobStateKind::RetryCount.prefix()));
    }
}
