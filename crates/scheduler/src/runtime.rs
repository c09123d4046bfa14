use chrono::{DateTime, Utc};

/// Per-job mutable state, guarded by a per-job async mutex.
///
/// Reset in memory on start, rehydrated from the state store, then
/// authoritative for the rest of the process lifetime; the store is
/// written through.
#[derive(Debug, Default)]
pub struct JobRuntime {
    /// True while a task is strictly inside the job body.
    pub in_flight: bool,
    /// Most recent attempt that reached the body, success or failure.
    pub last_run: Option<DateTime<Utc>>,
    /// Most recent successful finish.
    pub last_completion: Option<DateTime<Utc>>,
}

impl JobRuntime {
    /// The timestamp the catch-up rule compares against: last completion
    /// when one exists, else last run.
    #[must_use]
    pub fn reference(&self) -> Option<DateTime<Utc>> {
        self.last_completion.or(self.last_run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_prefers_completion() {
        let run = Utc::now();
        let completion = run - chrono::Duration::minutes(5);
        let rt = JobRuntime {
            in_flight: false,
            last_run: Some(run),
            last_completion: Some(completion),
        };
        assert_eq!(rt.reference(), Some(completion));
    }

    #[test]
    fn reference_falls_back_to_last_run() {
        let run = Utc::now();
        let rt = JobRuntime {
            in_flight: false,
            last_run: Some(run),
            last_completion: None,
        };
        assert_eq!(rt.reference(), Some(run));
        assert_eq!(JobRuntime::default().reference(), None);
    }
}
