use thiserror::Error;

/// Failure value returned by a job function.
///
/// Jobs are opaque to the scheduler; the variants here classify failures
/// only as far as the executor, retry controller, and alert sink need.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    /// An upstream HTTP service rejected or failed the request.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// The data layer could not be read or written.
    #[error("data layer error: {0}")]
    Data(String),

    /// A coverage-gated job probed the data layer and found insufficient
    /// historical coverage. Retryable by design: the gate is not a
    /// dependency edge, it is a retryable failure.
    #[error("coverage not ready: {0}")]
    CoverageNotReady(String),

    /// The state store failed mid-job.
    #[error("state store error: {0}")]
    State(String),

    /// The job function panicked; recovered by the executor shim.
    #[error("job panicked: {0}")]
    Panicked(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl JobError {
    /// Short stable code for alert payloads and logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Upstream(_) => "upstream",
            Self::Data(_) => "data",
            Self::CoverageNotReady(_) => "coverage_not_ready",
            Self::State(_) => "state",
            Self::Panicked(_) => "panic",
            Self::Other(_) => "other",
        }
    }
}
