use thiserror::Error;

/// Errors surfaced by a state store backend.
#[derive(Debug, Error)]
pub enum StateError {
    /// Could not reach the backend (pool exhausted, connect refused).
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend accepted the request but failed to execute it.
    #[error("backend error: {0}")]
    Backend(String),
}
