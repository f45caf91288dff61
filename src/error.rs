use thiserror::Error;

/// Why the remote utilization endpoint produced no data
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("no OAuth credentials available")]
    NoCredentials,
    #[error("credentials rejected by usage endpoint")]
    Unauthorized,
    #[error("usage endpoint returned {0}")]
    Status(reqwest::StatusCode),
    #[error("usage request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures of the external `ccusage` binary
#[derive(Debug, Error)]
pub enum LegacyError {
    #[error("ccusage not found. Install with: npm install -g ccusage")]
    BinaryNotFound,
    #[error("ccusage failed: {0}")]
    ExecutionFailed(String),
    #[error("failed to parse ccusage output: {0}")]
    Parse(String),
}

/// A refresh pass that produced nothing usable
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no usage source available: {0}")]
    AllSourcesFailed(String),
    /// Failure of a concurrent pass this call waited on
    #[error("{0}")]
    Coalesced(String),
    #[error("usage scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
