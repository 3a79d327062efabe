//! Status Source port: "what number is the clinic serving right now?"

use async_trait::async_trait;

/// Current state of a clinic queue, as reported by the remote portal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteStatus {
    /// The number currently being called.
    Serving(u32),
    /// The portal reports its non-operating-hours placeholder.
    Closed,
}

/// Why a status lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    /// The target reference cannot be turned into a status query
    /// (invalid URL, page without the expected markers).
    #[error("cannot resolve target: {0}")]
    Resolution(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("status request timed out")]
    Timeout,

    /// Well-formed response without a usable status field.
    #[error("unexpected status data: {0}")]
    Data(String),
}

/// User-facing category of a failed lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidTarget,
    Timeout,
    System,
}

impl StatusError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StatusError::Resolution(_) => FailureKind::InvalidTarget,
            StatusError::Timeout => FailureKind::Timeout,
            StatusError::Transport(_) | StatusError::Data(_) => FailureKind::System,
        }
    }
}

/// Hexagonal port for querying a monitored clinic.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, target_url: &str) -> Result<RemoteStatus, StatusError>;
}
