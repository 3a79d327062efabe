/// Core error type for the clinic wait bot.
///
/// Adapter crates map their specific failures into this type so the
/// conversation and polling layers can handle them consistently. Status
/// lookups use the dedicated [`crate::status::StatusError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no session for user {0}")]
    SessionNotFound(String),

    #[error("invalid session transition: {0}")]
    InvalidTransition(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
