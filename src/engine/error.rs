use thiserror::Error;

/// Failures surfaced by compliance engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("No file attached to evidence")]
    MissingArtifact,

    #[error("Compliance check already in progress")]
    AlreadyInProgress,

    #[error("Compliance check cannot be retried from status '{0}'")]
    NotRetryable(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("User is not associated with a company")]
    NoCompany,

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(what: &str, id: i64) -> Self {
        EngineError::NotFound(format!("{} {}", what, id))
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Storage(e.into())
    }
}
