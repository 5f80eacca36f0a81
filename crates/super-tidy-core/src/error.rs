use crate::model::LabelId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{0}")]
    Other(String),
}

/// Why a merge did not complete. Carried inside [`crate::model::MergeOutcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("stale suggestion: label {0} no longer exists")]
    StaleSuggestion(LabelId),

    #[error("cannot merge label {0} into itself")]
    SelfMerge(LabelId),

    #[error("labels {0} and {1} are of different kinds")]
    KindMismatch(LabelId, LabelId),

    #[error("record store failure: {0}")]
    Store(String),
}

#[derive(Error, Debug)]
pub enum OracleError {
    /// Transient failure talking to a backend; safe to retry.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed oracle response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl OracleError {
    pub fn is_transient(&self) -> bool {
        matches!(self, OracleError::Transport(_))
    }
}
