//! Error types produced by the `storage` crate.
use thiserror::Error;

/// Failures while persisting report batches or talking to the backend.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StorageError {
    #[error("invalid storage configuration: {0}")]
    Config(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to serialize bulk payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("index template installation failed: {0}")]
    Template(String),
    #[error("bulk request returned status {0}")]
    UnexpectedStatus(u16),
    #[error("bulk indexing reported per-item errors")]
    BulkRejected,
}
