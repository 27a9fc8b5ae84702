use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid key path: {0}")]
    InvalidPath(String),
}
