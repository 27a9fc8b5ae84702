use thiserror::Error;

/// Error taxonomy for the coordination-service client contract (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("no node at {0}")]
    NoNode(String),

    #[error("node exists at {0}")]
    NodeExists(String),

    #[error("bad version at {0}")]
    BadVersion(String),

    #[error("coordination-service error: {0}")]
    Other(String),
}
