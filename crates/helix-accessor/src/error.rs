use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessorError {
    #[error("no node at {0}")]
    NotFound(String),

    #[error("{0} does not allow merge, cannot subtract")]
    SubtractNotAllowed(String),

    #[error("malformed record at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: helix_domain::RecordError,
    },

    #[error(transparent)]
    Client(#[from] helix_client::ClientError),
}
