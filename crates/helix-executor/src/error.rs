use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Accessor(#[from] helix_accessor::AccessorError),
}
