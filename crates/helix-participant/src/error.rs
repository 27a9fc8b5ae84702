use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParticipantError {
    #[error("auto-join is disallowed and no participant config exists")]
    AutoJoinDisallowed,

    #[error("failed to create live instance node")]
    LiveInstanceFailed(#[source] helix_accessor::AccessorError),

    #[error(transparent)]
    Accessor(#[from] helix_accessor::AccessorError),
}
