use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpectatorError {
    #[error("spectator connection is not connected")]
    NotConnected,
}
