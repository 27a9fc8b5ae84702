//! The spectator side of the runtime: read-only cluster membership and
//! partition-placement observation.

mod connection;
mod error;
mod spectator;

pub use connection::SpectatorConnection;
pub use error::SpectatorError;
pub use spectator::Spectator;
