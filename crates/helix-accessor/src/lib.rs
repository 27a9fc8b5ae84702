//! Read-modify-write property access layered on a [`helix_client::CoordinationClient`].

mod accessor;
mod error;

pub use accessor::DataAccessor;
pub use error::AccessorError;
