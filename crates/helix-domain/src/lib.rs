//! Core data types shared across the Helix-style participant/spectator
//! runtime: the universal record shape ([`Record`]), the coordination-service
//! key layout ([`KeyBuilder`]/[`PropertyKey`]), and the well-known field
//! names used on the wire ([`wire`]).

mod error;
mod key;
mod record;
pub mod wire;

pub use error::RecordError;
pub use key::{KeyBuilder, PropertyKey};
pub use record::{ListFields, MapFields, Record, SimpleFields};
