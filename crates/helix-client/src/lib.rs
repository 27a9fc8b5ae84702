//! The coordination-service client contract (§6) and an in-process double
//! used by tests and the demo binary.

mod client;
mod error;
mod memory;

pub use client::{
    ChildrenWatchFn, ConnectionState, CoordinationClient, DataWatchFn, Stat, WatchFuture,
    ANY_VERSION,
};
pub use error::ClientError;
pub use memory::InMemoryClient;
