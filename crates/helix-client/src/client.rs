use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::ClientError;

/// Version stamp attached to a coordination-service node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub version: i64,
}

/// `-1` means "any version" to `set` — no optimistic check.
pub const ANY_VERSION: i64 = -1;

/// Connection states a session can be in, per §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Lost,
    Connected,
    Suspended,
}

pub type WatchFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type ChildrenWatchFn = Arc<dyn Fn(Vec<String>) -> WatchFuture + Send + Sync>;
pub type DataWatchFn = Arc<dyn Fn(Option<Vec<u8>>, Option<Stat>) -> WatchFuture + Send + Sync>;

/// The coordination-service contract named in §6. This is the sole external
/// collaborator the participant/spectator runtime depends on; a real
/// implementation would speak a ZooKeeper-compatible wire protocol, which is
/// explicitly out of scope here (§1) — this crate declares only the
/// contract, plus an in-process double (`InMemoryClient`) for tests.
#[async_trait]
pub trait CoordinationClient: Send + Sync + 'static {
    /// Creates `path`, auto-creating ancestors. `NodeExists` if already present.
    async fn create(
        &self,
        path: &str,
        data: Vec<u8>,
        ephemeral: bool,
        sequential: bool,
    ) -> Result<(), ClientError>;

    /// Ensures every ancestor of `path` (and `path` itself) exists, creating
    /// empty nodes as needed. Never errors on existing nodes.
    async fn ensure_path(&self, path: &str) -> Result<(), ClientError>;

    async fn exists(&self, path: &str) -> Result<bool, ClientError>;

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), ClientError>;

    /// Immediate child names (not full paths). `NoNode` if `path` is absent.
    async fn get_children(&self, path: &str) -> Result<Vec<String>, ClientError>;

    /// `version == ANY_VERSION` skips the optimistic check.
    async fn set(&self, path: &str, data: Vec<u8>, version: i64) -> Result<(), ClientError>;

    async fn delete(&self, path: &str, recursive: bool) -> Result<(), ClientError>;

    /// Current session id, or `None` if disconnected.
    fn session_id(&self) -> Option<String>;

    /// Registers a children watch. Fires immediately with the current
    /// children, then again on every subsequent change, for the lifetime of
    /// the session (re-armed automatically).
    async fn watch_children(&self, path: &str, callback: ChildrenWatchFn);

    /// Registers a data watch. Fires immediately with the current value
    /// (`None` if absent), then again on every subsequent change.
    async fn watch_data(&self, path: &str, callback: DataWatchFn);

    /// Connection-state changes (`Lost`/`Connected`/`Suspended`).
    fn subscribe_connection_state(&self) -> watch::Receiver<ConnectionState>;
}

/// Lets an `Arc<C>` stand in for `C` wherever a `CoordinationClient` is
/// expected, so the same client instance can be shared between the accessor,
/// the executor, and the participant's own watches without cloning state.
#[async_trait]
impl<T: CoordinationClient> CoordinationClient for Arc<T> {
    async fn create(
        &self,
        path: &str,
        data: Vec<u8>,
        ephemeral: bool,
        sequential: bool,
    ) -> Result<(), ClientError> {
        (**self).create(path, data, ephemeral, sequential).await
    }

    async fn ensure_path(&self, path: &str) -> Result<(), ClientError> {
        (**self).ensure_path(path).await
    }

    async fn exists(&self, path: &str) -> Result<bool, ClientError> {
        (**self).exists(path).await
    }

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), ClientError> {
        (**self).get(path).await
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, ClientError> {
        (**self).get_children(path).await
    }

    async fn set(&self, path: &str, data: Vec<u8>, version: i64) -> Result<(), ClientError> {
        (**self).set(path, data, version).await
    }

    async fn delete(&self, path: &str, recursive: bool) -> Result<(), ClientError> {
        (**self).delete(path, recursive).await
    }

    fn session_id(&self) -> Option<String> {
        (**self).session_id()
    }

    async fn watch_children(&self, path: &str, callback: ChildrenWatchFn) {
        (**self).watch_children(path, callback).await
    }

    async fn watch_data(&self, path: &str, callback: DataWatchFn) {
        (**self).watch_data(path, callback).await
    }

    fn subscribe_connection_state(&self) -> watch::Receiver<ConnectionState> {
        (**self).subscribe_connection_state()
    }
}
