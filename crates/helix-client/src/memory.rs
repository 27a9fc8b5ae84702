use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::client::{
    ChildrenWatchFn, ConnectionState, CoordinationClient, DataWatchFn, Stat, ANY_VERSION,
};
use crate::error::ClientError;

#[derive(Debug, Clone)]
struct Node {
    data: Vec<u8>,
    version: i64,
    ephemeral: bool,
}

struct Inner {
    nodes: BTreeMap<String, Node>,
    session_id: String,
    seq_counters: BTreeMap<String, u64>,
    children_watches: BTreeMap<String, Vec<ChildrenWatchFn>>,
    data_watches: BTreeMap<String, Vec<DataWatchFn>>,
    bad_version_once: BTreeSet<String>,
}

impl Inner {
    fn new(session_id: String) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(String::new(), Node { data: Vec::new(), version: 0, ephemeral: false });
        Self {
            nodes,
            session_id,
            seq_counters: BTreeMap::new(),
            children_watches: BTreeMap::new(),
            data_watches: BTreeMap::new(),
            bad_version_once: BTreeSet::new(),
        }
    }

    fn parent_of(path: &str) -> &str {
        match path.rfind('/') {
            Some(0) => "",
            Some(i) => &path[..i],
            None => "",
        }
    }

    fn children_of(&self, path: &str) -> Vec<String> {
        let prefix = format!("{path}/");
        self.nodes
            .keys()
            .filter_map(|k| {
                let rest = k.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect()
    }
}

/// An in-process double for [`CoordinationClient`]. Backs tests and the demo
/// binary; holds no wire protocol, no persistence, no real ZooKeeper-style
/// session negotiation — only the observable behavior that callers depend on.
pub struct InMemoryClient {
    inner: Mutex<Inner>,
    conn_tx: watch::Sender<ConnectionState>,
}

impl InMemoryClient {
    pub fn new(session_id: impl Into<String>) -> Self {
        let (conn_tx, _) = watch::channel(ConnectionState::Connected);
        Self { inner: Mutex::new(Inner::new(session_id.into())), conn_tx }
    }

    /// Drops every ephemeral node, clears watches and issues a new session id,
    /// driving the connection-state channel through `Lost`. Simulates a
    /// coordination-service session expiry.
    pub fn simulate_session_loss(&self, new_session_id: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.nodes.retain(|_, n| !n.ephemeral);
        inner.children_watches.clear();
        inner.data_watches.clear();
        inner.session_id = new_session_id.into();
        let _ = self.conn_tx.send(ConnectionState::Lost);
    }

    /// Marks the session reconnected, without re-creating ephemeral nodes —
    /// callers (the participant) are expected to re-create them in response.
    pub fn simulate_reconnect(&self) {
        let _ = self.conn_tx.send(ConnectionState::Connected);
    }

    /// Makes the next `set()` against `path` fail with `BadVersion`
    /// regardless of the version supplied, once.
    pub fn fail_next_set_with_bad_version(&self, path: &str) {
        self.inner.lock().unwrap().bad_version_once.insert(path.to_string());
    }

    fn fire_children_watch(inner: &std::sync::MutexGuard<'_, Inner>, path: &str) -> Vec<(ChildrenWatchFn, Vec<String>)> {
        match inner.children_watches.get(path) {
            Some(cbs) => {
                let children = inner.children_of(path);
                cbs.iter().cloned().map(|cb| (cb, children.clone())).collect()
            }
            None => Vec::new(),
        }
    }

    fn fire_data_watch(
        inner: &std::sync::MutexGuard<'_, Inner>,
        path: &str,
    ) -> Vec<(DataWatchFn, Option<Vec<u8>>, Option<Stat>)> {
        match inner.data_watches.get(path) {
            Some(cbs) => {
                let value = inner
                    .nodes
                    .get(path)
                    .map(|n| (n.data.clone(), Stat { version: n.version }));
                cbs.iter()
                    .cloned()
                    .map(|cb| (cb, value.as_ref().map(|(d, _)| d.clone()), value.as_ref().map(|(_, s)| *s)))
                    .collect()
            }
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl CoordinationClient for InMemoryClient {
    async fn create(
        &self,
        path: &str,
        data: Vec<u8>,
        ephemeral: bool,
        sequential: bool,
    ) -> Result<(), ClientError> {
        let mut fired_children: Vec<(ChildrenWatchFn, Vec<String>)> = Vec::new();
        let final_path;
        {
            let mut inner = self.inner.lock().unwrap();

            let leaf_path = if sequential {
                let counter = inner.seq_counters.entry(path.to_string()).or_insert(0);
                let seq = *counter;
                *counter += 1;
                format!("{path}{seq:010}")
            } else {
                path.to_string()
            };

            if inner.nodes.contains_key(&leaf_path) {
                return Err(ClientError::NodeExists(leaf_path));
            }

            // makepath: create empty ancestors that don't yet exist.
            let mut ancestor = Inner::parent_of(&leaf_path).to_string();
            let mut ancestors = Vec::new();
            while !ancestor.is_empty() && !inner.nodes.contains_key(&ancestor) {
                ancestors.push(ancestor.clone());
                ancestor = Inner::parent_of(&ancestor).to_string();
            }
            for a in ancestors.into_iter().rev() {
                inner.nodes.insert(a, Node { data: Vec::new(), version: 0, ephemeral: false });
            }

            inner.nodes.insert(leaf_path.clone(), Node { data, version: 0, ephemeral });
            final_path = leaf_path;

            let parent = Inner::parent_of(&final_path);
            fired_children = Self::fire_children_watch(&inner, parent);
        }
        for (cb, children) in fired_children.drain(..) {
            cb(children).await;
        }
        debug!(path = %final_path, "created node");
        Ok(())
    }

    async fn ensure_path(&self, path: &str) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().unwrap();
        if path.is_empty() || inner.nodes.contains_key(path) {
            return Ok(());
        }
        let mut segments = Vec::new();
        let mut cur = path.to_string();
        while !cur.is_empty() && !inner.nodes.contains_key(&cur) {
            segments.push(cur.clone());
            cur = Inner::parent_of(&cur).to_string();
        }
        for seg in segments.into_iter().rev() {
            inner.nodes.entry(seg).or_insert(Node { data: Vec::new(), version: 0, ephemeral: false });
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, ClientError> {
        Ok(self.inner.lock().unwrap().nodes.contains_key(path))
    }

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), ClientError> {
        let inner = self.inner.lock().unwrap();
        inner
            .nodes
            .get(path)
            .map(|n| (n.data.clone(), Stat { version: n.version }))
            .ok_or_else(|| ClientError::NoNode(path.to_string()))
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, ClientError> {
        let inner = self.inner.lock().unwrap();
        if !inner.nodes.contains_key(path) {
            return Err(ClientError::NoNode(path.to_string()));
        }
        Ok(inner.children_of(path))
    }

    async fn set(&self, path: &str, data: Vec<u8>, version: i64) -> Result<(), ClientError> {
        let mut fired_data = Vec::new();
        {
            let mut inner = self.inner.lock().unwrap();

            if inner.bad_version_once.remove(path) {
                return Err(ClientError::BadVersion(path.to_string()));
            }

            let node = inner
                .nodes
                .get(path)
                .ok_or_else(|| ClientError::NoNode(path.to_string()))?;
            if version != ANY_VERSION && node.version != version {
                return Err(ClientError::BadVersion(path.to_string()));
            }

            let node = inner.nodes.get_mut(path).unwrap();
            node.data = data;
            node.version += 1;

            fired_data = Self::fire_data_watch(&inner, path);
        }
        for (cb, data, stat) in fired_data.drain(..) {
            cb(data, stat).await;
        }
        Ok(())
    }

    async fn delete(&self, path: &str, recursive: bool) -> Result<(), ClientError> {
        let mut fired_children = Vec::new();
        let mut fired_data = Vec::new();
        {
            let mut inner = self.inner.lock().unwrap();
            if !inner.nodes.contains_key(path) {
                return Err(ClientError::NoNode(path.to_string()));
            }
            if recursive {
                let prefix = format!("{path}/");
                let doomed: Vec<String> = inner
                    .nodes
                    .keys()
                    .filter(|k| k.as_str() == path || k.starts_with(&prefix))
                    .cloned()
                    .collect();
                for d in doomed {
                    inner.nodes.remove(&d);
                }
            } else {
                if !inner.children_of(path).is_empty() {
                    return Err(ClientError::Other(format!("{path} has children")));
                }
                inner.nodes.remove(path);
            }

            let parent = Inner::parent_of(path);
            fired_children = Self::fire_children_watch(&inner, parent);
            fired_data = Self::fire_data_watch(&inner, path);
        }
        for (cb, children) in fired_children.drain(..) {
            cb(children).await;
        }
        for (cb, data, stat) in fired_data.drain(..) {
            cb(data, stat).await;
        }
        Ok(())
    }

    fn session_id(&self) -> Option<String> {
        Some(self.inner.lock().unwrap().session_id.clone())
    }

    async fn watch_children(&self, path: &str, callback: ChildrenWatchFn) {
        let initial = {
            let mut inner = self.inner.lock().unwrap();
            inner.children_watches.entry(path.to_string()).or_default().push(callback.clone());
            inner.children_of(path)
        };
        callback(initial).await;
    }

    async fn watch_data(&self, path: &str, callback: DataWatchFn) {
        let initial = {
            let mut inner = self.inner.lock().unwrap();
            inner.data_watches.entry(path.to_string()).or_default().push(callback.clone());
            inner.nodes.get(path).map(|n| (n.data.clone(), Stat { version: n.version }))
        };
        match initial {
            Some((data, stat)) => callback(Some(data), Some(stat)).await,
            None => callback(None, None).await,
        }
    }

    fn subscribe_connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.conn_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn create_and_get_round_trips() {
        let client = InMemoryClient::new("session-1");
        client.create("/a/b", b"hello".to_vec(), false, false).await.unwrap();
        let (data, stat) = client.get("/a/b").await.unwrap();
        assert_eq!(data, b"hello");
        assert_eq!(stat.version, 0);
    }

    #[tokio::test]
    async fn create_existing_node_fails() {
        let client = InMemoryClient::new("session-1");
        client.create("/a", Vec::new(), false, false).await.unwrap();
        let err = client.create("/a", Vec::new(), false, false).await.unwrap_err();
        assert!(matches!(err, ClientError::NodeExists(_)));
    }

    #[tokio::test]
    async fn sequential_create_appends_monotonic_suffix() {
        let client = InMemoryClient::new("session-1");
        client.create("/msgs/m_", Vec::new(), false, true).await.unwrap();
        client.create("/msgs/m_", Vec::new(), false, true).await.unwrap();
        let children = client.get_children("/msgs").await.unwrap();
        assert_eq!(children.len(), 2);
    }

    #[tokio::test]
    async fn set_with_stale_version_is_bad_version() {
        let client = InMemoryClient::new("session-1");
        client.create("/a", b"v0".to_vec(), false, false).await.unwrap();
        let err = client.set("/a", b"v1".to_vec(), 5).await.unwrap_err();
        assert!(matches!(err, ClientError::BadVersion(_)));
    }

    #[tokio::test]
    async fn set_with_any_version_always_succeeds() {
        let client = InMemoryClient::new("session-1");
        client.create("/a", b"v0".to_vec(), false, false).await.unwrap();
        client.set("/a", b"v1".to_vec(), ANY_VERSION).await.unwrap();
        let (data, stat) = client.get("/a").await.unwrap();
        assert_eq!(data, b"v1");
        assert_eq!(stat.version, 1);
    }

    #[tokio::test]
    async fn fail_next_set_with_bad_version_fires_once() {
        let client = InMemoryClient::new("session-1");
        client.create("/a", b"v0".to_vec(), false, false).await.unwrap();
        client.fail_next_set_with_bad_version("/a");
        assert!(matches!(
            client.set("/a", b"v1".to_vec(), 0).await.unwrap_err(),
            ClientError::BadVersion(_)
        ));
        client.set("/a", b"v1".to_vec(), 0).await.unwrap();
    }

    #[tokio::test]
    async fn recursive_delete_removes_subtree() {
        let client = InMemoryClient::new("session-1");
        client.create("/a/b", Vec::new(), false, false).await.unwrap();
        client.delete("/a", true).await.unwrap();
        assert!(!client.exists("/a").await.unwrap());
        assert!(!client.exists("/a/b").await.unwrap());
    }

    #[tokio::test]
    async fn children_watch_fires_on_registration_and_on_change() {
        let client = InMemoryClient::new("session-1");
        client.create("/live", Vec::new(), false, false).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        client
            .watch_children(
                "/live",
                Arc::new(move |_children| {
                    let calls = calls_clone.clone();
                    Box::pin(async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                    })
                }),
            )
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        client.create("/live/i1", Vec::new(), true, false).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn session_loss_drops_ephemerals_and_notifies_connection_state() {
        let client = InMemoryClient::new("session-1");
        client.create("/live/i1", Vec::new(), true, false).await.unwrap();
        let mut rx = client.subscribe_connection_state();
        client.simulate_session_loss("session-2");
        assert!(!client.exists("/live/i1").await.unwrap());
        assert_eq!(client.session_id().unwrap(), "session-2");
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ConnectionState::Lost);
    }
}
