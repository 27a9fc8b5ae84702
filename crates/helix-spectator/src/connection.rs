use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use helix_accessor::DataAccessor;
use helix_client::{ChildrenWatchFn, ConnectionState, CoordinationClient, DataWatchFn};
use helix_domain::{KeyBuilder, Record};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::SpectatorError;
use crate::spectator::Spectator;

/// Read-only entry point into a cluster: caches participant configs and
/// hands out per-resource [`Spectator`]s backed by external-view watches.
///
/// Mirrors the participant's children-watch-arms-data-watches idiom, applied
/// to `CONFIGS/PARTICIPANT/` instead of the message subtree.
pub struct SpectatorConnection<C: CoordinationClient> {
    accessor: Arc<DataAccessor<Arc<C>>>,
    key_builder: KeyBuilder,
    connected: AtomicBool,
    participants: Arc<RwLock<HashMap<String, Record>>>,
    spectators: Mutex<HashMap<String, Arc<Spectator<C>>>>,
}

impl<C: CoordinationClient> SpectatorConnection<C> {
    pub fn new(cluster_id: impl Into<String>, client: C) -> Arc<Self> {
        let client = Arc::new(client);
        Arc::new(Self {
            accessor: Arc::new(DataAccessor::new(client)),
            key_builder: KeyBuilder::new(cluster_id),
            connected: AtomicBool::new(false),
            participants: Arc::new(RwLock::new(HashMap::new())),
            spectators: Mutex::new(HashMap::new()),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn accessor(&self) -> &Arc<DataAccessor<Arc<C>>> {
        &self.accessor
    }

    /// Clears the participant cache and installs the children-watch that
    /// arms a data-watch on every participant-config child it discovers.
    /// Also starts the session-loss reconnect watcher on first call.
    pub async fn connect(connection: &Arc<Self>) {
        connection.init().await;
        connection.connected.store(true, Ordering::SeqCst);
        Self::spawn_reconnect_watcher(connection.clone());
    }

    async fn init(&self) {
        self.participants.write().await.clear();

        let accessor = self.accessor.clone();
        let key_builder = self.key_builder.clone();
        let participants = self.participants.clone();
        let known: Arc<RwLock<std::collections::HashSet<String>>> = Arc::new(RwLock::new(Default::default()));

        let callback: ChildrenWatchFn = Arc::new(move |children: Vec<String>| {
            let accessor = accessor.clone();
            let key_builder = key_builder.clone();
            let participants = participants.clone();
            let known = known.clone();
            Box::pin(async move {
                for child in children {
                    let mut known = known.write().await;
                    if known.contains(&child) {
                        continue;
                    }
                    known.insert(child.clone());
                    drop(known);

                    let participants = participants.clone();
                    let key = key_builder.participant_config(&child);
                    let watch: DataWatchFn = Arc::new(move |data, _stat| {
                        let participants = participants.clone();
                        Box::pin(async move {
                            let Some(bytes) = data else { return };
                            match Record::from_bytes(&bytes) {
                                Ok(record) => {
                                    participants.write().await.insert(record.id.clone(), record);
                                }
                                Err(e) => error!(error = %e, "malformed participant config"),
                            }
                        })
                    });
                    accessor.watch_property(&key, watch).await;
                }
            })
        });

        self.accessor.watch_children(&self.key_builder.participant_configs(), callback).await;
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Watches the client's connection state: on `LOST`, flags the
    /// connection as lost; on the following `CONNECTED`, reruns `init`
    /// so the participant-config cache and its watches are rearmed on the
    /// new session, mirroring the participant side's reconnect behavior.
    fn spawn_reconnect_watcher(connection: Arc<Self>) {
        let mut rx = connection.accessor.client().subscribe_connection_state();
        let is_lost = Arc::new(AtomicBool::new(false));
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = *rx.borrow();
                match state {
                    ConnectionState::Lost => {
                        is_lost.store(true, Ordering::SeqCst);
                        warn!("spectator connection lost");
                    }
                    ConnectionState::Connected => {
                        if is_lost.swap(false, Ordering::SeqCst) && connection.is_connected() {
                            info!("spectator connection recovered, re-initializing");
                            connection.init().await;
                        }
                    }
                    ConnectionState::Suspended => {}
                }
            }
        });
    }

    /// Returns a cached [`Spectator`] for `resource_id`, creating one (and
    /// arming its external-view watch) on first use. `None` if not
    /// connected.
    pub async fn spectate(connection: &Arc<Self>, resource_id: &str) -> Result<Arc<Spectator<C>>, SpectatorError> {
        if !connection.is_connected() {
            error!(resource_id, "tried to spectate without connecting");
            return Err(SpectatorError::NotConnected);
        }
        if let Some(existing) = connection.spectators.lock().unwrap().get(resource_id) {
            return Ok(existing.clone());
        }
        debug!(resource_id, "starting to watch resource");
        let spectator = Spectator::new(
            connection.accessor.clone(),
            &connection.key_builder,
            resource_id,
            connection.participants.clone(),
        )
        .await;
        connection.spectators.lock().unwrap().insert(resource_id.to_string(), spectator.clone());
        Ok(spectator)
    }
}
