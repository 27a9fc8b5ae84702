use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use helix_accessor::DataAccessor;
use helix_client::{ChildrenWatchFn, ConnectionState, CoordinationClient};
use helix_domain::{wire, KeyBuilder, Record};
use helix_executor::{Executor, ParticipantHandle};
use helix_statemodel::{FactoryRegistry, StateModelFactory};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::error::ParticipantError;
use crate::session::SessionHandle;

type PreConnectCallback = Box<dyn Fn() + Send + Sync>;

/// A Helix participant's session-bound lifecycle: auto-join, message
/// dispatch wiring, ephemeral presence, and session-loss reconnect.
///
/// Owns its `DataAccessor`, `Executor`, and `FactoryRegistry` by value —
/// a one-way ownership graph that replaces the source's cyclic
/// `Participant ↔ Executor ↔ Accessor` wiring. The executor only ever sees
/// a narrow [`SessionHandle`], never the participant itself.
pub struct Participant<C: CoordinationClient> {
    client: Arc<C>,
    accessor: Arc<DataAccessor<Arc<C>>>,
    key_builder: KeyBuilder,
    executor: OnceCell<Arc<Executor<Arc<C>>>>,
    factory_registry: Mutex<FactoryRegistry>,
    host: String,
    port: u16,
    participant_id: String,
    pre_connect_callbacks: Mutex<Vec<PreConnectCallback>>,
    is_lost: AtomicBool,
    connected: AtomicBool,
}

impl<C: CoordinationClient> Participant<C> {
    pub fn new(
        cluster_id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        participant_id: Option<String>,
        client: C,
    ) -> Arc<Self> {
        let host = host.into();
        let participant_id = participant_id.unwrap_or_else(|| format!("{host}_{port}"));
        let client = Arc::new(client);
        let accessor = Arc::new(DataAccessor::new(client.clone()));

        Arc::new(Self {
            client,
            accessor,
            key_builder: KeyBuilder::new(cluster_id),
            executor: OnceCell::new(),
            factory_registry: Mutex::new(FactoryRegistry::new()),
            host,
            port,
            participant_id,
            pre_connect_callbacks: Mutex::new(Vec::new()),
            is_lost: AtomicBool::new(false),
            connected: AtomicBool::new(false),
        })
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn session_id(&self) -> Option<String> {
        self.client.session_id()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn accessor(&self) -> &Arc<DataAccessor<Arc<C>>> {
        &self.accessor
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn key_builder(&self) -> &KeyBuilder {
        &self.key_builder
    }

    /// Registers an opaque callback run once, right before the live-instance
    /// node is created, on every `_init` (including reconnects).
    pub fn register_pre_connect_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.pre_connect_callbacks.lock().unwrap().push(Box::new(callback));
    }

    /// Registers a state-model factory for a state-model-def name. Must be
    /// called before [`Self::connect`] — the registry is read-only once the
    /// executor is built.
    pub fn register_state_model_factory(
        &self,
        state_model_def: impl Into<String>,
        factory: Arc<dyn StateModelFactory>,
    ) {
        self.factory_registry.lock().unwrap().register(state_model_def, factory);
    }

    pub fn unregister_state_model_factory(&self, state_model_def: &str) {
        self.factory_registry.lock().unwrap().unregister(state_model_def);
    }

    /// Starts the client session and runs `_init`. On failure, forces a
    /// disconnect and returns the error.
    pub async fn connect(participant: &Arc<Self>) -> Result<(), ParticipantError> {
        if let Err(e) = participant.init().await {
            error!(error = %e, "participant init failed, disconnecting");
            participant.disconnect().await;
            return Err(e);
        }
        participant.connected.store(true, Ordering::SeqCst);
        Self::spawn_reconnect_watcher(participant.clone());
        Ok(())
    }

    pub async fn disconnect(&self) {
        let live_instance = self.key_builder.live_instance(&self.participant_id);
        if let Err(e) = self.accessor.remove(&live_instance).await {
            warn!(error = %e, "failed removing live instance on disconnect");
        }
        self.pre_connect_callbacks.lock().unwrap().clear();
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn init(&self) -> Result<(), ParticipantError> {
        self.ensure_participant_config().await?;
        self.ensure_executor();
        self.install_message_watch().await;
        self.run_pre_connect_callbacks();
        self.create_live_instance().await.map_err(ParticipantError::LiveInstanceFailed)?;
        Ok(())
    }

    async fn ensure_participant_config(&self) -> Result<(), ParticipantError> {
        let config_key = self.key_builder.participant_config(&self.participant_id);
        if self.accessor.exists(&config_key).await? {
            return Ok(());
        }

        if !self.auto_join_allowed().await? {
            return Err(ParticipantError::AutoJoinDisallowed);
        }

        let mut config = Record::new(self.participant_id.clone());
        config.set_simple(wire::participant_config::HELIX_HOST, &self.host);
        config.set_simple(wire::participant_config::HELIX_PORT, self.port.to_string());
        config.set_simple(wire::participant_config::HELIX_ENABLED, "true");
        self.accessor.create(&config_key, &config).await?;

        for key in [
            self.key_builder.instance(&self.participant_id),
            self.key_builder.current_states(&self.participant_id, None),
            self.key_builder.errors(&self.participant_id),
            self.key_builder.health_report(&self.participant_id),
            self.key_builder.messages(&self.participant_id),
            self.key_builder.status_updates(&self.participant_id),
        ] {
            self.accessor.create(&key, &Record::new(String::new())).await?;
        }

        Ok(())
    }

    async fn auto_join_allowed(&self) -> Result<bool, ParticipantError> {
        let cluster_config = self.accessor.get(&self.key_builder.cluster_config()).await?;
        Ok(cluster_config
            .and_then(|r| r.get_simple(wire::cluster_config::ALLOW_PARTICIPANT_AUTO_JOIN).map(str::to_string))
            .is_some_and(|v| v == "true"))
    }

    fn ensure_executor(&self) {
        let registry = Arc::new(self.factory_registry.lock().unwrap().clone());
        let session_handle: Arc<dyn ParticipantHandle> =
            Arc::new(SessionHandle { participant_id: self.participant_id.clone(), client: self.client.clone() });
        let _ = self.executor.set(Arc::new(Executor::new(
            self.accessor.clone(),
            self.key_builder.clone(),
            registry,
            session_handle,
        )));
    }

    async fn install_message_watch(&self) {
        let messages_key = self.key_builder.messages(&self.participant_id);
        let accessor = self.accessor.clone();
        let key_builder = self.key_builder.clone();
        let participant_id = self.participant_id.clone();
        let executor = self
            .executor
            .get()
            .expect("executor initialized before message watch is installed")
            .clone();

        let callback: ChildrenWatchFn = Arc::new(move |children: Vec<String>| {
            let accessor = accessor.clone();
            let key_builder = key_builder.clone();
            let participant_id = participant_id.clone();
            let executor = executor.clone();
            Box::pin(async move {
                let mut records = Vec::new();
                for child in children {
                    let key = key_builder.message(&participant_id, &child);
                    if let Ok(Some(record)) = accessor.get(&key).await {
                        records.push(record);
                    }
                }
                if !records.is_empty() {
                    executor.on_message(records).await;
                }
            })
        });

        self.accessor.watch_children(&messages_key, callback).await;
    }

    fn run_pre_connect_callbacks(&self) {
        for callback in self.pre_connect_callbacks.lock().unwrap().iter() {
            callback();
        }
    }

    async fn create_live_instance(&self) -> Result<(), helix_accessor::AccessorError> {
        let mut node = Record::new(self.participant_id.clone());
        node.set_simple(wire::live_instance::HELIX_VERSION, "helix-rs-0.1");
        node.set_simple(wire::live_instance::SESSION_ID, self.client.session_id().unwrap_or_default());
        node.set_simple(
            wire::live_instance::LIVE_INSTANCE,
            format!("{}@{}", self.participant_id, self.host),
        );
        self.accessor.create(&self.key_builder.live_instance(&self.participant_id), &node).await
    }

    /// Watches the client's connection state: on `LOST`, flags the session
    /// as lost; on the following `CONNECTED`, reruns `_init` from scratch
    /// (the ephemeral live instance and prior watches were invalidated by
    /// the session change). The abandoned `CURRENTSTATES/<old_sid>` subtree
    /// is left for the controller to clean up.
    fn spawn_reconnect_watcher(participant: Arc<Self>) {
        let mut rx = participant.client.subscribe_connection_state();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = *rx.borrow();
                match state {
                    ConnectionState::Lost => {
                        participant.is_lost.store(true, Ordering::SeqCst);
                        warn!(participant_id = %participant.participant_id, "session lost");
                    }
                    ConnectionState::Connected => {
                        if participant.is_lost.swap(false, Ordering::SeqCst) {
                            info!(participant_id = %participant.participant_id, "session recovered, re-initializing");
                            if let Err(e) = participant.init().await {
                                error!(error = %e, "re-init after reconnect failed");
                            }
                        }
                    }
                    ConnectionState::Suspended => {}
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helix_client::InMemoryClient;

    #[tokio::test]
    async fn connect_without_auto_join_and_no_config_fails() {
        let participant = Participant::new("cluster1", "host-a", 9000, None, InMemoryClient::new("s1"));

        let err = Participant::connect(&participant).await.unwrap_err();
        assert!(matches!(err, ParticipantError::AutoJoinDisallowed));
        assert!(!participant.is_connected());
    }

    #[tokio::test]
    async fn connect_with_auto_join_creates_config_and_live_instance() {
        let participant = Participant::new("cluster1", "host-a", 9000, None, InMemoryClient::new("s1"));
        let kb = participant.key_builder().clone();
        let mut cluster_config = Record::new("cluster1");
        cluster_config.set_simple(wire::cluster_config::ALLOW_PARTICIPANT_AUTO_JOIN, "true");
        participant.accessor().create(&kb.cluster_config(), &cluster_config).await.unwrap();

        Participant::connect(&participant).await.unwrap();

        assert!(participant.is_connected());
        assert!(participant.accessor().exists(&kb.participant_config("host-a_9000")).await.unwrap());
        assert!(participant.accessor().exists(&kb.live_instance("host-a_9000")).await.unwrap());
        assert!(participant.accessor().exists(&kb.messages("host-a_9000")).await.unwrap());
    }

    #[tokio::test]
    async fn connect_with_existing_config_skips_auto_join_check() {
        let participant = Participant::new("cluster1", "host-a", 9000, Some("p1".into()), InMemoryClient::new("s1"));
        let kb = participant.key_builder().clone();
        participant.accessor().create(&kb.participant_config("p1"), &Record::new("p1")).await.unwrap();

        Participant::connect(&participant).await.unwrap();

        assert!(participant.is_connected());
        assert!(participant.accessor().exists(&kb.live_instance("p1")).await.unwrap());
    }

    #[tokio::test]
    async fn disconnect_removes_live_instance() {
        let participant = Participant::new("cluster1", "host-a", 9000, Some("p1".into()), InMemoryClient::new("s1"));
        let kb = participant.key_builder().clone();
        participant.accessor().create(&kb.participant_config("p1"), &Record::new("p1")).await.unwrap();
        Participant::connect(&participant).await.unwrap();

        participant.disconnect().await;

        assert!(!participant.is_connected());
        assert!(!participant.accessor().exists(&kb.live_instance("p1")).await.unwrap());
    }

    #[tokio::test]
    async fn session_loss_and_reconnect_recreates_live_instance() {
        let participant = Participant::new("cluster1", "host-a", 9000, Some("p1".into()), InMemoryClient::new("s1"));
        let kb = participant.key_builder().clone();
        participant.accessor().create(&kb.participant_config("p1"), &Record::new("p1")).await.unwrap();
        Participant::connect(&participant).await.unwrap();
        assert!(participant.accessor().exists(&kb.live_instance("p1")).await.unwrap());

        participant.client().simulate_session_loss("s2");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!participant.accessor().exists(&kb.live_instance("p1")).await.unwrap());

        participant.client().simulate_reconnect();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(participant.accessor().exists(&kb.live_instance("p1")).await.unwrap());
    }
}
