use std::collections::HashMap;
use std::sync::Arc;

use helix_accessor::DataAccessor;
use helix_client::CoordinationClient;
use helix_domain::{wire, KeyBuilder, Record};
use helix_statemodel::{FactoryRegistry, StateModel};
use tokio::sync::{RwLock, Semaphore};
use tracing::{error, warn};

use crate::participant_handle::ParticipantHandle;
use crate::task::TransitionTask;

pub const DEFAULT_PARALLELISM: usize = 20;

/// Watches a participant's message subtree (via the participant's
/// children-watch callback, which calls [`Self::on_message`]), filters,
/// acknowledges, and schedules [`TransitionTask`]s onto a bounded pool.
pub struct Executor<C: CoordinationClient> {
    accessor: Arc<DataAccessor<C>>,
    key_builder: KeyBuilder,
    factory_registry: Arc<FactoryRegistry>,
    participant: Arc<dyn ParticipantHandle>,
    semaphore: Arc<Semaphore>,
    state_models: RwLock<HashMap<String, Arc<StateModel>>>,
}

impl<C: CoordinationClient> Executor<C> {
    pub fn new(
        accessor: Arc<DataAccessor<C>>,
        key_builder: KeyBuilder,
        factory_registry: Arc<FactoryRegistry>,
        participant: Arc<dyn ParticipantHandle>,
    ) -> Self {
        Self::with_parallelism(accessor, key_builder, factory_registry, participant, DEFAULT_PARALLELISM)
    }

    pub fn with_parallelism(
        accessor: Arc<DataAccessor<C>>,
        key_builder: KeyBuilder,
        factory_registry: Arc<FactoryRegistry>,
        participant: Arc<dyn ParticipantHandle>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            accessor,
            key_builder,
            factory_registry,
            participant,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            state_models: RwLock::new(HashMap::new()),
        }
    }

    /// Processes one notification batch of message records. Every message is
    /// filtered in order; messages that survive filtering are acknowledged,
    /// in iteration order, before any transition task in the batch is
    /// submitted to the pool.
    pub async fn on_message(&self, messages: Vec<Record>)
    where
        C: CoordinationClient,
    {
        let session_id = self.participant.session_id();
        let participant_id = self.participant.participant_id().to_string();
        let mut prepared = Vec::new();

        for message in messages {
            let Some(msg_type) = message.get_simple(wire::message::MSG_TYPE) else {
                continue; // step 1
            };
            if msg_type.to_uppercase() != wire::message::STATE_TRANSITION {
                continue; // step 2
            }

            let tgt_session = message.get_simple(wire::message::TGT_SESSION_ID).unwrap_or_default();
            if tgt_session != session_id {
                warn!(
                    message = %message.id,
                    tgt_session_id = %tgt_session,
                    expected = %session_id,
                    "message targets a different session, removing"
                );
                let key = self.key_builder.message(&participant_id, &message.id);
                if let Err(e) = self.accessor.remove(&key).await {
                    error!(error = %e, message = %message.id, "failed removing stale-session message");
                }
                continue; // step 3
            }

            let msg_state = message.get_simple(wire::message::MSG_STATE).unwrap_or_default();
            if msg_state.to_uppercase() != wire::message::MSG_STATE_NEW {
                continue; // step 4
            }

            let Some(state_model_def) = message.get_simple(wire::message::STATE_MODEL_DEF) else {
                continue;
            };
            let Some(factory) = self.factory_registry.for_state_model_def(state_model_def) else {
                warn!(state_model_def, "no factory registered for state-model-def");
                continue;
            };
            let Some(partition_name) = message.get_simple(wire::message::PARTITION_NAME) else {
                continue;
            };
            let state_model = factory.get_or_create_state_model(&self.state_models, partition_name).await;

            // step 6: acknowledge before submitting, in iteration order.
            let mut ack = Record::new(message.id.clone());
            ack.set_simple(wire::message::MSG_STATE, wire::message::MSG_STATE_READ);
            ack.set_simple(
                wire::message::READ_TIMESTAMP,
                chrono::Utc::now().timestamp_millis().to_string(),
            );
            ack.set_simple(wire::message::EXE_SESSION_ID, session_id.clone());
            let message_key = self.key_builder.message(&participant_id, &message.id);
            if let Err(e) = self.accessor.update(&message_key, &ack, false).await {
                error!(error = %e, message = %message.id, "failed acknowledging message");
                continue;
            }

            let mut acked_message = message.clone();
            acked_message.set_simple(wire::message::MSG_STATE, wire::message::MSG_STATE_READ);
            prepared.push((acked_message, state_model, factory.parser().clone()));
        }

        for (message, state_model, parser) in prepared {
            let task = TransitionTask::new(
                message,
                state_model,
                parser,
                self.accessor.clone(),
                self.key_builder.clone(),
                self.participant.clone(),
            );
            let permit = self.semaphore.clone().acquire_owned().await.expect("semaphore never closed");
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = task.run().await {
                    error!(error = %e, "transition task failed");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helix_client::InMemoryClient;
    use helix_statemodel::{HandlerFuture, StateModelFactory, StateModelParser};

    struct TestParticipant {
        id: String,
        session: String,
    }

    impl ParticipantHandle for TestParticipant {
        fn participant_id(&self) -> &str {
            &self.id
        }
        fn session_id(&self) -> String {
            self.session.clone()
        }
    }

    struct OnlineOfflineFactory(StateModelParser);

    #[async_trait::async_trait]
    impl StateModelFactory for OnlineOfflineFactory {
        fn parser(&self) -> &StateModelParser {
            &self.0
        }

        async fn create_state_model(&self, _partition_name: &str) -> Arc<StateModel> {
            Arc::new(StateModel::new())
        }
    }

    fn executor() -> (Executor<InMemoryClient>, Arc<DataAccessor<InMemoryClient>>, KeyBuilder) {
        let accessor = Arc::new(DataAccessor::new(InMemoryClient::new("s1")));
        let kb = KeyBuilder::new("cluster1");
        let participant: Arc<dyn ParticipantHandle> =
            Arc::new(TestParticipant { id: "p1".into(), session: "s1".into() });

        let parser = StateModelParser::builder()
            .on_transition("OFFLINE", "ONLINE", |_ctx| Box::pin(async { Ok(()) }) as HandlerFuture)
            .build();
        let mut registry = FactoryRegistry::new();
        registry.register("OnlineOffline", Arc::new(OnlineOfflineFactory(parser)));

        let executor = Executor::new(accessor.clone(), kb.clone(), Arc::new(registry), participant);
        (executor, accessor, kb)
    }

    fn transition_message(id: &str, tgt_session: &str, msg_state: &str) -> Record {
        let mut m = Record::new(id);
        m.set_simple(wire::message::MSG_TYPE, wire::message::STATE_TRANSITION);
        m.set_simple(wire::message::MSG_STATE, msg_state);
        m.set_simple(wire::message::TGT_SESSION_ID, tgt_session);
        m.set_simple(wire::message::FROM_STATE, "OFFLINE");
        m.set_simple(wire::message::TO_STATE, "ONLINE");
        m.set_simple(wire::message::RESOURCE_NAME, "R");
        m.set_simple(wire::message::PARTITION_NAME, "R_0");
        m.set_simple(wire::message::STATE_MODEL_DEF, "OnlineOffline");
        m
    }

    #[tokio::test]
    async fn wrong_session_message_is_removed_and_not_processed() {
        let (executor, accessor, kb) = executor();
        let message_key = kb.message("p1", "M1");
        let msg = transition_message("M1", "wrong", "NEW");
        accessor.create(&message_key, &msg).await.unwrap();

        executor.on_message(vec![msg]).await;

        assert!(!accessor.exists(&message_key).await.unwrap());
    }

    #[tokio::test]
    async fn happy_path_transitions_and_removes_message() {
        let (executor, accessor, kb) = executor();
        let message_key = kb.message("p1", "M1");
        let msg = transition_message("M1", "s1", "NEW");
        accessor.create(&message_key, &msg).await.unwrap();

        executor.on_message(vec![msg]).await;

        // The task is spawned; give it a chance to run to completion.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(!accessor.exists(&message_key).await.unwrap());
        let cs = accessor.get(&kb.current_state("p1", "s1", "R")).await.unwrap().unwrap();
        assert_eq!(cs.map_fields["R_0"]["CURRENT_STATE"], "ONLINE");
    }

    #[tokio::test]
    async fn already_read_message_is_skipped() {
        let (executor, accessor, kb) = executor();
        let message_key = kb.message("p1", "M1");
        let msg = transition_message("M1", "s1", "READ");
        accessor.create(&message_key, &msg).await.unwrap();

        executor.on_message(vec![msg]).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // Not removed: it was never dispatched to a task.
        assert!(accessor.exists(&message_key).await.unwrap());
    }

    #[tokio::test]
    async fn message_without_msg_type_is_ignored() {
        let (executor, accessor, kb) = executor();
        let message_key = kb.message("p1", "M1");
        let msg = Record::new("M1");
        accessor.create(&message_key, &msg).await.unwrap();

        executor.on_message(vec![msg]).await;

        assert!(accessor.exists(&message_key).await.unwrap());
    }
}
