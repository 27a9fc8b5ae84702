use std::sync::Arc;

use helix_accessor::DataAccessor;
use helix_client::CoordinationClient;
use helix_domain::{wire, KeyBuilder, Record};
use helix_statemodel::{StateModel, StateModelParser, TransitionContext};
use tracing::info;

use crate::error::ExecutorError;
use crate::participant_handle::ParticipantHandle;

/// Executes one transition message end-to-end. No step is skipped on
/// failure of a later one: handler invocation always runs, the current-state
/// update always happens (carrying either the new state or `ERROR`), and the
/// message is always removed.
pub struct TransitionTask<C: CoordinationClient> {
    message: Record,
    state_model: Arc<StateModel>,
    parser: StateModelParser,
    accessor: Arc<DataAccessor<C>>,
    key_builder: KeyBuilder,
    participant: Arc<dyn ParticipantHandle>,
}

impl<C: CoordinationClient> TransitionTask<C> {
    pub fn new(
        message: Record,
        state_model: Arc<StateModel>,
        parser: StateModelParser,
        accessor: Arc<DataAccessor<C>>,
        key_builder: KeyBuilder,
        participant: Arc<dyn ParticipantHandle>,
    ) -> Self {
        Self { message, state_model, parser, accessor, key_builder, participant }
    }

    pub async fn run(self) -> Result<(), ExecutorError> {
        let from_state = field(&self.message, wire::message::FROM_STATE);
        let to_state = field(&self.message, wire::message::TO_STATE);
        let resource_name = field(&self.message, wire::message::RESOURCE_NAME);
        let partition_name = field(&self.message, wire::message::PARTITION_NAME);
        let state_model_def = field(&self.message, wire::message::STATE_MODEL_DEF);

        info!(message = %self.message.id, %from_state, %to_state, "invoking transition message");

        let ctx = TransitionContext {
            partition_name: partition_name.clone(),
            from_state: from_state.clone(),
            to_state: to_state.clone(),
            record: self.message.clone(),
        };

        let outcome = match self.parser.resolve(&from_state, &to_state) {
            Some(handler) => handler(ctx).await,
            None => Err(helix_statemodel::StateModelError::HandlerFailed(format!(
                "no handler for {from_state} -> {to_state}"
            ))),
        };

        let session_id = self.participant.session_id();
        let participant_id = self.participant.participant_id().to_string();

        let current_state_key =
            self.key_builder.current_state(&participant_id, &session_id, &resource_name);
        let mut delta = Record::new(resource_name.clone());

        let sub = match &outcome {
            Ok(()) => {
                let mut partition_fields = std::collections::BTreeMap::new();
                partition_fields
                    .insert(wire::current_state::CURRENT_STATE.to_string(), to_state.clone());
                delta.map_fields.insert(partition_name.clone(), partition_fields);
                let dropped = to_state == "DROPPED";
                if !dropped {
                    delta.simple_fields.insert(
                        wire::current_state::STATE_MODEL_DEF.to_string(),
                        state_model_def.clone(),
                    );
                    delta
                        .simple_fields
                        .insert(wire::current_state::SESSION_ID.to_string(), session_id.clone());
                }
                dropped
            }
            Err(e) => {
                let mut partition_fields = std::collections::BTreeMap::new();
                partition_fields
                    .insert(wire::current_state::CURRENT_STATE.to_string(), "ERROR".to_string());
                partition_fields.insert(wire::current_state::INFO.to_string(), e.to_string());
                delta.map_fields.insert(partition_name.clone(), partition_fields);
                delta
                    .simple_fields
                    .insert(wire::current_state::STATE_MODEL_DEF.to_string(), state_model_def.clone());
                delta.simple_fields.insert(wire::current_state::SESSION_ID.to_string(), session_id.clone());
                false
            }
        };

        self.accessor.update(&current_state_key, &delta, sub).await?;

        if let Err(e) = &outcome {
            let error_key =
                self.key_builder.error(&participant_id, &session_id, &resource_name, &partition_name);
            let mut error_record = Record::new(partition_name.clone());
            error_record.set_simple(wire::error_record::ERROR, e.to_string());
            self.accessor.create(&error_key, &error_record).await?;
        }

        self.state_model
            .set_current_state(if outcome.is_ok() { to_state } else { "ERROR".to_string() })
            .await;

        let message_key = self.key_builder.message(&participant_id, &self.message.id);
        self.accessor.remove(&message_key).await?;

        Ok(())
    }
}

fn field(record: &Record, name: &str) -> String {
    record.get_simple(name).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use helix_client::InMemoryClient;
    use helix_statemodel::HandlerFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

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

    fn message(from: &str, to: &str) -> Record {
        let mut m = Record::new("m1");
        m.set_simple(wire::message::FROM_STATE, from);
        m.set_simple(wire::message::TO_STATE, to);
        m.set_simple(wire::message::RESOURCE_NAME, "R");
        m.set_simple(wire::message::PARTITION_NAME, "R_0");
        m.set_simple(wire::message::STATE_MODEL_DEF, "OnlineOffline");
        m
    }

    async fn setup() -> (
        Arc<DataAccessor<InMemoryClient>>,
        KeyBuilder,
        Arc<dyn ParticipantHandle>,
    ) {
        let accessor = Arc::new(DataAccessor::new(InMemoryClient::new("s1")));
        let kb = KeyBuilder::new("cluster1");
        let participant: Arc<dyn ParticipantHandle> =
            Arc::new(TestParticipant { id: "p1".into(), session: "s1".into() });
        let message_key = kb.message("p1", "m1");
        accessor.create(&message_key, &message("OFFLINE", "ONLINE")).await.unwrap();
        (accessor, kb, participant)
    }

    #[tokio::test]
    async fn successful_transition_publishes_current_state_and_removes_message() {
        let (accessor, kb, participant) = setup().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let parser = StateModelParser::builder()
            .on_transition("OFFLINE", "ONLINE", move |_ctx| {
                let calls = calls_clone.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }) as HandlerFuture
            })
            .build();
        let state_model = Arc::new(StateModel::new());

        let task = TransitionTask::new(
            message("OFFLINE", "ONLINE"),
            state_model.clone(),
            parser,
            accessor.clone(),
            kb.clone(),
            participant.clone(),
        );
        task.run().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let cs_key = kb.current_state("p1", "s1", "R");
        let cs = accessor.get(&cs_key).await.unwrap().unwrap();
        assert_eq!(cs.map_fields["R_0"]["CURRENT_STATE"], "ONLINE");
        assert_eq!(state_model.current_state().await, "ONLINE");
        assert!(!accessor.exists(&kb.message("p1", "m1")).await.unwrap());
    }

    #[tokio::test]
    async fn failing_handler_records_error_state_and_error_node() {
        let (accessor, kb, participant) = setup().await;
        let parser = StateModelParser::builder()
            .on_transition("OFFLINE", "ONLINE", |_ctx| {
                Box::pin(async move {
                    Err(helix_statemodel::StateModelError::HandlerFailed("boom".into()))
                }) as HandlerFuture
            })
            .build();
        let state_model = Arc::new(StateModel::new());

        let task = TransitionTask::new(
            message("OFFLINE", "ONLINE"),
            state_model.clone(),
            parser,
            accessor.clone(),
            kb.clone(),
            participant.clone(),
        );
        task.run().await.unwrap();

        let cs_key = kb.current_state("p1", "s1", "R");
        let cs = accessor.get(&cs_key).await.unwrap().unwrap();
        assert_eq!(cs.map_fields["R_0"]["CURRENT_STATE"], "ERROR");
        assert_eq!(state_model.current_state().await, "ERROR");

        let error_key = kb.error("p1", "s1", "R", "R_0");
        let error_record = accessor.get(&error_key).await.unwrap().unwrap();
        assert!(error_record.get_simple("ERROR").unwrap().contains("boom"));
        assert!(!accessor.exists(&kb.message("p1", "m1")).await.unwrap());
    }

    #[tokio::test]
    async fn dropped_partition_is_removed_from_current_state() {
        let (accessor, kb, participant) = setup().await;
        let cs_key = kb.current_state("p1", "s1", "R");
        let mut seeded = Record::new("R");
        seeded.map_entry("R_0").insert("CURRENT_STATE".into(), "ONLINE".into());
        accessor.create(&cs_key, &seeded).await.unwrap();

        let parser = StateModelParser::builder()
            .on_transition("ONLINE", "DROPPED", |_ctx| Box::pin(async { Ok(()) }) as HandlerFuture)
            .build();
        let state_model = Arc::new(StateModel::new());

        let task = TransitionTask::new(
            message("ONLINE", "DROPPED"),
            state_model.clone(),
            parser,
            accessor.clone(),
            kb.clone(),
            participant.clone(),
        );
        task.run().await.unwrap();

        let cs = accessor.get(&cs_key).await.unwrap().unwrap();
        assert!(!cs.map_fields.contains_key("R_0"));
    }
}
