use std::sync::Arc;

use helix_statemodel::{StateModel, StateModelFactory, StateModelParser};
use tracing::info;

/// A master/slave factory that just logs every transition it's asked to
/// perform. Mirrors the Python example's `DummyStateModel` used for manual
/// smoke-testing a cluster before wiring up a real workload.
pub struct DummyStateModelFactory {
    parser: StateModelParser,
}

impl Default for DummyStateModelFactory {
    fn default() -> Self {
        let parser = StateModelParser::builder()
            .on_transition("OFFLINE", "SLAVE", |ctx| {
                Box::pin(async move {
                    info!(partition = %ctx.partition_name, "become slave from offline");
                    Ok(())
                })
            })
            .on_transition("SLAVE", "OFFLINE", |ctx| {
                Box::pin(async move {
                    info!(partition = %ctx.partition_name, "become offline from slave");
                    Ok(())
                })
            })
            .on_transition("SLAVE", "MASTER", |ctx| {
                Box::pin(async move {
                    info!(partition = %ctx.partition_name, "become master from slave");
                    Ok(())
                })
            })
            .on_transition("MASTER", "SLAVE", |ctx| {
                Box::pin(async move {
                    info!(partition = %ctx.partition_name, "become slave from master");
                    Ok(())
                })
            })
            .on_transition("OFFLINE", "DROPPED", |ctx| {
                Box::pin(async move {
                    info!(partition = %ctx.partition_name, "become dropped from offline");
                    Ok(())
                })
            })
            .build();
        Self { parser }
    }
}

#[async_trait::async_trait]
impl StateModelFactory for DummyStateModelFactory {
    fn parser(&self) -> &StateModelParser {
        &self.parser
    }

    async fn create_state_model(&self, partition_name: &str) -> Arc<StateModel> {
        info!(partition = partition_name, "creating state model");
        Arc::new(StateModel::new())
    }
}
