use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::StateModel;
use crate::parser::StateModelParser;

/// Produces [`StateModel`]s for partitions and lazily caches them by
/// partition name, mirroring the source's `put_state_model`/`get_state_model`
/// pair.
#[async_trait::async_trait]
pub trait StateModelFactory: Send + Sync + 'static {
    /// The transition-handler table partitions created by this factory use.
    fn parser(&self) -> &StateModelParser;

    async fn create_state_model(&self, partition_name: &str) -> Arc<StateModel>;

    async fn get_or_create_state_model(
        &self,
        cache: &RwLock<HashMap<String, Arc<StateModel>>>,
        partition_name: &str,
    ) -> Arc<StateModel> {
        if let Some(model) = cache.read().await.get(partition_name) {
            return model.clone();
        }
        let model = self.create_state_model(partition_name).await;
        cache.write().await.insert(partition_name.to_string(), model.clone());
        model
    }
}

/// Dispatches to the correct [`StateModelFactory`] by state-model-def name.
///
/// Grounded directly on the teacher's cloud-target → driver registry: the
/// distilled spec never names the type that holds the `STATE_MODEL_DEF` →
/// factory mapping its executor step needs, so this supplies it in the same
/// shape.
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, Arc<dyn StateModelFactory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self { factories: HashMap::new() }
    }

    pub fn register(&mut self, state_model_def: impl Into<String>, factory: Arc<dyn StateModelFactory>) -> &mut Self {
        self.factories.insert(state_model_def.into(), factory);
        self
    }

    pub fn for_state_model_def(&self, state_model_def: &str) -> Option<Arc<dyn StateModelFactory>> {
        self.factories.get(state_model_def).cloned()
    }

    pub fn unregister(&mut self, state_model_def: &str) -> Option<Arc<dyn StateModelFactory>> {
        self.factories.remove(state_model_def)
    }

    pub fn registered_state_model_defs(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StateModelParser;

    struct NoopFactory(StateModelParser);

    #[async_trait::async_trait]
    impl StateModelFactory for NoopFactory {
        fn parser(&self) -> &StateModelParser {
            &self.0
        }

        async fn create_state_model(&self, _partition_name: &str) -> Arc<StateModel> {
            Arc::new(StateModel::new())
        }
    }

    #[tokio::test]
    async fn registry_resolves_by_state_model_def_name() {
        let mut registry = FactoryRegistry::new();
        registry.register("OnlineOffline", Arc::new(NoopFactory(StateModelParser::builder().build())));

        assert!(registry.for_state_model_def("OnlineOffline").is_some());
        assert!(registry.for_state_model_def("MasterSlave").is_none());
    }

    #[tokio::test]
    async fn get_or_create_caches_by_partition() {
        let factory = NoopFactory(StateModelParser::builder().build());
        let cache = RwLock::new(HashMap::new());

        let a = factory.get_or_create_state_model(&cache, "R_0").await;
        let b = factory.get_or_create_state_model(&cache, "R_0").await;
        assert!(Arc::ptr_eq(&a, &b));
    }
}
