use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use helix_accessor::DataAccessor;
use helix_client::{CoordinationClient, DataWatchFn};
use helix_domain::{KeyBuilder, MapFields, Record};
use tokio::sync::RwLock;
use tracing::debug;

/// A read-only view of one resource's external view: `partition_id →
/// {participant_id → state}`, kept current by a data-watch.
pub struct Spectator<C: CoordinationClient> {
    mapping: RwLock<MapFields>,
    participants: Arc<RwLock<HashMap<String, Record>>>,
}

impl<C: CoordinationClient> Spectator<C> {
    pub(crate) async fn new(
        accessor: Arc<DataAccessor<Arc<C>>>,
        key_builder: &KeyBuilder,
        resource_id: &str,
        participants: Arc<RwLock<HashMap<String, Record>>>,
    ) -> Arc<Self> {
        let spectator = Arc::new(Self { mapping: RwLock::new(MapFields::new()), participants });

        let mapping = MappingHandle(spectator.clone());
        let watch: DataWatchFn = Arc::new(move |data, _stat| {
            let mapping = mapping.clone();
            Box::pin(async move {
                let new_mapping = match data {
                    None => MapFields::new(),
                    Some(bytes) => match Record::from_bytes(&bytes) {
                        Ok(record) => record.map_fields,
                        Err(e) => {
                            tracing::error!(error = %e, "malformed external view");
                            MapFields::new()
                        }
                    },
                };
                debug!(partitions = new_mapping.len(), "updated external view");
                *mapping.write().await = new_mapping;
            })
        });

        accessor.watch_property(&key_builder.external_view(resource_id), watch).await;
        spectator
    }

    /// All participants currently in `state`, optionally restricted to one
    /// partition; unioned across every partition otherwise.
    pub async fn get_participants(&self, state: &str, partition_id: Option<&str>) -> Vec<Record> {
        let mapping = self.mapping.read().await;
        let mut matched = HashSet::new();

        let partitions: Vec<&String> = match partition_id {
            Some(p) => mapping.keys().filter(|k| k.as_str() == p).collect(),
            None => mapping.keys().collect(),
        };

        for partition in partitions {
            if let Some(states) = mapping.get(partition) {
                for (participant_id, s) in states {
                    if s == state {
                        matched.insert(participant_id.clone());
                    }
                }
            }
        }

        let participants = self.participants.read().await;
        matched.into_iter().filter_map(|p| participants.get(&p).cloned()).collect()
    }

    /// The `participant_id → state` map for one partition, empty if unknown.
    pub async fn get_state_map(&self, partition_id: &str) -> HashMap<String, String> {
        self.mapping
            .read()
            .await
            .get(partition_id)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

/// Thin clone-able handle so the watch closure can reach back into the
/// spectator's mapping without holding a reference with a 'static bound.
struct MappingHandle<C: CoordinationClient>(Arc<Spectator<C>>);

impl<C: CoordinationClient> Clone for MappingHandle<C> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<C: CoordinationClient> std::ops::Deref for MappingHandle<C> {
    type Target = RwLock<MapFields>;

    fn deref(&self) -> &Self::Target {
        &self.0.mapping
    }
}
