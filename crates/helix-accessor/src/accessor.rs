use helix_client::{ChildrenWatchFn, ClientError, CoordinationClient, DataWatchFn, ANY_VERSION};
use helix_domain::{PropertyKey, Record};
use tracing::{info, warn};

use crate::error::AccessorError;

fn canonical_bytes(key: &PropertyKey, record: &Record) -> Result<Vec<u8>, AccessorError> {
    record.to_canonical_bytes().map_err(|source| AccessorError::Malformed {
        path: key.path.clone(),
        source,
    })
}

/// Reads and writes [`Record`]s through a [`CoordinationClient`], applying
/// the policy (ephemeral/sequential/merge-on-update/update-only-on-exists)
/// carried by each [`PropertyKey`].
pub struct DataAccessor<C: CoordinationClient> {
    client: C,
}

impl<C: CoordinationClient> DataAccessor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Creates a property, creating ancestor nodes as necessary. Falls back
    /// to [`Self::set`] if the node already exists.
    pub async fn create(&self, key: &PropertyKey, record: &Record) -> Result<(), AccessorError> {
        let data = canonical_bytes(key, record)?;
        info!(path = %key.path, "creating property");
        match self
            .client
            .create(&key.path, data, key.ephemeral, key.sequential)
            .await
        {
            Ok(()) => Ok(()),
            Err(ClientError::NodeExists(_)) => {
                warn!(path = %key.path, "property exists already, falling back to set");
                self.set(key, record).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrites a property unconditionally, creating ancestors unless the
    /// key is marked update-only-on-exists.
    pub async fn set(&self, key: &PropertyKey, record: &Record) -> Result<(), AccessorError> {
        if !key.update_only_on_exists {
            self.client.ensure_path(&key.path).await?;
        }
        info!(path = %key.path, "setting property");
        let data = canonical_bytes(key, record)?;
        match self.client.set(&key.path, data, ANY_VERSION).await {
            Ok(()) => Ok(()),
            Err(ClientError::NoNode(p)) => Err(AccessorError::NotFound(p)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, key: &PropertyKey) -> Result<Option<Record>, AccessorError> {
        match self.client.get(&key.path).await {
            Ok((data, _stat)) => {
                let record = Record::from_bytes(&data).map_err(|source| AccessorError::Malformed {
                    path: key.path.clone(),
                    source,
                })?;
                Ok(Some(record))
            }
            Err(ClientError::NoNode(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_children(&self, key: &PropertyKey) -> Result<Vec<String>, AccessorError> {
        match self.client.get_children(&key.path).await {
            Ok(children) => Ok(children),
            Err(ClientError::NoNode(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, key: &PropertyKey) -> Result<bool, AccessorError> {
        Ok(self.client.exists(&key.path).await?)
    }

    /// Registers a children watch. Fires immediately, then again on every
    /// subsequent change, for the lifetime of the session.
    pub async fn watch_children(&self, key: &PropertyKey, callback: ChildrenWatchFn) {
        self.client.watch_children(&key.path, callback).await;
    }

    /// Registers a data watch, receiving the raw `(data, stat)` pair on
    /// every notification (absent as `(None, None)`).
    pub async fn watch_property(&self, key: &PropertyKey, callback: DataWatchFn) {
        self.client.watch_data(&key.path, callback).await;
    }

    pub async fn remove(&self, key: &PropertyKey) -> Result<(), AccessorError> {
        match self.client.delete(&key.path, true).await {
            Ok(()) => Ok(()),
            Err(ClientError::NoNode(p)) => {
                warn!(path = %p, "property does not exist, nothing to remove");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read-modify-write with optimistic-concurrency retry. When the key
    /// allows merge, `updated` is folded field-by-field into the stored
    /// record (added if `sub` is false, removed if `sub` is true). Otherwise
    /// `updated` entirely replaces the stored record, and `sub` is rejected.
    pub async fn update(
        &self,
        key: &PropertyKey,
        updated: &Record,
        sub: bool,
    ) -> Result<(), AccessorError> {
        loop {
            let exists = self.client.exists(&key.path).await?;
            if !exists {
                if key.update_only_on_exists || sub {
                    return Err(AccessorError::NotFound(key.path.clone()));
                }
                let data = canonical_bytes(key, updated)?;
                match self
                    .client
                    .create(&key.path, data, key.ephemeral, key.sequential)
                    .await
                {
                    Ok(()) => return Ok(()),
                    Err(ClientError::NodeExists(_)) => {
                        // Someone beat us to it; fall through and merge below.
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let (data, stat) = self.client.get(&key.path).await?;
            let mut value = Record::from_bytes(&data).map_err(|source| AccessorError::Malformed {
                path: key.path.clone(),
                source,
            })?;

            if key.merge_on_update {
                if !sub {
                    for (k, v) in updated.simple_fields.iter() {
                        value.simple_fields.insert(k.clone(), v.clone());
                    }
                    for (k, v) in updated.list_fields.iter() {
                        value.list_fields.insert(k.clone(), v.clone());
                    }
                    for (k, v) in updated.map_fields.iter() {
                        value.map_fields.insert(k.clone(), v.clone());
                    }
                } else {
                    for k in updated.simple_fields.keys() {
                        value.simple_fields.remove(k);
                    }
                    for k in updated.list_fields.keys() {
                        value.list_fields.remove(k);
                    }
                    for k in updated.map_fields.keys() {
                        value.map_fields.remove(k);
                    }
                }
            } else if !sub {
                value = updated.clone();
            } else {
                return Err(AccessorError::SubtractNotAllowed(key.path.clone()));
            }

            let data = canonical_bytes(key, &value)?;
            match self.client.set(&key.path, data, stat.version).await {
                Ok(()) => return Ok(()),
                Err(ClientError::BadVersion(_)) => {
                    info!(path = %key.path, "version conflict, retrying update");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
