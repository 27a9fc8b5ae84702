use std::path::Path;

use tracing::debug;

use crate::config::ParticipantConfig;
use crate::error::ConfigError;
use crate::raw::RawParticipantConfig;

/// Loads a participant's bootstrap configuration from a YAML file.
///
/// Expected shape:
/// ```yaml
/// cluster_id: myCluster
/// host: 127.0.0.1
/// port: 12000
/// coordination_service_addresses:
///   - 127.0.0.1:2181
/// participant_id: custom-id   # optional, defaults to "<host>_<port>"
/// ```
pub fn load_participant_config(path: &Path) -> Result<ParticipantConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let raw: RawParticipantConfig = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
        path: path.display().to_string(),
        source: e,
    })?;

    if raw.coordination_service_addresses.is_empty() {
        return Err(ConfigError::Conversion {
            path: path.display().to_string(),
            message: "coordination_service_addresses must not be empty".to_string(),
        });
    }

    debug!(path = %path.display(), cluster_id = %raw.cluster_id, "loaded participant config");

    let participant_id = raw
        .participant_id
        .unwrap_or_else(|| ParticipantConfig::default_participant_id(&raw.host, raw.port));

    Ok(ParticipantConfig {
        cluster_id: raw.cluster_id,
        host: raw.host,
        port: raw.port,
        coordination_service_addresses: raw.coordination_service_addresses,
        participant_id,
    })
}
