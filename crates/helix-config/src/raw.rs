use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RawParticipantConfig {
    pub cluster_id: String,
    pub host: String,
    pub port: u16,
    pub coordination_service_addresses: Vec<String>,
    #[serde(default)]
    pub participant_id: Option<String>,
}
