/// Bootstrap configuration for a participant process: which cluster to
/// join, how to reach the coordination service, and this process's
/// identity within the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantConfig {
    pub cluster_id: String,
    pub host: String,
    pub port: u16,
    pub coordination_service_addresses: Vec<String>,
    pub participant_id: String,
}

impl ParticipantConfig {
    /// Default participant id, used when none is configured explicitly.
    pub fn default_participant_id(host: &str, port: u16) -> String {
        format!("{host}_{port}")
    }
}
