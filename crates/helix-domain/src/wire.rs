//! Well-known field names used across `simpleFields`/`mapFields`, per §6.

pub mod message {
    pub const MSG_TYPE: &str = "MSG_TYPE";
    pub const MSG_STATE: &str = "MSG_STATE";
    pub const TGT_SESSION_ID: &str = "TGT_SESSION_ID";
    pub const EXE_SESSION_ID: &str = "EXE_SESSION_ID";
    pub const READ_TIMESTAMP: &str = "READ_TIMESTAMP";
    pub const STATE_MODEL_DEF: &str = "STATE_MODEL_DEF";
    pub const PARTITION_NAME: &str = "PARTITION_NAME";
    pub const RESOURCE_NAME: &str = "RESOURCE_NAME";
    pub const FROM_STATE: &str = "FROM_STATE";
    pub const TO_STATE: &str = "TO_STATE";

    pub const STATE_TRANSITION: &str = "STATE_TRANSITION";
    pub const MSG_STATE_NEW: &str = "NEW";
    pub const MSG_STATE_READ: &str = "READ";
}

pub mod current_state {
    pub const CURRENT_STATE: &str = "CURRENT_STATE";
    pub const INFO: &str = "INFO";
    pub const STATE_MODEL_DEF: &str = "STATE_MODEL_DEF";
    pub const SESSION_ID: &str = "SESSION_ID";
    pub const ERROR_STATE: &str = "ERROR";
    pub const DROPPED_STATE: &str = "DROPPED";
    pub const OFFLINE_STATE: &str = "OFFLINE";
}

pub mod error_record {
    pub const ERROR: &str = "ERROR";
}

pub mod live_instance {
    pub const HELIX_VERSION: &str = "HELIX_VERSION";
    pub const SESSION_ID: &str = "SESSION_ID";
    pub const LIVE_INSTANCE: &str = "LIVE_INSTANCE";
}

pub mod participant_config {
    pub const HELIX_HOST: &str = "HELIX_HOST";
    pub const HELIX_PORT: &str = "HELIX_PORT";
    pub const HELIX_ENABLED: &str = "HELIX_ENABLED";
}

pub mod cluster_config {
    pub const ALLOW_PARTICIPANT_AUTO_JOIN: &str = "allowParticipantAutoJoin";
}
