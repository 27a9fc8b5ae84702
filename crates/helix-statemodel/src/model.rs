use tokio::sync::RwLock;

/// The state every partition starts in before its first transition.
pub const DEFAULT_INIT_STATE: &str = "OFFLINE";

/// The full `simpleFields`/`mapFields` context a transition handler needs:
/// which partition, which edge of the state graph, and the message record
/// that triggered it.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub partition_name: String,
    pub from_state: String,
    pub to_state: String,
    pub record: helix_domain::Record,
}

/// Tracks the current state of one partition. Shared between the executor
/// (which drives transitions) and anything inspecting live state, so the
/// current-state cell is lock-guarded rather than plain.
pub struct StateModel {
    current_state: RwLock<String>,
}

impl Default for StateModel {
    fn default() -> Self {
        Self::new()
    }
}

impl StateModel {
    pub fn new() -> Self {
        Self { current_state: RwLock::new(DEFAULT_INIT_STATE.to_string()) }
    }

    pub async fn current_state(&self) -> String {
        self.current_state.read().await.clone()
    }

    pub async fn set_current_state(&self, state: impl Into<String>) {
        *self.current_state.write().await = state.into();
    }
}
