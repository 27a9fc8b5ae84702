use std::sync::Arc;

use helix_client::CoordinationClient;
use helix_executor::ParticipantHandle;

/// The narrow identity/session slice handed to the executor, breaking the
/// `Participant ↔ Executor ↔ Accessor` reference cycle the source has.
pub struct SessionHandle<C: CoordinationClient> {
    pub(crate) participant_id: String,
    pub(crate) client: Arc<C>,
}

impl<C: CoordinationClient> ParticipantHandle for SessionHandle<C> {
    fn participant_id(&self) -> &str {
        &self.participant_id
    }

    fn session_id(&self) -> String {
        self.client.session_id().unwrap_or_default()
    }
}
