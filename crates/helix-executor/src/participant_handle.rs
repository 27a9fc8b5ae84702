/// The narrow slice of `Participant` the executor needs: its identity and
/// its current coordination-service session. Borrowing this instead of the
/// whole participant breaks the source's `Participant ↔ Executor ↔ Accessor`
/// reference cycle.
pub trait ParticipantHandle: Send + Sync + 'static {
    fn participant_id(&self) -> &str;
    fn session_id(&self) -> String;
}
