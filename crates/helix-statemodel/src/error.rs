use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateModelError {
    #[error("transition handler failed: {0}")]
    HandlerFailed(String),

    #[error("no state-model factory registered for state-model-def: {0}")]
    FactoryNotConfigured(String),
}
