//! Message dispatch pipeline: filters and acknowledges incoming transition
//! messages, then runs each as a [`TransitionTask`] on a bounded pool.

mod error;
mod executor;
mod participant_handle;
mod task;

pub use error::ExecutorError;
pub use executor::{Executor, DEFAULT_PARALLELISM};
pub use participant_handle::ParticipantHandle;
pub use task::TransitionTask;
