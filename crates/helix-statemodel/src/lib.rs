//! State models, transition-handler resolution, and the factory registry
//! that maps a state-model-def name to the factory that builds its models.

mod error;
mod factory;
mod model;
mod parser;

pub use error::StateModelError;
pub use factory::{FactoryRegistry, StateModelFactory};
pub use model::{StateModel, TransitionContext, DEFAULT_INIT_STATE};
pub use parser::{Handler, HandlerFuture, StateModelParser, StateModelParserBuilder};
