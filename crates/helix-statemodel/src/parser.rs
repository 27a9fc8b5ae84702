use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::StateModelError;
use crate::model::TransitionContext;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), StateModelError>> + Send>>;
pub type Handler = Arc<dyn Fn(TransitionContext) -> HandlerFuture + Send + Sync>;

/// Resolves the transition handler for a `from_state` → `to_state` edge.
///
/// The source resolved handlers dynamically at call time by composing
/// `on_become_<to>_from_<from>` and reflecting it off the state-model
/// instance. This recasts that as a table built once at construction time —
/// callers register handlers under the same naming convention (lowercased),
/// and lookup becomes a plain `HashMap` hit instead of reflection.
#[derive(Clone, Default)]
pub struct StateModelParser {
    handlers: HashMap<(String, String), Handler>,
    default_handler: Option<Handler>,
}

impl StateModelParser {
    pub fn builder() -> StateModelParserBuilder {
        StateModelParserBuilder::default()
    }

    /// Looks up the handler for `from_state` → `to_state`, falling back to
    /// the default transition handler if no specific one was registered.
    pub fn resolve(&self, from_state: &str, to_state: &str) -> Option<Handler> {
        let key = (from_state.to_lowercase(), to_state.to_lowercase());
        self.handlers.get(&key).cloned().or_else(|| self.default_handler.clone())
    }
}

#[derive(Default)]
pub struct StateModelParserBuilder {
    handlers: HashMap<(String, String), Handler>,
    default_handler: Option<Handler>,
}

impl StateModelParserBuilder {
    /// Registers the handler for `on_become_<to_state>_from_<from_state>`,
    /// matching the source's naming convention case-insensitively.
    pub fn on_transition<F>(mut self, from_state: &str, to_state: &str, handler: F) -> Self
    where
        F: Fn(TransitionContext) -> HandlerFuture + Send + Sync + 'static,
    {
        self.handlers.insert(
            (from_state.to_lowercase(), to_state.to_lowercase()),
            Arc::new(handler),
        );
        self
    }

    pub fn default_transition_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(TransitionContext) -> HandlerFuture + Send + Sync + 'static,
    {
        self.default_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> StateModelParser {
        StateModelParser { handlers: self.handlers, default_handler: self.default_handler }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx(from: &str, to: &str) -> TransitionContext {
        TransitionContext {
            partition_name: "R_0".into(),
            from_state: from.into(),
            to_state: to.into(),
            record: helix_domain::Record::new("m1"),
        }
    }

    #[tokio::test]
    async fn resolves_registered_handler_case_insensitively() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let parser = StateModelParser::builder()
            .on_transition("OFFLINE", "SLAVE", move |_ctx| {
                let calls = calls_clone.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .build();

        let handler = parser.resolve("Offline", "Slave").expect("handler registered");
        handler(ctx("Offline", "Slave")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_back_to_default_handler() {
        let parser = StateModelParser::builder()
            .default_transition_handler(|_ctx| Box::pin(async { Ok(()) }))
            .build();

        assert!(parser.resolve("slave", "master").is_some());
    }

    #[test]
    fn resolve_returns_none_without_match_or_default() {
        let parser = StateModelParser::builder().build();
        assert!(parser.resolve("offline", "slave").is_none());
    }
}
