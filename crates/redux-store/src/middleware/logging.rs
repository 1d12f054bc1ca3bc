//! LoggingMiddleware - logs all actions for debugging

use super::Middleware;
use crate::action::Action;
use crate::dispatcher::Dispatcher;

/// LoggingMiddleware - logs every action that passes through the store
pub struct LoggingMiddleware {
    name: String,
}

impl LoggingMiddleware {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new("store")
    }
}

impl<S> Middleware<S> for LoggingMiddleware {
    fn handle(&mut self, action: &Action, _state: &S, _dispatcher: &Dispatcher) -> bool {
        match (action.payload_value(), action.error_value()) {
            (_, Some(error)) => log::debug!("[{}] Action: {} ({})", self.name, action, error),
            (Some(payload), None) => {
                log::debug!("[{}] Action: {} {}", self.name, action, payload)
            }
            (None, None) => log::debug!("[{}] Action: {}", self.name, action),
        }
        // Always continue to next middleware
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_logging_middleware() {
        let mut middleware = LoggingMiddleware::default();
        let (dispatcher, rx) = Dispatcher::new();

        let action = Action::new("counter/incrementByAmount").payload(json!(5));
        let should_continue = middleware.handle(&action, &(), &dispatcher);

        assert!(should_continue);
        assert!(rx.try_recv().is_err());
    }
}
