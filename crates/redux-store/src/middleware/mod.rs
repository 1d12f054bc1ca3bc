//! Middleware system
//!
//! Middleware sits between action dispatch and reducer execution, allowing
//! logging, validation and other cross-cutting concerns to be handled in a
//! composable way.
//!
//! ## Design
//!
//! ```text
//! Action → Middleware Chain → Reducer → State → Listeners
//! ```
//!
//! Each middleware can:
//! - Inspect actions and the current state
//! - Queue follow-up actions on the [`Dispatcher`]
//! - Block actions from reaching the reducer
//!
//! A blocked action neither changes state nor notifies listeners.

use crate::action::Action;
use crate::dispatcher::Dispatcher;

mod logging;

pub use logging::LoggingMiddleware;

/// Middleware trait - handles actions before they reach the reducer
///
/// Middleware is called in the order it was added to the store.
pub trait Middleware<S>: Send {
    /// Handle an action before it reaches the reducer
    ///
    /// # Parameters
    /// - `action`: The action being dispatched
    /// - `state`: Current state (read-only)
    /// - `dispatcher`: Queues actions to run after this dispatch
    ///
    /// # Returns
    /// - `true`: Continue to next middleware/reducer
    /// - `false`: Block this action from continuing
    fn handle(&mut self, action: &Action, state: &S, dispatcher: &Dispatcher) -> bool;
}
