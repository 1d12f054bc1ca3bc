//! Dispatcher for middleware follow-up actions
//!
//! Middleware runs while a dispatch is in flight, so it cannot call
//! `Store::dispatch` directly. It queues follow-up actions on the Dispatcher
//! instead; the store drains the queue once the current dispatch (reducer and
//! listeners) has completed, and every queued action goes through the full
//! middleware chain again.
//!
//! This enables patterns like:
//! - `session/loggedIn` triggers `profile/load`
//! - a validation middleware swaps an action for an error action

use crate::action::Action;
use std::sync::mpsc::{self, Receiver, Sender};

/// Dispatcher for queueing actions behind the in-flight dispatch
#[derive(Clone)]
pub struct Dispatcher {
    action_tx: Sender<Action>,
}

impl Dispatcher {
    /// Create a dispatcher together with the receiving end of its queue
    pub fn new() -> (Self, Receiver<Action>) {
        let (action_tx, action_rx) = mpsc::channel();
        (Self { action_tx }, action_rx)
    }

    /// Queue an action to be dispatched after the current one
    pub fn dispatch(&self, action: Action) {
        if let Err(e) = self.action_tx.send(action) {
            log::error!("Dispatcher: failed to queue action: {}", e);
        }
    }
}
