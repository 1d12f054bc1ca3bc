use crate::action::Action;
use std::sync::Arc;

/// Reducer - pure function that produces new state from current state + action
///
/// `state` is `None` before the reducer has produced anything; the reducer
/// then returns its initial state. Returning the same `Arc` signals that
/// nothing changed.
///
/// Reducers must be deterministic and free of I/O. They must not dispatch.
pub trait Reducer<S>: Send + Sync + 'static {
    fn reduce(&self, state: Option<Arc<S>>, action: &Action) -> Arc<S>;
}

impl<S, F> Reducer<S> for F
where
    F: Fn(Option<Arc<S>>, &Action) -> Arc<S> + Send + Sync + 'static,
{
    fn reduce(&self, state: Option<Arc<S>>, action: &Action) -> Arc<S> {
        self(state, action)
    }
}

/// Shared, type-erased reducer
pub type BoxedReducer<S> = Arc<dyn Reducer<S>>;

/// Build a reducer from an initial state and a handler over the current state
///
/// The handler receives the current `Arc` and returns it unchanged for
/// actions it does not handle.
pub fn reducer_fn<S, F>(initial_state: S, handler: F) -> impl Reducer<S>
where
    S: Send + Sync + 'static,
    F: Fn(&Arc<S>, &Action) -> Arc<S> + Send + Sync + 'static,
{
    let initial_state = Arc::new(initial_state);
    move |state: Option<Arc<S>>, action: &Action| {
        let state = state.unwrap_or_else(|| initial_state.clone());
        handler(&state, action)
    }
}
