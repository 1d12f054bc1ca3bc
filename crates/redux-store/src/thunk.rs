//! Thunk extension
//!
//! A thunk is a deferred unit of work that receives the store's dispatch and
//! state reader instead of being reduced. It runs as soon as it is dispatched
//! and its output (often a future) is handed back to the caller.
//!
//! ```rust
//! use redux_store::{reducer_fn, Action, Dispatch, GetState, Store, ThunkExt};
//! use std::sync::Arc;
//!
//! let store = Store::create(
//!     reducer_fn(0i64, |state, action| match action.action_type() {
//!         "increment" => Arc::new(**state + 1),
//!         _ => state.clone(),
//!     }),
//!     None,
//! );
//!
//! let increment_if_odd = |dispatch: Dispatch<i64>, get_state: GetState<i64>| {
//!     if *get_state.get() % 2 != 0 {
//!         dispatch.dispatch(Action::new("increment")).map(|_| true)
//!     } else {
//!         Ok(false)
//!     }
//! };
//! assert!(!store.dispatch_thunk(increment_if_odd).unwrap());
//! ```

use crate::action::Action;
use crate::error::StoreError;
use crate::store::Store;
use std::sync::Arc;

/// Deferred unit of work run by [`ThunkExt::dispatch_thunk`]
pub trait Thunk<S> {
    type Output;

    fn run(self, dispatch: Dispatch<S>, get_state: GetState<S>) -> Self::Output;
}

impl<S, F, T> Thunk<S> for F
where
    F: FnOnce(Dispatch<S>, GetState<S>) -> T,
{
    type Output = T;

    fn run(self, dispatch: Dispatch<S>, get_state: GetState<S>) -> T {
        self(dispatch, get_state)
    }
}

/// Dispatch capability handed to thunks
///
/// Accepts plain actions as well as further thunks.
pub struct Dispatch<S> {
    store: Store<S>,
}

impl<S> Clone for Dispatch<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Send + Sync + 'static> Dispatch<S> {
    pub fn dispatch(&self, action: Action) -> Result<Action, StoreError> {
        self.store.dispatch(action)
    }

    pub fn dispatch_thunk<K: Thunk<S>>(&self, thunk: K) -> K::Output {
        self.store.dispatch_thunk(thunk)
    }
}

/// State-read capability handed to thunks
pub struct GetState<S> {
    store: Store<S>,
}

impl<S> Clone for GetState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Send + Sync + 'static> GetState<S> {
    pub fn get(&self) -> Arc<S> {
        self.store.get_state()
    }
}

/// Thunk-aware dispatch for [`Store`]
pub trait ThunkExt<S> {
    /// Run a thunk with this store's dispatch and state reader
    fn dispatch_thunk<K: Thunk<S>>(&self, thunk: K) -> K::Output;
}

impl<S: Send + Sync + 'static> ThunkExt<S> for Store<S> {
    fn dispatch_thunk<K: Thunk<S>>(&self, thunk: K) -> K::Output {
        thunk.run(
            Dispatch {
                store: self.clone(),
            },
            GetState {
                store: self.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::reducer_fn;
    use std::time::Duration;

    fn counter_store() -> Store<i64> {
        Store::create(
            reducer_fn(0i64, |state, action| match action.action_type() {
                "increment" => Arc::new(**state + 1),
                "reset" => Arc::new(0),
                _ => state.clone(),
            }),
            None,
        )
    }

    #[test]
    fn test_thunk_returns_its_output() {
        let store = counter_store();
        let output = store.dispatch_thunk(|_dispatch: Dispatch<i64>, _get_state: GetState<i64>| 42);
        assert_eq!(output, 42);
    }

    #[test]
    fn test_thunk_dispatches_multiple_actions() {
        let store = counter_store();
        store
            .dispatch_thunk(|dispatch: Dispatch<i64>, get_state: GetState<i64>| {
                while *get_state.get() < 3 {
                    dispatch.dispatch(Action::new("increment"))?;
                }
                Ok::<_, StoreError>(())
            })
            .unwrap();
        assert_eq!(*store.get_state(), 3);
    }

    #[test]
    fn test_thunk_can_dispatch_thunks() {
        let store = counter_store();
        store.dispatch_thunk(|dispatch: Dispatch<i64>, _get_state: GetState<i64>| {
            dispatch.dispatch_thunk(|inner: Dispatch<i64>, _get_state: GetState<i64>| {
                inner.dispatch(Action::new("increment")).unwrap();
            });
            dispatch.dispatch(Action::new("increment")).unwrap();
        });
        assert_eq!(*store.get_state(), 2);
    }

    #[tokio::test]
    async fn test_async_thunk_dispatches_after_suspension() {
        let store = counter_store();
        let pending = store.dispatch_thunk(|dispatch: Dispatch<i64>, get_state: GetState<i64>| async move {
            dispatch.dispatch(Action::new("increment"))?;
            tokio::time::sleep(Duration::from_millis(5)).await;
            dispatch.dispatch(Action::new("increment"))?;
            Ok::<_, StoreError>(*get_state.get())
        });

        // The synchronous part of an async block only runs when polled
        assert_eq!(*store.get_state(), 0);
        assert_eq!(pending.await.unwrap(), 2);
        assert_eq!(*store.get_state(), 2);
    }
}
