//! Predictable state container with a Redux-style dispatch cycle
//!
//! A [`Store`] owns one state value. The only way to change it is to
//! dispatch an [`Action`]; the root [`Reducer`] computes the next state and
//! every subscribed listener is notified afterwards.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   Action   ┌────────────┐  ok   ┌───────────┐
//! │ dispatch()   │──────────► │ Middleware │─────► │  Reducer  │
//! │ / thunks     │            │   chain    │       │ (pure fn) │
//! └──────────────┘            └────────────┘       └───────────┘
//!        ▲                          │                     │ next state
//!        │ follow-up actions        ▼                     ▼
//!        └──────────────────── Dispatcher          Listeners notified
//! ```
//!
//! Reducers can be composed with [`CombinedReducer`] and generated from
//! case reducers with [`Slice`]. Side effects live in thunks
//! ([`ThunkExt::dispatch_thunk`]) and async thunks ([`create_async_thunk`]).
//!
//! # Example
//!
//! ```rust
//! use redux_store::{Slice, Store};
//!
//! let counter = Slice::builder("counter", 0i64)
//!     .case("increment", |state, _action| state + 1)
//!     .case("decrement", |state, _action| state - 1)
//!     .build()?;
//!
//! let store = Store::create(counter.reducer(), None);
//! let _subscription = store.subscribe(|| println!("state changed"));
//!
//! let increment = counter.action("increment").unwrap();
//! store.dispatch(increment.create())?;
//! store.dispatch(increment.create())?;
//! assert_eq!(*store.get_state(), 2);
//! # Ok::<(), redux_store::StoreError>(())
//! ```

mod action;
mod async_thunk;
mod combine;
mod config;
mod dispatcher;
mod error;
pub mod middleware;
mod reducer;
mod slice;
mod store;
mod thunk;

pub use action::{Action, ActionCreator, SerializedError, INIT_ACTION_TYPE, REPLACE_ACTION_TYPE};
pub use async_thunk::{
    create_async_thunk, AbortController, AbortSignal, AsyncThunk, AsyncThunkAction,
    AsyncThunkResult, BoxFuture, RejectedWithValue, ThunkApi,
};
pub use combine::{CombinedReducer, CombinedReducerBuilder, CombinedState};
pub use config::StoreConfig;
pub use dispatcher::Dispatcher;
pub use error::StoreError;
pub use middleware::{LoggingMiddleware, Middleware};
pub use reducer::{reducer_fn, BoxedReducer, Reducer};
pub use slice::{create_reducer, ExtraReducersBuilder, Slice, SliceBuilder, SliceReducer};
pub use store::{Listener, Store, StoreBuilder, Subscription};
pub use thunk::{Dispatch, GetState, Thunk, ThunkExt};
