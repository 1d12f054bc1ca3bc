//! Async thunks with a pending/fulfilled/rejected lifecycle
//!
//! [`create_async_thunk`] wraps an async work function into a thunk creator.
//! Every dispatched call runs this state machine:
//!
//! ```text
//! dispatch ──► prefix/pending ──► work(arg, api) ──┬─ Ok  ──► prefix/fulfilled (payload = result)
//!                                                  ├─ Err ──► prefix/rejected  (error = SerializedError)
//!                                                  └─ abort ► prefix/rejected  (error = AbortError)
//! ```
//!
//! Exactly one pending action is followed by exactly one settled action.
//! The work and the settled action run on a spawned tokio task, so dropping
//! the returned future does not cancel the request; use the
//! [`AbortController`] for that.
//! Overlapping calls are independent; their actions carry distinct
//! `meta.requestId` values. Failures never surface as store errors: reducers
//! see them through the rejected action, and the caller gets the same
//! [`SerializedError`] from the awaited result.

use crate::action::{Action, ActionCreator, SerializedError};
use crate::thunk::{Dispatch, GetState, Thunk};
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// BoxFuture type alias for async thunk work
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Future returned when an [`AsyncThunkAction`] is dispatched
pub type AsyncThunkResult<T> = BoxFuture<'static, Result<T, SerializedError>>;

type WorkFn<S, A, T> = dyn Fn(A, ThunkApi<S>) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync;
type ConditionFn<S, A> = dyn Fn(&A, &S) -> bool + Send + Sync;

/// Create an async thunk creator for `type_prefix`
///
/// # Example
///
/// ```rust
/// use redux_store::{create_async_thunk, reducer_fn, Store, ThunkApi, ThunkExt};
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = Store::create(reducer_fn((), |state, _action| state.clone()), None);
/// let fetch_user = create_async_thunk("users/fetch", |id: u64, _api: ThunkApi<()>| async move {
///     Ok::<_, anyhow::Error>(format!("user-{}", id))
/// });
///
/// let user = store.dispatch_thunk(fetch_user.call(7)).await.unwrap();
/// assert_eq!(user, "user-7");
/// # });
/// ```
pub fn create_async_thunk<S, A, T, F, Fut>(type_prefix: impl Into<String>, work: F) -> AsyncThunk<S, A, T>
where
    S: Send + Sync + 'static,
    A: Serialize + Send + 'static,
    T: Serialize + Send + 'static,
    F: Fn(A, ThunkApi<S>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    let type_prefix = type_prefix.into();
    let work: Arc<WorkFn<S, A, T>> =
        Arc::new(move |arg: A, api: ThunkApi<S>| -> BoxFuture<'static, anyhow::Result<T>> {
            Box::pin(work(arg, api))
        });

    AsyncThunk {
        pending: ActionCreator::new(format!("{}/pending", type_prefix)),
        fulfilled: ActionCreator::new(format!("{}/fulfilled", type_prefix)),
        rejected: ActionCreator::new(format!("{}/rejected", type_prefix)),
        type_prefix,
        work,
        condition: None,
    }
}

/// Thunk creator produced by [`create_async_thunk`]
pub struct AsyncThunk<S, A, T> {
    type_prefix: String,
    pending: ActionCreator,
    fulfilled: ActionCreator,
    rejected: ActionCreator,
    work: Arc<WorkFn<S, A, T>>,
    condition: Option<Arc<ConditionFn<S, A>>>,
}

impl<S, A, T> Clone for AsyncThunk<S, A, T> {
    fn clone(&self) -> Self {
        Self {
            type_prefix: self.type_prefix.clone(),
            pending: self.pending.clone(),
            fulfilled: self.fulfilled.clone(),
            rejected: self.rejected.clone(),
            work: self.work.clone(),
            condition: self.condition.clone(),
        }
    }
}

impl<S, A, T> AsyncThunk<S, A, T>
where
    S: Send + Sync + 'static,
    A: Serialize + Send + 'static,
    T: Serialize + Send + 'static,
{
    /// Skip calls for which `condition(arg, state)` is false
    ///
    /// A skipped call dispatches nothing and resolves to a `ConditionError`.
    pub fn with_condition<C>(mut self, condition: C) -> Self
    where
        C: Fn(&A, &S) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Create the thunk for one call
    pub fn call(&self, arg: A) -> AsyncThunkAction<S, A, T> {
        AsyncThunkAction {
            thunk: self.clone(),
            arg,
            request_id: uuid::Uuid::new_v4().to_string(),
            abort: AbortController::new(),
        }
    }

    pub fn type_prefix(&self) -> &str {
        &self.type_prefix
    }

    pub fn pending(&self) -> &ActionCreator {
        &self.pending
    }

    pub fn fulfilled(&self) -> &ActionCreator {
        &self.fulfilled
    }

    pub fn rejected(&self) -> &ActionCreator {
        &self.rejected
    }

    pub fn pending_type(&self) -> &str {
        self.pending.action_type()
    }

    pub fn fulfilled_type(&self) -> &str {
        self.fulfilled.action_type()
    }

    pub fn rejected_type(&self) -> &str {
        self.rejected.action_type()
    }

    pub fn is_pending(&self, action: &Action) -> bool {
        self.pending.matches(action)
    }

    pub fn is_fulfilled(&self, action: &Action) -> bool {
        self.fulfilled.matches(action)
    }

    pub fn is_rejected(&self, action: &Action) -> bool {
        self.rejected.matches(action)
    }

    /// Fulfilled or rejected
    pub fn is_settled(&self, action: &Action) -> bool {
        self.is_fulfilled(action) || self.is_rejected(action)
    }
}

/// One call of an [`AsyncThunk`], ready to be dispatched
pub struct AsyncThunkAction<S, A, T> {
    thunk: AsyncThunk<S, A, T>,
    arg: A,
    request_id: String,
    abort: AbortController,
}

impl<S, A, T> AsyncThunkAction<S, A, T> {
    /// Identifier carried by every action of this call as `meta.requestId`
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Controller to abort this call once dispatched
    pub fn abort_controller(&self) -> AbortController {
        self.abort.clone()
    }
}

enum Outcome<T> {
    Finished(anyhow::Result<T>),
    Aborted(String),
}

impl<S, A, T> Thunk<S> for AsyncThunkAction<S, A, T>
where
    S: Send + Sync + 'static,
    A: Serialize + Send + 'static,
    T: Serialize + Send + 'static,
{
    type Output = AsyncThunkResult<T>;

    fn run(self, dispatch: Dispatch<S>, get_state: GetState<S>) -> AsyncThunkResult<T> {
        let AsyncThunkAction {
            thunk,
            arg,
            request_id,
            abort,
        } = self;

        if let Some(condition) = &thunk.condition {
            let state = get_state.get();
            if !condition(&arg, &*state) {
                log::debug!(
                    "{}: condition returned false, skipping request {}",
                    thunk.type_prefix,
                    request_id
                );
                let error = SerializedError::new(
                    "ConditionError",
                    "Aborted due to condition callback returning false.",
                );
                return Box::pin(async move { Err(error) });
            }
        }

        if tokio::runtime::Handle::try_current().is_err() {
            log::error!(
                "{}: async thunks need a tokio runtime, skipping request {}",
                thunk.type_prefix,
                request_id
            );
            let error = SerializedError::new("RuntimeError", "no tokio runtime is running");
            return Box::pin(async move { Err(error) });
        }

        let arg_value = serde_json::to_value(&arg).unwrap_or_else(|e| {
            log::warn!("{}: argument is not serializable: {}", thunk.type_prefix, e);
            Value::Null
        });

        let pending = thunk.pending.create().meta(json!({
            "arg": arg_value,
            "requestId": request_id,
            "requestStatus": "pending",
        }));
        if let Err(e) = dispatch.dispatch(pending) {
            log::error!("{}: failed to dispatch pending action: {}", thunk.type_prefix, e);
            let error = SerializedError::new("DispatchError", e.to_string());
            return Box::pin(async move { Err(error) });
        }

        let signal = abort.signal();
        let api = ThunkApi {
            dispatch: dispatch.clone(),
            get_state,
            request_id: request_id.clone(),
            signal: signal.clone(),
        };
        let work = (thunk.work)(arg, api);
        let type_prefix = thunk.type_prefix.clone();

        // Settles on its own, whether or not the caller awaits the result
        let task = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                reason = signal.aborted() => Outcome::Aborted(reason),
                result = work => Outcome::Finished(result),
            };

            let mut meta = json!({
                "arg": arg_value,
                "requestId": request_id,
            });

            let (action, result) = match outcome {
                Outcome::Finished(Ok(value)) => match serde_json::to_value(&value) {
                    Ok(payload) => {
                        meta["requestStatus"] = json!("fulfilled");
                        (thunk.fulfilled.create().payload(payload), Ok(value))
                    }
                    Err(e) => {
                        let error = SerializedError::new("SerializationError", e.to_string());
                        meta["requestStatus"] = json!("rejected");
                        meta["aborted"] = json!(false);
                        (thunk.rejected.create().error(error.clone()), Err(error))
                    }
                },
                Outcome::Finished(Err(err)) => {
                    meta["requestStatus"] = json!("rejected");
                    meta["aborted"] = json!(false);
                    match err.downcast::<RejectedWithValue>() {
                        Ok(RejectedWithValue(value)) => {
                            let error = SerializedError {
                                message: Some("Rejected".to_string()),
                                ..SerializedError::default()
                            };
                            meta["rejectedWithValue"] = json!(true);
                            (
                                thunk.rejected.create().payload(value).error(error.clone()),
                                Err(error),
                            )
                        }
                        Err(err) => {
                            let error = SerializedError::from_error(&err);
                            (thunk.rejected.create().error(error.clone()), Err(error))
                        }
                    }
                }
                Outcome::Aborted(reason) => {
                    let error = SerializedError::new("AbortError", reason);
                    meta["requestStatus"] = json!("rejected");
                    meta["aborted"] = json!(true);
                    (thunk.rejected.create().error(error.clone()), Err(error))
                }
            };

            if let Err(e) = dispatch.dispatch(action.meta(meta)) {
                log::error!("{}: failed to dispatch settled action: {}", thunk.type_prefix, e);
            }

            result
        });

        Box::pin(async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    log::error!("{}: request task failed: {}", type_prefix, e);
                    Err(SerializedError::new("TaskError", e.to_string()))
                }
            }
        })
    }
}

/// Capabilities handed to the async work function
pub struct ThunkApi<S> {
    dispatch: Dispatch<S>,
    get_state: GetState<S>,
    request_id: String,
    signal: AbortSignal,
}

impl<S: Send + Sync + 'static> ThunkApi<S> {
    pub fn dispatch(&self) -> &Dispatch<S> {
        &self.dispatch
    }

    pub fn get_state(&self) -> Arc<S> {
        self.get_state.get()
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }

    /// Reject the call with a custom payload instead of an error
    ///
    /// Return the result as the work function's error:
    /// `return Err(api.reject_with_value(&details))`.
    pub fn reject_with_value<V: Serialize>(&self, value: &V) -> anyhow::Error {
        match serde_json::to_value(value) {
            Ok(value) => anyhow::Error::new(RejectedWithValue(value)),
            Err(e) => anyhow::Error::new(e).context("rejection value is not serializable"),
        }
    }
}

/// Error carrying the value passed to [`ThunkApi::reject_with_value`]
#[derive(Debug, Error)]
#[error("Rejected")]
pub struct RejectedWithValue(pub Value);

/// Aborts a dispatched [`AsyncThunkAction`]
#[derive(Clone)]
pub struct AbortController {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Abort with a reason; only the first reason is kept
    pub fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Observes an [`AbortController`]
#[derive(Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<Option<String>>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        self.rx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<String> {
        self.rx.borrow().clone()
    }

    /// Resolves with the abort reason once aborted
    ///
    /// Never resolves when the controller is dropped without aborting.
    pub async fn aborted(&self) -> String {
        let mut rx = self.rx.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(reason) = current {
                return reason;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
