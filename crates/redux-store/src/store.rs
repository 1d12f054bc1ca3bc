use crate::action::{Action, INIT_ACTION_TYPE, REPLACE_ACTION_TYPE};
use crate::config::StoreConfig;
use crate::dispatcher::Dispatcher;
use crate::error::StoreError;
use crate::middleware::{LoggingMiddleware, Middleware};
use crate::reducer::{BoxedReducer, Reducer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::thread::{self, ThreadId};
use std::time::Instant;

/// Change-notification callback registered with [`Store::subscribe`]
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Store - holds application state and manages the Redux loop
///
/// The Store follows the Redux pattern:
/// - Centralized state management
/// - Actions are dispatched to modify state
/// - Pure reducers handle state transitions
/// - State is immutable (replaced on each action)
///
/// `Store` is a cheap handle: clones share the same state slot, so one
/// instance is created per application and passed to every consumer.
///
/// # Example
/// ```rust
/// use redux_store::{reducer_fn, Action, Store};
/// use std::sync::Arc;
///
/// let store = Store::create(
///     reducer_fn(0i64, |state, action| match action.action_type() {
///         "increment" => Arc::new(**state + 1),
///         _ => state.clone(),
///     }),
///     None,
/// );
/// store.dispatch(Action::new("increment")).unwrap();
/// assert_eq!(*store.get_state(), 1);
/// ```
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

struct StoreInner<S> {
    state: RwLock<Arc<S>>,
    reducer: RwLock<BoxedReducer<S>>,
    middleware: Mutex<Vec<Box<dyn Middleware<S>>>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    /// Serializes dispatches coming from different threads
    gate: Mutex<()>,
    /// Thread currently running a dispatch
    dispatching: Mutex<Option<ThreadId>>,
    dispatcher: Dispatcher,
    queued: Mutex<Receiver<Action>>,
    config: StoreConfig,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Send + Sync + 'static> Store<S> {
    /// Create a store from a root reducer
    ///
    /// Without `preloaded_state` the reducer is called once with no state and
    /// the `@@init` action to produce the initial state.
    pub fn create<R: Reducer<S>>(reducer: R, preloaded_state: Option<S>) -> Self {
        Self::from_parts(
            Arc::new(reducer),
            preloaded_state.map(Arc::new),
            Vec::new(),
            StoreConfig::default(),
        )
    }

    pub fn builder() -> StoreBuilder<S> {
        StoreBuilder::new()
    }

    fn from_parts(
        reducer: BoxedReducer<S>,
        preloaded_state: Option<Arc<S>>,
        middleware: Vec<Box<dyn Middleware<S>>>,
        config: StoreConfig,
    ) -> Self {
        let state = match preloaded_state {
            Some(state) => state,
            None => reducer.reduce(None, &Action::new(INIT_ACTION_TYPE)),
        };
        let (dispatcher, queued) = Dispatcher::new();

        log::debug!(
            "[{}] Store created with {} middleware",
            config.name,
            middleware.len()
        );

        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(state),
                reducer: RwLock::new(reducer),
                middleware: Mutex::new(middleware),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
                gate: Mutex::new(()),
                dispatching: Mutex::new(None),
                dispatcher,
                queued: Mutex::new(queued),
                config,
            }),
        }
    }

    /// Get the current state
    pub fn get_state(&self) -> Arc<S> {
        read(&self.inner.state).clone()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Add middleware to the store
    ///
    /// Middleware is called in the order it was added.
    pub fn add_middleware<M: Middleware<S> + 'static>(&self, middleware: M) {
        lock(&self.inner.middleware).push(Box::new(middleware));
    }

    /// Process an action through middleware chain and reducer
    ///
    /// Listeners subscribed when notification starts are called in
    /// subscription order. Actions queued by middleware are dispatched after
    /// this one completes. Returns the dispatched action.
    ///
    /// Reentrancy is tracked per thread. A reducer, middleware or listener
    /// dispatching on its own thread gets [`StoreError::ReentrantDispatch`];
    /// a dispatch from another thread waits until the current one is done, so
    /// a listener must not block on a thread that dispatches to this store.
    pub fn dispatch(&self, action: Action) -> Result<Action, StoreError> {
        action.validate()?;

        {
            let _guard = DispatchGuard::enter(&self.inner, &action)?;
            self.process(&action);
        }

        self.drain_queued();
        Ok(action)
    }

    /// Dispatch an untyped action value
    pub fn dispatch_value(&self, value: serde_json::Value) -> Result<Action, StoreError> {
        self.dispatch(Action::from_value(value)?)
    }

    /// Register a listener, called after every dispatch until unsubscribed
    ///
    /// Registering the same callback twice creates two independent entries.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push((id, Arc::new(listener)));

        let inner: Weak<StoreInner<S>> = Arc::downgrade(&self.inner);
        let registry: Weak<dyn ListenerRegistry> = inner;
        Subscription { id, registry }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    /// Replace the root reducer and let it initialise its state
    ///
    /// Fails with [`StoreError::ReentrantDispatch`] when called during a
    /// dispatch; the current reducer then stays in place.
    pub fn replace_reducer<R: Reducer<S>>(&self, reducer: R) -> Result<Action, StoreError> {
        let action = Action::new(REPLACE_ACTION_TYPE);
        {
            let _guard = DispatchGuard::enter(&self.inner, &action)?;
            *write(&self.inner.reducer) = Arc::new(reducer);
            self.process(&action);
        }

        self.drain_queued();
        Ok(action)
    }

    fn process(&self, action: &Action) {
        let started = Instant::now();
        let current = self.get_state();

        if !self.run_middleware(action, &current) {
            log::trace!(
                "[{}] Action {} consumed by middleware",
                self.inner.config.name,
                action
            );
            return;
        }

        let reducer = read(&self.inner.reducer).clone();
        let next = reducer.reduce(Some(current), action);
        *write(&self.inner.state) = next;

        self.notify();

        let elapsed = started.elapsed();
        if elapsed > self.inner.config.warn_after() {
            log::warn!(
                "[{}] Dispatching {} took {}ms, which is more than the warning threshold of {}ms",
                self.inner.config.name,
                action,
                elapsed.as_millis(),
                self.inner.config.warn_after_ms
            );
        }
    }

    fn run_middleware(&self, action: &Action, state: &S) -> bool {
        let mut middleware = lock(&self.inner.middleware);
        for middleware in middleware.iter_mut() {
            if !middleware.handle(action, state, &self.inner.dispatcher) {
                return false;
            }
        }
        true
    }

    fn notify(&self) {
        // Snapshot: changes made by listeners apply from the next dispatch
        let listeners: Vec<Listener> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener();
        }
    }

    fn drain_queued(&self) {
        loop {
            let queued = lock(&self.inner.queued).try_recv();
            let Ok(action) = queued else {
                break;
            };
            if let Err(e) = self.dispatch(action) {
                log::error!(
                    "[{}] Failed to dispatch queued action: {}",
                    self.inner.config.name,
                    e
                );
            }
        }
    }
}

/// Marks the calling thread as dispatching until dropped
struct DispatchGuard<'a, S> {
    inner: &'a StoreInner<S>,
    _gate: MutexGuard<'a, ()>,
}

impl<'a, S> DispatchGuard<'a, S> {
    fn enter(inner: &'a StoreInner<S>, action: &Action) -> Result<Self, StoreError> {
        let current = thread::current().id();
        let owner = *lock(&inner.dispatching);
        if owner == Some(current) {
            return Err(StoreError::ReentrantDispatch {
                action_type: action.action_type().to_string(),
            });
        }

        let gate = lock(&inner.gate);
        *lock(&inner.dispatching) = Some(current);
        Ok(Self { inner, _gate: gate })
    }
}

impl<S> Drop for DispatchGuard<'_, S> {
    fn drop(&mut self) {
        *lock(&self.inner.dispatching) = None;
    }
}

trait ListenerRegistry: Send + Sync {
    fn remove_listener(&self, id: u64) -> bool;
    fn has_listener(&self, id: u64) -> bool;
}

impl<S: Send + Sync> ListenerRegistry for StoreInner<S> {
    fn remove_listener(&self, id: u64) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }

    fn has_listener(&self, id: u64) -> bool {
        lock(&self.listeners)
            .iter()
            .any(|(listener_id, _)| *listener_id == id)
    }
}

/// Handle for one listener registration
///
/// Dropping the handle keeps the listener registered.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn ListenerRegistry>,
}

impl Subscription {
    /// Remove the listener; calling this more than once is a no-op
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_listener(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.has_listener(self.id))
            .unwrap_or(false)
    }
}

/// Builder for [`Store`]
pub struct StoreBuilder<S> {
    reducer: Option<BoxedReducer<S>>,
    preloaded_state: Option<Arc<S>>,
    middleware: Vec<Box<dyn Middleware<S>>>,
    config: StoreConfig,
}

impl<S: Send + Sync + 'static> StoreBuilder<S> {
    pub fn new() -> Self {
        Self {
            reducer: None,
            preloaded_state: None,
            middleware: Vec::new(),
            config: StoreConfig::default(),
        }
    }

    pub fn reducer<R: Reducer<S>>(mut self, reducer: R) -> Self {
        self.reducer = Some(Arc::new(reducer));
        self
    }

    pub fn preloaded_state(mut self, state: S) -> Self {
        self.preloaded_state = Some(Arc::new(state));
        self
    }

    pub fn middleware<M: Middleware<S> + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Box::new(middleware));
        self
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Store<S>, StoreError> {
        let reducer = self
            .reducer
            .ok_or_else(|| StoreError::configuration("a store needs a root reducer"))?;

        let mut middleware = self.middleware;
        if self.config.log_actions {
            middleware.insert(0, Box::new(LoggingMiddleware::new(self.config.name.clone())));
        }

        Ok(Store::from_parts(
            reducer,
            self.preloaded_state,
            middleware,
            self.config,
        ))
    }
}

impl<S: Send + Sync + 'static> Default for StoreBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
