//! Reducer composition
//!
//! A [`CombinedReducer`] owns one sub-reducer per key. Each sub-reducer only
//! ever sees and returns its own slot of the [`CombinedState`]. When no slot
//! changed, the previous composite `Arc` is handed back as is.

use crate::action::Action;
use crate::error::StoreError;
use crate::reducer::Reducer;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

type Slot = Arc<dyn Any + Send + Sync>;

/// Composite state record, one type-erased slot per reducer key
#[derive(Clone, Default)]
pub struct CombinedState {
    slots: BTreeMap<String, Slot>,
}

impl CombinedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: put a slot (used for preloaded state)
    pub fn with<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.slots.insert(key.into(), Arc::new(value));
        self
    }

    /// Read a slot back with its concrete type
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let slot = self.slots.get(key)?.clone();
        slot.downcast::<T>().ok()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether both states hold the very same slot for `key`
    pub fn same_slot(&self, other: &CombinedState, key: &str) -> bool {
        match (self.slots.get(key), other.slots.get(key)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for CombinedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedState")
            .field("keys", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Sub-reducer with its state type erased
trait SlotReducer: Send + Sync {
    /// Returns the next slot and whether it differs from the input
    fn reduce_slot(&self, key: &str, slot: Option<&Slot>, action: &Action) -> (Slot, bool);
}

struct TypedSlot<T, R> {
    reducer: R,
    _state: PhantomData<fn() -> T>,
}

impl<T, R> SlotReducer for TypedSlot<T, R>
where
    T: Send + Sync + 'static,
    R: Reducer<T>,
{
    fn reduce_slot(&self, key: &str, slot: Option<&Slot>, action: &Action) -> (Slot, bool) {
        let current = slot.and_then(|slot| match slot.clone().downcast::<T>() {
            Ok(typed) => Some(typed),
            Err(_) => {
                log::warn!(
                    "State under key '{}' has an unexpected type, reinitializing it",
                    key
                );
                None
            }
        });

        let next = self.reducer.reduce(current.clone(), action);
        let changed = match &current {
            Some(current) => !Arc::ptr_eq(current, &next),
            None => true,
        };
        (next as Slot, changed)
    }
}

/// Reducer over a [`CombinedState`]
pub struct CombinedReducer {
    reducers: Vec<(String, Box<dyn SlotReducer>)>,
}

impl CombinedReducer {
    pub fn builder() -> CombinedReducerBuilder {
        CombinedReducerBuilder::default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.reducers.iter().map(|(key, _)| key.as_str())
    }
}

impl Reducer<CombinedState> for CombinedReducer {
    fn reduce(&self, state: Option<Arc<CombinedState>>, action: &Action) -> Arc<CombinedState> {
        if let Some(state) = &state {
            for key in state.keys() {
                if !self.reducers.iter().any(|(k, _)| k == key) {
                    log::warn!(
                        "Unexpected key '{}' in combined state, it will be dropped",
                        key
                    );
                }
            }
        }

        let mut next = CombinedState::new();
        let mut has_changed = false;

        for (key, reducer) in &self.reducers {
            let slot = state.as_ref().and_then(|state| state.slots.get(key));
            let (next_slot, changed) = reducer.reduce_slot(key, slot, action);
            has_changed |= changed;
            next.slots.insert(key.clone(), next_slot);
        }

        match state {
            Some(state) if !has_changed && state.len() == self.reducers.len() => state,
            _ => Arc::new(next),
        }
    }
}

/// Builder for [`CombinedReducer`]
#[derive(Default)]
pub struct CombinedReducerBuilder {
    reducers: Vec<(String, Box<dyn SlotReducer>)>,
    errors: Vec<String>,
}

impl CombinedReducerBuilder {
    /// Register the reducer for one key
    pub fn with<T, R>(mut self, key: impl Into<String>, reducer: R) -> Self
    where
        T: Send + Sync + 'static,
        R: Reducer<T>,
    {
        let key = key.into();
        if key.is_empty() {
            self.errors.push("reducer keys must not be empty".to_string());
        } else if self.reducers.iter().any(|(k, _)| *k == key) {
            self.errors
                .push(format!("a reducer for key '{}' is already registered", key));
        } else {
            self.reducers.push((
                key,
                Box::new(TypedSlot {
                    reducer,
                    _state: PhantomData,
                }),
            ));
        }
        self
    }

    pub fn build(self) -> Result<CombinedReducer, StoreError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(StoreError::configuration(error));
        }
        if self.reducers.is_empty() {
            return Err(StoreError::configuration(
                "combined reducer needs at least one reducer",
            ));
        }
        Ok(CombinedReducer {
            reducers: self.reducers,
        })
    }
}
