//! Slices - a named bundle of case reducers and their action types
//!
//! A slice namespaces its case reducers under its name (`counter/increment`)
//! and can additionally respond to foreign actions, such as the lifecycle
//! actions of an async thunk, through extra reducers. Extra reducers are a
//! construction-time convenience only: at dispatch time a slice reducer is an
//! ordinary [`Reducer`].
//!
//! For one action the slice reducer runs
//! 1. the case reducer registered for the exact action type,
//! 2. every matcher that accepts the action, in registration order,
//! 3. the default case, only when neither of the above matched.
//!
//! Unmatched actions return the input state reference.

use crate::action::{Action, ActionCreator};
use crate::error::StoreError;
use crate::reducer::Reducer;
use std::collections::HashMap;
use std::sync::Arc;

type CaseReducer<S> = Arc<dyn Fn(&S, &Action) -> S + Send + Sync>;
type Matcher = Arc<dyn Fn(&Action) -> bool + Send + Sync>;

/// Named bundle of reducer logic and action creators for one feature area
pub struct Slice<S> {
    name: String,
    actions: HashMap<String, ActionCreator>,
    reducer: SliceReducer<S>,
}

impl<S: Send + Sync + 'static> Slice<S> {
    pub fn builder(name: impl Into<String>, initial_state: S) -> SliceBuilder<S> {
        SliceBuilder::new(name, initial_state)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The slice reducer, to be passed to a store or a combined reducer
    pub fn reducer(&self) -> SliceReducer<S> {
        self.reducer.clone()
    }

    /// Action creator for a case reducer, by case name
    pub fn action(&self, case: &str) -> Option<&ActionCreator> {
        self.actions.get(case)
    }

    pub fn actions(&self) -> impl Iterator<Item = (&str, &ActionCreator)> {
        self.actions
            .iter()
            .map(|(case, creator)| (case.as_str(), creator))
    }

    pub fn initial_state(&self) -> Arc<S> {
        self.reducer.inner.initial_state.clone()
    }
}

/// Builder for [`Slice`]
pub struct SliceBuilder<S> {
    name: String,
    initial_state: S,
    cases: Vec<(String, CaseReducer<S>)>,
    extra: ExtraReducersBuilder<S>,
    errors: Vec<String>,
}

impl<S: Send + Sync + 'static> SliceBuilder<S> {
    pub fn new(name: impl Into<String>, initial_state: S) -> Self {
        Self {
            name: name.into(),
            initial_state,
            cases: Vec::new(),
            extra: ExtraReducersBuilder::new(),
            errors: Vec::new(),
        }
    }

    /// Register a case reducer; its action type is `<slice name>/<case>`
    pub fn case<F>(mut self, case: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&S, &Action) -> S + Send + Sync + 'static,
    {
        let case = case.into();
        if case.is_empty() {
            self.errors.push("case reducer names must not be empty".to_string());
        } else if self.cases.iter().any(|(existing, _)| *existing == case) {
            self.errors
                .push(format!("case reducer '{}' is already registered", case));
        } else {
            self.cases.push((case, Arc::new(handler)));
        }
        self
    }

    /// Respond to actions defined elsewhere
    pub fn extra_reducers<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut ExtraReducersBuilder<S>),
    {
        build(&mut self.extra);
        self
    }

    pub fn build(self) -> Result<Slice<S>, StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::configuration("slice name must not be empty"));
        }
        if let Some(error) = self.errors.into_iter().next() {
            return Err(StoreError::configuration(format!(
                "slice '{}': {}",
                self.name, error
            )));
        }

        let mut actions = HashMap::new();
        let mut cases = HashMap::new();
        for (case, handler) in self.cases {
            let creator = ActionCreator::new(format!("{}/{}", self.name, case));
            cases.insert(creator.action_type().to_string(), handler);
            actions.insert(case, creator);
        }

        let extra = self.extra.finish()?;
        for (action_type, handler) in extra.cases {
            if cases.contains_key(&action_type) {
                return Err(StoreError::configuration(format!(
                    "slice '{}': action type '{}' has both a case reducer and an extra reducer",
                    self.name, action_type
                )));
            }
            cases.insert(action_type, handler);
        }

        log::debug!(
            "Slice '{}' built with {} case reducers and {} matchers",
            self.name,
            cases.len(),
            extra.matchers.len()
        );

        Ok(Slice {
            name: self.name,
            actions,
            reducer: SliceReducer {
                inner: Arc::new(SliceReducerInner {
                    initial_state: Arc::new(self.initial_state),
                    cases,
                    matchers: extra.matchers,
                    default_case: extra.default_case,
                }),
            },
        })
    }
}

/// Builder for reducers responding to arbitrary action types
pub struct ExtraReducersBuilder<S> {
    cases: Vec<(String, CaseReducer<S>)>,
    matchers: Vec<(Matcher, CaseReducer<S>)>,
    default_case: Option<CaseReducer<S>>,
    errors: Vec<String>,
}

struct ExtraReducers<S> {
    cases: Vec<(String, CaseReducer<S>)>,
    matchers: Vec<(Matcher, CaseReducer<S>)>,
    default_case: Option<CaseReducer<S>>,
}

impl<S: Send + Sync + 'static> ExtraReducersBuilder<S> {
    fn new() -> Self {
        Self {
            cases: Vec::new(),
            matchers: Vec::new(),
            default_case: None,
            errors: Vec::new(),
        }
    }

    /// Handle one exact action type
    pub fn add_case<F>(&mut self, action_type: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&S, &Action) -> S + Send + Sync + 'static,
    {
        let action_type = action_type.into();
        if !self.matchers.is_empty() {
            self.errors.push(format!(
                "add_case('{}') must be called before add_matcher",
                action_type
            ));
        } else if self.default_case.is_some() {
            self.errors.push(format!(
                "add_case('{}') must be called before add_default_case",
                action_type
            ));
        } else if self.cases.iter().any(|(existing, _)| *existing == action_type) {
            self.errors.push(format!(
                "add_case cannot be called with two reducers for '{}'",
                action_type
            ));
        } else {
            self.cases.push((action_type, Arc::new(handler)));
        }
        self
    }

    /// Handle every action accepted by `matcher`
    pub fn add_matcher<M, F>(&mut self, matcher: M, handler: F) -> &mut Self
    where
        M: Fn(&Action) -> bool + Send + Sync + 'static,
        F: Fn(&S, &Action) -> S + Send + Sync + 'static,
    {
        if self.default_case.is_some() {
            self.errors
                .push("add_matcher must be called before add_default_case".to_string());
        } else {
            self.matchers.push((Arc::new(matcher), Arc::new(handler)));
        }
        self
    }

    /// Handle actions nothing else matched
    pub fn add_default_case<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&S, &Action) -> S + Send + Sync + 'static,
    {
        if self.default_case.is_some() {
            self.errors
                .push("add_default_case can only be called once".to_string());
        } else {
            self.default_case = Some(Arc::new(handler));
        }
        self
    }

    fn finish(self) -> Result<ExtraReducers<S>, StoreError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(StoreError::configuration(error));
        }
        Ok(ExtraReducers {
            cases: self.cases,
            matchers: self.matchers,
            default_case: self.default_case,
        })
    }
}

/// Build a standalone reducer from cases, matchers and a default case
pub fn create_reducer<S, F>(initial_state: S, build: F) -> Result<SliceReducer<S>, StoreError>
where
    S: Send + Sync + 'static,
    F: FnOnce(&mut ExtraReducersBuilder<S>),
{
    let mut builder = ExtraReducersBuilder::new();
    build(&mut builder);
    let extra = builder.finish()?;

    Ok(SliceReducer {
        inner: Arc::new(SliceReducerInner {
            initial_state: Arc::new(initial_state),
            cases: extra.cases.into_iter().collect(),
            matchers: extra.matchers,
            default_case: extra.default_case,
        }),
    })
}

/// Reducer produced by a [`Slice`] or [`create_reducer`]
pub struct SliceReducer<S> {
    inner: Arc<SliceReducerInner<S>>,
}

struct SliceReducerInner<S> {
    initial_state: Arc<S>,
    cases: HashMap<String, CaseReducer<S>>,
    matchers: Vec<(Matcher, CaseReducer<S>)>,
    default_case: Option<CaseReducer<S>>,
}

impl<S> Clone for SliceReducer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Send + Sync + 'static> Reducer<S> for SliceReducer<S> {
    fn reduce(&self, state: Option<Arc<S>>, action: &Action) -> Arc<S> {
        let inner = &self.inner;
        let mut state = state.unwrap_or_else(|| inner.initial_state.clone());
        let mut matched = false;

        if let Some(case) = inner.cases.get(action.action_type()) {
            state = Arc::new(case(&state, action));
            matched = true;
        }

        for (matcher, handler) in &inner.matchers {
            if matcher(action) {
                state = Arc::new(handler(&state, action));
                matched = true;
            }
        }

        if !matched {
            if let Some(default_case) = &inner.default_case {
                state = Arc::new(default_case(&state, action));
            }
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::async_thunk::{create_async_thunk, ThunkApi};
    use crate::combine::CombinedReducer;
    use crate::store::Store;
    use crate::thunk::ThunkExt;
    use serde_json::json;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct CounterState {
        value: i64,
        status: &'static str,
    }

    fn counter_slice() -> Slice<CounterState> {
        Slice::builder("counter", CounterState::default())
            .case("increment", |state, _action| CounterState {
                value: state.value + 1,
                ..state.clone()
            })
            .case("incrementByAmount", |state, action| CounterState {
                value: state.value + action.payload_as::<i64>().unwrap_or(0),
                ..state.clone()
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_action_types_are_namespaced() {
        let slice = counter_slice();
        assert_eq!(slice.name(), "counter");
        assert_eq!(
            slice.action("increment").unwrap().action_type(),
            "counter/increment"
        );
        assert!(slice.action("decrement").is_none());
        assert_eq!(slice.actions().count(), 2);
    }

    #[test]
    fn test_counter_slice_in_store() {
        let slice = counter_slice();
        let store = Store::create(slice.reducer(), None);
        let increment = slice.action("increment").unwrap();
        let by_amount = slice.action("incrementByAmount").unwrap();

        store.dispatch(increment.create()).unwrap();
        assert_eq!(store.get_state().value, 1);

        store.dispatch(by_amount.with_payload(&5).unwrap()).unwrap();
        assert_eq!(store.get_state().value, 6);

        let before = store.get_state();
        store.dispatch(Action::new("unknown")).unwrap();
        assert!(Arc::ptr_eq(&before, &store.get_state()));
        assert_eq!(store.get_state().value, 6);
    }

    #[test]
    fn test_unprefixed_case_name_does_not_match() {
        let slice = counter_slice();
        let state = slice.initial_state();
        let next = slice.reducer().reduce(Some(state.clone()), &Action::new("increment"));
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[tokio::test]
    async fn test_extra_reducers_follow_async_thunk() {
        let fetch_count = create_async_thunk(
            "counter/fetchCount",
            |amount: i64, _api: ThunkApi<CounterState>| async move {
                Ok::<_, anyhow::Error>(amount)
            },
        );

        let pending_type = fetch_count.pending_type().to_string();
        let fulfilled_type = fetch_count.fulfilled_type().to_string();
        let slice = Slice::builder("counter", CounterState::default())
            .case("increment", |state, _action| CounterState {
                value: state.value + 1,
                ..state.clone()
            })
            .extra_reducers(|builder| {
                builder
                    .add_case(pending_type, |state, _action| CounterState {
                        status: "loading",
                        ..state.clone()
                    })
                    .add_case(fulfilled_type, |state, action| CounterState {
                        value: state.value + action.payload_as::<i64>().unwrap_or(0),
                        status: "idle",
                    });
            })
            .build()
            .unwrap();

        let store = Store::create(slice.reducer(), None);
        let statuses = Arc::new(std::sync::Mutex::new(Vec::new()));
        {
            let store_handle = store.clone();
            let statuses = statuses.clone();
            store.subscribe(move || statuses.lock().unwrap().push(store_handle.get_state().status));
        }

        store.dispatch_thunk(fetch_count.call(7)).await.unwrap();

        assert_eq!(store.get_state().value, 7);
        assert_eq!(*statuses.lock().unwrap(), vec!["loading", "idle"]);
    }

    #[test]
    fn test_matchers_and_default_case() {
        let reducer = create_reducer(Vec::<String>::new(), |builder| {
            builder
                .add_case("todos/add", |state, action| {
                    let mut next = state.clone();
                    next.push(action.payload_as::<String>().unwrap_or_default());
                    next
                })
                .add_matcher(
                    |action| action.action_type().ends_with("/rejected"),
                    |state, action| {
                        let mut next = state.clone();
                        next.push(format!("error: {}", action.action_type()));
                        next
                    },
                )
                .add_matcher(
                    |action| action.action_type().starts_with("todos/"),
                    |state, _action| {
                        let mut next = state.clone();
                        next.push("touched".to_string());
                        next
                    },
                )
                .add_default_case(|state, _action| {
                    let mut next = state.clone();
                    next.push("default".to_string());
                    next
                });
        })
        .unwrap();

        let state = reducer.reduce(None, &Action::new("todos/add").payload(json!("milk")));
        assert_eq!(*state, vec!["milk", "touched"]);

        let state = reducer.reduce(Some(state), &Action::new("todos/load/rejected"));
        assert_eq!(
            *state,
            vec!["milk", "touched", "error: todos/load/rejected", "touched"]
        );

        let state = reducer.reduce(Some(state), &Action::new("other"));
        assert_eq!(state.last().map(String::as_str), Some("default"));
    }

    #[test]
    fn test_builder_errors() {
        let err = Slice::builder("", 0u8).build().err().unwrap();
        assert!(matches!(err, StoreError::Configuration(_)));

        let err = Slice::builder("counter", 0u8)
            .case("increment", |state, _| state + 1)
            .case("increment", |state, _| state + 2)
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("already registered"));

        let err = Slice::builder("counter", 0u8)
            .case("increment", |state, _| state + 1)
            .extra_reducers(|builder| {
                builder.add_case("counter/increment", |state, _| *state);
            })
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("counter/increment"));

        let err = create_reducer(0u8, |builder| {
            builder
                .add_matcher(|_| true, |state, _| *state)
                .add_case("late", |state, _| *state);
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("before add_matcher"));

        let err = create_reducer(0u8, |builder| {
            builder
                .add_default_case(|state, _| *state)
                .add_default_case(|state, _| *state);
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("only be called once"));
    }

    #[test]
    fn test_slices_in_combined_reducer() {
        let counter = counter_slice();
        let todos = create_reducer(Vec::<String>::new(), |builder| {
            builder.add_case("todos/add", |state, action| {
                let mut next = state.clone();
                next.push(action.payload_as::<String>().unwrap_or_default());
                next
            });
        })
        .unwrap();

        let root = CombinedReducer::builder()
            .with("counter", counter.reducer())
            .with("todos", todos)
            .build()
            .unwrap();
        let store = Store::create(root, None);

        let before = store.get_state();
        store
            .dispatch(counter.action("increment").unwrap().create())
            .unwrap();
        let after = store.get_state();

        assert_eq!(after.get::<CounterState>("counter").unwrap().value, 1);
        assert!(after.same_slot(&before, "todos"));
    }
}
