//! Counter feature: state, slice and the simulated remote fetch

use redux_store::{create_async_thunk, AsyncThunk, Slice, StoreError, ThunkApi};
use std::time::Duration;

const FETCH_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterState {
    pub value: i64,
    pub status: Status,
    pub last_error: Option<String>,
}

pub type FetchCount = AsyncThunk<CounterState, i64, i64>;

/// Simulated remote call resolving to the requested amount
///
/// Negative amounts are rejected, and a second fetch is skipped while one is
/// still loading.
pub fn fetch_count() -> FetchCount {
    create_async_thunk(
        "counter/fetchCount",
        |amount: i64, api: ThunkApi<CounterState>| async move {
            log::debug!("Fetching {} (request {})", amount, api.request_id());
            if amount < 0 {
                anyhow::bail!("cannot fetch a negative amount ({})", amount);
            }
            tokio::time::sleep(FETCH_DELAY).await;
            Ok(amount)
        },
    )
    .with_condition(|_amount, state: &CounterState| state.status != Status::Loading)
}

pub fn counter_slice(fetch: &FetchCount) -> Result<Slice<CounterState>, StoreError> {
    let pending = fetch.pending_type().to_string();
    let fulfilled = fetch.fulfilled_type().to_string();
    let rejected = fetch.rejected_type().to_string();

    Slice::builder("counter", CounterState::default())
        .case("increment", |state, _action| CounterState {
            value: state.value + 1,
            ..state.clone()
        })
        .case("decrement", |state, _action| CounterState {
            value: state.value - 1,
            ..state.clone()
        })
        .case("incrementByAmount", |state, action| CounterState {
            value: state.value + action.payload_as::<i64>().unwrap_or(0),
            ..state.clone()
        })
        .extra_reducers(|builder| {
            builder
                .add_case(pending, |state, _action| CounterState {
                    status: Status::Loading,
                    ..state.clone()
                })
                .add_case(fulfilled, |state, action| CounterState {
                    value: state.value + action.payload_as::<i64>().unwrap_or(0),
                    status: Status::Idle,
                    last_error: None,
                })
                .add_case(rejected, |state, action| CounterState {
                    status: Status::Failed,
                    last_error: action.error_value().and_then(|e| e.message.clone()),
                    ..state.clone()
                });
        })
        .build()
}
