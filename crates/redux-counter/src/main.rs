use redux_store::{Action, Store, StoreConfig, ThunkExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod counter;
mod logger;

use counter::{counter_slice, fetch_count};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_file = logger::init()?;
    log::info!("Starting redux-counter");

    let config = StoreConfig::load();
    let fetch = fetch_count();
    let slice = counter_slice(&fetch)?;
    let store = Store::builder()
        .reducer(slice.reducer())
        .config(config)
        .build()?;

    let notifications = Arc::new(AtomicUsize::new(0));
    let subscription = {
        let notifications = notifications.clone();
        store.subscribe(move || {
            notifications.fetch_add(1, Ordering::SeqCst);
        })
    };

    for case in ["increment", "increment", "decrement"] {
        if let Some(creator) = slice.action(case) {
            store.dispatch(creator.create())?;
        }
    }
    if let Some(creator) = slice.action("incrementByAmount") {
        store.dispatch(creator.with_payload(&5)?)?;
    }
    println!("count after local updates: {}", store.get_state().value);

    match store.dispatch_thunk(fetch.call(10)).await {
        Ok(amount) => println!("fetched {}, count is now {}", amount, store.get_state().value),
        Err(e) => println!("fetch failed: {}", e),
    }

    match store.dispatch_thunk(fetch.call(-3)).await {
        Ok(amount) => println!("fetched {}", amount),
        Err(e) => println!("fetch failed: {}", e),
    }

    subscription.unsubscribe();
    store.dispatch(Action::new("counter/increment"))?;

    let state = store.get_state();
    println!(
        "final count: {} ({:?}), {} notifications",
        state.value,
        state.status,
        notifications.load(Ordering::SeqCst)
    );

    log::info!("Exiting redux-counter, log written to {}", log_file.display());
    Ok(())
}
