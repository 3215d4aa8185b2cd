#![forbid(unsafe_code)]

//! StateHolder counter demo binary entry point.
//!
//! Plays a scripted UI against a [`CounterModel`]: double-taps go through a
//! debounced dispatcher, a ticker is merged into the state, and state and
//! events are observed the way a screen would observe them.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use stateholder::prelude::*;
use stateholder::{DebounceConfig, DebounceDispatcher, collect_state_with};
use stateholder_demo::app::{Action, CounterEvent, CounterModel, CounterState, ticker};
use stateholder_demo::cli;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

type DemoResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let opts = cli::Opts::parse();
    init_tracing();

    match run(opts).await {
        Ok(state) => {
            info!(
                count = state.count,
                ticks = state.ticks,
                taps = state.taps,
                "final state"
            );
        }
        Err(err) => {
            error!(%err, "demo failed");
            std::process::exit(1);
        }
    }
}

async fn run(opts: cli::Opts) -> DemoResult<CounterState> {
    let config = DebounceConfig::with_millis(opts.debounce_ms);
    let model = Arc::new(CounterModel::new(opts.milestone)?);
    let target = Arc::clone(&model);
    let dispatcher =
        DebounceDispatcher::try_new(config, move |action: Action| target.on_action(action))?;
    let ui = Scope::current()?;

    if !opts.quiet {
        let _state_log = collect_state(&*model, &ui, |state: CounterState| {
            info!(
                count = state.count,
                ticks = state.ticks,
                taps = state.taps,
                "state"
            );
        });
        let _count_log = collect_state_with(
            &*model,
            &ui,
            |state: &CounterState| state.count,
            |count| debug!(count, "count changed"),
        );
    }
    let events = handle_events(
        Arc::clone(&model),
        &ui,
        |_: &CounterEvent| true,
        |event: CounterEvent| async move {
            match event {
                CounterEvent::Milestone(count) => info!(count, "milestone reached"),
                CounterEvent::Reset => info!("counter reset"),
            }
        },
    );

    let ticks = model.track_ticks(ticker(opts.ticks, Duration::from_millis(opts.tick_ms)));

    let tap_gap = config.window * 2;
    for _ in 0..opts.clicks {
        // The second tap of each pair lands inside the window and is dropped.
        dispatcher.dispatch(Action::Increment);
        dispatcher.dispatch(Action::Increment);
        tokio::time::sleep(tap_gap).await;
    }
    let undo = dispatcher.relay(Action::Decrement);
    undo();

    let exit = ticks.join().await?;
    info!(?exit, "ticker finished");

    while !model.events().value().is_empty() && events.is_active() {
        tokio::task::yield_now().await;
    }

    let state = model.state().value();
    model.clear();
    ui.cancel();
    Ok(state)
}
