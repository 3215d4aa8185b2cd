#![forbid(unsafe_code)]

//! Counter view-model driven by the demo.
//!
//! [`CounterModel`] wraps a [`StateViewModel`]: taps arrive as [`Action`]s,
//! a ticker stream is merged into the state, and every `milestone` counts
//! a [`CounterEvent::Milestone`] is queued for the UI.

use std::time::Duration;

use futures::Stream;
use stateholder::prelude::*;
use stateholder::{Pending, StateError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterState {
    pub count: i64,
    /// Last ticker item merged in.
    pub ticks: u64,
    /// Taps that made it past the debouncer.
    pub taps: u64,
}

/// UI actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Increment,
    Decrement,
    Reset,
}

/// One-shot notifications for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterEvent {
    Milestone(i64),
    Reset,
}

pub struct CounterModel {
    inner: StateViewModel<CounterState, CounterEvent>,
    milestone: i64,
}

impl std::fmt::Debug for CounterModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterModel")
            .field("inner", &self.inner)
            .field("milestone", &self.milestone)
            .finish()
    }
}

impl CounterModel {
    /// Model on the current tokio runtime. `milestone == 0` disables
    /// milestone events.
    pub fn new(milestone: i64) -> Result<Self, StateError> {
        Ok(Self::with_scope(Scope::current()?, milestone))
    }

    #[must_use]
    pub fn with_scope(scope: Scope, milestone: i64) -> Self {
        Self {
            inner: StateViewModel::with_scope(CounterState::default(), scope),
            milestone,
        }
    }

    pub fn on_action(&self, action: Action) {
        match action {
            Action::Increment => self.step(1),
            Action::Decrement => self.step(-1),
            Action::Reset => {
                self.inner.update_state(|s| CounterState {
                    count: 0,
                    ..s.clone()
                });
                self.inner.emit(CounterEvent::Reset);
            }
        }
    }

    fn step(&self, delta: i64) {
        self.inner.update_state(|s| CounterState {
            count: s.count + delta,
            taps: s.taps + 1,
            ..s.clone()
        });
        let count = self.inner.state().with(|s| s.count);
        if delta > 0 && self.milestone > 0 && count != 0 && count % self.milestone == 0 {
            self.inner.emit(CounterEvent::Milestone(count));
        }
    }

    /// Merge a ticker into `ticks` for as long as the model lives.
    pub fn track_ticks<St>(&self, ticks: St) -> MergeHandle
    where
        St: Stream<Item = u64> + Send + 'static,
    {
        self.inner
            .merge_state(ticks, |s, tick| CounterState { ticks: *tick, ..s.clone() })
    }

    /// Cancel every merge the model started.
    pub fn clear(&self) {
        self.inner.clear();
    }
}

impl StateOwner<CounterState> for CounterModel {
    fn state(&self) -> StateFlow<CounterState> {
        self.inner.state()
    }
}

impl EventHolder<CounterEvent> for CounterModel {
    fn events(&self) -> StateFlow<Pending<CounterEvent>> {
        self.inner.events()
    }

    fn handle(&self, event: &CounterEvent) {
        self.inner.handle(event);
    }
}

/// `1..=count`, one item every `every`.
pub fn ticker(count: u64, every: Duration) -> impl Stream<Item = u64> + Send + 'static {
    futures::stream::unfold(1u64, move |n| async move {
        if n > count {
            return None;
        }
        tokio::time::sleep(every).await;
        Some((n, n + 1))
    })
}
