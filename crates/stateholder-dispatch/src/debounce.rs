#![forbid(unsafe_code)]

//! Per-action debouncing.
//!
//! [`DebounceDispatcher`] remembers when each distinct action (by `Eq` +
//! `Hash`) was last forwarded. A repeat arriving within the window is
//! dropped silently; one arriving strictly after it is forwarded and
//! restamped.
//!
//! # Invariants
//!
//! 1. Excluded actions always reach the handler and never touch the lookup.
//! 2. Entries older than the window are purged before every decision, so the
//!    lookup only ever holds actions forwarded within the last window.
//! 3. The lookup lock is never held while the handler runs; the handler may
//!    dispatch again.
//!
//! # Usage
//!
//! ```ignore
//! use stateholder_dispatch::{DebounceConfig, DebounceDispatcher, Dispatcher};
//!
//! let dispatcher = DebounceDispatcher::new(DebounceConfig::default(), |action| {
//!     model.on_action(action)
//! })
//! .with_exclude(|action| matches!(action, Action::TextChanged(_)));
//! dispatcher.dispatch(Action::Submit);
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;
use web_time::Instant;

use crate::config::{DebounceConfig, DispatchConfigError};
use crate::dispatcher::Dispatcher;

type ExcludeFn<A> = Box<dyn Fn(&A) -> bool + Send + Sync>;

/// Dispatcher that drops repeats of an action within a time window.
pub struct DebounceDispatcher<A, H> {
    window: Duration,
    handler: H,
    exclude: ExcludeFn<A>,
    lookup: Mutex<HashMap<A, Instant>>,
}

impl<A, H> std::fmt::Debug for DebounceDispatcher<A, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceDispatcher")
            .field("window", &self.window)
            .field("tracked", &self.lookup.lock().len())
            .finish_non_exhaustive()
    }
}

/// Debounce dispatcher with the given window and no exclusions.
pub fn debounced<A, H>(window: Duration, handler: H) -> DebounceDispatcher<A, H>
where
    A: Eq + Hash + Clone,
    H: Fn(A),
{
    DebounceDispatcher::new(DebounceConfig::with_window(window), handler)
}

impl<A, H> DebounceDispatcher<A, H>
where
    A: Eq + Hash + Clone,
    H: Fn(A),
{
    /// Build without checking `config`. A zero window lets every repeat
    /// through; use [`try_new`](Self::try_new) for untrusted configs.
    pub fn new(config: DebounceConfig, handler: H) -> Self {
        Self {
            window: config.window,
            handler,
            exclude: Box::new(|_: &A| false),
            lookup: Mutex::new(HashMap::new()),
        }
    }

    /// Like [`new`](Self::new), but rejects a config that fails
    /// [`DebounceConfig::validate`].
    pub fn try_new(config: DebounceConfig, handler: H) -> Result<Self, DispatchConfigError> {
        config.validate()?;
        Ok(Self::new(config, handler))
    }

    /// Actions matching `exclude` bypass debouncing entirely.
    #[must_use]
    pub fn with_exclude(mut self, exclude: impl Fn(&A) -> bool + Send + Sync + 'static) -> Self {
        self.exclude = Box::new(exclude);
        self
    }

    /// Exclude a fixed set of actions.
    #[must_use]
    pub fn with_excluded(self, actions: impl IntoIterator<Item = A>) -> Self
    where
        A: Send + Sync + 'static,
    {
        let excluded: Vec<A> = actions.into_iter().collect();
        self.with_exclude(move |action| excluded.contains(action))
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of actions currently inside their debounce window.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.lookup.lock().len()
    }

    /// Dispatch as if the current time were `now`. Returns `true` if the
    /// action reached the handler.
    pub fn dispatch_at(&self, action: A, now: Instant) -> bool {
        if (self.exclude)(&action) {
            (self.handler)(action);
            return true;
        }

        let forward = {
            let mut lookup = self.lookup.lock();
            let window = self.window;
            lookup.retain(|_, at| now.saturating_duration_since(*at) <= window);
            // Anything still present was forwarded within the window.
            if lookup.contains_key(&action) {
                false
            } else {
                lookup.insert(action.clone(), now);
                true
            }
        };

        if forward {
            (self.handler)(action);
        } else {
            debug!(window_ms = self.window.as_millis() as u64, "action debounced");
        }
        forward
    }
}

impl<A, H> Dispatcher<A> for DebounceDispatcher<A, H>
where
    A: Eq + Hash + Clone,
    H: Fn(A),
{
    fn dispatch(&self, action: A) {
        self.dispatch_at(action, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn first_action_is_immediate() {
        let count = Cell::new(0);
        let dispatcher = debounced(ms(100), |_: &str| count.set(count.get() + 1));
        dispatcher.dispatch("test");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn repeats_are_debounced() {
        let count = Cell::new(0);
        let dispatcher = debounced(ms(100), |_: &str| count.set(count.get() + 1));
        let t0 = Instant::now();
        assert!(dispatcher.dispatch_at("test", t0));
        assert!(!dispatcher.dispatch_at("test", t0 + ms(10)));
        assert!(!dispatcher.dispatch_at("test", t0 + ms(100)));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn distinct_actions_are_independent() {
        let count = Cell::new(0);
        let dispatcher = debounced(ms(100), |_: &str| count.set(count.get() + 1));
        let t0 = Instant::now();
        dispatcher.dispatch_at("test1", t0);
        dispatcher.dispatch_at("test2", t0);
        dispatcher.dispatch_at("test3", t0);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn excluded_actions_always_pass() {
        let count = Cell::new(0);
        let dispatcher = debounced(ms(100), |_: &str| count.set(count.get() + 1))
            .with_excluded(["excluded"]);
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(dispatcher.dispatch_at("excluded", t0));
        }
        assert_eq!(count.get(), 3);
        assert_eq!(dispatcher.tracked(), 0);
    }

    #[test]
    fn dispatches_again_after_window() {
        let last = RefCell::new(None);
        let dispatcher = debounced(ms(50), |a: &'static str| *last.borrow_mut() = Some(a));
        let t0 = Instant::now();
        dispatcher.dispatch_at("first", t0);
        assert_eq!(*last.borrow(), Some("first"));

        dispatcher.dispatch_at("second", t0 + ms(100));
        assert_eq!(*last.borrow(), Some("second"));

        assert!(dispatcher.dispatch_at("first", t0 + ms(100)));
    }

    #[test]
    fn recent_entries_survive_purge() {
        let count = Cell::new(0);
        let dispatcher = debounced(ms(100), |_: &str| count.set(count.get() + 1));
        let t0 = Instant::now();
        dispatcher.dispatch_at("test1", t0);
        assert_eq!(count.get(), 1);

        dispatcher.dispatch_at("test1", t0 + ms(50));
        assert_eq!(count.get(), 1);

        dispatcher.dispatch_at("test2", t0 + ms(50));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn stale_entries_are_purged() {
        let dispatcher = debounced(ms(100), |_: u32| {});
        let t0 = Instant::now();
        for n in 0..10 {
            dispatcher.dispatch_at(n, t0);
        }
        assert_eq!(dispatcher.tracked(), 10);
        dispatcher.dispatch_at(99, t0 + ms(101));
        assert_eq!(dispatcher.tracked(), 1);
    }

    #[test]
    fn default_config_window() {
        let dispatcher = DebounceDispatcher::new(DebounceConfig::default(), |_: u8| {});
        assert_eq!(dispatcher.window(), ms(100));
    }

    #[test]
    fn zero_window_is_rejected() {
        let result = DebounceDispatcher::try_new(DebounceConfig::with_millis(0), |_: u8| {});
        assert!(result.is_err());
        let dispatcher =
            DebounceDispatcher::try_new(DebounceConfig::with_millis(30), |_: u8| {}).unwrap();
        assert_eq!(dispatcher.window(), ms(30));
    }

    #[test]
    fn handler_may_dispatch_reentrantly() {
        let log = RefCell::new(Vec::new());
        let inner = debounced(ms(100), |n: u8| log.borrow_mut().push(n));
        let outer = debounced(ms(100), |n: u8| {
            inner.dispatch(n);
            inner.dispatch(n);
        });
        outer.dispatch(1);
        assert_eq!(*log.borrow(), vec![1]);
    }
}
