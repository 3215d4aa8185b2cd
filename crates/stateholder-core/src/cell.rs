#![forbid(unsafe_code)]

//! Observable cell with ordered change notification and version tracking.
//!
//! # Design
//!
//! [`ObservableCell<T>`] wraps a value of type `T` in shared, thread-safe
//! storage (`Arc<Mutex<..>>`). When the value changes (determined by
//! `PartialEq`), every live subscriber is notified in registration order.
//! A new subscriber first receives the current value, then every later
//! change.
//!
//! All notifications go through one FIFO delivery queue, drained by one
//! thread at a time under a delivery gate. A caller that finds another
//! thread delivering waits for it to finish, then drains whatever is left,
//! so `set` and `subscribe` return only after their own notification has
//! been delivered. Because there is exactly one drainer at a time, every
//! subscriber observes the same total order of transitions.
//!
//! # Performance
//!
//! | Operation     | Complexity                 |
//! |---------------|----------------------------|
//! | `get()`       | O(1) + clone               |
//! | `set()`       | O(S) where S = subscribers |
//! | `subscribe()` | O(1) amortized             |
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: calling `set()` or `subscribe()` from inside a
//!   subscriber callback is allowed. The nested item is queued and delivered
//!   after the current one, so the nested call returns before its own change
//!   has been fanned out.
//! - **Panicking subscriber**: the remaining subscribers still receive the
//!   change and everything queued behind it. The first panic is then resumed
//!   in the caller that was delivering.
//! - **Blocking subscriber**: a slow callback holds the delivery gate, so
//!   writers on other threads wait for it. A callback that waits on another
//!   thread's write to this cell deadlocks.
//! - **Subscriber leak**: callbacks live as long as their [`Subscription`].
//!   Dead weak references are pruned lazily during delivery.

use std::any::Any;
use std::cell::Cell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::{Mutex, MutexGuard, ReentrantMutex};
use tokio::sync::mpsc;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type CallbackWeak<T> = Weak<dyn Fn(&T) + Send + Sync>;

/// A registered subscriber.
struct Slot<T> {
    id: u64,
    /// Version current when the subscriber registered. Only changes with a
    /// strictly greater version are delivered to it.
    since: u64,
    callback: CallbackWeak<T>,
}

/// One queued notification.
enum Delivery<T> {
    /// A value transition, fanned out to every eligible subscriber.
    Change { version: u64, value: T },
    /// The first value handed to a freshly registered subscriber.
    Initial { id: u64, value: T },
}

struct CellInner<T> {
    value: T,
    version: u64,
    next_id: u64,
    subscribers: Vec<Slot<T>>,
    queue: VecDeque<Delivery<T>>,
}

struct Shared<T> {
    state: Mutex<CellInner<T>>,
    /// Held by the delivering thread. The flag is set while that thread is
    /// inside the drain loop, so calls from its own callbacks only enqueue.
    delivery: ReentrantMutex<Cell<bool>>,
}

/// A shared, version-tracked value with ordered change notification.
///
/// Cloning an `ObservableCell` creates a new handle to the **same** inner
/// state: both handles see the same value and share subscribers.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Subscribers are notified in registration order.
/// 4. Every subscriber sees the current value first, then every later
///    transition in the same global order as every other subscriber.
/// 5. Outside of re-entrant calls, `set` and `subscribe` return only after
///    their notification has reached every subscriber.
pub struct ObservableCell<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ObservableCell<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.state.lock();
        f.debug_struct("ObservableCell")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + Send + 'static> ObservableCell<T> {
    /// Create a new cell with the given initial value.
    ///
    /// The initial version is 0 and no subscribers are registered.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CellInner {
                    value,
                    version: 0,
                    next_id: 0,
                    subscribers: Vec::new(),
                    queue: VecDeque::new(),
                }),
                delivery: ReentrantMutex::new(Cell::new(false)),
            }),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.shared.state.lock().value.clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// The cell is locked while `f` runs; `f` must not touch this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.shared.state.lock().value)
    }

    /// Set a new value. Returns `true` if the value changed.
    ///
    /// An equal value is a no-op: the stored value is kept, the version does
    /// not move and nobody is notified.
    pub fn set(&self, value: T) -> bool {
        let inner = self.shared.state.lock();
        self.commit(inner, value)
    }

    /// Replace the value with `f(current)`, retrying if another writer got in
    /// between reading the snapshot and committing the result.
    ///
    /// `f` may therefore run more than once and must be free of side effects.
    /// An `Err` from `f` aborts without touching the cell.
    pub fn compare_and_update<E>(&self, f: impl Fn(&T) -> Result<T, E>) -> Result<bool, E> {
        loop {
            let (snapshot, seen) = {
                let inner = self.shared.state.lock();
                (inner.value.clone(), inner.version)
            };
            let next = f(&snapshot)?;
            let inner = self.shared.state.lock();
            if inner.version != seen {
                continue;
            }
            return Ok(self.commit(inner, next));
        }
    }

    /// Subscribe to value changes. The callback first receives the current
    /// value, then every later distinct value.
    ///
    /// Returns a [`Subscription`] guard. Dropping the guard unsubscribes the
    /// callback; a delivery already in progress is allowed to finish.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let strong: Callback<T> = Arc::new(callback);
        {
            let mut inner = self.shared.state.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            let since = inner.version;
            inner.subscribers.push(Slot {
                id,
                since,
                callback: Arc::downgrade(&strong),
            });
            let value = inner.value.clone();
            inner.queue.push_back(Delivery::Initial { id, value });
            #[cfg(feature = "tracing")]
            tracing::trace!(subscriber = id, version = since, "cell subscriber added");
        }
        self.deliver();
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Subscribe through an async stream. The first item is the current
    /// value; every later distinct value follows without gaps.
    #[must_use]
    pub fn stream(&self) -> StateStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |value: &T| {
            // The receiver going away only means the stream was dropped.
            let _ = tx.send(value.clone());
        });
        StateStream {
            rx,
            _subscription: subscription,
        }
    }

    /// Current version number. Increments by 1 on each value-changing
    /// mutation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.state.lock().version
    }

    /// Number of registered subscribers (including dead ones not yet pruned).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().subscribers.len()
    }

    /// `true` if both handles point at the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn commit(&self, mut inner: MutexGuard<'_, CellInner<T>>, value: T) -> bool {
        if inner.value == value {
            return false;
        }
        inner.version += 1;
        let version = inner.version;
        inner.value = value.clone();
        inner.queue.push_back(Delivery::Change { version, value });
        #[cfg(feature = "tracing")]
        tracing::trace!(version, "cell value changed");
        drop(inner);
        self.deliver();
        true
    }

    /// Drain the queue, waiting first for any other thread that is
    /// delivering. A call from inside a callback on the delivering thread
    /// returns at once; the running loop picks up what it queued.
    fn deliver(&self) {
        let gate = self.shared.delivery.lock();
        if gate.replace(true) {
            return;
        }
        let reset = DrainFlag(&*gate);
        let mut first_panic: Option<Box<dyn Any + Send>> = None;
        while let Some((targets, value)) = self.next_delivery() {
            for callback in &targets {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(&value))) {
                    first_panic.get_or_insert(payload);
                }
            }
        }
        drop(reset);
        drop(gate);
        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
    }

    /// Pop queued items until one has live targets.
    fn next_delivery(&self) -> Option<(Vec<Callback<T>>, T)> {
        let mut inner = self.shared.state.lock();
        loop {
            let targets: Vec<Callback<T>>;
            let value = match inner.queue.pop_front()? {
                Delivery::Change { version, value } => {
                    inner.subscribers.retain(|slot| slot.callback.strong_count() > 0);
                    targets = inner
                        .subscribers
                        .iter()
                        .filter(|slot| slot.since < version)
                        .filter_map(|slot| slot.callback.upgrade())
                        .collect();
                    value
                }
                Delivery::Initial { id, value } => {
                    targets = inner
                        .subscribers
                        .iter()
                        .find(|slot| slot.id == id)
                        .and_then(|slot| slot.callback.upgrade())
                        .into_iter()
                        .collect();
                    value
                }
            };
            if !targets.is_empty() {
                return Some((targets, value));
            }
        }
    }
}

/// Clears the draining flag when the drain loop exits, including by unwind.
struct DrainFlag<'a>(&'a Cell<bool>);

impl Drop for DrainFlag<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping the `Subscription` drops the strong reference to the callback,
/// so the weak entry in the cell's subscriber list fails to upgrade on the
/// next delivery.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    /// Type-erased strong reference keeping the callback alive.
    _guard: Box<dyn Any + Send + Sync>,
}

impl Subscription {
    /// Stop receiving notifications. Equivalent to dropping the guard.
    pub fn cancel(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Async view of a cell subscription.
///
/// Yields the current value first, then every later distinct value in
/// order. Never terminates on its own; drop it to unsubscribe.
pub struct StateStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
    _subscription: Subscription,
}

impl<T> std::fmt::Debug for StateStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStream").finish_non_exhaustive()
    }
}

impl<T> Unpin for StateStream<T> {}

impl<T> Stream for StateStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
