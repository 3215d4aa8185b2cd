#![forbid(unsafe_code)]

//! One-shot event queues.
//!
//! Continuous state belongs in a [`StateContainer`]; discrete signals such
//! as "show a toast" belong here. Producers [`emit`](EventQueue::emit)
//! events, the consumer observes the pending sequence and acknowledges each
//! event with [`handle`](EventHolder::handle) once it has acted on it. An
//! event stays pending (and is re-observed) until it is handled.
//!
//! The pending sequence is shared as an immutable [`Pending`] slice, so each
//! snapshot handed to observers is cheap to clone and never changes
//! underneath them.

use std::sync::Arc;

use crate::container::StateContainer;
use crate::holder::StateFlow;

/// Snapshot of pending events, oldest first.
pub type Pending<E> = Arc<[E]>;

/// Read side of an event queue.
pub trait EventHolder<E: Clone + PartialEq + Send + Sync + 'static> {
    /// Observable snapshot of the pending events, oldest first.
    fn events(&self) -> StateFlow<Pending<E>>;

    /// Acknowledge `event`, removing one pending occurrence of it.
    fn handle(&self, event: &E);
}

/// Ordered queue of pending one-shot events.
pub struct EventQueue<E> {
    pending: StateContainer<Pending<E>>,
}

impl<E: Clone + std::fmt::Debug> std::fmt::Debug for EventQueue<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("pending", &self.pending)
            .finish()
    }
}

impl<E: Clone + PartialEq + Send + Sync + 'static> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + PartialEq + Send + Sync + 'static> EventQueue<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: StateContainer::new(Pending::from([])),
        }
    }

    /// Append `event` to the end of the pending sequence.
    pub fn emit(&self, event: E) {
        self.pending.update(|events| {
            events.iter().cloned().chain([event.clone()]).collect()
        });
    }

    /// Current pending events, oldest first.
    #[must_use]
    pub fn pending(&self) -> Pending<E> {
        self.pending.value()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.state().with(|events| events.is_empty())
    }
}

impl<E: Clone + PartialEq + Send + Sync + 'static> EventHolder<E> for EventQueue<E> {
    fn events(&self) -> StateFlow<Pending<E>> {
        self.pending.state()
    }

    /// Removes the earliest pending occurrence of `event`. Handling an event
    /// that is not pending is a no-op.
    fn handle(&self, event: &E) {
        self.pending.update(|events| match events.iter().position(|e| e == event) {
            Some(index) => events
                .iter()
                .take(index)
                .chain(events.iter().skip(index + 1))
                .cloned()
                .collect(),
            None => Arc::clone(events),
        });
    }
}
