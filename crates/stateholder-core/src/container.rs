#![forbid(unsafe_code)]

//! State containers and the merge engine.
//!
//! A [`StateContainer`] owns one [`ObservableCell`] and is the only writer of
//! it. State changes arrive two ways:
//!
//! - [`update`](StateContainer::update): a pure function of the current
//!   state, applied with an optimistic compare-and-retry loop so two racing
//!   updates can never silently overwrite each other.
//! - [`merge`](StateContainer::merge) and friends: a spawned task that
//!   collects an asynchronous source and folds every item into the state
//!   through a combine function, using the same `update` path.
//!
//! # Invariants
//!
//! 1. Every accepted update is computed from the value current at the moment
//!    it is committed.
//! 2. An update whose result equals the current state emits nothing.
//! 3. Merges are independent: cancelling or failing one leaves the container
//!    and every other merge untouched.
//! 4. Dropping (or [`dispose`](StateContainer::dispose)-ing) the container
//!    cancels every merge it started.

use std::convert::Infallible;

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cell::ObservableCell;
use crate::error::MergeError;
use crate::holder::{StateFlow, StateHolder, StateOwner};
use crate::provider::StateProvider;
use crate::scope::{MergeExit, MergeHandle, Scope};

/// Holds the current state and folds updates into it.
pub struct StateContainer<S> {
    cell: ObservableCell<S>,
    /// Cancellation tokens of the merges started through this container.
    merges: Mutex<Vec<CancellationToken>>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for StateContainer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateContainer")
            .field("cell", &self.cell)
            .field("merges", &self.merges.lock().len())
            .finish()
    }
}

/// Container seeded with `initial`.
#[must_use]
pub fn state_container<S>(initial: S) -> StateContainer<S>
where
    S: Clone + PartialEq + Send + 'static,
{
    StateContainer::new(initial)
}

/// Container seeded by `provider`, consulted once.
#[must_use]
pub fn state_container_from<S>(provider: &impl StateProvider<S>) -> StateContainer<S>
where
    S: Clone + PartialEq + Send + 'static,
{
    StateContainer::from_provider(provider)
}

impl<S: Clone + PartialEq + Send + 'static> StateContainer<S> {
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            cell: ObservableCell::new(initial),
            merges: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn from_provider(provider: &impl StateProvider<S>) -> Self {
        Self::new(provider.provide())
    }

    /// Read-only view of the state.
    #[must_use]
    pub fn state(&self) -> StateFlow<S> {
        StateFlow::new(self.cell.clone())
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn value(&self) -> S {
        self.cell.get()
    }

    /// Read-only facade hiding `update` and `merge`.
    #[must_use]
    pub fn as_state_owner(&self) -> StateHolder<S> {
        self.as_state_holder()
    }

    /// Apply `transform` to the current state. Returns `true` if the state
    /// changed.
    ///
    /// `transform` may be evaluated more than once when other writers race
    /// with this one, so it must be pure. A panic in `transform` unwinds to
    /// the caller and leaves the state untouched.
    pub fn update(&self, transform: impl Fn(&S) -> S) -> bool {
        match self
            .cell
            .compare_and_update(|state| Ok::<_, Infallible>(transform(state)))
        {
            Ok(changed) => changed,
            Err(never) => match never {},
        }
    }

    /// Fallible [`update`](Self::update). An error aborts the update and is
    /// returned unchanged; the state is not touched.
    pub fn try_update<E>(&self, transform: impl Fn(&S) -> Result<S, E>) -> Result<bool, E> {
        self.cell.compare_and_update(transform)
    }

    /// Collect `source` inside `scope`, folding every item into the state
    /// with `combine`.
    ///
    /// The returned handle stops the collection when cancelled; so does
    /// cancelling `scope` or disposing this container.
    pub fn merge<T, St, F>(&self, source: St, scope: &Scope, combine: F) -> MergeHandle
    where
        T: Send + 'static,
        St: Stream<Item = T> + Send + 'static,
        F: Fn(&S, &T) -> S + Send + Sync + 'static,
    {
        self.spawn_merge("stream", source, scope, move |state: &S, item: &T| {
            Ok::<_, Infallible>(combine(state, item))
        })
    }

    /// Like [`merge`](Self::merge), but `combine` may fail. The first error
    /// ends this merge only and is reported through
    /// [`MergeHandle::join`] as [`MergeError::Combine`]; it is not retried.
    pub fn try_merge<T, St, F, E>(&self, source: St, scope: &Scope, combine: F) -> MergeHandle
    where
        T: Send + 'static,
        St: Stream<Item = T> + Send + 'static,
        F: Fn(&S, &T) -> Result<S, E> + Send + Sync + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.spawn_merge("try_stream", source, scope, combine)
    }

    /// Follow the state of another container, holder or flow.
    pub fn merge_from<T, O, F>(&self, owner: &O, scope: &Scope, combine: F) -> MergeHandle
    where
        T: Clone + PartialEq + Send + 'static,
        O: StateOwner<T> + ?Sized,
        F: Fn(&S, &T) -> S + Send + Sync + 'static,
    {
        let source = owner.state().stream();
        self.spawn_merge("state", source, scope, move |state: &S, item: &T| {
            Ok::<_, Infallible>(combine(state, item))
        })
    }

    /// Cancel every merge started through this container. The state keeps
    /// its current value and `update` keeps working.
    pub fn dispose(&self) {
        let merges = std::mem::take(&mut *self.merges.lock());
        if !merges.is_empty() {
            debug!(count = merges.len(), "disposing container merges");
        }
        for token in merges {
            token.cancel();
        }
    }

    /// Number of merges that are still running.
    #[must_use]
    pub fn active_merges(&self) -> usize {
        let mut merges = self.merges.lock();
        merges.retain(|token| !token.is_cancelled());
        merges.len()
    }

    fn spawn_merge<T, St, F, E>(
        &self,
        label: &'static str,
        source: St,
        scope: &Scope,
        combine: F,
    ) -> MergeHandle
    where
        T: Send + 'static,
        St: Stream<Item = T> + Send + 'static,
        F: Fn(&S, &T) -> Result<S, E> + Send + Sync + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let cell = self.cell.clone();
        let handle = scope.spawn(label, move |token| {
            collect_into(cell, source, combine, token)
        });
        let mut merges = self.merges.lock();
        merges.retain(|token| !token.is_cancelled());
        merges.push(handle.token().clone());
        handle
    }
}

impl<S: Clone + PartialEq + Send + 'static> StateOwner<S> for StateContainer<S> {
    fn state(&self) -> StateFlow<S> {
        StateContainer::state(self)
    }
}

impl<S> Drop for StateContainer<S> {
    fn drop(&mut self) {
        for token in self.merges.get_mut().drain(..) {
            token.cancel();
        }
    }
}

/// The body of every merge task.
async fn collect_into<S, T, St, F, E>(
    cell: ObservableCell<S>,
    source: St,
    combine: F,
    token: CancellationToken,
) -> Result<MergeExit, MergeError>
where
    S: Clone + PartialEq + Send + 'static,
    St: Stream<Item = T>,
    F: Fn(&S, &T) -> Result<S, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut source = std::pin::pin!(source);
    loop {
        let item = tokio::select! {
            biased;
            () = token.cancelled() => return Ok(MergeExit::Cancelled),
            item = source.next() => item,
        };
        let Some(item) = item else {
            return Ok(MergeExit::Completed);
        };
        if token.is_cancelled() {
            return Ok(MergeExit::Cancelled);
        }
        cell.compare_and_update(|state| combine(state, &item))
            .map_err(|err| MergeError::Combine(Box::new(err)))?;
    }
}

/// Builds a state type that needs a [`Scope`] to wire up its merges.
///
/// View-models implement this for their containers so the scope they hand
/// out is the one cancelled when the view-model goes away.
pub trait StateContainerFactory {
    type Output;

    fn create(&self, scope: &Scope) -> Self::Output;
}

/// Merge a stream into a container from the stream's side.
pub trait StreamMergeExt: Stream + Sized {
    /// Same as `container.merge(self, scope, combine)`.
    fn merge_into<S, F>(self, container: &StateContainer<S>, scope: &Scope, combine: F) -> MergeHandle
    where
        Self: Send + 'static,
        Self::Item: Send + 'static,
        S: Clone + PartialEq + Send + 'static,
        F: Fn(&S, &Self::Item) -> S + Send + Sync + 'static,
    {
        container.merge(self, scope, combine)
    }
}

impl<St: Stream + Sized> StreamMergeExt for St {}
