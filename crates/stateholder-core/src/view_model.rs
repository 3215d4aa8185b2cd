#![forbid(unsafe_code)]

//! View-model base.
//!
//! [`StateViewModel`] bundles a [`StateContainer`], an [`EventQueue`] and
//! the [`Scope`] every merge runs in. It is meant to be embedded in a
//! concrete view-model, which forwards `state()` / `events()` to the UI and
//! keeps the mutating methods to itself. Dropping the view-model (or calling
//! [`clear`](StateViewModel::clear)) cancels every merge it started.

use futures::Stream;

use crate::container::StateContainer;
use crate::error::StateError;
use crate::event::{EventHolder, EventQueue, Pending};
use crate::holder::{StateFlow, StateOwner};
use crate::provider::StateProvider;
use crate::scope::{MergeHandle, Scope};

pub struct StateViewModel<S, E> {
    container: StateContainer<S>,
    events: EventQueue<E>,
    scope: Scope,
}

impl<S: std::fmt::Debug, E: Clone + std::fmt::Debug> std::fmt::Debug for StateViewModel<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateViewModel")
            .field("container", &self.container)
            .field("events", &self.events)
            .field("scope", &self.scope)
            .finish()
    }
}

impl<S, E> StateViewModel<S, E>
where
    S: Clone + PartialEq + Send + 'static,
    E: Clone + PartialEq + Send + Sync + 'static,
{
    /// View-model on the current tokio runtime.
    pub fn new(initial: S) -> Result<Self, StateError> {
        Ok(Self::with_scope(initial, Scope::current()?))
    }

    /// View-model whose initial state comes from `provider`.
    pub fn from_provider(provider: &impl StateProvider<S>) -> Result<Self, StateError> {
        Ok(Self::with_container(
            StateContainer::from_provider(provider),
            Scope::current()?,
        ))
    }

    /// View-model running its merges in `scope`.
    #[must_use]
    pub fn with_scope(initial: S, scope: Scope) -> Self {
        Self::with_container(StateContainer::new(initial), scope)
    }

    #[must_use]
    pub fn with_container(container: StateContainer<S>, scope: Scope) -> Self {
        Self {
            container,
            events: EventQueue::new(),
            scope,
        }
    }

    /// The scope merges run in. Cancelled when the view-model is cleared.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn update_state(&self, transform: impl Fn(&S) -> S) -> bool {
        self.container.update(transform)
    }

    pub fn merge_state<T, St, F>(&self, source: St, combine: F) -> MergeHandle
    where
        T: Send + 'static,
        St: Stream<Item = T> + Send + 'static,
        F: Fn(&S, &T) -> S + Send + Sync + 'static,
    {
        self.container.merge(source, &self.scope, combine)
    }

    pub fn merge_state_from<T, O, F>(&self, owner: &O, combine: F) -> MergeHandle
    where
        T: Clone + PartialEq + Send + 'static,
        O: StateOwner<T> + ?Sized,
        F: Fn(&S, &T) -> S + Send + Sync + 'static,
    {
        self.container.merge_from(owner, &self.scope, combine)
    }

    /// Queue a one-shot event for the UI.
    pub fn emit(&self, event: E) {
        self.events.emit(event);
    }

    /// Cancel every merge. State and pending events stay readable.
    pub fn clear(&self) {
        self.scope.cancel();
        self.container.dispose();
    }
}

impl<S, E> StateOwner<S> for StateViewModel<S, E>
where
    S: Clone + PartialEq + Send + 'static,
    E: Clone + PartialEq + Send + Sync + 'static,
{
    fn state(&self) -> StateFlow<S> {
        self.container.state()
    }
}

impl<S, E> EventHolder<E> for StateViewModel<S, E>
where
    S: Clone + PartialEq + Send + 'static,
    E: Clone + PartialEq + Send + Sync + 'static,
{
    fn events(&self) -> StateFlow<Pending<E>> {
        self.events.events()
    }

    fn handle(&self, event: &E) {
        self.events.handle(event);
    }
}
