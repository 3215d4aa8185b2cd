#![forbid(unsafe_code)]

//! Read-only views over a container's state.
//!
//! [`StateFlow`] is the observable half of an [`ObservableCell`]: it can be
//! read, subscribed to and streamed, but never written. [`StateOwner`] is the
//! capability "has observable state"; [`StateHolder`] is the smallest type
//! that implements it, used to hand a container's state to code that must
//! not call `update` or `merge`.

use crate::cell::{ObservableCell, StateStream, Subscription};

/// Read-only handle to a cell.
pub struct StateFlow<T> {
    cell: ObservableCell<T>,
}

impl<T> Clone for StateFlow<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StateFlow<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StateFlow").field(&self.cell).finish()
    }
}

impl<T: Clone + PartialEq + Send + 'static> StateFlow<T> {
    pub(crate) fn new(cell: ObservableCell<T>) -> Self {
        Self { cell }
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> T {
        self.cell.get()
    }

    /// Borrow the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    /// See [`ObservableCell::subscribe`].
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.cell.subscribe(callback)
    }

    /// See [`ObservableCell::stream`].
    #[must_use]
    pub fn stream(&self) -> StateStream<T> {
        self.cell.stream()
    }

    /// Number of accepted changes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.cell.version()
    }

    /// `true` if both flows observe the same cell.
    #[must_use]
    pub fn same_source(&self, other: &Self) -> bool {
        self.cell.ptr_eq(&other.cell)
    }
}

/// Anything that exposes observable state.
pub trait StateOwner<T: Clone + PartialEq + Send + 'static> {
    /// The observable state.
    fn state(&self) -> StateFlow<T>;

    /// Narrow to a [`StateHolder`] that exposes nothing but `state`.
    fn as_state_holder(&self) -> StateHolder<T> {
        StateHolder::from_flow(self.state())
    }
}

impl<T: Clone + PartialEq + Send + 'static> StateOwner<T> for StateFlow<T> {
    fn state(&self) -> StateFlow<T> {
        self.clone()
    }
}

/// Read-only facade over state owned elsewhere.
///
/// Holding a `StateHolder` keeps the cell alive but takes no part in the
/// owning container's lifecycle: disposing the container still cancels its
/// merges, and the holder keeps reporting the last value.
pub struct StateHolder<T> {
    flow: StateFlow<T>,
}

impl<T> Clone for StateHolder<T> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StateHolder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHolder").field("flow", &self.flow).finish()
    }
}

impl<T: Clone + PartialEq + Send + 'static> StateHolder<T> {
    /// Wrap an existing flow.
    #[must_use]
    pub fn from_flow(flow: StateFlow<T>) -> Self {
        Self { flow }
    }

    /// Wrap anything that owns state, e.g. a container or another holder.
    #[must_use]
    pub fn from_owner(owner: &impl StateOwner<T>) -> Self {
        Self::from_flow(owner.state())
    }
}

impl<T: Clone + PartialEq + Send + 'static> StateOwner<T> for StateHolder<T> {
    fn state(&self) -> StateFlow<T> {
        self.flow.clone()
    }
}
