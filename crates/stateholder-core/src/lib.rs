#![forbid(unsafe_code)]

//! Observable state containers for view-models.
//!
//! The building blocks, leaves first:
//!
//! - [`StateProvider`]: produces the initial value of a container.
//! - [`ObservableCell`]: a shared value with ordered change notification.
//! - [`StateContainer`]: owns a cell; applies pure `update` transforms and
//!   merges asynchronous sources into its state.
//! - [`StateHolder`] / [`StateOwner`]: read-only views over a container.
//! - [`EventQueue`] / [`EventHolder`]: consumer-acknowledged one-shot events.
//! - [`Scope`] / [`MergeHandle`]: the cancellation boundary merge tasks run in.
//! - [`StateViewModel`]: a view-model base that owns all of the above.
//!
//! # Example
//!
//! ```ignore
//! use stateholder_core::{Scope, state_container};
//!
//! let scope = Scope::current()?;
//! let counter = state_container(0);
//! let ticks = futures::stream::iter([10, 20]);
//! counter.merge(ticks, &scope, |count, tick| count + tick);
//! ```

pub mod cell;
pub mod collect;
pub mod container;
pub mod error;
pub mod event;
pub mod holder;
pub mod provider;
pub mod scope;
pub mod view_model;

pub use cell::{ObservableCell, StateStream, Subscription};
pub use collect::{collect_state, collect_state_with, handle_events};
pub use container::{
    StateContainer, StateContainerFactory, StreamMergeExt, state_container, state_container_from,
};
pub use error::{MergeError, StateError};
pub use event::{EventHolder, EventQueue, Pending};
pub use holder::{StateFlow, StateHolder, StateOwner};
pub use provider::{LazyProvider, StateProvider, ValueProvider, provide_state, provide_state_with};
pub use scope::{MergeExit, MergeHandle, Scope};
pub use view_model::StateViewModel;

