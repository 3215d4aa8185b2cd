#![forbid(unsafe_code)]

//! StateHolder: state containers for view-models.
//!
//! This crate re-exports the workspace crates behind a single name:
//!
//! - [`core`]: cells, containers, merges, scopes and event queues.
//! - [`dispatch`]: action dispatchers and per-action debouncing
//!   (feature `dispatch`, on by default).
//!
//! The most common items are also available from the [`prelude`].

pub use stateholder_core as core;
#[cfg(feature = "dispatch")]
pub use stateholder_dispatch as dispatch;

pub use stateholder_core::*;
#[cfg(feature = "dispatch")]
pub use stateholder_dispatch::{
    DebounceConfig, DebounceDispatcher, DispatchConfigError, Dispatcher, debounced,
};

pub mod prelude {
    //! `use stateholder::prelude::*;` for view-model code.

    pub use stateholder_core::{
        EventHolder, EventQueue, MergeHandle, Scope, StateContainer, StateFlow, StateHolder,
        StateOwner, StateViewModel, StreamMergeExt, collect_state, handle_events,
        state_container,
    };
    #[cfg(feature = "dispatch")]
    pub use stateholder_dispatch::{Dispatcher, debounced};
}
