#![forbid(unsafe_code)]

//! Action dispatchers for view-models.
//!
//! - [`Dispatcher`]: anything that accepts UI actions. Every `Fn(A)` closure
//!   is a dispatcher.
//! - [`DebounceDispatcher`]: drops repeats of the same action inside a
//!   debounce window, so a double-tapped button fires once.
//! - [`DebounceConfig`]: window configuration with environment overrides.

pub mod config;
pub mod debounce;
pub mod dispatcher;

pub use config::{DebounceConfig, DispatchConfigError};
pub use debounce::{DebounceDispatcher, debounced};
pub use dispatcher::Dispatcher;
