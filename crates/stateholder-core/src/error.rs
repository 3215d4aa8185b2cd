#![forbid(unsafe_code)]

//! Error types for scopes and merge tasks.

use std::any::Any;
use std::fmt;

/// Errors raised while setting up state plumbing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// A [`Scope`](crate::Scope) was requested outside a tokio runtime.
    NoRuntime,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuntime => write!(f, "no tokio runtime is running on this thread"),
        }
    }
}

impl std::error::Error for StateError {}

/// Why a merge task stopped with a failure.
#[derive(Debug)]
pub enum MergeError {
    /// The combine function of a `try_merge` returned an error.
    Combine(Box<dyn std::error::Error + Send + Sync>),
    /// The combine function or the upstream stream panicked.
    Panicked(String),
    /// The runtime shut down or aborted the task before it finished.
    Aborted,
}

impl MergeError {
    pub(crate) fn from_join(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::Panicked(panic_message(&*err.into_panic()))
        } else {
            Self::Aborted
        }
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Combine(err) => write!(f, "combine failed: {err}"),
            Self::Panicked(msg) => write!(f, "merge task panicked: {msg}"),
            Self::Aborted => write!(f, "merge task aborted"),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Combine(err) => Some(err.as_ref()),
            Self::Panicked(_) | Self::Aborted => None,
        }
    }
}
