#![forbid(unsafe_code)]

//! Cancellation scopes for merge tasks.
//!
//! A [`Scope`] is the lifetime boundary merge subscriptions run in: it pairs
//! a tokio runtime handle with a [`CancellationToken`]. Every task spawned in
//! a scope gets a child token, so a task can be cancelled on its own through
//! its [`MergeHandle`], or together with every sibling by cancelling (or
//! dropping) the scope.
//!
//! # Invariants
//!
//! 1. Cancelling is idempotent; cancelling twice is a no-op.
//! 2. A cancelled scope never starts new work: tasks spawned into it observe
//!    cancellation before their first item.
//! 3. Cancellation never interrupts a state update halfway through. An
//!    update already applied stays applied.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{MergeError, StateError, panic_message};

/// How a merge task ended without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeExit {
    /// The upstream source ran out of items.
    Completed,
    /// The task, its scope, or its owning container was cancelled.
    Cancelled,
}

/// Structured-concurrency boundary that owns merge tasks.
///
/// Dropping a scope cancels everything running in it.
pub struct Scope {
    handle: Handle,
    token: CancellationToken,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Scope {
    /// Scope bound to the given runtime.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            token: CancellationToken::new(),
        }
    }

    /// Scope bound to the runtime the caller is running on.
    pub fn current() -> Result<Self, StateError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| StateError::NoRuntime)
    }

    /// Nested scope: cancelled with `self`, but cancellable on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            token: self.token.child_token(),
        }
    }

    /// Cancel every task in this scope and its children.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!("scope cancelled");
        }
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Spawn `task` with its own child token.
    ///
    /// Panics inside the task are caught and reported as
    /// [`MergeError::Panicked`] through the returned handle.
    pub(crate) fn spawn<F, Fut>(&self, label: &'static str, task: F) -> MergeHandle
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<MergeExit, MergeError>> + Send + 'static,
    {
        let token = self.token.child_token();
        let fut = task(token.clone());
        let done = token.clone();
        let join = self.handle.spawn(async move {
            debug!(label, "merge task started");
            let result = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(MergeError::Panicked(panic_message(&*payload))),
            };
            match &result {
                Ok(exit) => debug!(label, ?exit, "merge task finished"),
                Err(err) => warn!(label, %err, "merge task failed"),
            }
            // Mark the token so owners can prune finished tasks.
            done.cancel();
            result
        });
        MergeHandle { token, join }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Handle to one merge subscription.
///
/// Dropping the handle does **not** stop the task; call [`cancel`] or cancel
/// the scope it runs in.
///
/// [`cancel`]: MergeHandle::cancel
pub struct MergeHandle {
    token: CancellationToken,
    join: JoinHandle<Result<MergeExit, MergeError>>,
}

impl std::fmt::Debug for MergeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeHandle")
            .field("active", &self.is_active())
            .field("finished", &self.join.is_finished())
            .finish()
    }
}

impl MergeHandle {
    /// Stop collecting from the source. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// `false` once the task was cancelled or has finished.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Token that cancels only this task.
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Wait for the task to end and report how it ended.
    pub async fn join(self) -> Result<MergeExit, MergeError> {
        match self.join.await {
            Ok(result) => result,
            Err(err) => Err(MergeError::from_join(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_outside_runtime_fails() {
        let err = Scope::current().unwrap_err();
        assert_eq!(err, StateError::NoRuntime);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let scope = Scope::current().unwrap();
        assert!(!scope.is_cancelled());
        scope.cancel();
        scope.cancel();
        assert!(scope.is_cancelled());
        scope.cancelled().await;
    }

    #[tokio::test]
    async fn child_follows_parent() {
        let parent = Scope::current().unwrap();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[tokio::test]
    async fn spawned_task_sees_scope_cancel() {
        let scope = Scope::current().unwrap();
        let handle = scope.spawn("test", |token| async move {
            token.cancelled().await;
            Ok(MergeExit::Cancelled)
        });
        drop(scope);
        assert_eq!(handle.join().await.unwrap(), MergeExit::Cancelled);
    }

    #[tokio::test]
    async fn panics_are_reported() {
        let scope = Scope::current().unwrap();
        let handle = scope.spawn("test", |_token| async move {
            if true {
                panic!("combine exploded");
            }
            Ok(MergeExit::Completed)
        });
        match handle.join().await {
            Err(MergeError::Panicked(msg)) => assert_eq!(msg, "combine exploded"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn finished_task_is_inactive() {
        let scope = Scope::current().unwrap();
        let handle = scope.spawn("test", |_token| async { Ok(MergeExit::Completed) });
        let token = handle.token().clone();
        assert_eq!(handle.join().await.unwrap(), MergeExit::Completed);
        assert!(token.is_cancelled());
    }
}
