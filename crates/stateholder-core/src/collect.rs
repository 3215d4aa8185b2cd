#![forbid(unsafe_code)]

//! Scoped observers for state and events.
//!
//! These are the framework-agnostic halves of lifecycle-bound collection:
//! the host decides when a [`Scope`] starts and ends (e.g. while a screen is
//! visible), and these helpers keep an observer running for exactly that
//! window.

use std::future::Future;

use futures::{FutureExt, StreamExt};

use crate::event::EventHolder;
use crate::holder::StateOwner;
use crate::scope::{MergeExit, MergeHandle, Scope};

/// Run `block` on every state value of `owner` while `scope` is alive.
///
/// The first call receives the current value.
pub fn collect_state<T, O, F>(owner: &O, scope: &Scope, mut block: F) -> MergeHandle
where
    T: Clone + PartialEq + Send + 'static,
    O: StateOwner<T> + ?Sized,
    F: FnMut(T) + Send + 'static,
{
    let mut stream = owner.state().stream();
    scope.spawn("collect", move |token| async move {
        loop {
            let item = tokio::select! {
                biased;
                () = token.cancelled() => return Ok(MergeExit::Cancelled),
                item = stream.next() => item,
            };
            match item {
                Some(value) => block(value),
                None => return Ok(MergeExit::Completed),
            }
        }
    })
}

/// Run `block` on a projection of the state, skipping values whose
/// projection equals the previous one.
pub fn collect_state_with<T, U, O, Sel, F>(
    owner: &O,
    scope: &Scope,
    selector: Sel,
    mut block: F,
) -> MergeHandle
where
    T: Clone + PartialEq + Send + 'static,
    U: PartialEq + Clone + Send + 'static,
    O: StateOwner<T> + ?Sized,
    Sel: Fn(&T) -> U + Send + 'static,
    F: FnMut(U) + Send + 'static,
{
    let mut last: Option<U> = None;
    collect_state(owner, scope, move |state: T| {
        let selected = selector(&state);
        if last.as_ref() == Some(&selected) {
            return;
        }
        last = Some(selected.clone());
        block(selected);
    })
}

/// Deliver pending events of `holder` to `on_event` while `scope` is alive.
///
/// Every event in the latest pending snapshot is passed to `on_event`; when
/// `should_handle` accepts it, it is then acknowledged with
/// [`EventHolder::handle`]. Snapshots that pile up while `on_event` runs are
/// collapsed to the newest one. Events that are not acknowledged stay
/// pending and are delivered again with the next snapshot, so delivery is
/// at-least-once.
pub fn handle_events<E, H, P, F, Fut>(
    holder: std::sync::Arc<H>,
    scope: &Scope,
    should_handle: P,
    mut on_event: F,
) -> MergeHandle
where
    E: Clone + PartialEq + Send + Sync + 'static,
    H: EventHolder<E> + Send + Sync + ?Sized + 'static,
    P: Fn(&E) -> bool + Send + 'static,
    F: FnMut(E) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let mut stream = holder.events().stream();
    scope.spawn("events", move |token| async move {
        loop {
            let snapshot = tokio::select! {
                biased;
                () = token.cancelled() => return Ok(MergeExit::Cancelled),
                item = stream.next() => item,
            };
            let Some(mut snapshot) = snapshot else {
                return Ok(MergeExit::Completed);
            };
            while let Some(Some(newer)) = stream.next().now_or_never() {
                snapshot = newer;
            }
            for event in snapshot.iter() {
                if token.is_cancelled() {
                    return Ok(MergeExit::Cancelled);
                }
                on_event(event.clone()).await;
                if should_handle(event) {
                    holder.handle(event);
                }
            }
        }
    })
}
