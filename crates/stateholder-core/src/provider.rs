#![forbid(unsafe_code)]

//! Initial-state providers.
//!
//! A [`StateProvider`] is a zero-argument factory consulted exactly once when
//! a [`StateContainer`](crate::StateContainer) is built. Simple cases use
//! [`provide_state`] or [`provide_state_with`], or pass a closure directly;
//! providers that need injected dependencies implement the trait on their
//! own type.

/// Produces the initial value of a container.
pub trait StateProvider<S> {
    /// Build the state.
    fn provide(&self) -> S;
}

impl<S, F> StateProvider<S> for F
where
    F: Fn() -> S,
{
    fn provide(&self) -> S {
        self()
    }
}

/// Provider that hands out clones of an already-built value.
#[derive(Debug, Clone)]
pub struct ValueProvider<S>(S);

impl<S: Clone> StateProvider<S> for ValueProvider<S> {
    fn provide(&self) -> S {
        self.0.clone()
    }
}

/// Provider that defers construction until [`StateProvider::provide`] runs.
pub struct LazyProvider<F>(F);

impl<F> std::fmt::Debug for LazyProvider<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyProvider").finish_non_exhaustive()
    }
}

impl<S, F> StateProvider<S> for LazyProvider<F>
where
    F: Fn() -> S,
{
    fn provide(&self) -> S {
        (self.0)()
    }
}

/// Wrap an eager value.
#[must_use]
pub fn provide_state<S: Clone>(state: S) -> ValueProvider<S> {
    ValueProvider(state)
}

/// Wrap a block that computes the state when the provider is consulted.
#[must_use]
pub fn provide_state_with<S, F>(block: F) -> LazyProvider<F>
where
    F: Fn() -> S,
{
    LazyProvider(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn eager_provider_returns_value() {
        let provider = provide_state(42);
        assert_eq!(provider.provide(), 42);
        assert_eq!(provider.provide(), 42);
    }

    #[test]
    fn lazy_provider_runs_only_when_asked() {
        let calls = Cell::new(0);
        let provider = provide_state_with(|| {
            calls.set(calls.get() + 1);
            "built".to_string()
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(provider.provide(), "built");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn custom_provider_with_dependency() {
        struct Repo {
            seed: i32,
        }
        struct RepoProvider {
            repo: Repo,
        }
        impl StateProvider<i32> for RepoProvider {
            fn provide(&self) -> i32 {
                self.repo.seed * 6
            }
        }
        let provider: Box<dyn StateProvider<i32>> = Box::new(RepoProvider {
            repo: Repo { seed: 7 },
        });
        assert_eq!(provider.provide(), 42);
    }

    #[test]
    fn closure_is_a_provider() {
        let base = 20;
        let provider = move || base + 1;
        assert_eq!(StateProvider::<i32>::provide(&provider), 21);
        let container = crate::state_container_from(&|| vec![1, 2]);
        assert_eq!(container.value(), vec![1, 2]);
    }
}
