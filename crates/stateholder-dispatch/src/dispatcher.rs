#![forbid(unsafe_code)]

//! The dispatcher seam between UI callbacks and view-model actions.

/// Accepts actions from the UI.
pub trait Dispatcher<A> {
    fn dispatch(&self, action: A);

    /// Zero-argument callback that dispatches a copy of `action`.
    fn relay(&self, action: A) -> impl Fn()
    where
        Self: Sized,
        A: Clone,
    {
        move || self.dispatch(action.clone())
    }

    /// One-argument callback that builds the action from its input, e.g. a
    /// text field's `on_change` feeding `Action::QueryChanged`.
    fn relay_of<T, F>(&self, build: F) -> impl Fn(T)
    where
        Self: Sized,
        F: Fn(T) -> A,
    {
        move |input| self.dispatch(build(input))
    }

    /// Two-argument form of [`relay_of`](Dispatcher::relay_of).
    fn relay_of2<T1, T2, F>(&self, build: F) -> impl Fn(T1, T2)
    where
        Self: Sized,
        F: Fn(T1, T2) -> A,
    {
        move |a, b| self.dispatch(build(a, b))
    }
}

impl<A, F> Dispatcher<A> for F
where
    F: Fn(A),
{
    fn dispatch(&self, action: A) {
        self(action);
    }
}
