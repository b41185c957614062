//! State-transition functions.

use std::fmt;
use std::sync::Arc;

/// Anything that can be the current state of a store.
///
/// Snapshots are replaced whole on every fold step, never mutated in place.
pub trait Snapshot: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Snapshot for T {}

/// A pure function from one snapshot to the next.
///
/// Cheap to clone; clones share the same function. The output stage relies on
/// this to re-apply the latest view reducer to every new base snapshot.
pub struct Reducer<S> {
    f: Arc<dyn Fn(S) -> S + Send + Sync>,
}

impl<S: 'static> Reducer<S> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    pub fn identity() -> Self {
        Self::new(|state| state)
    }

    pub fn apply(&self, state: S) -> S {
        (self.f)(state)
    }

    /// `self` first, then `next`.
    pub fn then(self, next: Reducer<S>) -> Self {
        Self::new(move |state| next.apply(self.apply(state)))
    }
}

impl<S> Clone for Reducer<S> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<S> fmt::Debug for Reducer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reducer(..)")
    }
}
