//! Site-keyed cache of bindings.
//!
//! Hosts that re-run the same code on every evaluation (UI components,
//! request handlers replaying a session) cannot hold on to a [`Binding`]
//! themselves. They hand the registry a stable token for the call site
//! instead: the first `bind` for a token constructs the instance, later ones
//! reuse it and only forward the dependency tuple.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::debug;
use uuid::Uuid;

use crate::binding::{Binding, Dependencies};
use crate::callbacks::Callbacks;
use crate::definition::StoreDefinition;
use crate::reducer::Snapshot;

/// Stable identity of one binding site for the lifetime of its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingSite(Uuid);

impl BindingSite {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for BindingSite {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BindingSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site-{}", self.0)
    }
}

/// Exactly one [`Binding`] per site token.
pub struct BindingRegistry<K, S, D = ()> {
    bindings: HashMap<K, Binding<S, D>>,
}

impl<K, S, D> Default for BindingRegistry<K, S, D> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<K, S, D> BindingRegistry<K, S, D>
where
    K: Hash + Eq + fmt::Debug,
    S: Snapshot,
    D: Dependencies,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate `site` with `dependencies`. Constructs the binding on the
    /// first call for this site; afterwards `definition` is ignored and only
    /// changed dependencies are forwarded. Returns the callbacks and the
    /// latest visible snapshot.
    pub fn bind(&mut self, site: K, definition: &StoreDefinition<S, D>, dependencies: D) -> (Callbacks, S) {
        let binding = match self.bindings.entry(site) {
            Entry::Occupied(entry) => {
                let binding = entry.into_mut();
                binding.re_evaluate(dependencies);
                binding
            }
            Entry::Vacant(entry) => {
                debug!(site = ?entry.key(), store = definition.label(), "first evaluation of site");
                entry.insert(Binding::bind(definition, dependencies))
            }
        };
        (binding.callbacks().clone(), binding.snapshot())
    }

    pub fn get(&self, site: &K) -> Option<&Binding<S, D>> {
        self.bindings.get(site)
    }

    pub fn get_mut(&mut self, site: &K) -> Option<&mut Binding<S, D>> {
        self.bindings.get_mut(site)
    }

    /// Release and forget the binding at `site`. Returns `false` if the site
    /// was never bound (or already released).
    pub fn release(&mut self, site: &K) -> bool {
        match self.bindings.remove(site) {
            Some(mut binding) => {
                binding.release();
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self) {
        for (_, mut binding) in self.bindings.drain() {
            binding.release();
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sites_are_unique() {
        let a = BindingSite::new();
        let b = BindingSite::new();
        assert_ne!(a, b);
        let copied = a;
        assert_eq!(a, copied);
        assert!(a.to_string().starts_with("site-"));
    }
}
