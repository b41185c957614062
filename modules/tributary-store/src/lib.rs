//! Compose one piece of state out of independent, named event sources.
//!
//! A [`StoreDefinition`] declares an initial snapshot and a set of named
//! channels. Each channel turns the stream of its invocation arguments into a
//! stream of [`Reducer`]s. Binding a definition wires every channel to an
//! invocation callback, merges all reducer streams into one timeline and
//! folds it into the current snapshot:
//!
//! - [`compose`]: build the stream graph for one instance (pull-driven)
//! - [`Binding`]: one instance per owner lifetime; invocations propagate
//!   synchronously, timers wake a small tokio task
//! - [`BindingRegistry`]: instance cache keyed by a stable binding-site token
//!
//! Channel failures end the instance. The last good snapshot stays visible
//! and no error reaches the owner beyond the binding's [`Phase`].

pub mod binding;
pub mod callbacks;
pub mod channel;
pub mod compose;
pub mod definition;
pub mod error;
pub mod reducer;
pub mod registry;

pub use binding::{Binding, Dependencies, Phase};
pub use callbacks::{Callback, Callbacks};
pub use channel::{ArgStream, ChannelDefinition, ReducerStream};
pub use compose::{compose, Composed};
pub use definition::{
    default_accumulator, Accumulator, ReducerTimeline, StateTimeline, StoreBuilder, StoreDefinition,
};
pub use error::{Result, StoreError};
pub use reducer::{Reducer, Snapshot};
pub use registry::{BindingRegistry, BindingSite};
