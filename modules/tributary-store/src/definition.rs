//! Store definitions: initial state plus the channels that may change it.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use indexmap::IndexMap;
use tributary_streams::fold_with_seed;

use crate::channel::{ChannelDefinition, WireChannel};
use crate::error::{Result, StoreError};
use crate::reducer::{Reducer, Snapshot};

/// The merged reducer timeline of a bound instance.
pub type ReducerTimeline<S> = BoxStream<'static, Result<Reducer<S>>>;

/// A timeline of snapshots.
pub type StateTimeline<S> = BoxStream<'static, Result<S>>;

/// Replaces the default fold. Receives the merged reducer timeline and the
/// initial snapshot; must itself make a current value available right away.
pub type Accumulator<S> = Arc<dyn Fn(ReducerTimeline<S>, S) -> StateTimeline<S> + Send + Sync>;

/// Fold every reducer, in arrival order, over `initial`. Yields `initial`
/// before any reducer arrives.
///
/// Public so a custom [`Accumulator`] can layer its own stages on top.
pub fn default_accumulator<S: Snapshot>(reducers: ReducerTimeline<S>, initial: S) -> StateTimeline<S> {
    fold_with_seed(reducers, initial, |state, reducer: Reducer<S>| reducer.apply(state)).boxed()
}

/// Declarative description of a store. Immutable and cheap to clone; one
/// definition may back any number of independent bindings.
///
/// `D` is the dependency tuple fed to the dependency channel. Stores without
/// one use `()`.
pub struct StoreDefinition<S, D = ()> {
    label: Arc<str>,
    initial_state: S,
    channels: Arc<IndexMap<String, Arc<dyn WireChannel<S>>>>,
    dependency_channel: Option<ChannelDefinition<S, D>>,
    output_channel: Option<ChannelDefinition<S, S>>,
    accumulator: Option<Accumulator<S>>,
}

impl<S: Clone, D> Clone for StoreDefinition<S, D> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            initial_state: self.initial_state.clone(),
            channels: self.channels.clone(),
            dependency_channel: self.dependency_channel.clone(),
            output_channel: self.output_channel.clone(),
            accumulator: self.accumulator.clone(),
        }
    }
}

impl<S, D> std::fmt::Debug for StoreDefinition<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreDefinition")
            .field("label", &self.label)
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .field("dependency_channel", &self.dependency_channel.is_some())
            .field("output_channel", &self.output_channel.is_some())
            .field("custom_accumulator", &self.accumulator.is_some())
            .finish()
    }
}

impl<S: Snapshot> StoreDefinition<S, ()> {
    pub fn builder(initial_state: S) -> StoreBuilder<S, ()> {
        StoreBuilder {
            label: None,
            initial_state,
            channels: IndexMap::new(),
            duplicates: Vec::new(),
            dependency_channel: None,
            output_channel: None,
            accumulator: None,
        }
    }
}

impl<S: Snapshot, D> StoreDefinition<S, D> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn initial_state(&self) -> &S {
        &self.initial_state
    }

    /// Channel names in declaration order.
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub(crate) fn channels(&self) -> impl Iterator<Item = (&String, &Arc<dyn WireChannel<S>>)> {
        self.channels.iter()
    }

    pub fn dependency_channel(&self) -> Option<&ChannelDefinition<S, D>> {
        self.dependency_channel.as_ref()
    }

    pub fn output_channel(&self) -> Option<&ChannelDefinition<S, S>> {
        self.output_channel.as_ref()
    }

    pub(crate) fn accumulate(&self, reducers: ReducerTimeline<S>) -> StateTimeline<S> {
        match &self.accumulator {
            Some(accumulator) => accumulator(reducers, self.initial_state.clone()),
            None => default_accumulator(reducers, self.initial_state.clone()),
        }
    }
}

/// Builder for [`StoreDefinition`]. Channels keep their declaration order.
pub struct StoreBuilder<S, D> {
    label: Option<String>,
    initial_state: S,
    channels: IndexMap<String, Arc<dyn WireChannel<S>>>,
    duplicates: Vec<String>,
    dependency_channel: Option<ChannelDefinition<S, D>>,
    output_channel: Option<ChannelDefinition<S, S>>,
    accumulator: Option<Accumulator<S>>,
}

impl<S: Snapshot, D: Send + 'static> StoreBuilder<S, D> {
    /// Label used in logs. Defaults to the snapshot's type name.
    pub fn named(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn channel<A: Send + 'static>(mut self, name: impl Into<String>, channel: ChannelDefinition<S, A>) -> Self {
        let name = name.into();
        if self.channels.contains_key(&name) {
            self.duplicates.push(name);
        } else {
            self.channels.insert(name, Arc::new(channel));
        }
        self
    }

    /// Channel fed by the owner's dependency tuple. Fixes the store's
    /// dependency type.
    pub fn dependency_channel<D2: Send + 'static>(self, channel: ChannelDefinition<S, D2>) -> StoreBuilder<S, D2> {
        StoreBuilder {
            label: self.label,
            initial_state: self.initial_state,
            channels: self.channels,
            duplicates: self.duplicates,
            dependency_channel: Some(channel),
            output_channel: self.output_channel,
            accumulator: self.accumulator,
        }
    }

    /// Channel over the accumulated snapshots whose reducers shape the
    /// visible value without being folded back into the state.
    pub fn output_channel(mut self, channel: ChannelDefinition<S, S>) -> Self {
        self.output_channel = Some(channel);
        self
    }

    pub fn accumulator<F>(mut self, accumulator: F) -> Self
    where
        F: Fn(ReducerTimeline<S>, S) -> StateTimeline<S> + Send + Sync + 'static,
    {
        self.accumulator = Some(Arc::new(accumulator));
        self
    }

    pub fn build(self) -> Result<StoreDefinition<S, D>> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(StoreError::DuplicateChannel(name));
        }
        let label = self
            .label
            .unwrap_or_else(|| std::any::type_name::<S>().to_string());
        Ok(StoreDefinition {
            label: label.into(),
            initial_state: self.initial_state,
            channels: Arc::new(self.channels),
            dependency_channel: self.dependency_channel,
            output_channel: self.output_channel,
            accumulator: self.accumulator,
        })
    }
}
