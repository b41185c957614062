//! The compose engine.
//!
//! Wires every channel of a definition to a live emitter, merges all reducer
//! timelines, folds them into the state timeline and, when an output channel
//! is declared, layers the non-persisted view on top:
//!
//! ```text
//! invoke(name, args) → emitter → channel → ┐
//! invoke(name, args) → emitter → channel → ├ merge → accumulate ─┬──────────┐
//! dependencies ──────→ dependency channel → ┘                    │ tap      │
//!                                                output channel ←┘          │
//!                                     view reducers (identity first) → combine_latest → visible
//! ```

use futures::stream::{self, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use tracing::debug;
use tributary_streams::{combine_latest, emitter, merge, tap};

use crate::callbacks::Callbacks;
use crate::channel::ArgStream;
use crate::definition::{StateTimeline, StoreDefinition};
use crate::error::StoreError;
use crate::reducer::{Reducer, Snapshot};

/// Live graph of one bound instance: the invocation callbacks and the
/// externally visible state timeline. Dropping `visible` tears the graph down.
pub struct Composed<S> {
    pub callbacks: Callbacks,
    pub visible: StateTimeline<S>,
}

/// Build the stream graph for one instance of `definition`.
///
/// Every channel transform is applied exactly once here. The returned
/// timeline is lazy: nothing flows until it is polled, and its first item is
/// whatever the accumulator yields first (the initial snapshot by default).
pub fn compose<S, D>(definition: &StoreDefinition<S, D>, dependencies: ArgStream<D>) -> Composed<S>
where
    S: Snapshot,
    D: Send + 'static,
{
    let mut ports = IndexMap::new();
    let mut timelines = Vec::new();

    // First in line: the seeded tuple was pushed before any invocation could be.
    if let Some(channel) = definition.dependency_channel() {
        timelines.push(channel.apply(dependencies).map_err(StoreError::Dependency).boxed());
    }

    for (name, channel) in definition.channels() {
        let (port, reducers) = channel.wire();
        let channel_name = name.clone();
        timelines.push(
            reducers
                .map_err(move |source| StoreError::Channel {
                    channel: channel_name.clone(),
                    source,
                })
                .boxed(),
        );
        ports.insert(name.clone(), port);
    }

    debug!(
        store = definition.label(),
        timelines = timelines.len(),
        output = definition.output_channel().is_some(),
        "composing store"
    );

    let accumulated = definition.accumulate(merge(timelines).boxed());

    let visible = match definition.output_channel() {
        None => accumulated,
        Some(output) => {
            let (snapshots, snapshot_stream) = emitter::<S>();
            let base = tap(accumulated, snapshots).boxed();
            let views = stream::once(async { Ok(Reducer::identity()) })
                .chain(output.apply(snapshot_stream).map_err(StoreError::Output))
                .boxed();
            combine_latest(base, views)
                .map_ok(|(state, view)| view.apply(state))
                .boxed()
        }
    };

    Composed {
        callbacks: Callbacks::new(ports),
        visible,
    }
}
