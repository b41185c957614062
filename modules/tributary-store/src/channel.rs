//! Channel definitions: transforms from invocation arguments to reducers.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use tributary_streams::emitter;

use crate::callbacks::ChannelPort;
use crate::reducer::Reducer;

/// Invocation arguments of one channel, one item per call.
pub type ArgStream<A> = BoxStream<'static, A>;

/// Reducers produced by one channel. An `Err` item is a channel failure and
/// ends the bound instance.
pub type ReducerStream<S> = BoxStream<'static, anyhow::Result<Reducer<S>>>;

/// Turns a stream of invocation arguments into a stream of reducers.
///
/// The transform runs exactly once per bound instance, so it must describe a
/// persistent pipeline over its input rather than react to a single call. A
/// single invocation may yield any number of reducers, now or later.
pub struct ChannelDefinition<S, A> {
    transform: Arc<dyn Fn(ArgStream<A>) -> ReducerStream<S> + Send + Sync>,
}

impl<S, A> Clone for ChannelDefinition<S, A> {
    fn clone(&self) -> Self {
        Self {
            transform: self.transform.clone(),
        }
    }
}

impl<S, A> std::fmt::Debug for ChannelDefinition<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelDefinition")
            .field("args", &std::any::type_name::<A>())
            .finish()
    }
}

impl<S, A> ChannelDefinition<S, A>
where
    S: Send + 'static,
    A: Send + 'static,
{
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(ArgStream<A>) -> ReducerStream<S> + Send + Sync + 'static,
    {
        Self {
            transform: Arc::new(transform),
        }
    }

    /// Exactly one reducer per invocation.
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(A) -> Reducer<S> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(move |input| {
            let f = f.clone();
            input.map(move |args| Ok(f(args))).boxed()
        })
    }

    /// One reducer per invocation, or a failure that ends the instance.
    pub fn try_map<F>(f: F) -> Self
    where
        F: Fn(A) -> anyhow::Result<Reducer<S>> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(move |input| {
            let f = f.clone();
            input.map(move |args| f(args)).boxed()
        })
    }

    pub fn apply(&self, input: ArgStream<A>) -> ReducerStream<S> {
        (self.transform)(input)
    }
}

/// Type-erased view of a channel definition, so channels with different
/// argument types can live in one ordered registry.
pub(crate) trait WireChannel<S>: Send + Sync {
    /// Allocate a fresh emitter and apply the transform to its stream.
    fn wire(&self) -> (Box<dyn ChannelPort>, ReducerStream<S>);
}

impl<S, A> WireChannel<S> for ChannelDefinition<S, A>
where
    S: Send + 'static,
    A: Send + 'static,
{
    fn wire(&self) -> (Box<dyn ChannelPort>, ReducerStream<S>) {
        let (port, input) = emitter::<A>();
        (Box::new(port), self.apply(input))
    }
}
