//! Invocation callbacks for a bound instance.

use std::any::{type_name, Any};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;
use tributary_streams::Emitter;

use crate::error::{Result, StoreError};

/// Push side of one channel with its argument type erased.
pub(crate) trait ChannelPort: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn args_type(&self) -> &'static str;
    fn close(&self);
}

impl<A: Send + 'static> ChannelPort for Emitter<A> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn args_type(&self) -> &'static str {
        type_name::<A>()
    }

    fn close(&self) {
        self.complete();
    }
}

/// Runs whatever propagation is due after an invocation.
pub(crate) trait Flush: Send + Sync {
    fn flush(&self);
}

/// Ordered registry of channel name to emitter, built once per bound
/// instance. Cloning shares the same emitters.
#[derive(Clone)]
pub struct Callbacks {
    ports: Arc<IndexMap<String, Box<dyn ChannelPort>>>,
    flush: Option<Arc<dyn Flush>>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ports.keys()).finish()
    }
}

impl Callbacks {
    pub(crate) fn new(ports: IndexMap<String, Box<dyn ChannelPort>>) -> Self {
        Self {
            ports: Arc::new(ports),
            flush: None,
        }
    }

    /// Propagate synchronously after every invocation, in the caller's
    /// context.
    pub(crate) fn with_flush(self, flush: Arc<dyn Flush>) -> Self {
        Self {
            ports: self.ports,
            flush: Some(flush),
        }
    }

    /// Channel names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ports.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    /// Typed handle to one channel. Fails if the channel does not exist or
    /// takes a different argument type.
    pub fn callback<A: Send + 'static>(&self, name: &str) -> Result<Callback<A>> {
        let port = self
            .ports
            .get(name)
            .ok_or_else(|| StoreError::UnknownChannel(name.to_string()))?;
        let emitter = port
            .as_any()
            .downcast_ref::<Emitter<A>>()
            .ok_or_else(|| StoreError::ArgumentType {
                channel: name.to_string(),
                expected: port.args_type(),
            })?;
        Ok(Callback {
            name: name.into(),
            emitter: emitter.clone(),
            flush: self.flush.clone(),
        })
    }

    /// Push `args` into the named channel. Invoking a released instance is a
    /// no-op.
    pub fn invoke<A: Send + 'static>(&self, name: &str, args: A) -> Result<()> {
        self.callback::<A>(name)?.call(args);
        Ok(())
    }

    /// Complete every channel. Further invocations are dropped.
    pub(crate) fn close(&self) {
        for port in self.ports.values() {
            port.close();
        }
    }
}

/// Fire-and-forget invoker for one channel.
///
/// When the channel belongs to a [`Binding`](crate::Binding), reducers the
/// channel produces synchronously are folded before `call` returns.
pub struct Callback<A> {
    name: Arc<str>,
    emitter: Emitter<A>,
    flush: Option<Arc<dyn Flush>>,
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            emitter: self.emitter.clone(),
            flush: self.flush.clone(),
        }
    }
}

impl<A> std::fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback").field("channel", &self.name).finish()
    }
}

impl<A: Send + 'static> Callback<A> {
    pub fn call(&self, args: A) {
        if self.emitter.emit(args).is_err() {
            debug!(channel = %self.name, "invocation dropped, channel is closed");
            return;
        }
        if let Some(flush) = &self.flush {
            flush.flush();
        }
    }

    pub fn channel(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tributary_streams::emitter;

    fn registry() -> (Callbacks, futures::stream::BoxStream<'static, (String,)>) {
        let (port, args) = emitter::<(String,)>();
        let (bump, _bumps) = emitter::<()>();
        let mut ports: IndexMap<String, Box<dyn ChannelPort>> = IndexMap::new();
        ports.insert("rename".into(), Box::new(port));
        ports.insert("bump".into(), Box::new(bump));
        (Callbacks::new(ports), args)
    }

    #[tokio::test]
    async fn invoke_pushes_the_argument_tuple() {
        let (callbacks, mut args) = registry();
        callbacks.invoke("rename", ("Bob".to_string(),)).unwrap();
        assert_eq!(args.next().await, Some(("Bob".to_string(),)));
    }

    #[test]
    fn names_keep_declaration_order() {
        let (callbacks, _args) = registry();
        assert_eq!(callbacks.names().collect::<Vec<_>>(), vec!["rename", "bump"]);
        assert!(callbacks.contains("bump"));
        assert!(!callbacks.contains("missing"));
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let (callbacks, _args) = registry();
        let err = callbacks.invoke("missing", ()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownChannel(name) if name == "missing"));
    }

    #[test]
    fn mismatched_argument_type_is_rejected() {
        let (callbacks, _args) = registry();
        let err = callbacks.callback::<(u32,)>("rename").unwrap_err();
        match err {
            StoreError::ArgumentType { channel, expected } => {
                assert_eq!(channel, "rename");
                assert!(expected.contains("String"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn closed_channels_drop_invocations() {
        let (callbacks, mut args) = registry();
        let rename = callbacks.callback::<(String,)>("rename").unwrap();
        callbacks.close();

        rename.call(("ignored".to_string(),));
        callbacks.invoke("rename", ("ignored".to_string(),)).unwrap();
        assert_eq!(args.next().await, None);
    }
}
