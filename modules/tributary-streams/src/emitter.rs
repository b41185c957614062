//! Controllable hot sources.

use futures::channel::mpsc;
use futures::stream::{BoxStream, Stream, StreamExt};
use thiserror::Error;

/// Returned by [`Emitter::emit`] once the emitter has been completed or its
/// stream side has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("emitter is closed")]
pub struct EmitterClosed;

/// Push side of a hot source. Cloning shares the same underlying stream.
pub struct Emitter<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Create a hot source. Values pushed through the [`Emitter`] appear on the
/// returned stream in push order. Nothing is replayed: the stream only sees
/// values emitted after it was created.
pub fn emitter<T: Send + 'static>() -> (Emitter<T>, BoxStream<'static, T>) {
    let (tx, rx) = mpsc::unbounded();
    (Emitter { tx }, rx.boxed())
}

impl<T> Emitter<T> {
    /// Push a value. Fails once the emitter is completed or the stream side
    /// is gone.
    pub fn emit(&self, value: T) -> Result<(), EmitterClosed> {
        self.tx.unbounded_send(value).map_err(|_| EmitterClosed)
    }

    /// Complete the source for every clone of this emitter. Values already
    /// pushed are still delivered, then the stream ends.
    pub fn complete(&self) {
        self.tx.close_channel();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Pass every `Ok` item of `stream` through unchanged while copying it into
/// `sink`. A closed sink is ignored; the tapped stream keeps flowing.
pub fn tap<T, E, St>(stream: St, sink: Emitter<T>) -> impl Stream<Item = Result<T, E>>
where
    T: Clone,
    St: Stream<Item = Result<T, E>>,
{
    stream.inspect(move |item| {
        if let Ok(value) = item {
            let _ = sink.emit(value.clone());
        }
    })
}
