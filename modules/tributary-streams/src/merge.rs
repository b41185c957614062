//! Delivery-ordered merge of many fallible streams.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, FusedStream, SelectAll, Stream, StreamExt};

/// Merge of many inputs into one timeline.
///
/// Items are delivered in the order the inputs become ready (wake order),
/// with no priority between inputs. Items from a single input keep their
/// relative order. The first `Err` from any input is yielded, every input is
/// dropped, and the merge ends.
pub struct Merge<T, E> {
    inputs: SelectAll<BoxStream<'static, Result<T, E>>>,
    done: bool,
}

pub fn merge<T, E, I>(inputs: I) -> Merge<T, E>
where
    I: IntoIterator<Item = BoxStream<'static, Result<T, E>>>,
{
    Merge {
        inputs: futures::stream::select_all(inputs),
        done: false,
    }
}

impl<T, E> Merge<T, E> {
    /// Number of inputs that have not ended yet.
    pub fn live_inputs(&self) -> usize {
        self.inputs.len()
    }

    fn finish(&mut self) {
        self.done = true;
        // Dropping the inputs cancels whatever stage they were waiting on.
        self.inputs = SelectAll::new();
    }
}

impl<T, E> Stream for Merge<T, E> {
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.inputs.poll_next_unpin(cx) {
            Poll::Ready(Some(Err(error))) => {
                self.finish();
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                self.finish();
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl<T, E> FusedStream for Merge<T, E> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}
