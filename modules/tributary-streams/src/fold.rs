//! Left fold with synchronous seed emission.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, FusedStream, Stream, StreamExt};

/// Running fold over a fallible stream.
///
/// The first poll yields the seed without touching the input, so a consumer
/// always has a current value. Each later `Ok(item)` yields
/// `f(previous, item)`. The first `Err` is forwarded and the fold ends.
pub struct Fold<T, S, E, F> {
    input: Option<BoxStream<'static, Result<T, E>>>,
    state: Option<S>,
    seeded: bool,
    f: F,
}

// No field is structurally pinned.
impl<T, S, E, F> Unpin for Fold<T, S, E, F> {}

pub fn fold_with_seed<T, S, E, F>(input: BoxStream<'static, Result<T, E>>, seed: S, f: F) -> Fold<T, S, E, F>
where
    S: Clone,
    F: FnMut(S, T) -> S,
{
    Fold {
        input: Some(input),
        state: Some(seed),
        seeded: false,
        f,
    }
}

impl<T, S, E, F> Stream for Fold<T, S, E, F>
where
    S: Clone,
    F: FnMut(S, T) -> S,
{
    type Item = Result<S, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if !this.seeded {
            this.seeded = true;
            if let Some(seed) = &this.state {
                return Poll::Ready(Some(Ok(seed.clone())));
            }
        }

        let Some(input) = this.input.as_mut() else {
            return Poll::Ready(None);
        };

        match input.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(item))) => {
                let Some(previous) = this.state.take() else {
                    this.input = None;
                    return Poll::Ready(None);
                };
                let next = (this.f)(previous, item);
                this.state = Some(next.clone());
                Poll::Ready(Some(Ok(next)))
            }
            Poll::Ready(Some(Err(error))) => {
                this.input = None;
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                this.input = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, S, E, F> FusedStream for Fold<T, S, E, F>
where
    S: Clone,
    F: FnMut(S, T) -> S,
{
    fn is_terminated(&self) -> bool {
        self.seeded && self.input.is_none()
    }
}
