//! Pairwise "latest of each side" combinator.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, FusedStream, Stream, StreamExt};

/// Holds the most recent value of two fallible streams and yields the pair
/// whenever either side updates, once both sides have produced a value.
///
/// Only the latest value per side is kept. Ends when both sides ended, or as
/// soon as a side ends without ever producing a value. The first `Err` from
/// either side is forwarded and ends the combination.
pub struct CombineLatest<A, B, E> {
    left: Option<BoxStream<'static, Result<A, E>>>,
    right: Option<BoxStream<'static, Result<B, E>>>,
    latest_left: Option<A>,
    latest_right: Option<B>,
    done: bool,
}

// No field is structurally pinned.
impl<A, B, E> Unpin for CombineLatest<A, B, E> {}

pub fn combine_latest<A, B, E>(
    left: BoxStream<'static, Result<A, E>>,
    right: BoxStream<'static, Result<B, E>>,
) -> CombineLatest<A, B, E> {
    CombineLatest {
        left: Some(left),
        right: Some(right),
        latest_left: None,
        latest_right: None,
        done: false,
    }
}

impl<A: Clone, B: Clone, E> CombineLatest<A, B, E> {
    fn pair(&self) -> Option<(A, B)> {
        match (&self.latest_left, &self.latest_right) {
            (Some(a), Some(b)) => Some((a.clone(), b.clone())),
            _ => None,
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.left = None;
        self.right = None;
    }
}

/// What one side did during a poll.
enum Side<T, E> {
    Value(T),
    Failed(E),
    Ended,
    Idle,
}

fn poll_side<T, E>(side: &mut Option<BoxStream<'static, Result<T, E>>>, cx: &mut Context<'_>) -> Side<T, E> {
    let Some(stream) = side.as_mut() else {
        return Side::Idle;
    };
    match stream.poll_next_unpin(cx) {
        Poll::Ready(Some(Ok(value))) => Side::Value(value),
        Poll::Ready(Some(Err(error))) => Side::Failed(error),
        Poll::Ready(None) => {
            *side = None;
            Side::Ended
        }
        Poll::Pending => Side::Idle,
    }
}

impl<A: Clone, B: Clone, E> Stream for CombineLatest<A, B, E> {
    type Item = Result<(A, B), E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.done {
                return Poll::Ready(None);
            }
            let mut progressed = false;

            match poll_side(&mut this.left, cx) {
                Side::Value(a) => {
                    this.latest_left = Some(a);
                    if let Some(pair) = this.pair() {
                        return Poll::Ready(Some(Ok(pair)));
                    }
                    progressed = true;
                }
                Side::Failed(error) => {
                    this.finish();
                    return Poll::Ready(Some(Err(error)));
                }
                Side::Ended => {
                    if this.latest_left.is_none() {
                        this.finish();
                        return Poll::Ready(None);
                    }
                    progressed = true;
                }
                Side::Idle => {}
            }

            match poll_side(&mut this.right, cx) {
                Side::Value(b) => {
                    this.latest_right = Some(b);
                    if let Some(pair) = this.pair() {
                        return Poll::Ready(Some(Ok(pair)));
                    }
                    progressed = true;
                }
                Side::Failed(error) => {
                    this.finish();
                    return Poll::Ready(Some(Err(error)));
                }
                Side::Ended => {
                    if this.latest_right.is_none() {
                        this.finish();
                        return Poll::Ready(None);
                    }
                    progressed = true;
                }
                Side::Idle => {}
            }

            if this.left.is_none() && this.right.is_none() {
                this.done = true;
                return Poll::Ready(None);
            }
            if !progressed {
                return Poll::Pending;
            }
        }
    }
}

impl<A: Clone, B: Clone, E> FusedStream for CombineLatest<A, B, E> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}
