//! Time and switching operators for channel authors.
//!
//! The engine never schedules anything itself; channels that need timers or
//! switching build them from these.

use std::time::Duration;

use async_stream::stream;
use futures::stream::{self, BoxStream, FusedStream, StreamExt};
use tokio::time::{interval_at, sleep, Instant};

/// Shift every item later by `by`, keeping their order and spacing.
pub fn delay<T: Send + 'static>(input: BoxStream<'static, T>, by: Duration) -> BoxStream<'static, T> {
    input
        .map(move |item| async move {
            sleep(by).await;
            item
        })
        .buffered(usize::MAX)
        .boxed()
}

/// Emit an item only once `quiet` has passed without a newer one. A pending
/// item is flushed when the input ends.
pub fn debounce<T: Send + 'static>(input: BoxStream<'static, T>, quiet: Duration) -> BoxStream<'static, T> {
    stream! {
        let mut input = input;
        let mut pending: Option<T> = None;
        let mut finished = false;
        let timer = sleep(quiet);
        tokio::pin!(timer);

        while !finished {
            let ready = tokio::select! {
                next = input.next() => match next {
                    Some(item) => {
                        pending = Some(item);
                        timer.as_mut().reset(Instant::now() + quiet);
                        None
                    }
                    None => {
                        finished = true;
                        pending.take()
                    }
                },
                () = &mut timer, if pending.is_some() => pending.take(),
            };
            if let Some(item) = ready {
                yield item;
            }
        }
    }
    .boxed()
}

enum Step<T, U> {
    Outer(Option<T>),
    Inner(Option<U>),
}

/// Map every outer item to an inner stream and follow only the latest one.
/// A new outer item drops the previous inner stream and whatever it was
/// waiting on. Ends once the outer stream and the last inner stream ended.
pub fn switch_map<T, U, F>(outer: BoxStream<'static, T>, mut f: F) -> BoxStream<'static, U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> BoxStream<'static, U> + Send + 'static,
{
    stream! {
        let mut outer = outer.fuse();
        let mut inner: Option<BoxStream<'static, U>> = None;

        loop {
            let step = match inner.as_mut() {
                Some(active) => tokio::select! {
                    biased;
                    next = outer.next(), if !outer.is_terminated() => Step::Outer(next),
                    item = active.next() => Step::Inner(item),
                },
                None if outer.is_terminated() => break,
                None => Step::Outer(outer.next().await),
            };
            match step {
                Step::Outer(Some(value)) => inner = Some(f(value)),
                Step::Outer(None) => {}
                Step::Inner(Some(item)) => yield item,
                Step::Inner(None) => inner = None,
            }
        }
    }
    .boxed()
}

/// Time elapsed since the previous tick, every `period`. Missed ticks are
/// delivered in a burst so the deltas always add up to the elapsed time.
pub fn ticks(period: Duration) -> BoxStream<'static, Duration> {
    stream::unfold(None, move |last: Option<(tokio::time::Interval, Instant)>| async move {
        let (mut interval, previous) = match last {
            Some(state) => state,
            None => {
                let start = Instant::now();
                (interval_at(start + period, period), start)
            }
        };
        let now = interval.tick().await;
        Some((now.duration_since(previous), Some((interval, now))))
    })
    .boxed()
}
