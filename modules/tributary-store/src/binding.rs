//! Binding of a store definition to one owner lifetime.
//!
//! A host drives a [`Binding`] through three hooks:
//!
//! - [`Binding::bind`] when the owner first evaluates (Unbound → Bound)
//! - [`Binding::re_evaluate`] on every later evaluation with the current
//!   dependency tuple
//! - [`Binding::release`] when the owner goes away (→ Released, terminal)
//!
//! Propagation is synchronous in whatever context delivers an event: a
//! callback invocation or a dependency change folds every reducer that is
//! ready before it returns. Asynchronous stages (timers, I/O) wake a small
//! driver task which does the same on their behalf. Every snapshot is
//! published into a watch channel; the owner reads the latest value with
//! [`Binding::snapshot`] and awaits [`Binding::changed`] to know when to
//! evaluate again.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use std::task::{Context, Poll};

use futures::task::{waker, ArcWake};
use futures::StreamExt;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use tributary_streams::{emitter, Emitter};

use crate::callbacks::{Callbacks, Flush};
use crate::compose::{compose, Composed};
use crate::definition::{StateTimeline, StoreDefinition};
use crate::reducer::Snapshot;

/// Values an owner supplies on every evaluation to drive the dependency
/// channel. Compared with `==` against the previously pushed value; tuples
/// compare positionally, `Vec`s also compare lengths. No dependencies is `()`.
pub trait Dependencies: Clone + PartialEq + Send + 'static {}

impl<T: Clone + PartialEq + Send + 'static> Dependencies for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Live: invocations and dependency changes update the snapshot.
    Bound = 0,
    /// Every input ended. The last snapshot stays visible.
    Completed = 1,
    /// A channel failed. The last snapshot stays visible, frozen.
    Failed = 2,
    /// Released by the owner. Terminal.
    Released = 3,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Phase::Bound,
            1 => Phase::Completed,
            2 => Phase::Failed,
            _ => Phase::Released,
        }
    }
}

#[derive(Clone)]
struct PhaseCell(Arc<AtomicU8>);

impl PhaseCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(Phase::Bound as u8)))
    }

    fn get(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Leave `Bound` for `to`. No effect once the binding left `Bound`.
    fn settle(&self, to: Phase) {
        let _ = self.0.compare_exchange(
            Phase::Bound as u8,
            to as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn release(&self) -> Phase {
        Phase::from_u8(self.0.swap(Phase::Released as u8, Ordering::AcqRel))
    }
}

/// Wakes the driver task. Every poll of the visible timeline registers this
/// waker, whichever context the poll runs in.
struct Signal(Notify);

impl ArcWake for Signal {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.0.notify_one();
    }
}

/// The visible timeline and where its snapshots go. Dropped together as
/// soon as the timeline can never yield again, which closes every watch
/// receiver.
struct Live<S> {
    timeline: StateTimeline<S>,
    publisher: watch::Sender<S>,
}

/// Owns the live timeline and publishes what it yields.
struct Pump<S> {
    label: Arc<str>,
    live: Mutex<Option<Live<S>>>,
    phase: PhaseCell,
    signal: Arc<Signal>,
}

impl<S: Snapshot> Pump<S> {
    /// Poll the timeline until nothing is ready, publishing every snapshot.
    /// Returns `false` once the timeline can never yield again.
    ///
    /// If another context is draining already this returns immediately;
    /// whatever it missed wakes the signal.
    fn drain(&self) -> bool {
        let mut guard = match self.live.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return true,
            Err(TryLockError::Poisoned(_)) => {
                warn!(store = %self.label, "reducer panicked, store is now inert");
                self.phase.settle(Phase::Failed);
                return false;
            }
        };
        let Some(live) = guard.as_mut() else {
            return false;
        };

        let waker = waker(self.signal.clone());
        let mut cx = Context::from_waker(&waker);
        loop {
            match live.timeline.poll_next_unpin(&mut cx) {
                Poll::Ready(Some(Ok(state))) => {
                    live.publisher.send_replace(state);
                }
                Poll::Ready(Some(Err(error))) => {
                    warn!(store = %self.label, error = %error, "visible timeline failed, store is now inert");
                    *guard = None;
                    self.phase.settle(Phase::Failed);
                    return false;
                }
                Poll::Ready(None) => {
                    debug!(store = %self.label, "visible timeline completed");
                    *guard = None;
                    self.phase.settle(Phase::Completed);
                    return false;
                }
                Poll::Pending => return true,
            }
        }
    }
}

impl<S> Pump<S> {
    /// Drop the timeline and everything pending inside it.
    fn shut(&self) {
        let mut guard = match self.live.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }
}

impl<S: Snapshot> Flush for Pump<S> {
    fn flush(&self) {
        self.drain();
    }
}

async fn drive<S: Snapshot>(pump: Arc<Pump<S>>) {
    while pump.drain() {
        pump.signal.0.notified().await;
    }
}

/// One live instance of a store definition, owned by one owner lifetime.
///
/// Must be created, invoked and released inside a tokio runtime.
pub struct Binding<S, D = ()> {
    label: Arc<str>,
    callbacks: Callbacks,
    dependencies: Emitter<D>,
    last_dependencies: D,
    snapshot: watch::Receiver<S>,
    pump: Arc<Pump<S>>,
    driver: Option<JoinHandle<()>>,
}

impl<S: Snapshot, D: Dependencies> Binding<S, D> {
    /// Construct the instance: seed the dependency stream with `dependencies`,
    /// compose the graph and start driving the visible timeline.
    ///
    /// The snapshot is the definition's initial state until the timeline
    /// publishes something else.
    pub fn bind(definition: &StoreDefinition<S, D>, dependencies: D) -> Self {
        let label: Arc<str> = definition.label().into();
        let (dependency_emitter, dependency_stream) = emitter::<D>();
        let _ = dependency_emitter.emit(dependencies.clone());

        let Composed { callbacks, visible } = compose(definition, dependency_stream);
        let (publisher, snapshot) = watch::channel(definition.initial_state().clone());

        let pump = Arc::new(Pump {
            label: label.clone(),
            live: Mutex::new(Some(Live {
                timeline: visible,
                publisher,
            })),
            phase: PhaseCell::new(),
            signal: Arc::new(Signal(Notify::new())),
        });
        let callbacks = callbacks.with_flush(pump.clone());

        let span = info_span!("binding", store = %label);
        let driver = tokio::spawn(drive(pump.clone()).instrument(span));

        info!(store = %label, channels = ?callbacks, "store bound");

        Self {
            label,
            callbacks,
            dependencies: dependency_emitter,
            last_dependencies: dependencies,
            snapshot,
            pump,
            driver: Some(driver),
        }
    }

    /// Owner re-evaluated with `dependencies`. Pushes them into the
    /// dependency stream only if they differ from the last pushed value.
    /// Returns whether anything was pushed; nothing is once the binding left
    /// [`Phase::Bound`].
    pub fn re_evaluate(&mut self, dependencies: D) -> bool {
        if self.phase() != Phase::Bound || dependencies == self.last_dependencies {
            return false;
        }
        if self.dependencies.emit(dependencies.clone()).is_err() {
            debug!(store = %self.label, "dependency stream closed, change dropped");
            return false;
        }
        debug!(store = %self.label, "dependencies changed");
        self.last_dependencies = dependencies;
        self.pump.drain();
        true
    }

    /// Tear the instance down: complete the dependency stream and every
    /// channel, then drop the visible timeline. Pending asynchronous stages
    /// inside channels are dropped with it. Idempotent.
    pub fn release(&mut self) {
        if self.teardown() {
            info!(store = %self.label, "store released");
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Latest visible snapshot.
    pub fn snapshot(&self) -> S {
        self.snapshot.borrow().clone()
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn phase(&self) -> Phase {
        self.pump.phase.get()
    }

    pub fn dependencies(&self) -> &D {
        &self.last_dependencies
    }

    /// Wait until the visible timeline publishes a snapshot this binding has
    /// not seen yet. Returns `false` once nothing more will be published.
    pub async fn changed(&mut self) -> bool {
        self.snapshot.changed().await.is_ok()
    }

    /// Independent receiver of visible snapshots, for hosts that re-evaluate
    /// from elsewhere.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.snapshot.clone()
    }
}

impl<S, D> Binding<S, D> {
    /// Returns `false` if the binding was already released.
    fn teardown(&mut self) -> bool {
        if self.pump.phase.release() == Phase::Released {
            return false;
        }
        self.dependencies.complete();
        self.callbacks.close();
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        self.pump.shut();
        true
    }
}

impl<S, D> Drop for Binding<S, D> {
    fn drop(&mut self) {
        if self.teardown() {
            debug!(store = %self.label, "store released on drop");
        }
    }
}
