use std::time::Duration;

use anyhow::Result;
use futures::future;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tributary_store::{Binding, ChannelDefinition, Reducer, StoreDefinition};

use super::show;
use crate::config::DemoConfig;
use crate::operators::{switch_map, ticks};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StopwatchState {
    /// Elapsed running time in milliseconds.
    pub time: u64,
    pub splits: Vec<u64>,
    pub running: bool,
}

pub fn store(tick: Duration) -> Result<StoreDefinition<StopwatchState>> {
    let store = StoreDefinition::builder(StopwatchState::default())
        .named("stopwatch")
        .channel(
            "reset",
            ChannelDefinition::map(|()| Reducer::new(|_: StopwatchState| StopwatchState::default())),
        )
        .channel(
            "toggle",
            ChannelDefinition::new(move |toggles| {
                switch_map(toggles, move |(running,): (bool,)| {
                    if running {
                        ticks(tick)
                            .map(|delta| {
                                let delta = delta.as_millis() as u64;
                                Reducer::new(move |s: StopwatchState| StopwatchState {
                                    time: s.time + delta,
                                    running: true,
                                    ..s
                                })
                            })
                            .boxed()
                    } else {
                        stream::once(future::ready(Reducer::new(|s: StopwatchState| StopwatchState {
                            running: false,
                            ..s
                        })))
                        .boxed()
                    }
                })
                .map(Ok)
                .boxed()
            }),
        )
        .channel(
            "split",
            ChannelDefinition::map(|(now,): (u64,)| {
                Reducer::new(move |mut s: StopwatchState| {
                    s.splits.push(now);
                    s
                })
            }),
        )
        .build()?;
    Ok(store)
}

pub async fn run(config: &DemoConfig) -> Result<()> {
    let store = store(config.tick)?;
    let mut binding = Binding::bind(&store, ());
    let callbacks = binding.callbacks().clone();
    let lap = config.tick * 25;

    callbacks.invoke("toggle", (true,))?;
    for _ in 0..2 {
        tokio::time::sleep(lap).await;
        callbacks.invoke("split", (binding.snapshot().time,))?;
        show("stopwatch", "split", &binding.snapshot())?;
    }

    callbacks.invoke("toggle", (false,))?;
    show("stopwatch", "stopped", &binding.snapshot())?;

    callbacks.invoke("reset", ())?;
    show("stopwatch", "reset", &binding.snapshot())?;

    binding.release();
    Ok(())
}
