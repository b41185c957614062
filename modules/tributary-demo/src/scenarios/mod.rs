//! Example sessions. Each one plays the owner of a store: binds it, invokes
//! its channels the way a user would and prints what becomes visible.

pub mod corvids;
pub mod counter;
pub mod form;
pub mod stopwatch;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::info;
use tributary_store::{Binding, Dependencies, Snapshot};

use crate::config::{DemoConfig, Scenario};

pub async fn run(scenario: Scenario, config: &DemoConfig) -> Result<()> {
    for one in scenario.expand() {
        info!(scenario = %one, "running scenario");
        match one {
            Scenario::Counter => counter::run().await?,
            Scenario::Form => form::run(config).await?,
            Scenario::Stopwatch => stopwatch::run(config).await?,
            Scenario::Corvids => corvids::run(config).await?,
            Scenario::All => {}
        }
    }
    Ok(())
}

/// Print one visible snapshot as JSON.
fn show<S: Serialize>(scenario: &str, step: &str, snapshot: &S) -> Result<()> {
    println!("[{scenario}] {step}: {}", serde_json::to_string(snapshot)?);
    Ok(())
}

/// Re-evaluate on every published snapshot until `done` holds.
async fn wait_for<S, D, F>(binding: &mut Binding<S, D>, mut done: F) -> Result<S>
where
    S: Snapshot,
    D: Dependencies,
    F: FnMut(&S) -> bool,
{
    loop {
        let snapshot = binding.snapshot();
        if done(&snapshot) {
            return Ok(snapshot);
        }
        if !binding.changed().await {
            bail!("store {} stopped updating ({:?})", binding.label(), binding.phase());
        }
    }
}
