use std::time::Duration;

use anyhow::Result;
use futures::future;
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::Serialize;
use tracing::debug;
use tributary_store::{Binding, ChannelDefinition, Reducer, StoreDefinition};

use super::{show, wait_for};
use crate::config::DemoConfig;
use crate::operators::{delay, switch_map};

/// `valid` keeps its previous value while a check is in flight.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FormState {
    pub name: Option<String>,
    pub email: Option<String>,
    pub valid: bool,
}

/// Every new snapshot restarts the email check; the visible `valid` follows
/// the latest completed check only and is never folded into the state.
pub fn store(validation_delay: Duration) -> Result<StoreDefinition<FormState>> {
    let email_pattern = Regex::new(r"^\S+@\S+$")?;

    let store = StoreDefinition::builder(FormState::default())
        .named("form")
        .channel(
            "setName",
            ChannelDefinition::map(|(name,): (String,)| {
                Reducer::new(move |s: FormState| FormState {
                    name: Some(name.clone()),
                    ..s
                })
            }),
        )
        .channel(
            "setEmail",
            ChannelDefinition::map(|(email,): (String,)| {
                Reducer::new(move |s: FormState| FormState {
                    email: Some(email.clone()),
                    ..s
                })
            }),
        )
        .output_channel(ChannelDefinition::new(move |snapshots| {
            let email_pattern = email_pattern.clone();
            let checks = switch_map(snapshots, move |state: FormState| {
                let valid = email_pattern.is_match(state.email.as_deref().unwrap_or_default());
                debug!(email = ?state.email, valid, "validating");
                delay(stream::once(future::ready(valid)).boxed(), validation_delay)
            });
            checks
                .map(|valid| Ok(Reducer::new(move |latest: FormState| FormState { valid, ..latest })))
                .boxed()
        }))
        .build()?;
    Ok(store)
}

pub async fn run(config: &DemoConfig) -> Result<()> {
    let store = store(config.validation_delay)?;
    let mut binding = Binding::bind(&store, ());
    show("form", "initial", &binding.snapshot())?;

    let callbacks = binding.callbacks().clone();
    callbacks.invoke("setName", ("Ada".to_string(),))?;
    callbacks.invoke("setEmail", ("ada@example.org".to_string(),))?;
    show("form", "typed", &binding.snapshot())?;

    let checked = wait_for(&mut binding, |s| s.valid).await?;
    show("form", "validated", &checked)?;

    callbacks.invoke("setEmail", ("ada at example".to_string(),))?;
    let checked = wait_for(&mut binding, |s| !s.valid).await?;
    show("form", "revalidated", &checked)?;

    binding.release();
    Ok(())
}
