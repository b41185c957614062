use std::time::Duration;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use regex::RegexBuilder;
use serde::Serialize;
use tracing::debug;
use tributary_store::{Binding, ChannelDefinition, Reducer, StoreDefinition};
use tributary_streams::emitter;

use super::{show, wait_for};
use crate::config::DemoConfig;
use crate::operators::debounce;

pub const CORVIDAE: [&str; 8] = ["Crow", "Raven", "Rook", "Jackdaw", "Jay", "Magpie", "Treepie", "Chough"];

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerState {
    pub current_value: Option<String>,
    pub is_searching: Option<bool>,
    pub autocompletion_results: Option<Vec<String>>,
    pub selected: Option<String>,
}

/// Birds whose name contains `pattern`, ignoring case.
pub fn search(pattern: &str) -> Result<Vec<String>> {
    let matcher = RegexBuilder::new(&regex::escape(pattern))
        .case_insensitive(true)
        .build()?;
    Ok(CORVIDAE
        .iter()
        .filter(|name| matcher.is_match(name))
        .map(|name| name.to_string())
        .collect())
}

/// The dependency tuple carries the selection the host currently wants
/// shown, if any.
pub fn store(quiet: Duration) -> Result<StoreDefinition<PickerState, (Option<String>,)>> {
    let store = StoreDefinition::builder(PickerState::default())
        .named("corvid-picker")
        .channel(
            "pick",
            ChannelDefinition::map(|(corvid,): (String,)| {
                Reducer::new(move |s: PickerState| PickerState {
                    selected: Some(corvid.clone()),
                    ..s
                })
            }),
        )
        .channel(
            "textChanged",
            ChannelDefinition::new(move |texts| {
                // Every keystroke shows up at once; the search only runs
                // once typing pauses.
                let (typed, settled) = emitter::<String>();
                let immediate = texts.map(move |(text,): (String,)| {
                    let _ = typed.emit(text.clone());
                    Ok(Reducer::new(move |s: PickerState| PickerState {
                        current_value: Some(text.clone()),
                        is_searching: Some(true),
                        ..s
                    }))
                });
                let searched = debounce(settled, quiet).map(|text| -> Result<Reducer<PickerState>> {
                    let results = search(&text)?;
                    debug!(%text, hits = results.len(), "corvid search");
                    Ok(Reducer::new(move |s: PickerState| PickerState {
                        is_searching: Some(false),
                        autocompletion_results: Some(results.clone()),
                        ..s
                    }))
                });
                stream::select(immediate, searched).boxed()
            }),
        )
        .dependency_channel(ChannelDefinition::map(|(selected,): (Option<String>,)| {
            Reducer::new(move |s: PickerState| PickerState {
                selected: selected.clone(),
                ..s
            })
        }))
        .build()?;
    Ok(store)
}

pub async fn run(config: &DemoConfig) -> Result<()> {
    let store = store(config.debounce)?;
    let mut binding = Binding::bind(&store, (None,));
    let callbacks = binding.callbacks().clone();

    for text in ["r", "ro", "roo"] {
        callbacks.invoke("textChanged", (text.to_string(),))?;
        show("corvids", "typing", &binding.snapshot())?;
    }
    let found = wait_for(&mut binding, |s| s.is_searching == Some(false)).await?;
    show("corvids", "results", &found)?;

    let first = found.autocompletion_results.and_then(|hits| hits.into_iter().next());
    if let Some(corvid) = first {
        callbacks.invoke("pick", (corvid,))?;
        show("corvids", "picked", &binding.snapshot())?;
    }

    // The host overrides the selection through the dependency tuple.
    binding.re_evaluate((Some("Magpie".to_string()),));
    show("corvids", "host selected", &binding.snapshot())?;

    binding.release();
    Ok(())
}
