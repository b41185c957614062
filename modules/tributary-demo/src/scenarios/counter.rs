use anyhow::Result;
use serde::Serialize;
use tributary_store::{BindingRegistry, BindingSite, ChannelDefinition, Reducer, StoreDefinition};

use super::show;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterState {
    pub a_number: i64,
    pub a_string: String,
}

pub fn store() -> Result<StoreDefinition<CounterState>> {
    let store = StoreDefinition::builder(CounterState::default())
        .named("counter")
        .channel(
            "increment",
            ChannelDefinition::map(|()| {
                Reducer::new(|s: CounterState| CounterState {
                    a_number: s.a_number + 1,
                    ..s
                })
            }),
        )
        .channel(
            "decrement",
            ChannelDefinition::map(|()| {
                Reducer::new(|s: CounterState| CounterState {
                    a_number: s.a_number - 1,
                    ..s
                })
            }),
        )
        .channel(
            "scream",
            ChannelDefinition::map(|(text,): (String,)| {
                Reducer::new(move |s: CounterState| CounterState {
                    a_string: s.a_string + &text.to_uppercase(),
                    ..s
                })
            }),
        )
        .build()?;
    Ok(store)
}

/// Replays a component that re-renders after every click: each render binds
/// the same site again and gets the live instance back.
pub async fn run() -> Result<()> {
    let store = store()?;
    let site = BindingSite::new();
    let mut registry = BindingRegistry::new();

    let (callbacks, snapshot) = registry.bind(site, &store, ());
    show("counter", "initial", &snapshot)?;

    let clicks: [(&str, Option<&str>); 4] = [
        ("increment", None),
        ("increment", None),
        ("decrement", None),
        ("scream", Some("aaaaa")),
    ];
    for (channel, text) in clicks {
        match text {
            Some(text) => callbacks.invoke(channel, (text.to_string(),))?,
            None => callbacks.invoke(channel, ())?,
        }
        let (_, snapshot) = registry.bind(site, &store, ());
        show("counter", channel, &snapshot)?;
    }

    registry.release_all();
    Ok(())
}
