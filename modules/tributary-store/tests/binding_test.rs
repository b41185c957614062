//! Integration tests for the binding lifecycle: bind, re-evaluate, release.
//! Time-based scenarios run on a paused tokio clock.

use std::time::Duration;

use anyhow::anyhow;
use futures::stream::{self, StreamExt};
use tokio::time::{advance, sleep};
use tributary_store::{Binding, ChannelDefinition, Phase, Reducer, StoreDefinition};

/// Let the binding's driver task catch up with woken timers.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Counter {
    count: i64,
}

fn step(by: i64) -> ChannelDefinition<Counter, ()> {
    ChannelDefinition::map(move |()| Reducer::new(move |s: Counter| Counter { count: s.count + by }))
}

fn counter_store() -> StoreDefinition<Counter> {
    StoreDefinition::builder(Counter { count: 0 })
        .named("counter")
        .channel("increment", step(1))
        .channel("decrement", step(-1))
        .channel(
            "delayedIncrement",
            ChannelDefinition::new(|calls| {
                calls
                    .flat_map(|()| {
                        let now = stream::once(async { Ok(Reducer::new(|s: Counter| Counter { count: s.count + 1 })) });
                        let later = stream::once(async {
                            sleep(Duration::from_millis(1000)).await;
                            Ok(Reducer::new(|s: Counter| Counter { count: s.count + 1 }))
                        });
                        now.chain(later)
                    })
                    .boxed()
            }),
        )
        .channel(
            "boom",
            ChannelDefinition::try_map(|()| Err(anyhow!("counter overheated"))),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn initial_snapshot_is_visible_right_after_bind() {
    let binding = Binding::bind(&counter_store(), ());
    assert_eq!(binding.snapshot(), Counter { count: 0 });
    assert_eq!(binding.phase(), Phase::Bound);

    let names: Vec<&str> = binding.callbacks().names().collect();
    assert_eq!(names, vec!["increment", "decrement", "delayedIncrement", "boom"]);
}

#[tokio::test]
async fn invocations_fold_before_the_call_returns() {
    let binding = Binding::bind(&counter_store(), ());
    let callbacks = binding.callbacks().clone();

    callbacks.invoke("increment", ()).unwrap();
    assert_eq!(binding.snapshot(), Counter { count: 1 });
    callbacks.invoke("increment", ()).unwrap();
    assert_eq!(binding.snapshot(), Counter { count: 2 });
    callbacks.invoke("decrement", ()).unwrap();
    assert_eq!(binding.snapshot(), Counter { count: 1 });
}

#[tokio::test(start_paused = true)]
async fn delayed_reducer_lands_after_its_delay() {
    let binding = Binding::bind(&counter_store(), ());
    let delayed = binding.callbacks().callback::<()>("delayedIncrement").unwrap();

    delayed.call(());
    assert_eq!(binding.snapshot().count, 1);

    advance(Duration::from_millis(999)).await;
    settle().await;
    assert_eq!(binding.snapshot().count, 1);

    advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(binding.snapshot().count, 2);
}

#[tokio::test(start_paused = true)]
async fn owner_is_told_about_asynchronous_updates() {
    let mut binding = Binding::bind(&counter_store(), ());
    binding.callbacks().invoke("delayedIncrement", ()).unwrap();
    assert_eq!(binding.snapshot().count, 1);

    // Paused time auto-advances to the pending timer while we wait.
    assert!(binding.changed().await);
    while binding.snapshot().count < 2 {
        assert!(binding.changed().await);
    }
    assert_eq!(binding.snapshot().count, 2);
}

#[tokio::test]
async fn failure_leaves_the_binding_inert() {
    let binding = Binding::bind(&counter_store(), ());
    let callbacks = binding.callbacks().clone();

    callbacks.invoke("increment", ()).unwrap();
    callbacks.invoke("boom", ()).unwrap();
    assert_eq!(binding.phase(), Phase::Failed);
    assert_eq!(binding.snapshot(), Counter { count: 1 });

    callbacks.invoke("increment", ()).unwrap();
    callbacks.invoke("decrement", ()).unwrap();
    assert_eq!(binding.snapshot(), Counter { count: 1 });
}

#[tokio::test(start_paused = true)]
async fn release_stops_every_update() {
    let mut binding = Binding::bind(&counter_store(), ());
    let increment = binding.callbacks().callback::<()>("increment").unwrap();
    let mut updates = binding.subscribe();

    increment.call(());
    binding.callbacks().invoke("delayedIncrement", ()).unwrap();
    assert_eq!(binding.snapshot().count, 2);

    binding.release();
    assert_eq!(binding.phase(), Phase::Released);

    increment.call(());
    binding.callbacks().invoke("decrement", ()).unwrap();
    advance(Duration::from_millis(2000)).await;
    settle().await;
    assert_eq!(binding.snapshot().count, 2);

    let _ = updates.borrow_and_update();
    assert!(updates.changed().await.is_err());

    binding.release();
    assert_eq!(binding.phase(), Phase::Released);
}

#[tokio::test]
async fn dropping_the_binding_releases_it() {
    let binding = Binding::bind(&counter_store(), ());
    let increment = binding.callbacks().callback::<()>("increment").unwrap();
    let updates = binding.subscribe();

    increment.call(());
    drop(binding);
    increment.call(());
    assert_eq!(updates.borrow().count, 1);
}

#[tokio::test]
async fn store_without_inputs_completes() {
    let binding = Binding::bind(&StoreDefinition::builder(Counter { count: 7 }).build().unwrap(), ());
    settle().await;
    assert_eq!(binding.phase(), Phase::Completed);
    assert_eq!(binding.snapshot(), Counter { count: 7 });
}

// ---------------------------------------------------------------------------
// Ordering across channels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
struct Trail {
    entries: Vec<String>,
}

fn append(tag: &'static str) -> ChannelDefinition<Trail, (String,)> {
    ChannelDefinition::map(move |(entry,): (String,)| {
        Reducer::new(move |mut s: Trail| {
            s.entries.push(format!("{tag}:{entry}"));
            s
        })
    })
}

#[tokio::test]
async fn two_channels_apply_in_invocation_order() {
    let store = StoreDefinition::builder(Trail::default())
        .channel("first", append("c1"))
        .channel("second", append("c2"))
        .build()
        .unwrap();
    let binding = Binding::bind(&store, ());
    let callbacks = binding.callbacks();

    callbacks.invoke("second", ("x".to_string(),)).unwrap();
    callbacks.invoke("first", ("y".to_string(),)).unwrap();
    callbacks.invoke("second", ("z".to_string(),)).unwrap();

    assert_eq!(binding.snapshot().entries, vec!["c2:x", "c1:y", "c2:z"]);
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
struct Record {
    a: String,
    b: String,
    pushes: Vec<String>,
}

fn record_store() -> StoreDefinition<Record, (String,)> {
    StoreDefinition::builder(Record::default())
        .named("record")
        .channel(
            "setA",
            ChannelDefinition::map(|(a,): (String,)| Reducer::new(move |s: Record| Record { a: a.clone(), ..s })),
        )
        .channel(
            "suffixB",
            ChannelDefinition::map(|()| Reducer::new(|s: Record| Record { b: s.b.clone() + "!", ..s })),
        )
        .channel(
            "boom",
            ChannelDefinition::try_map(|()| Err(anyhow!("record corrupted"))),
        )
        .dependency_channel(ChannelDefinition::map(|(id,): (String,)| {
            Reducer::new(move |mut s: Record| {
                s.pushes.push(id.clone());
                s.b = id.clone();
                s
            })
        }))
        .build()
        .unwrap()
}

#[tokio::test]
async fn dependency_channel_fires_once_on_bind() {
    let binding = Binding::bind(&record_store(), ("1".to_string(),));
    settle().await;
    assert_eq!(binding.snapshot().pushes, vec!["1"]);
    assert_eq!(binding.snapshot().b, "1");
}

#[tokio::test]
async fn seeded_dependencies_apply_before_the_first_invocation() {
    let binding = Binding::bind(&record_store(), ("1".to_string(),));
    binding.callbacks().invoke("suffixB", ()).unwrap();

    let snapshot = binding.snapshot();
    assert_eq!(snapshot.b, "1!");
    assert_eq!(snapshot.pushes, vec!["1"]);
}

#[tokio::test]
async fn empty_dependency_tuple_fires_once() {
    #[derive(Debug, Clone, PartialEq, Default)]
    struct Mounts {
        fired: u32,
    }

    let store = StoreDefinition::builder(Mounts::default())
        .dependency_channel(ChannelDefinition::map(|()| {
            Reducer::new(|s: Mounts| Mounts { fired: s.fired + 1 })
        }))
        .build()
        .unwrap();

    let mut binding = Binding::bind(&store, ());
    settle().await;
    assert_eq!(binding.snapshot().fired, 1);

    for _ in 0..3 {
        assert!(!binding.re_evaluate(()));
    }
    settle().await;
    assert_eq!(binding.snapshot().fired, 1);
}

#[tokio::test]
async fn only_changed_dependencies_are_pushed() {
    let mut binding = Binding::bind(&record_store(), ("a".to_string(),));
    settle().await;

    assert!(!binding.re_evaluate(("a".to_string(),)));
    assert_eq!(binding.snapshot().pushes, vec!["a"]);

    assert!(binding.re_evaluate(("b".to_string(),)));
    assert_eq!(binding.snapshot().pushes, vec!["a", "b"]);
    assert_eq!(binding.dependencies(), &("b".to_string(),));

    assert!(!binding.re_evaluate(("b".to_string(),)));
    assert_eq!(binding.snapshot().pushes, vec!["a", "b"]);
}

#[tokio::test]
async fn dependency_change_resets_only_its_field() {
    let mut binding = Binding::bind(&record_store(), ("1".to_string(),));
    binding.callbacks().invoke("setA", ("kept".to_string(),)).unwrap();
    assert_eq!(binding.snapshot().b, "1");

    binding.re_evaluate(("2".to_string(),));
    let snapshot = binding.snapshot();
    assert_eq!(snapshot.b, "2");
    assert_eq!(snapshot.a, "kept");
}

#[tokio::test]
async fn released_binding_ignores_dependencies() {
    let mut binding = Binding::bind(&record_store(), ("1".to_string(),));
    settle().await;
    binding.release();
    assert!(!binding.re_evaluate(("2".to_string(),)));
    assert_eq!(binding.snapshot().b, "1");
}

#[tokio::test]
async fn failed_binding_ignores_dependencies() {
    let mut binding = Binding::bind(&record_store(), ("1".to_string(),));
    binding.callbacks().invoke("boom", ()).unwrap();
    assert_eq!(binding.phase(), Phase::Failed);

    assert!(!binding.re_evaluate(("2".to_string(),)));
    assert_eq!(binding.dependencies(), &("1".to_string(),));
    assert_eq!(binding.snapshot().b, "1");
}

#[tokio::test(start_paused = true)]
async fn external_stream_merges_into_the_dependency_channel() {
    #[derive(Debug, Clone, PartialEq, Default)]
    struct Clock {
        owner: u32,
        ticks: u32,
    }

    let store = StoreDefinition::builder(Clock::default())
        .dependency_channel(ChannelDefinition::new(|deps| {
            let owner = deps.map(|(owner,): (u32,)| Ok(Reducer::new(move |s: Clock| Clock { owner, ..s })));
            let ticks = stream::unfold((), |()| async {
                sleep(Duration::from_millis(100)).await;
                Some((Ok(Reducer::new(|s: Clock| Clock { ticks: s.ticks + 1, ..s })), ()))
            });
            stream::select(owner, ticks).boxed()
        }))
        .build()
        .unwrap();

    let mut binding = Binding::bind(&store, (1,));
    settle().await;
    assert_eq!(binding.snapshot(), Clock { owner: 1, ticks: 0 });

    advance(Duration::from_millis(100)).await;
    settle().await;
    assert_eq!(binding.snapshot().ticks, 1);

    binding.re_evaluate((2,));
    assert_eq!(binding.snapshot(), Clock { owner: 2, ticks: 1 });

    advance(Duration::from_millis(100)).await;
    settle().await;
    assert_eq!(binding.snapshot().ticks, 2);

    binding.release();
    advance(Duration::from_millis(300)).await;
    settle().await;
    assert_eq!(binding.snapshot().ticks, 2);
}

// ---------------------------------------------------------------------------
// Output channel: delayed derived field
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
struct Form {
    name: Option<String>,
    email: Option<String>,
    valid: bool,
}

fn form_store() -> StoreDefinition<Form> {
    StoreDefinition::builder(Form::default())
        .named("form")
        .channel(
            "setName",
            ChannelDefinition::map(|(name,): (String,)| {
                Reducer::new(move |s: Form| Form { name: Some(name.clone()), ..s })
            }),
        )
        .channel(
            "setEmail",
            ChannelDefinition::map(|(email,): (String,)| {
                Reducer::new(move |s: Form| Form { email: Some(email.clone()), ..s })
            }),
        )
        .output_channel(ChannelDefinition::new(|snapshots| {
            snapshots
                .filter_map(|s: Form| async move { s.email })
                .then(|email| async move {
                    sleep(Duration::from_millis(1000)).await;
                    let valid = email.contains('@');
                    Ok(Reducer::new(move |s: Form| Form { valid, ..s }))
                })
                .boxed()
        }))
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn derived_field_waits_for_its_validation() {
    let binding = Binding::bind(&form_store(), ());
    let callbacks = binding.callbacks().clone();

    callbacks.invoke("setEmail", ("a@b.c".to_string(),)).unwrap();
    assert_eq!(binding.snapshot().email.as_deref(), Some("a@b.c"));
    assert!(!binding.snapshot().valid);

    advance(Duration::from_millis(999)).await;
    settle().await;
    assert!(!binding.snapshot().valid);

    advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(
        binding.snapshot(),
        Form {
            name: None,
            email: Some("a@b.c".into()),
            valid: true,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn stale_validation_is_reapplied_to_newer_input() {
    let binding = Binding::bind(&form_store(), ());
    let callbacks = binding.callbacks().clone();

    callbacks.invoke("setEmail", ("a@b.c".to_string(),)).unwrap();
    advance(Duration::from_millis(1000)).await;
    settle().await;
    assert!(binding.snapshot().valid);

    // The base changes; the latest view still applies until a new one lands.
    callbacks.invoke("setEmail", ("nope".to_string(),)).unwrap();
    assert_eq!(binding.snapshot().email.as_deref(), Some("nope"));
    assert!(binding.snapshot().valid);

    advance(Duration::from_millis(1000)).await;
    settle().await;
    assert!(!binding.snapshot().valid);

    callbacks.invoke("setName", ("Bob".to_string(),)).unwrap();
    let snapshot = binding.snapshot();
    assert_eq!(snapshot.name.as_deref(), Some("Bob"));
    assert_eq!(snapshot.email.as_deref(), Some("nope"));
    assert!(!snapshot.valid);
}

#[tokio::test]
async fn output_failure_makes_the_binding_inert() {
    let store = StoreDefinition::builder(Counter { count: 0 })
        .channel("increment", step(1))
        .output_channel(ChannelDefinition::new(|snapshots| {
            snapshots
                .filter(|s: &Counter| futures::future::ready(s.count >= 2))
                .map(|_| Err(anyhow!("view crashed")))
                .boxed()
        }))
        .build()
        .unwrap();
    let binding = Binding::bind(&store, ());
    let callbacks = binding.callbacks().clone();

    callbacks.invoke("increment", ()).unwrap();
    callbacks.invoke("increment", ()).unwrap();
    assert_eq!(binding.phase(), Phase::Failed);
    assert_eq!(binding.snapshot().count, 2);

    callbacks.invoke("increment", ()).unwrap();
    assert_eq!(binding.snapshot().count, 2);
}
