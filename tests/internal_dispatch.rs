//! Events raised by callbacks while the machine is busy.

mod common;

use common::{eventually, init_tracing};
use statecraft::prelude::*;
use statecraft::trace::{MachineLogger, StateCounter};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn counts(pairs: &[(&str, u64)]) -> HashMap<String, u64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// off --on--> on, whose effect raises `error`; on --error--> error.
fn dispatch_from_effect(builder: &mut MachineBuilder<()>) {
    let off = builder.new_state("off");
    let on = builder.new_state("on");
    let error = builder.new_state("error");
    builder.initial_state().add_transition(&off);

    off.add_transition(&on)
        .on_event("on")
        .effect(|_, _, dispatcher| dispatcher.dispatch(Event::new("error")));
    on.add_transition(&off).on_event("off");
    on.add_transition(&error).on_event("error");
}

/// Leaving `on` raises `error`, and entering `error` raises `fixit`.
fn dispatch_from_entry_and_exit(builder: &mut MachineBuilder<()>) {
    let off = builder.new_state("off");
    let on = builder.new_state("on");
    let error = builder.new_state("error");
    let fixing = builder.new_state("fixing");
    builder.initial_state().add_transition(&off);

    off.add_transition(&error).on_event("error");
    off.add_transition(&on).on_event("on");
    on.add_transition(&off).on_event("off");
    on.on_exit(|_, _, dispatcher| dispatcher.dispatch(Event::new("error")));
    error.on_entry(|_, _, dispatcher| dispatcher.dispatch(Event::new("fixit")));
    error.add_transition(&fixing).on_event("fixit");
}

#[test]
fn immediate_effect_dispatch_completes_before_returning() {
    let counter = Arc::new(StateCounter::new());
    let mut builder = MachineBuilder::new(());
    dispatch_from_effect(&mut builder);
    builder.add_tracer(counter.clone());
    let machine = builder.build_immediate().unwrap();
    machine.start().unwrap();
    assert_eq!(machine.current_state().name(), "off");

    machine.dispatch(Event::new("on"));

    assert_eq!(machine.current_state().name(), "error");
    assert_eq!(
        counter.state_counts(),
        counts(&[("initial", 1), ("off", 1), ("on", 1), ("error", 1)])
    );
}

#[test]
fn immediate_entry_and_exit_dispatch_chain() {
    let counter = Arc::new(StateCounter::new());
    let mut builder = MachineBuilder::new(());
    dispatch_from_entry_and_exit(&mut builder);
    builder.add_tracer(counter.clone());
    let machine = builder.build_immediate().unwrap();
    machine.start().unwrap();

    machine.dispatch(Event::new("on"));
    assert_eq!(machine.current_state().name(), "on");
    machine.dispatch(Event::new("off"));

    assert_eq!(machine.current_state().name(), "fixing");
    assert_eq!(
        counter.state_counts(),
        counts(&[("initial", 1), ("off", 2), ("on", 1), ("error", 1), ("fixing", 1)])
    );
    assert!(counter.rejected_event_counts().is_empty());
}

#[test]
fn dispatch_from_start_entry_is_processed_after_settling() {
    let mut builder = MachineBuilder::new(());
    let idle = builder.new_state("idle");
    let busy = builder.new_state("busy");
    builder.initial_state().add_transition(&idle);
    idle.on_entry(|_, _, dispatcher| dispatcher.dispatch(Event::new("work")));
    idle.add_transition(&busy).on_event("work");
    let machine = builder.build_immediate().unwrap();

    machine.start().unwrap();

    assert_eq!(machine.current_state().name(), "busy");
}

#[tokio::test(flavor = "multi_thread")]
async fn threaded_effect_dispatch() {
    init_tracing();
    let counter = Arc::new(StateCounter::new());
    let mut builder = MachineBuilder::new(());
    dispatch_from_effect(&mut builder);
    builder.add_tracer(counter.clone());
    let machine = builder.build_threaded().unwrap();
    machine.start().unwrap();
    assert_eq!(machine.current_state().name(), "off");

    machine.dispatch(Event::new("on"));

    assert!(eventually(Duration::from_secs(2), || machine.current_state().name() == "error").await);
    assert_eq!(
        counter.state_counts(),
        counts(&[("initial", 1), ("off", 1), ("on", 1), ("error", 1)])
    );
    assert!(counter.rejected_event_counts().is_empty());
    machine.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn threaded_entry_and_exit_dispatch_chain() {
    init_tracing();
    let counter = Arc::new(StateCounter::new());
    let logger = Arc::new(MachineLogger::new());
    let mut builder = MachineBuilder::new(());
    dispatch_from_entry_and_exit(&mut builder);
    builder.add_tracer(counter.clone()).add_tracer(logger.clone());
    let machine = builder.build_threaded().unwrap();
    machine.start().unwrap();
    assert_eq!(machine.current_state().name(), "off");

    machine.dispatch(Event::new("on"));
    assert!(eventually(Duration::from_secs(2), || machine.current_state().name() == "on").await);
    machine.dispatch(Event::new("off"));
    assert!(eventually(Duration::from_secs(2), || machine.current_state().name() == "fixing").await);

    assert_eq!(
        counter.state_counts(),
        counts(&[("initial", 1), ("off", 2), ("on", 1), ("error", 1), ("fixing", 1)])
    );
    assert!(counter.rejected_event_counts().is_empty());
    assert!(!logger.is_empty());
    machine.stop();
}
