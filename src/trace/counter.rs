//! Entry and rejection counting.

use super::Tracer;
use crate::core::{Event, State};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Counts entries per state name and rejected events per event name.
///
/// # Example
///
/// ```rust
/// use statecraft::prelude::*;
/// use statecraft::trace::StateCounter;
/// use std::sync::Arc;
///
/// let counter = Arc::new(StateCounter::new());
/// let mut builder = MachineBuilder::new(());
/// let idle = builder.new_state("idle");
/// builder.initial_state().add_transition(&idle);
/// builder.add_tracer(counter.clone());
///
/// let machine = builder.build_immediate().unwrap();
/// machine.start().unwrap();
/// machine.dispatch(Event::new("Unknown"));
///
/// assert_eq!(counter.state_counts()["idle"], 1);
/// assert_eq!(counter.rejected_event_counts()["Unknown"], 1);
/// ```
#[derive(Debug, Default)]
pub struct StateCounter {
    counts: Mutex<Counts>,
}

#[derive(Debug, Default)]
struct Counts {
    states: HashMap<String, u64>,
    rejected: HashMap<String, u64>,
}

impl StateCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of entries per state name.
    pub fn state_counts(&self) -> HashMap<String, u64> {
        self.counts.lock().states.clone()
    }

    /// Snapshot of rejections per event name.
    pub fn rejected_event_counts(&self) -> HashMap<String, u64> {
        self.counts.lock().rejected.clone()
    }

    pub fn entries_of(&self, state: &str) -> u64 {
        self.counts.lock().states.get(state).copied().unwrap_or(0)
    }
}

impl<D> Tracer<D> for StateCounter {
    fn on_entry(&self, state: &State<D>, _data: &D) {
        *self
            .counts
            .lock()
            .states
            .entry(state.name().to_string())
            .or_default() += 1;
    }

    fn on_rejected_event(&self, event: &Event, _state: &State<D>, _data: &D) {
        *self
            .counts
            .lock()
            .rejected
            .entry(event.name().to_string())
            .or_default() += 1;
    }
}
