//! Observers of a running machine.
//!
//! Tracers are called synchronously, on whichever thread is running the
//! machine, at fixed points of every step:
//!
//! - `on_exit` after the exit action of the state being left;
//! - `on_transition` for every transition taken, local ones included;
//! - `on_entry` after the entry action of the state being entered;
//! - `on_rejected_event` when an event matches no transition.
//!
//! A tracer must not block for long: on a threaded machine it runs while
//! the engine lock is held.

mod counter;
mod logger;

pub use counter::StateCounter;
pub use logger::{LogEntry, LogKind, MachineLogger};

use crate::core::{Event, State};

/// Hooks called by both engines. Every method defaults to doing nothing.
pub trait Tracer<D>: Send + Sync {
    fn on_entry(&self, _state: &State<D>, _data: &D) {}

    fn on_exit(&self, _state: &State<D>, _data: &D) {}

    /// `event` is `None` for eventless and timer-triggered transitions.
    fn on_transition(&self, _event: Option<&Event>, _source: &State<D>, _target: &State<D>, _data: &D) {}

    fn on_rejected_event(&self, _event: &Event, _state: &State<D>, _data: &D) {}
}
