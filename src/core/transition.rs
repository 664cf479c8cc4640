//! Finalized transitions between states.

use super::dispatch::Dispatcher;
use super::event::Event;
use super::guard::Guard;
use super::state::StateId;
use super::trigger::Trigger;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Side effect run when a transition is taken, before any exit or entry
/// action. Receives the triggering event, or `None` for eventless and
/// timer-triggered transitions.
pub type Effect<D> = Arc<dyn Fn(Option<&Event>, &D, &dyn Dispatcher) + Send + Sync>;

/// Descriptive labels attached to the parts of a transition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionLabels {
    pub transition: Vec<String>,
    pub trigger: Vec<String>,
    pub guard: Vec<String>,
    pub effect: Vec<String>,
}

/// A directed edge between two states of a finalized machine.
///
/// Everything except a timer trigger's live deadline is fixed at build time.
pub struct Transition<D> {
    source: StateId,
    target: StateId,
    trigger: Trigger,
    guard: Guard<D>,
    effect: Option<Effect<D>>,
    labels: TransitionLabels,
    deadline: Mutex<Option<Instant>>,
}

impl<D> Transition<D> {
    pub(crate) fn new(
        source: StateId,
        target: StateId,
        trigger: Trigger,
        guard: Guard<D>,
        effect: Option<Effect<D>>,
        labels: TransitionLabels,
    ) -> Self {
        Self {
            source,
            target,
            trigger,
            guard,
            effect,
            labels,
            deadline: Mutex::new(None),
        }
    }

    pub fn source(&self) -> StateId {
        self.source
    }

    pub fn target(&self) -> StateId {
        self.target
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// A local transition leaves and re-enters nothing: only its effect and
    /// the transition trace fire.
    pub fn is_local(&self) -> bool {
        self.source == self.target
    }

    pub fn labels(&self) -> &TransitionLabels {
        &self.labels
    }

    pub fn has_effect(&self) -> bool {
        self.effect.is_some()
    }

    /// When a timer transition becomes eligible, if its source state is
    /// currently entered. Always `None` for other trigger kinds.
    pub fn deadline(&self) -> Option<Instant> {
        *self.deadline.lock()
    }

    /// Whether `event` takes this transition. Only event triggers match.
    pub(crate) fn accepts_event(&self, event: &Event, data: &D) -> bool {
        match &self.trigger {
            Trigger::Event(name) => name == event.name() && self.guard.check(data, event.payload()),
            _ => false,
        }
    }

    /// Whether this transition may fire without an event at `now`.
    pub(crate) fn accepts_without_event(&self, data: &D, now: Instant) -> bool {
        match &self.trigger {
            Trigger::Event(_) => false,
            Trigger::None => self.guard.check(data, None),
            Trigger::Timer(_) => {
                self.deadline().is_some_and(|deadline| now >= deadline)
                    && self.guard.check(data, None)
            }
        }
    }

    pub(crate) fn arm(&self, entered_at: Instant) {
        if let Trigger::Timer(duration) = self.trigger {
            *self.deadline.lock() = Some(entered_at + duration);
        }
    }

    pub(crate) fn disarm(&self) {
        *self.deadline.lock() = None;
    }

    pub(crate) fn fire_effect(&self, event: Option<&Event>, data: &D, dispatcher: &dyn Dispatcher) {
        if let Some(effect) = &self.effect {
            effect(event, data, dispatcher);
        }
    }
}

impl<D> fmt::Debug for Transition<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("trigger", &self.trigger)
            .field("labels", &self.labels)
            .finish()
    }
}
