//! Finalized states.
//!
//! A state owns its outgoing transitions in declaration order, which is
//! also the order in which they are considered: the first eligible
//! transition wins.

use super::dispatch::Dispatcher;
use super::transition::Transition;
use crate::engine::{FINAL_STATE_NAME, INITIAL_STATE_NAME};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Entry or exit action of a state.
pub type Action<D> = Arc<dyn Fn(&State<D>, &D, &dyn Dispatcher) + Send + Sync>;

/// Index of a state within its machine's graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(usize);

impl StateId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Descriptive labels attached to a state and its actions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateLabels {
    pub state: Vec<String>,
    pub entry: Vec<String>,
    pub exit: Vec<String>,
}

/// A named node of a finalized machine.
pub struct State<D> {
    machine: Uuid,
    id: StateId,
    name: String,
    labels: StateLabels,
    on_entry: Option<Action<D>>,
    on_exit: Option<Action<D>>,
    transitions: Vec<Transition<D>>,
}

impl<D> State<D> {
    pub(crate) fn new(
        machine: Uuid,
        id: StateId,
        name: String,
        labels: StateLabels,
        on_entry: Option<Action<D>>,
        on_exit: Option<Action<D>>,
    ) -> Self {
        Self {
            machine,
            id,
            name,
            labels,
            on_entry,
            on_exit,
            transitions: Vec::new(),
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    /// Id of the machine this state was built into.
    pub fn machine(&self) -> Uuid {
        self.machine
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &StateLabels {
        &self.labels
    }

    /// Outgoing transitions, in declaration order.
    pub fn transitions(&self) -> &[Transition<D>] {
        &self.transitions
    }

    pub fn is_initial(&self) -> bool {
        self.name == INITIAL_STATE_NAME
    }

    pub fn is_final(&self) -> bool {
        self.name == FINAL_STATE_NAME
    }

    pub(crate) fn push_transition(&mut self, transition: Transition<D>) {
        self.transitions.push(transition);
    }

    pub(crate) fn run_entry(&self, data: &D, dispatcher: &dyn Dispatcher) {
        if let Some(action) = &self.on_entry {
            action(self, data, dispatcher);
        }
    }

    pub(crate) fn run_exit(&self, data: &D, dispatcher: &dyn Dispatcher) {
        if let Some(action) = &self.on_exit {
            action(self, data, dispatcher);
        }
    }

    /// Start the clock on every timer transition leaving this state.
    pub(crate) fn arm_timers(&self, entered_at: Instant) {
        for transition in &self.transitions {
            transition.arm(entered_at);
        }
    }

    pub(crate) fn disarm_timers(&self) {
        for transition in &self.transitions {
            transition.disarm();
        }
    }
}

impl<D> fmt::Debug for State<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("machine", &self.machine)
            .field("id", &self.id)
            .field("name", &self.name)
            .field("labels", &self.labels)
            .field("transitions", &self.transitions)
            .finish()
    }
}
