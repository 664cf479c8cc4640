//! Scratch space for one finalize pass.

use crate::builder::error::BuildError;
use crate::builder::state::StateBuilder;
use crate::core::{Action, State, StateId, StateLabels};
use std::collections::HashSet;
use uuid::Uuid;

/// States under construction for a single machine, indexed by `StateId`.
pub(crate) struct Assembly<D> {
    machine: Uuid,
    states: Vec<State<D>>,
    builders: Vec<StateBuilder<D>>,
    names: HashSet<String>,
}

impl<D: Send + Sync + 'static> Assembly<D> {
    pub(crate) fn new(machine: Uuid) -> Self {
        Self {
            machine,
            states: Vec::new(),
            builders: Vec::new(),
            names: HashSet::new(),
        }
    }

    pub(crate) fn machine(&self) -> Uuid {
        self.machine
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn insert(
        &mut self,
        builder: StateBuilder<D>,
        name: &str,
        labels: StateLabels,
        on_entry: Option<Action<D>>,
        on_exit: Option<Action<D>>,
    ) -> Result<StateId, BuildError> {
        if !self.names.insert(name.to_string()) {
            return Err(BuildError::DuplicateState(name.to_string()));
        }
        let id = StateId::new(self.states.len());
        self.states
            .push(State::new(self.machine, id, name.to_string(), labels, on_entry, on_exit));
        self.builders.push(builder);
        Ok(id)
    }

    pub(crate) fn builder(&self, id: StateId) -> StateBuilder<D> {
        self.builders[id.index()].clone()
    }

    pub(crate) fn state_mut(&mut self, id: StateId) -> &mut State<D> {
        &mut self.states[id.index()]
    }

    pub(crate) fn into_states(self) -> Vec<State<D>> {
        self.states
    }
}
