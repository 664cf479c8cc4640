//! The immutable state graph of a finalized machine.

use super::state::{State, StateId};
use crate::visit::Visitor;

/// All states of a machine, with their transitions, in a fixed visit order:
/// the initial state, registered states in registration order, states that
/// were only referenced as transition endpoints, and finally the final state.
pub struct Graph<D> {
    states: Vec<State<D>>,
    visit_order: Vec<StateId>,
    initial: StateId,
    final_state: Option<StateId>,
}

impl<D> Graph<D> {
    pub(crate) fn new(
        states: Vec<State<D>>,
        visit_order: Vec<StateId>,
        initial: StateId,
        final_state: Option<StateId>,
    ) -> Self {
        debug_assert_eq!(states.len(), visit_order.len());
        Self {
            states,
            visit_order,
            initial,
            final_state,
        }
    }

    /// Look up a state by id. Ids are only minted by the builder that
    /// produced this graph, so every id it hands out is valid here.
    pub fn state(&self, id: StateId) -> &State<D> {
        &self.states[id.index()]
    }

    pub fn initial(&self) -> &State<D> {
        self.state(self.initial)
    }

    pub fn final_state(&self) -> Option<&State<D>> {
        self.final_state.map(|id| self.state(id))
    }

    /// States in visit order.
    pub fn states(&self) -> impl Iterator<Item = &State<D>> + '_ {
        self.visit_order.iter().map(|id| self.state(*id))
    }

    pub fn find(&self, name: &str) -> Option<&State<D>> {
        self.states.iter().find(|s| s.name() == name)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions().len()).sum()
    }

    /// Walk every state once and every transition on it once, in visit
    /// order and declaration order.
    pub fn visit(&self, visitor: &mut dyn Visitor<D>) {
        for state in self.states() {
            visitor.visit_state(state);
            for transition in state.transitions() {
                visitor.visit_transition(transition, state, self.state(transition.target()));
            }
        }
    }
}
