//! Read-only walks over a machine's graph.

mod plantuml;
mod snapshot;

pub use plantuml::render_plantuml;
pub use snapshot::{GraphSnapshot, StateSnapshot, TransitionSnapshot};

use crate::core::{State, Transition};

/// Receives every state once, followed by each of its outgoing transitions.
///
/// States arrive in visit order: the initial state, registered states in
/// registration order, states that were only ever transition targets, and
/// the final state last.
pub trait Visitor<D> {
    fn visit_state(&mut self, state: &State<D>);

    fn visit_transition(&mut self, transition: &Transition<D>, source: &State<D>, target: &State<D>);
}
