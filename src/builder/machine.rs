//! Builder for constructing state machines.

use crate::builder::assembly::Assembly;
use crate::builder::error::{BuildError, EngineKind};
use crate::builder::state::StateBuilder;
use crate::core::{Graph, StateId};
use crate::engine::{ImmediateMachine, MachineConfig, ThreadedMachine, FINAL_STATE_NAME, INITIAL_STATE_NAME};
use crate::trace::Tracer;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

enum Finalized<D: Send + Sync + 'static> {
    Pending,
    Immediate(Arc<ImmediateMachine<D>>),
    Threaded(Arc<ThreadedMachine<D>>),
    Abandoned,
}

/// Builder for constructing state machines.
///
/// The builder starts with the reserved initial state. Finalizing it is a
/// two-pass process: every state is built first, then every transition is
/// resolved against the built states, so graphs may contain cycles and
/// forward references.
///
/// A builder finalizes into exactly one engine kind. Asking again for the
/// same kind returns the cached machine; asking for the other kind fails.
///
/// # Example
///
/// ```rust
/// use statecraft::prelude::*;
///
/// let mut builder = MachineBuilder::new(());
/// let off = builder.new_state("off");
/// let on = builder.new_state("on");
/// builder.initial_state().add_transition(&off);
/// off.add_transition(&on).on_event("TurnOn");
/// on.add_transition(&off).on_event("TurnOff");
///
/// let machine = builder.build_immediate().unwrap();
/// machine.start().unwrap();
/// machine.dispatch(Event::new("TurnOn"));
/// assert_eq!(machine.current_state().name(), "on");
///
/// let again = builder.build_immediate().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&machine, &again));
/// ```
pub struct MachineBuilder<D: Send + Sync + 'static> {
    id: Uuid,
    data: Arc<D>,
    initial: StateBuilder<D>,
    final_state: Option<StateBuilder<D>>,
    states: Vec<StateBuilder<D>>,
    tracers: Vec<Arc<dyn Tracer<D>>>,
    config: MachineConfig,
    finalized: Finalized<D>,
}

impl<D: Send + Sync + 'static> MachineBuilder<D> {
    /// Create a builder that owns the machine data.
    pub fn new(data: D) -> Self {
        Self::from_shared(Arc::new(data))
    }

    /// Create a builder around data the caller keeps a handle on, for
    /// guards that watch values changed from outside the machine.
    pub fn from_shared(data: Arc<D>) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            initial: StateBuilder::new(INITIAL_STATE_NAME),
            final_state: None,
            states: Vec::new(),
            tracers: Vec::new(),
            config: MachineConfig::default(),
            finalized: Finalized::Pending,
        }
    }

    /// Identifier shared by the finalized machine and its log records.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn initial_state(&self) -> StateBuilder<D> {
        self.initial.clone()
    }

    /// Add the reserved final state. Calling this again returns the same state.
    pub fn add_final_state(&mut self) -> StateBuilder<D> {
        self.final_state
            .get_or_insert_with(|| StateBuilder::new(FINAL_STATE_NAME))
            .clone()
    }

    pub fn final_state(&self) -> Option<StateBuilder<D>> {
        self.final_state.clone()
    }

    /// Create and register a new state.
    pub fn new_state(&mut self, name: impl Into<String>) -> StateBuilder<D> {
        let state = StateBuilder::new(name);
        self.states.push(state.clone());
        state
    }

    pub fn new_state_with_labels<I, L>(&mut self, name: impl Into<String>, labels: I) -> StateBuilder<D>
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let state = self.new_state(name);
        state.labels(labels);
        state
    }

    /// Register a state created with [`StateBuilder::new`].
    ///
    /// Registration fixes the state's position in visit order. Registering
    /// the same state twice has no further effect.
    pub fn add_state(&mut self, state: &StateBuilder<D>) -> &mut Self {
        if !self.states.iter().any(|s| s.same_as(state)) {
            self.states.push(state.clone());
        }
        self
    }

    pub fn add_tracer(&mut self, tracer: Arc<dyn Tracer<D>>) -> &mut Self {
        self.tracers.push(tracer);
        self
    }

    pub fn config(&mut self, config: MachineConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Finalize as a single-threaded machine driven by explicit calls.
    pub fn build_immediate(&mut self) -> Result<Arc<ImmediateMachine<D>>, BuildError> {
        match &self.finalized {
            Finalized::Immediate(machine) => return Ok(Arc::clone(machine)),
            Finalized::Threaded(_) => {
                return Err(BuildError::WrongEngineKind {
                    requested: EngineKind::Immediate,
                    finalized: EngineKind::Threaded,
                })
            }
            Finalized::Abandoned => return Err(BuildError::Abandoned),
            Finalized::Pending => {}
        }

        let graph = self.assemble()?;
        let machine = Arc::new(ImmediateMachine::new(
            self.id,
            graph,
            Arc::clone(&self.data),
            self.tracers.clone(),
        ));
        self.finalized = Finalized::Immediate(Arc::clone(&machine));
        Ok(machine)
    }

    /// Finalize as a machine that services events and timers on its own
    /// Tokio task once started.
    pub fn build_threaded(&mut self) -> Result<Arc<ThreadedMachine<D>>, BuildError> {
        match &self.finalized {
            Finalized::Threaded(machine) => return Ok(Arc::clone(machine)),
            Finalized::Immediate(_) => {
                return Err(BuildError::WrongEngineKind {
                    requested: EngineKind::Threaded,
                    finalized: EngineKind::Immediate,
                })
            }
            Finalized::Abandoned => return Err(BuildError::Abandoned),
            Finalized::Pending => {}
        }

        let graph = self.assemble()?;
        let machine = Arc::new(ThreadedMachine::new(
            self.id,
            graph,
            Arc::clone(&self.data),
            self.tracers.clone(),
            self.config.clone(),
        ));
        self.finalized = Finalized::Threaded(Arc::clone(&machine));
        Ok(machine)
    }

    /// Run both build passes. Any failure after the first state has been
    /// built leaves state builders claimed by this machine, so the builder
    /// is marked abandoned.
    fn assemble(&mut self) -> Result<Graph<D>, BuildError> {
        self.config.validate()?;
        let result = self.run_passes();
        if result.is_err() {
            self.finalized = Finalized::Abandoned;
        }
        result
    }

    fn run_passes(&self) -> Result<Graph<D>, BuildError> {
        let mut assembly = Assembly::new(self.id);

        let initial = self.initial.build(&mut assembly)?;
        let final_state = self
            .final_state
            .as_ref()
            .map(|state| state.build(&mut assembly))
            .transpose()?;
        let mut registered = Vec::with_capacity(self.states.len());
        for state in &self.states {
            registered.push(state.build(&mut assembly)?);
        }

        // Ids follow build order (initial, final, registered), and states
        // only reachable as targets are appended while this loop runs.
        let mut next = 0;
        while next < assembly.len() {
            let builder = assembly.builder(StateId::new(next));
            builder.build_transitions(&mut assembly)?;
            next += 1;
        }

        let visit_order = visit_order(initial, final_state, &registered, assembly.len());
        debug!(
            machine = %self.id,
            states = visit_order.len(),
            "machine graph assembled"
        );
        Ok(Graph::new(
            assembly.into_states(),
            visit_order,
            initial,
            final_state,
        ))
    }
}

/// Initial state, registered states, unregistered targets, final state.
fn visit_order(
    initial: StateId,
    final_state: Option<StateId>,
    registered: &[StateId],
    total: usize,
) -> Vec<StateId> {
    let mut seen = HashSet::new();
    let mut order = Vec::with_capacity(total);
    let reserved = final_state.into_iter().collect::<HashSet<_>>();

    let candidates = std::iter::once(initial)
        .chain(registered.iter().copied())
        .chain((0..total).map(StateId::new));
    for id in candidates {
        if !reserved.contains(&id) && seen.insert(id) {
            order.push(id);
        }
    }
    order.extend(final_state);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Machine;

    #[test]
    fn builder_is_seeded_with_initial_state() {
        let builder = MachineBuilder::new(());

        assert_eq!(builder.initial_state().name(), INITIAL_STATE_NAME);
        assert!(builder.final_state().is_none());
    }

    #[test]
    fn final_state_is_created_once() {
        let mut builder = MachineBuilder::new(());
        let first = builder.add_final_state();
        let second = builder.add_final_state();

        assert!(first.same_as(&second));
        assert_eq!(first.name(), FINAL_STATE_NAME);
    }

    #[test]
    fn builds_expected_transition_counts() {
        let mut builder = MachineBuilder::new(());
        let s1 = builder.new_state("s1");
        builder.initial_state().add_transition(&s1);

        let machine = builder.build_immediate().unwrap();
        let graph = machine.graph();

        assert_eq!(graph.state_count(), 2);
        assert_eq!(graph.initial().name(), INITIAL_STATE_NAME);
        assert_eq!(graph.initial().transitions().len(), 1);
    }

    #[test]
    fn repeated_build_returns_cached_machine() {
        let mut builder = MachineBuilder::new(());
        builder.new_state("only");

        let first = builder.build_immediate().unwrap();
        let second = builder.build_immediate().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.id(), builder.id());
    }

    #[test]
    fn repeated_threaded_build_returns_cached_machine() {
        let mut builder = MachineBuilder::new(());

        let first = builder.build_threaded().unwrap();
        let second = builder.build_threaded().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn cannot_build_both_engine_kinds() {
        let mut immediate = MachineBuilder::new(());
        immediate.build_immediate().unwrap();
        assert_eq!(
            immediate.build_threaded().err(),
            Some(BuildError::WrongEngineKind {
                requested: EngineKind::Threaded,
                finalized: EngineKind::Immediate,
            })
        );

        let mut threaded = MachineBuilder::new(());
        threaded.build_threaded().unwrap();
        assert_eq!(
            threaded.build_immediate().err(),
            Some(BuildError::WrongEngineKind {
                requested: EngineKind::Immediate,
                finalized: EngineKind::Threaded,
            })
        );
    }

    #[test]
    fn reserved_name_clash_is_a_duplicate() {
        let mut builder = MachineBuilder::new(());
        builder.new_state(INITIAL_STATE_NAME);

        let result = builder.build_immediate();

        assert_eq!(
            result.err(),
            Some(BuildError::DuplicateState(INITIAL_STATE_NAME.into()))
        );
    }

    #[test]
    fn failed_build_abandons_the_builder() {
        let mut builder = MachineBuilder::new(());
        builder.new_state("twin");
        builder.new_state("twin");

        assert!(matches!(
            builder.build_immediate(),
            Err(BuildError::DuplicateState(_))
        ));
        assert_eq!(builder.build_immediate().err(), Some(BuildError::Abandoned));
        assert_eq!(builder.build_threaded().err(), Some(BuildError::Abandoned));
    }

    #[test]
    fn invalid_config_does_not_abandon() {
        let mut builder = MachineBuilder::new(());
        builder.config(MachineConfig::default().with_event_queue_capacity(0));

        assert!(matches!(
            builder.build_threaded(),
            Err(BuildError::InvalidConfig(_))
        ));

        builder.config(MachineConfig::default());
        assert!(builder.build_threaded().is_ok());
    }

    #[test]
    fn visit_order_puts_final_state_last() {
        let mut builder = MachineBuilder::new(());
        let done = builder.add_final_state();
        let work = builder.new_state("work");
        let hidden = StateBuilder::new("hidden");
        builder.initial_state().add_transition(&work);
        work.add_transition(&hidden);
        hidden.add_transition(&done);

        let machine = builder.build_immediate().unwrap();
        let names: Vec<_> = machine.graph().states().map(|s| s.name().to_string()).collect();

        assert_eq!(names, ["initial", "work", "hidden", "final"]);
    }

    #[test]
    fn unregistered_targets_keep_their_transitions() {
        let mut builder = MachineBuilder::new(());
        let hidden = StateBuilder::new("hidden");
        let back = builder.new_state("back");
        builder.initial_state().add_transition(&hidden);
        hidden.add_transition(&back).on_event("Return");

        let machine = builder.build_immediate().unwrap();
        let hidden = machine.graph().find("hidden").unwrap();

        assert_eq!(hidden.transitions().len(), 1);
    }

    #[test]
    fn add_state_ignores_repeats() {
        let mut builder = MachineBuilder::new(());
        let state = StateBuilder::new("once");
        builder.add_state(&state).add_state(&state);

        let machine = builder.build_immediate().unwrap();

        assert_eq!(machine.graph().state_count(), 2);
    }
}
