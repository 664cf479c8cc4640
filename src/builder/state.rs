//! Builder for constructing states.
//!
//! State builders are shared handles: the machine builder, the caller and
//! every transition pointing at a state all refer to the same draft. This is
//! what lets a transition name a target that has not been configured (or
//! even registered) yet.

use crate::builder::assembly::Assembly;
use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::core::{Action, Dispatcher, State, StateId, StateLabels};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

pub(crate) struct StateSpec<D> {
    name: String,
    labels: StateLabels,
    on_entry: Option<Action<D>>,
    on_exit: Option<Action<D>>,
    transitions: Vec<TransitionBuilder<D>>,
    built: Option<BuiltState>,
}

#[derive(Clone, Copy)]
struct BuiltState {
    machine: Uuid,
    id: StateId,
    transitions_built: bool,
}

/// Handle for configuring one state.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::StateBuilder;
///
/// let off = StateBuilder::<()>::new("off");
/// let on = StateBuilder::<()>::new("on");
///
/// off.add_transition(&on).on_event("TurnOn");
/// on.add_transition(&off).on_event("TurnOff");
///
/// assert_eq!(off.transition_count(), 1);
/// ```
pub struct StateBuilder<D> {
    inner: Rc<RefCell<StateSpec<D>>>,
}

impl<D> Clone for StateBuilder<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Send + Sync + 'static> StateBuilder<D> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StateSpec {
                name: name.into(),
                labels: StateLabels::default(),
                on_entry: None,
                on_exit: None,
                transitions: Vec::new(),
                built: None,
            })),
        }
    }

    pub(crate) fn from_spec(inner: Rc<RefCell<StateSpec<D>>>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<StateSpec<D>>> {
        Rc::downgrade(&self.inner)
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn labels<I, L>(&self, labels: I) -> &Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let mut spec = self.inner.borrow_mut();
        spec.labels.state.extend(labels.into_iter().map(Into::into));
        drop(spec);
        self
    }

    pub fn on_entry<F>(&self, action: F) -> &Self
    where
        F: Fn(&State<D>, &D, &dyn Dispatcher) + Send + Sync + 'static,
    {
        self.inner.borrow_mut().on_entry = Some(Arc::new(action));
        self
    }

    pub fn entry_labels<I, L>(&self, labels: I) -> &Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let mut spec = self.inner.borrow_mut();
        spec.labels.entry.extend(labels.into_iter().map(Into::into));
        drop(spec);
        self
    }

    pub fn on_exit<F>(&self, action: F) -> &Self
    where
        F: Fn(&State<D>, &D, &dyn Dispatcher) + Send + Sync + 'static,
    {
        self.inner.borrow_mut().on_exit = Some(Arc::new(action));
        self
    }

    pub fn exit_labels<I, L>(&self, labels: I) -> &Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let mut spec = self.inner.borrow_mut();
        spec.labels.exit.extend(labels.into_iter().map(Into::into));
        drop(spec);
        self
    }

    /// Add an outgoing transition to `target`.
    ///
    /// Transitions are considered in the order they are added.
    pub fn add_transition(&self, target: &StateBuilder<D>) -> TransitionBuilder<D> {
        let transition = TransitionBuilder::new(target);
        self.inner.borrow_mut().transitions.push(transition.clone());
        transition
    }

    pub fn transition_count(&self) -> usize {
        self.inner.borrow().transitions.len()
    }

    pub fn is_built(&self) -> bool {
        self.inner.borrow().built.is_some()
    }

    pub(crate) fn same_as(&self, other: &StateBuilder<D>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// First pass: finalize the state itself, with no transitions yet.
    ///
    /// Memoized per machine: later calls return the same id.
    pub(crate) fn build(&self, assembly: &mut Assembly<D>) -> Result<StateId, BuildError> {
        let mut spec = self.inner.borrow_mut();
        if let Some(built) = spec.built {
            if built.machine != assembly.machine() {
                return Err(BuildError::ForeignState(spec.name.clone()));
            }
            trace!(state = %spec.name, "returning built state");
            return Ok(built.id);
        }

        debug!(machine = %assembly.machine(), state = %spec.name, "building state");
        let id = assembly.insert(
            self.clone(),
            &spec.name,
            spec.labels.clone(),
            spec.on_entry.clone(),
            spec.on_exit.clone(),
        )?;
        spec.built = Some(BuiltState {
            machine: assembly.machine(),
            id,
            transitions_built: false,
        });
        Ok(id)
    }

    /// Second pass: resolve both endpoints of every outgoing transition and
    /// attach the finalized transitions to the built state.
    ///
    /// Endpoints go through [`StateBuilder::build`], so targets that have not
    /// been built yet (forward references, back edges, self loops) are built
    /// on demand. Running this pass twice never duplicates transitions.
    pub(crate) fn build_transitions(&self, assembly: &mut Assembly<D>) -> Result<(), BuildError> {
        let source = self.build(assembly)?;
        let (name, pending) = {
            let spec = self.inner.borrow();
            if spec.built.is_some_and(|b| b.transitions_built) {
                return Ok(());
            }
            (spec.name.clone(), spec.transitions.clone())
        };
        debug!(
            machine = %assembly.machine(),
            state = %name,
            transitions = pending.len(),
            "building transitions"
        );

        let mut finished = Vec::with_capacity(pending.len());
        for transition in &pending {
            let target = transition.target().ok_or_else(|| BuildError::DanglingTarget {
                from: name.clone(),
                to: transition.target_name(),
            })?;
            let target = target.build(assembly)?;
            finished.push(transition.build(&name, source, target)?);
        }

        let state = assembly.state_mut(source);
        for transition in finished {
            state.push_transition(transition);
        }
        if let Some(built) = self.inner.borrow_mut().built.as_mut() {
            built.transitions_built = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembly() -> Assembly<()> {
        Assembly::new(Uuid::new_v4())
    }

    #[test]
    fn build_is_memoized() {
        let mut asm = assembly();
        let builder = StateBuilder::<()>::new("state1");

        let first = builder.build(&mut asm).unwrap();
        let second = builder.build(&mut asm).unwrap();

        assert_eq!(first, second);
        assert_eq!(asm.len(), 1);
        assert!(builder.is_built());
    }

    #[test]
    fn transitions_attach_only_in_second_pass() {
        let mut asm = assembly();
        let s1 = StateBuilder::<()>::new("s1");
        let s2 = StateBuilder::<()>::new("s2");
        let s3 = StateBuilder::<()>::new("s3");
        s1.add_transition(&s2);
        s2.add_transition(&s1);
        s2.add_transition(&s3);

        let id1 = s1.build(&mut asm).unwrap();
        let id2 = s2.build(&mut asm).unwrap();
        let id3 = s3.build(&mut asm).unwrap();
        assert_eq!(asm.state_mut(id1).transitions().len(), 0);
        assert_eq!(asm.state_mut(id2).transitions().len(), 0);

        s1.build_transitions(&mut asm).unwrap();
        assert_eq!(asm.state_mut(id1).transitions().len(), 1);
        s2.build_transitions(&mut asm).unwrap();
        assert_eq!(asm.state_mut(id2).transitions().len(), 2);

        s1.build_transitions(&mut asm).unwrap();
        assert_eq!(asm.state_mut(id1).transitions().len(), 1);
        assert_eq!(asm.state_mut(id3).transitions().len(), 0);

        assert_eq!(s2.build(&mut asm).unwrap(), id2);
        assert_eq!(asm.state_mut(id2).transitions().len(), 2);
    }

    #[test]
    fn second_pass_builds_unbuilt_targets() {
        let mut asm = assembly();
        let from = StateBuilder::<()>::new("from");
        let later = StateBuilder::<()>::new("later");
        from.add_transition(&later);

        from.build_transitions(&mut asm).unwrap();

        assert!(later.is_built());
        assert_eq!(asm.len(), 2);
        let target = asm.state_mut(StateId::new(0)).transitions()[0].target();
        assert_eq!(asm.builder(target).name(), "later");
    }

    #[test]
    fn self_loop_is_local() {
        let mut asm = assembly();
        let busy = StateBuilder::<()>::new("busy");
        busy.add_transition(&busy).on_event("Tick");

        busy.build_transitions(&mut asm).unwrap();

        let state = asm.state_mut(StateId::new(0));
        assert!(state.transitions()[0].is_local());
    }

    #[test]
    fn building_into_another_machine_fails() {
        let builder = StateBuilder::<()>::new("shared");
        builder.build(&mut assembly()).unwrap();

        let result = builder.build(&mut assembly());

        assert_eq!(result, Err(BuildError::ForeignState("shared".into())));
    }

    #[test]
    fn duplicate_names_fail() {
        let mut asm = assembly();
        StateBuilder::<()>::new("twin").build(&mut asm).unwrap();

        let result = StateBuilder::<()>::new("twin").build(&mut asm);

        assert_eq!(result, Err(BuildError::DuplicateState("twin".into())));
    }

    #[test]
    fn dropped_target_fails_second_pass() {
        let mut asm = assembly();
        let from = StateBuilder::<()>::new("from");
        {
            let gone = StateBuilder::<()>::new("gone");
            from.add_transition(&gone);
        }

        let result = from.build_transitions(&mut asm);

        assert_eq!(
            result,
            Err(BuildError::DanglingTarget {
                from: "from".into(),
                to: "gone".into(),
            })
        );
    }

    #[test]
    fn labels_flow_into_built_state() {
        let mut asm = assembly();
        let builder = StateBuilder::<()>::new("labelled");
        builder
            .labels(["important"])
            .on_entry(|_, _, _| {})
            .entry_labels(["open valve"])
            .on_exit(|_, _, _| {})
            .exit_labels(["close valve"]);

        let id = builder.build(&mut asm).unwrap();
        let labels = asm.state_mut(id).labels().clone();

        assert_eq!(labels.state, ["important"]);
        assert_eq!(labels.entry, ["open valve"]);
        assert_eq!(labels.exit, ["close valve"]);
    }
}
