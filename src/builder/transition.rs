//! Builder for constructing transitions.

use crate::builder::error::BuildError;
use crate::builder::state::{StateBuilder, StateSpec};
use crate::core::{Dispatcher, Effect, Event, Guard, Payload, StateId, Transition, TransitionLabels, Trigger};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct TransitionSpec<D> {
    target: Weak<RefCell<StateSpec<D>>>,
    target_name: String,
    trigger: Trigger,
    guard: Guard<D>,
    effect: Option<Effect<D>>,
    labels: TransitionLabels,
}

/// Handle for configuring one transition, returned by
/// [`StateBuilder::add_transition`].
///
/// The handle shares its configuration with the owning state builder, so
/// it can be dropped as soon as the transition is configured. Without a
/// trigger the transition is eventless; without a guard it always passes.
///
/// The target is held weakly: keep the target's [`StateBuilder`] alive (or
/// register it with the machine builder) until the machine is built.
pub struct TransitionBuilder<D> {
    inner: Rc<RefCell<TransitionSpec<D>>>,
}

impl<D> Clone for TransitionBuilder<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Send + Sync + 'static> TransitionBuilder<D> {
    pub(crate) fn new(target: &StateBuilder<D>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TransitionSpec {
                target: target.downgrade(),
                target_name: target.name(),
                trigger: Trigger::None,
                guard: Guard::always(),
                effect: None,
                labels: TransitionLabels::default(),
            })),
        }
    }

    /// Fire only when an event with this name is dispatched.
    pub fn on_event(&self, name: impl Into<String>) -> &Self {
        self.inner.borrow_mut().trigger = Trigger::Event(name.into());
        self
    }

    /// Fire once `duration` has passed since the source state was entered.
    pub fn after(&self, duration: Duration) -> &Self {
        self.inner.borrow_mut().trigger = Trigger::Timer(duration);
        self
    }

    pub fn guard<F>(&self, predicate: F) -> &Self
    where
        F: Fn(&D, Option<&Payload>) -> bool + Send + Sync + 'static,
    {
        self.inner.borrow_mut().guard = Guard::new(predicate);
        self
    }

    pub fn effect<F>(&self, effect: F) -> &Self
    where
        F: Fn(Option<&Event>, &D, &dyn Dispatcher) + Send + Sync + 'static,
    {
        self.inner.borrow_mut().effect = Some(Arc::new(effect));
        self
    }

    pub fn labels<I, L>(&self, labels: I) -> &Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        extend(&mut self.inner.borrow_mut().labels.transition, labels);
        self
    }

    pub fn trigger_labels<I, L>(&self, labels: I) -> &Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        extend(&mut self.inner.borrow_mut().labels.trigger, labels);
        self
    }

    pub fn guard_labels<I, L>(&self, labels: I) -> &Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        extend(&mut self.inner.borrow_mut().labels.guard, labels);
        self
    }

    pub fn effect_labels<I, L>(&self, labels: I) -> &Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        extend(&mut self.inner.borrow_mut().labels.effect, labels);
        self
    }

    pub fn trigger(&self) -> Trigger {
        self.inner.borrow().trigger.clone()
    }

    pub fn target_name(&self) -> String {
        self.inner.borrow().target_name.clone()
    }

    /// The target state builder, if it is still alive.
    pub(crate) fn target(&self) -> Option<StateBuilder<D>> {
        self.inner.borrow().target.upgrade().map(StateBuilder::from_spec)
    }

    /// Finalize into a transition between two already-built states.
    pub(crate) fn build(&self, source_name: &str, source: StateId, target: StateId) -> Result<Transition<D>, BuildError> {
        let spec = self.inner.borrow();
        if matches!(&spec.trigger, Trigger::Event(name) if name.is_empty()) {
            return Err(BuildError::EmptyEventName {
                from: source_name.to_string(),
                to: spec.target_name.clone(),
            });
        }

        Ok(Transition::new(
            source,
            target,
            spec.trigger.clone(),
            spec.guard.clone(),
            spec.effect.clone(),
            spec.labels.clone(),
        ))
    }
}

fn extend<I, L>(into: &mut Vec<String>, labels: I)
where
    I: IntoIterator<Item = L>,
    L: Into<String>,
{
    into.extend(labels.into_iter().map(Into::into));
}
