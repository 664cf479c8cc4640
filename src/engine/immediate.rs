//! Single-threaded run-to-completion engine.

use super::{Machine, MachineError, Wiring};
use crate::core::{Dispatcher, Event, Graph, State, StateId, Transition};
use crate::trace::Tracer;
use crate::visit::Visitor;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// A machine driven entirely by its caller.
///
/// `start`, `dispatch` and `tick` do all their work on the calling thread
/// and return once the machine has settled. Events dispatched by callbacks
/// while the machine is busy are queued and processed, in order, before the
/// outermost call returns.
///
/// Timer transitions become eligible once their deadline has passed, but
/// the engine never polls: call [`tick`](Self::tick) to re-evaluate.
///
/// The engine tolerates calls from several threads, but concurrent callers
/// interleave at event granularity; serialize access for deterministic
/// results.
///
/// A panicking callback unwinds out of the call that ran it. The machine
/// stays usable, though it may be left between the exit of one state and
/// the entry of the next.
pub struct ImmediateMachine<D: Send + Sync + 'static> {
    id: Uuid,
    graph: Graph<D>,
    data: Arc<D>,
    current: AtomicUsize,
    running: AtomicBool,
    draining: AtomicBool,
    queue: Mutex<VecDeque<Event>>,
    tracers: RwLock<Vec<Arc<dyn Tracer<D>>>>,
    wiring: Wiring<D>,
}

impl<D: Send + Sync + 'static> ImmediateMachine<D> {
    pub(crate) fn new(id: Uuid, graph: Graph<D>, data: Arc<D>, tracers: Vec<Arc<dyn Tracer<D>>>) -> Self {
        Self::with_wiring(id, graph, data, tracers, Wiring::detached())
    }

    pub(crate) fn with_wiring(
        id: Uuid,
        graph: Graph<D>,
        data: Arc<D>,
        tracers: Vec<Arc<dyn Tracer<D>>>,
        wiring: Wiring<D>,
    ) -> Self {
        let initial = graph.initial().id().index();
        Self {
            id,
            graph,
            data,
            current: AtomicUsize::new(initial),
            running: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            queue: Mutex::new(VecDeque::new()),
            tracers: RwLock::new(tracers),
            wiring,
        }
    }

    pub fn graph(&self) -> &Graph<D> {
        &self.graph
    }

    /// Re-evaluate eventless and timer transitions of the current state.
    ///
    /// Use this after changing data that guards depend on. Ignored while
    /// stopped, and absorbed when called from a callback of this machine.
    pub fn tick(&self) {
        if self.is_running() {
            self.exclusive(|| self.run_to_wait_condition());
        }
    }

    pub(crate) fn current_id(&self) -> StateId {
        StateId::new(self.current.load(Ordering::SeqCst))
    }

    fn current(&self) -> &State<D> {
        self.graph.state(self.current_id())
    }

    fn dispatcher(&self) -> &dyn Dispatcher {
        match &self.wiring.dispatcher {
            Some(dispatcher) => dispatcher.as_ref(),
            None => self,
        }
    }

    /// Run `step`, then drain the event queue, unless another step of this
    /// machine is already in progress. Events queued by `step` are handled
    /// by whichever call holds the drain.
    fn exclusive(&self, step: impl FnOnce()) {
        if self.draining.swap(true, Ordering::AcqRel) {
            trace!(machine = %self.id, "drain in progress, deferring");
            return;
        }
        {
            let _drain = DrainGuard(&self.draining);
            step();
            self.drain_queue();
        }

        // Another thread may have queued an event after the last pop but
        // before the guard was released.
        while !self.queue.lock().is_empty() && !self.draining.swap(true, Ordering::AcqRel) {
            let _drain = DrainGuard(&self.draining);
            self.drain_queue();
        }
    }

    fn drain_queue(&self) {
        loop {
            let next = self.queue.lock().pop_front();
            let Some(event) = next else {
                break;
            };
            if self.is_running() {
                trace!(machine = %self.id, event = event.name(), "draining event");
                self.process_event(&event);
            } else {
                trace!(machine = %self.id, event = event.name(), "machine stopped, discarding event");
            }
        }
    }

    fn process_event(&self, event: &Event) {
        let data = self.data.as_ref();
        let current = self.current();
        match current.transitions().iter().find(|t| t.accepts_event(event, data)) {
            Some(transition) => {
                self.do_transition(Some(event), transition);
                self.run_to_wait_condition();
            }
            None => {
                debug!(
                    machine = %self.id,
                    state = current.name(),
                    event = event.name(),
                    "event rejected"
                );
                self.trace(|t| t.on_rejected_event(event, current, data));
            }
        }
    }

    /// Take eventless and elapsed timer transitions until none is eligible.
    fn run_to_wait_condition(&self) {
        let data = self.data.as_ref();
        loop {
            let now = Instant::now();
            let current = self.current();
            trace!(machine = %self.id, state = current.name(), "scanning eventless transitions");
            let next = current
                .transitions()
                .iter()
                .find(|t| t.accepts_without_event(data, now));
            match next {
                Some(transition) => self.do_transition(None, transition),
                None => break,
            }
        }
    }

    fn do_transition(&self, event: Option<&Event>, transition: &Transition<D>) {
        let data = self.data.as_ref();
        let source = self.graph.state(transition.source());
        let target = self.graph.state(transition.target());

        transition.fire_effect(event, data, self.dispatcher());

        if transition.is_local() {
            if let Some(after) = transition.trigger().timer_duration() {
                transition.arm(Instant::now());
                trace!(
                    machine = %self.id,
                    state = source.name(),
                    after_ms = after.as_millis() as u64,
                    "local timer re-armed"
                );
                if let Some(hooks) = &self.wiring.hooks {
                    hooks.rearmed(source, transition);
                }
            }
            self.trace(|t| t.on_transition(event, source, target, data));
            return;
        }

        source.run_exit(data, self.dispatcher());
        self.leave(source);
        self.trace(|t| t.on_exit(source, data));
        self.trace(|t| t.on_transition(event, source, target, data));

        self.current.store(target.id().index(), Ordering::SeqCst);
        debug!(
            machine = %self.id,
            from = source.name(),
            to = target.name(),
            trigger = %transition.trigger(),
            "state changed"
        );
        self.enter(target);
    }

    fn enter(&self, state: &State<D>) {
        let data = self.data.as_ref();
        state.arm_timers(Instant::now());
        if let Some(hooks) = &self.wiring.hooks {
            hooks.entered(state);
        }
        state.run_entry(data, self.dispatcher());
        self.trace(|t| t.on_entry(state, data));
    }

    fn leave(&self, state: &State<D>) {
        state.disarm_timers();
        if let Some(hooks) = &self.wiring.hooks {
            hooks.exited(state);
        }
    }

    /// Call every tracer. The list is copied first so tracers may be added
    /// from inside a callback.
    fn trace(&self, call: impl Fn(&dyn Tracer<D>)) {
        let tracers = self.tracers.read().clone();
        for tracer in &tracers {
            call(tracer.as_ref());
        }
    }
}

impl<D: Send + Sync + 'static> Dispatcher for ImmediateMachine<D> {
    fn dispatch(&self, event: Event) {
        if !self.is_running() {
            trace!(machine = %self.id, event = event.name(), "machine not running, ignoring event");
            return;
        }
        self.queue.lock().push_back(event);
        self.exclusive(|| {});
    }
}

impl<D: Send + Sync + 'static> Machine<D> for ImmediateMachine<D> {
    fn id(&self) -> Uuid {
        self.id
    }

    /// Fails with [`MachineError::Busy`] when called from a callback of
    /// this machine, since the entry and settling could not run until the
    /// callback returns.
    fn start(&self) -> Result<(), MachineError> {
        if self.is_running() {
            warn!(machine = %self.id, "start called on a running machine");
            return Err(MachineError::AlreadyRunning);
        }
        if self.draining.load(Ordering::Acquire) {
            warn!(machine = %self.id, "start called while a step is in progress");
            return Err(MachineError::Busy);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!(machine = %self.id, "start called on a running machine");
            return Err(MachineError::AlreadyRunning);
        }
        debug!(machine = %self.id, state = self.current().name(), "starting machine");
        self.exclusive(|| {
            self.enter(self.current());
            self.run_to_wait_condition();
        });
        Ok(())
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            debug!(machine = %self.id, state = self.current().name(), "machine stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn current_state(&self) -> &State<D> {
        self.current()
    }

    fn add_tracer(&self, tracer: Arc<dyn Tracer<D>>) {
        self.tracers.write().push(tracer);
    }

    fn visit(&self, visitor: &mut dyn Visitor<D>) {
        self.graph.visit(visitor);
    }

    fn data(&self) -> &D {
        &self.data
    }

    fn shared_data(&self) -> Arc<D> {
        Arc::clone(&self.data)
    }
}

/// Releases the drain flag, including when a callback panics.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
