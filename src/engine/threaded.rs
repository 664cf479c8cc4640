//! Engine that makes progress on its own Tokio task.

use super::immediate::ImmediateMachine;
use super::timers::TimerSupervisor;
use super::{Machine, MachineConfig, MachineError, StateHooks, Wiring};
use crate::core::{Dispatcher, Event, Graph, State, StateId};
use crate::trace::Tracer;
use crate::visit::Visitor;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

/// The wrapped engine plus everything the coordination task shares with
/// callers.
struct EngineCell<D: Send + Sync + 'static> {
    id: Uuid,
    base: ImmediateMachine<D>,
    /// Serializes every call into `base`.
    lock: Mutex<()>,
    /// Last settled state, readable without waiting on `lock`.
    published: RwLock<StateId>,
    running: Arc<AtomicBool>,
    stop: CancellationToken,
}

impl<D: Send + Sync + 'static> EngineCell<D> {
    /// Run one step against the wrapped engine and publish where it settled.
    fn step<R>(&self, f: impl FnOnce(&ImmediateMachine<D>) -> R) -> R {
        let _lock = self.lock.lock();
        let _watch = PanicWatch(self);
        let result = f(&self.base);
        self.publish();
        result
    }

    fn publish(&self) {
        let current = self.base.current_id();
        let mut published = self.published.write();
        if *published != current {
            *published = current;
            trace!(machine = %self.id, state = self.base.graph().state(current).name(), "published state");
        }
    }

    /// Stop everything without taking the engine lock, so callbacks running
    /// under it may call this too.
    fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.base.stop();
        self.stop.cancel();
    }
}

/// Halts the machine if a callback panics during a step.
struct PanicWatch<'a, D: Send + Sync + 'static>(&'a EngineCell<D>);

impl<D: Send + Sync + 'static> Drop for PanicWatch<'_, D> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!(machine = %self.0.id, "callback panicked, halting machine");
            self.0.halt();
        }
    }
}

/// The dispatcher handed to callbacks and exposed by the machine. Never
/// blocks, so the coordination task can safely dispatch to itself.
struct EventSender {
    machine: Uuid,
    events: mpsc::Sender<Event>,
    running: Arc<AtomicBool>,
}

impl Dispatcher for EventSender {
    fn dispatch(&self, event: Event) {
        if !self.running.load(Ordering::SeqCst) {
            trace!(machine = %self.machine, event = event.name(), "machine not running, ignoring event");
            return;
        }
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(machine = %self.machine, event = event.name(), "event queue full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                trace!(machine = %self.machine, event = event.name(), "coordination task gone, dropping event");
            }
        }
    }
}

struct Inbox {
    events: mpsc::Receiver<Event>,
    evaluate: mpsc::Receiver<()>,
}

/// A machine that services events, timers and guard changes on its own.
///
/// `start` must be called inside a Tokio runtime: it runs the initial
/// entry synchronously, then spawns a coordination task on that runtime.
/// From then on:
/// - dispatched events are queued on a bounded channel and processed in
///   order by the coordination task;
/// - timer transitions fire on their own once their deadline passes;
/// - guards are re-evaluated every poll period, so eventless transitions
///   react to data changed from outside.
///
/// [`current_state`](Machine::current_state) never waits on a transition
/// in progress; it reports the state the machine last settled in.
///
/// A threaded machine runs at most once: once started and stopped it
/// cannot be started again. A panicking callback ends the coordination task and
/// leaves the machine stopped.
///
/// # Example
///
/// ```rust
/// use statecraft::prelude::*;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let mut builder = MachineBuilder::new(());
///     let waiting = builder.new_state("waiting");
///     let done = builder.new_state("done");
///     builder.initial_state().add_transition(&waiting);
///     waiting.add_transition(&done).after(Duration::from_millis(20));
///
///     let machine = builder.build_threaded().unwrap();
///     machine.start().unwrap();
///     assert_eq!(machine.current_state().name(), "waiting");
///
///     tokio::time::sleep(Duration::from_millis(200)).await;
///     assert_eq!(machine.current_state().name(), "done");
///     machine.stop();
/// }
/// ```
pub struct ThreadedMachine<D: Send + Sync + 'static> {
    cell: Arc<EngineCell<D>>,
    events: Arc<EventSender>,
    timers: Arc<TimerSupervisor>,
    pending: Mutex<Option<Inbox>>,
    poll_period: Duration,
}

impl<D: Send + Sync + 'static> ThreadedMachine<D> {
    pub(crate) fn new(
        id: Uuid,
        graph: Graph<D>,
        data: Arc<D>,
        tracers: Vec<Arc<dyn Tracer<D>>>,
        config: MachineConfig,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity);
        let (evaluate_tx, evaluate_rx) = mpsc::channel(config.event_queue_capacity);
        let running = Arc::new(AtomicBool::new(false));
        let stop = CancellationToken::new();

        let events = Arc::new(EventSender {
            machine: id,
            events: event_tx,
            running: Arc::clone(&running),
        });
        let timers = Arc::new(TimerSupervisor::new(id, stop.clone(), evaluate_tx));
        let dispatcher: Arc<dyn Dispatcher> = events.clone();
        let hooks: Arc<dyn StateHooks<D>> = timers.clone();
        let wiring = Wiring {
            dispatcher: Some(dispatcher),
            hooks: Some(hooks),
        };

        let initial = graph.initial().id();
        let base = ImmediateMachine::with_wiring(id, graph, data, tracers, wiring);
        Self {
            cell: Arc::new(EngineCell {
                id,
                base,
                lock: Mutex::new(()),
                published: RwLock::new(initial),
                running,
                stop,
            }),
            events,
            timers,
            pending: Mutex::new(Some(Inbox {
                events: event_rx,
                evaluate: evaluate_rx,
            })),
            poll_period: config.poll_period,
        }
    }

    pub fn graph(&self) -> &Graph<D> {
        self.cell.base.graph()
    }
}

impl<D: Send + Sync + 'static> Dispatcher for ThreadedMachine<D> {
    fn dispatch(&self, event: Event) {
        self.events.dispatch(event);
    }
}

impl<D: Send + Sync + 'static> Machine<D> for ThreadedMachine<D> {
    fn id(&self) -> Uuid {
        self.cell.id
    }

    fn start(&self) -> Result<(), MachineError> {
        if self.is_running() {
            warn!(machine = %self.cell.id, "start called on a running machine");
            return Err(MachineError::AlreadyRunning);
        }
        let runtime = Handle::try_current().map_err(|_| MachineError::NoRuntime)?;
        let Some(inbox) = self.pending.lock().take() else {
            warn!(machine = %self.cell.id, "threaded machine cannot be restarted");
            return Err(MachineError::AlreadyStarted);
        };

        self.timers.attach(runtime.clone());
        self.cell.running.store(true, Ordering::SeqCst);
        self.cell.step(|base| base.start())?;

        let coordinator = Coordinator {
            cell: Arc::clone(&self.cell),
            inbox,
            poll_period: self.poll_period,
        };
        runtime.spawn(coordinator.run());
        Ok(())
    }

    /// Stopping a machine that was never started does nothing, so it can
    /// still be started later.
    fn stop(&self) {
        if self.pending.lock().is_some() {
            trace!(machine = %self.cell.id, "stop called before start, ignoring");
            return;
        }
        if self.is_running() {
            debug!(machine = %self.cell.id, "stopping machine");
        }
        self.cell.halt();
    }

    fn is_running(&self) -> bool {
        self.cell.running.load(Ordering::SeqCst)
    }

    fn current_state(&self) -> &State<D> {
        let id = *self.cell.published.read();
        self.cell.base.graph().state(id)
    }

    fn add_tracer(&self, tracer: Arc<dyn Tracer<D>>) {
        self.cell.base.add_tracer(tracer);
    }

    fn visit(&self, visitor: &mut dyn Visitor<D>) {
        self.cell.base.visit(visitor);
    }

    fn data(&self) -> &D {
        self.cell.base.data()
    }

    fn shared_data(&self) -> Arc<D> {
        self.cell.base.shared_data()
    }
}

impl<D: Send + Sync + 'static> Drop for ThreadedMachine<D> {
    fn drop(&mut self) {
        self.cell.halt();
    }
}

/// Owns the receiving ends of the machine's channels and is the only
/// writer of the wrapped engine once the machine has started.
struct Coordinator<D: Send + Sync + 'static> {
    cell: Arc<EngineCell<D>>,
    inbox: Inbox,
    poll_period: Duration,
}

impl<D: Send + Sync + 'static> Coordinator<D> {
    async fn run(self) {
        let Coordinator {
            cell,
            mut inbox,
            poll_period,
        } = self;
        debug!(machine = %cell.id, poll_ms = poll_period.as_millis() as u64, "coordination task started");

        let mut poll = tokio::time::interval(poll_period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll.tick().await;

        loop {
            tokio::select! {
                _ = cell.stop.cancelled() => break,
                Some(event) = inbox.events.recv() => {
                    cell.step(|base| base.dispatch(event));
                }
                Some(()) = inbox.evaluate.recv() => {
                    cell.step(|base| base.tick());
                }
                _ = poll.tick() => {
                    cell.step(|base| base.tick());
                }
            }
        }
        debug!(machine = %cell.id, "coordination task stopped");
    }
}
