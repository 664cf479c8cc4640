//! Runnable machines.
//!
//! Two engines execute the same finalized graph:
//! - [`ImmediateMachine`] runs everything synchronously on the caller's
//!   thread and only makes progress when called.
//! - [`ThreadedMachine`] owns a coordination task on a Tokio runtime that
//!   serves dispatched events, transition timers and periodic guard
//!   re-evaluation on its own.
//!
//! Both implement [`Machine`], so tracers, visitors and renderers work with
//! either.

mod config;
mod error;
mod immediate;
mod threaded;
mod timers;

pub use config::MachineConfig;
pub use error::MachineError;
pub use immediate::ImmediateMachine;
pub use threaded::ThreadedMachine;

use crate::core::{Dispatcher, State, Transition};
use crate::trace::Tracer;
use crate::visit::Visitor;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Name of the state every machine starts in.
pub const INITIAL_STATE_NAME: &str = "initial";

/// Name of the optional final state.
pub const FINAL_STATE_NAME: &str = "final";

/// How often a threaded machine re-evaluates guards with no event or timer.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(10);

/// Capacity of a threaded machine's event channel.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 50;

/// Operations shared by both engines.
pub trait Machine<D: Send + Sync + 'static>: Dispatcher {
    fn id(&self) -> Uuid;

    /// Enter the current state and settle through eventless transitions.
    fn start(&self) -> Result<(), MachineError>;

    /// Stop accepting events. The current state is kept.
    fn stop(&self);

    fn is_running(&self) -> bool;

    fn current_state(&self) -> &State<D>;

    fn add_tracer(&self, tracer: Arc<dyn Tracer<D>>);

    /// Walk the finalized graph. The result does not depend on whether the
    /// machine has run.
    fn visit(&self, visitor: &mut dyn Visitor<D>);

    fn data(&self) -> &D;

    fn shared_data(&self) -> Arc<D>;
}

/// Housekeeping run by the immediate engine on every state entry and exit.
pub(crate) trait StateHooks<D>: Send + Sync {
    fn entered(&self, state: &State<D>);
    fn exited(&self, state: &State<D>);
    /// A local timer transition fired and restarted its own clock.
    fn rearmed(&self, state: &State<D>, transition: &Transition<D>);
}

/// Where an immediate engine sends callback dispatches and state
/// housekeeping. Unwired engines dispatch into themselves.
pub(crate) struct Wiring<D> {
    pub(crate) dispatcher: Option<Arc<dyn Dispatcher>>,
    pub(crate) hooks: Option<Arc<dyn StateHooks<D>>>,
}

impl<D> Wiring<D> {
    pub(crate) fn detached() -> Self {
        Self {
            dispatcher: None,
            hooks: None,
        }
    }
}
