//! The capability handed to user callbacks for injecting events.

use super::event::Event;

/// Injects events into the machine that owns it.
///
/// Every entry action, exit action and transition effect receives a
/// `&dyn Dispatcher`, so callbacks can raise follow-up events without
/// knowing which engine is running them. On an immediate machine the event
/// joins the queue being drained by the outermost `dispatch` call; on a
/// threaded machine it is sent to the coordination task.
///
/// Dispatching into a stopped machine is a silent no-op.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, event: Event);
}
