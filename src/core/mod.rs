//! Core state machine types.
//!
//! This module contains the finalized, immutable model that both engines
//! execute:
//! - Events and their opaque payloads
//! - States, transitions, triggers and guards
//! - The state graph and the dispatcher capability handed to callbacks
//!
//! Nothing here runs a machine; see [`crate::engine`] for that.

mod dispatch;
mod event;
mod graph;
mod guard;
mod state;
mod transition;
mod trigger;

pub use dispatch::Dispatcher;
pub use event::{Event, Payload};
pub use graph::Graph;
pub use guard::Guard;
pub use state::{Action, State, StateId, StateLabels};
pub use transition::{Effect, Transition, TransitionLabels};
pub use trigger::Trigger;
