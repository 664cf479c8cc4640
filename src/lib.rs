//! Statecraft: an embeddable UML-style finite state machine engine
//!
//! Machines are described with a builder, finalized into an immutable graph
//! and executed by one of two engines: an immediate engine driven by
//! explicit calls, or a threaded engine that serves events and timers on
//! its own Tokio task.
//!
//! # Core Concepts
//!
//! - **States** with optional entry and exit actions
//! - **Transitions** triggered by nothing (eventless), by a named event or
//!   by a timer, gated by a guard and carrying an optional effect
//! - **Local transitions** (source equals target) that fire their effect
//!   without leaving the state
//! - **Dispatcher**: callbacks can raise follow-up events; the chain
//!   completes before the outermost call returns
//! - **Tracers and visitors** observe the running machine and walk its graph
//!
//! # Example
//!
//! ```rust
//! use statecraft::prelude::*;
//! use statecraft::trace::StateCounter;
//! use std::sync::Arc;
//!
//! let mut builder = MachineBuilder::new(());
//! let off = builder.new_state("off");
//! let on = builder.new_state("on");
//! builder.initial_state().add_transition(&off);
//! off.add_transition(&on).on_event("TurnOn");
//! on.add_transition(&off).on_event("TurnOff");
//!
//! let counter = Arc::new(StateCounter::new());
//! builder.add_tracer(counter.clone());
//!
//! let machine = builder.build_immediate().unwrap();
//! machine.start().unwrap();
//! machine.dispatch(Event::new("TurnOn"));
//! machine.dispatch(Event::new("TurnOff"));
//!
//! assert_eq!(machine.current_state().name(), "off");
//! assert_eq!(counter.entries_of("off"), 2);
//! assert!(counter.rejected_event_counts().is_empty());
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod trace;
pub mod visit;

// Re-export commonly used types
pub use crate::builder::{BuildError, MachineBuilder};
pub use crate::core::{Dispatcher, Event};
pub use crate::engine::{ImmediateMachine, Machine, MachineError, ThreadedMachine};

/// Everything needed to build and drive a machine.
pub mod prelude {
    pub use crate::builder::{BuildError, MachineBuilder, StateBuilder, TransitionBuilder};
    pub use crate::core::{Dispatcher, Event, Payload, State, Trigger};
    pub use crate::engine::{ImmediateMachine, Machine, MachineConfig, MachineError, ThreadedMachine};
    pub use crate::trace::Tracer;
    pub use crate::visit::Visitor;
}
