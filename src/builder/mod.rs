//! Builder API for constructing state machines.
//!
//! Builders are mutable and single-threaded. States and transitions can be
//! wired in any order, including back edges and self loops, and are only
//! resolved when the machine is finalized with
//! [`MachineBuilder::build_immediate`] or [`MachineBuilder::build_threaded`].

mod assembly;
pub mod error;
pub mod machine;
pub mod state;
pub mod transition;

pub use error::{BuildError, EngineKind};
pub use machine::MachineBuilder;
pub use state::StateBuilder;
pub use transition::TransitionBuilder;
