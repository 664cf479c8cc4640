//! Runtime lifecycle errors.

use thiserror::Error;

/// Errors returned by [`Machine::start`](crate::engine::Machine::start).
///
/// Rejected events are not errors; they are reported to tracers.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MachineError {
    #[error("Machine is already running")]
    AlreadyRunning,

    #[error("Threaded machine was already started once and cannot be restarted")]
    AlreadyStarted,

    #[error("Threaded machine must be started from within a Tokio runtime")]
    NoRuntime,

    #[error("Machine cannot be started from inside one of its own callbacks")]
    Busy,
}
