//! Build errors for machine, state and transition builders.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The two runnable forms a builder can be finalized into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineKind {
    Immediate,
    Threaded,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Immediate => write!(f, "immediate"),
            EngineKind::Threaded => write!(f, "threaded"),
        }
    }
}

/// Errors that can occur when finalizing a machine.
///
/// Build errors are not retryable: construct a new builder instead.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Builder already finalised as {finalized} machine, cannot build {requested} machine")]
    WrongEngineKind {
        requested: EngineKind,
        finalized: EngineKind,
    },

    #[error("State name '{0}' is used more than once in this machine")]
    DuplicateState(String),

    #[error("State '{0}' was already built into a different machine")]
    ForeignState(String),

    #[error("Event trigger on transition '{from}' -> '{to}' has an empty event name")]
    EmptyEventName { from: String, to: String },

    #[error("Target '{to}' of a transition from '{from}' was dropped before the machine was built")]
    DanglingTarget { from: String, to: String },

    #[error("Invalid machine configuration: {0}")]
    InvalidConfig(String),

    #[error("A previous build of this machine failed. Construct a new builder")]
    Abandoned,
}
