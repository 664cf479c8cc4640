//! Timestamped record of everything a machine did.

use super::Tracer;
use crate::core::{Event, State};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use tracing::debug;
use uuid::Uuid;

/// What a [`LogEntry`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogKind {
    Entry,
    Exit,
    Transition,
    Rejected,
}

/// One line of a [`MachineLogger`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub when: DateTime<Utc>,
    pub machine: Uuid,
    pub kind: LogKind,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.when.to_rfc3339(), self.message)
    }
}

/// Tracer that keeps every entry, exit, transition and rejected event in
/// memory, and mirrors each one to `tracing` at debug level.
#[derive(Debug, Default)]
pub struct MachineLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MachineLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Write one line per entry.
    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        for entry in self.entries.lock().iter() {
            writeln!(writer, "{entry}")?;
        }
        Ok(())
    }

    fn record(&self, machine: Uuid, kind: LogKind, message: String) {
        debug!(machine = %machine, kind = ?kind, "{message}");
        self.entries.lock().push(LogEntry {
            when: Utc::now(),
            machine,
            kind,
            message,
        });
    }
}

impl<D> Tracer<D> for MachineLogger {
    fn on_entry(&self, state: &State<D>, _data: &D) {
        self.record(state.machine(), LogKind::Entry, format!("Entered state: {}", state.name()));
    }

    fn on_exit(&self, state: &State<D>, _data: &D) {
        self.record(state.machine(), LogKind::Exit, format!("Exited state: {}", state.name()));
    }

    fn on_transition(&self, event: Option<&Event>, source: &State<D>, target: &State<D>, _data: &D) {
        let message = match event {
            Some(event) => format!(
                "Transitioning on event {}: {} -> {}",
                event.name(),
                source.name(),
                target.name()
            ),
            None => format!("Transitioning: {} -> {}", source.name(), target.name()),
        };
        self.record(source.machine(), LogKind::Transition, message);
    }

    fn on_rejected_event(&self, event: &Event, state: &State<D>, _data: &D) {
        self.record(
            state.machine(),
            LogKind::Rejected,
            format!("Rejected event {} in state: {}", event.name(), state.name()),
        );
    }
}
