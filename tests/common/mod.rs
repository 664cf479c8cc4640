//! Helpers shared by the integration suites.

#![allow(dead_code)]

use statecraft::core::{Event, State};
use statecraft::trace::Tracer;
use parking_lot::Mutex;
use std::time::Duration;

/// Route engine logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Poll `check` until it holds or `within` has passed.
pub async fn eventually(within: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Tracer that records hook calls as short strings.
#[derive(Default)]
pub struct Recorder {
    steps: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().clone()
    }

    pub fn clear(&self) {
        self.steps.lock().clear();
    }
}

impl<D> Tracer<D> for Recorder {
    fn on_entry(&self, state: &State<D>, _data: &D) {
        self.steps.lock().push(format!("Entry({})", state.name()));
    }

    fn on_exit(&self, state: &State<D>, _data: &D) {
        self.steps.lock().push(format!("Exit({})", state.name()));
    }

    fn on_transition(&self, _event: Option<&Event>, _source: &State<D>, _target: &State<D>, _data: &D) {
        self.steps.lock().push("Transition".to_string());
    }

    fn on_rejected_event(&self, event: &Event, _state: &State<D>, _data: &D) {
        self.steps.lock().push(format!("Rejected({})", event.name()));
    }
}
