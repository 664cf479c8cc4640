//! Per-visit transition timers for threaded machines.

use super::StateHooks;
use crate::core::{State, Transition};
use parking_lot::Mutex;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

/// Starts one sleeper task per timer transition when a state is entered
/// and cancels them all when it is exited.
///
/// Sleepers never touch the machine. An elapsed sleeper only asks the
/// coordination task to re-evaluate, which then checks the transition's
/// deadline and guard under the engine lock.
pub(crate) struct TimerSupervisor {
    machine: Uuid,
    root: CancellationToken,
    visit: Mutex<CancellationToken>,
    evaluate: mpsc::Sender<()>,
    runtime: OnceLock<Handle>,
}

impl TimerSupervisor {
    /// Every visit token is a child of `root`, so cancelling `root` stops
    /// every outstanding sleeper.
    pub(crate) fn new(machine: Uuid, root: CancellationToken, evaluate: mpsc::Sender<()>) -> Self {
        let visit = root.child_token();
        Self {
            machine,
            root,
            visit: Mutex::new(visit),
            evaluate,
            runtime: OnceLock::new(),
        }
    }

    pub(crate) fn attach(&self, runtime: Handle) {
        let _ = self.runtime.set(runtime);
    }

    /// Start a sleeper that asks for re-evaluation after `duration`, unless
    /// `visit` is cancelled first.
    fn spawn_sleeper(&self, visit: CancellationToken, state: &str, duration: Duration) {
        let Some(runtime) = self.runtime.get() else {
            return;
        };
        debug!(
            machine = %self.machine,
            state = state,
            after_ms = duration.as_millis() as u64,
            "arming transition timer"
        );

        let machine = self.machine;
        let state = state.to_string();
        let evaluate = self.evaluate.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = visit.cancelled() => {
                    trace!(machine = %machine, state = %state, "transition timer cancelled");
                }
                _ = tokio::time::sleep(duration) => {
                    debug!(machine = %machine, state = %state, "transition timer elapsed");
                    // A full channel already holds a pending re-evaluation.
                    let _ = evaluate.try_send(());
                }
            }
        });
    }
}

impl<D> StateHooks<D> for TimerSupervisor {
    fn entered(&self, state: &State<D>) {
        let visit = self.root.child_token();
        *self.visit.lock() = visit.clone();

        for transition in state.transitions() {
            if let Some(duration) = transition.trigger().timer_duration() {
                self.spawn_sleeper(visit.clone(), state.name(), duration);
            }
        }
    }

    fn exited(&self, _state: &State<D>) {
        self.visit.lock().cancel();
    }

    /// The state is still being visited, so the new sleeper shares the
    /// current visit token.
    fn rearmed(&self, state: &State<D>, transition: &Transition<D>) {
        if let Some(duration) = transition.trigger().timer_duration() {
            let visit = self.visit.lock().clone();
            self.spawn_sleeper(visit, state.name(), duration);
        }
    }
}
