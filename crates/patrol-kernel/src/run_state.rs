//! Shared operator run state.
//!
//! [`run_state`] creates the single writer ([`RunStateController`], owned by
//! the operator command listener) and the first reader
//! ([`RunStateWatcher`], cloned into the traversal loop and the watchdog).
//! The value lives in a [`tokio::sync::watch`] channel: reads are snapshot
//! reads and waiting for a change never spins.

use patrol_types::RunState;
use tokio::sync::watch;
use tracing::debug;

/// Create a fresh run state, initialised to [`RunState::Running`].
pub fn run_state() -> (RunStateController, RunStateWatcher) {
    let (tx, rx) = watch::channel(RunState::Running);
    (RunStateController { tx }, RunStateWatcher { rx })
}

/// Sole writer of the run state.  Deliberately not `Clone`.
#[derive(Debug)]
pub struct RunStateController {
    tx: watch::Sender<RunState>,
}

impl RunStateController {
    pub fn current(&self) -> RunState {
        *self.tx.borrow()
    }

    /// A new reader of this run state.
    pub fn watcher(&self) -> RunStateWatcher {
        RunStateWatcher {
            rx: self.tx.subscribe(),
        }
    }

    /// `RUNNING`/`PAUSED` → `PAUSED`.  Returns `true` if the state changed.
    pub fn pause(&self) -> bool {
        self.transition(|s| (s == RunState::Running).then_some(RunState::Paused))
    }

    /// `PAUSED` → `RUNNING`.  Returns `true` if the state changed.
    pub fn resume(&self) -> bool {
        self.transition(|s| (s == RunState::Paused).then_some(RunState::Running))
    }

    /// Any → `STOPPING`.  Returns `true` if the state changed.
    pub fn stop(&self) -> bool {
        self.transition(|s| (s != RunState::Stopping).then_some(RunState::Stopping))
    }

    fn transition(&self, next: impl FnOnce(RunState) -> Option<RunState>) -> bool {
        self.tx.send_if_modified(|state| match next(*state) {
            Some(to) => {
                debug!(from = %state, to = %to, "run state transition");
                *state = to;
                true
            }
            None => false,
        })
    }
}

/// Read-only view of the run state.
#[derive(Debug, Clone)]
pub struct RunStateWatcher {
    rx: watch::Receiver<RunState>,
}

impl RunStateWatcher {
    /// Snapshot of the current state.  Never blocks.
    pub fn current(&self) -> RunState {
        *self.rx.borrow()
    }

    /// Wait until the state is not [`RunState::Paused`] and return it.
    ///
    /// Returns immediately when already `RUNNING` or `STOPPING`.  If the
    /// controller is dropped while paused nobody can resume the run, so this
    /// reports [`RunState::Stopping`].
    pub async fn wait_while_paused(&mut self) -> RunState {
        match self.rx.wait_for(|s| *s != RunState::Paused).await {
            Ok(state) => *state,
            Err(_) => RunState::Stopping,
        }
    }
}
