//! [`OperatorListener`] – turns operator input into run-state transitions.
//!
//! Input arrives on a [`tokio::sync::mpsc`] channel fed by whatever front end
//! the process has (the CLI forwards stdin lines and Ctrl-C).  The listener
//! owns the [`RunStateController`], so it is the only component that ever
//! changes the run state.  It never touches the robot: the watchdog observes
//! the new state on its next tick and cancels the action itself.

use patrol_kernel::{RunStateController, RunStateWatcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorIntent {
    Pause,
    Resume,
    Quit,
}

impl OperatorIntent {
    /// Map a key to an intent.  Keys are case-insensitive.
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'p' => Some(OperatorIntent::Pause),
            'r' => Some(OperatorIntent::Resume),
            'q' => Some(OperatorIntent::Quit),
            _ => None,
        }
    }

    pub fn key(self) -> char {
        match self {
            OperatorIntent::Pause => 'p',
            OperatorIntent::Resume => 'r',
            OperatorIntent::Quit => 'q',
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            OperatorIntent::Pause => "pause the patrol (cancels the current move)",
            OperatorIntent::Resume => "resume the patrol at the interrupted POI",
            OperatorIntent::Quit => "stop the patrol and exit",
        }
    }

    pub const ALL: [OperatorIntent; 3] = [
        OperatorIntent::Pause,
        OperatorIntent::Resume,
        OperatorIntent::Quit,
    ];
}

/// One item on the operator input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorInput {
    /// A key typed by the operator.
    Key(char),
    /// External shutdown request (Ctrl-C, SIGTERM).
    Shutdown,
}

/// Why [`OperatorListener::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// The operator pressed `q`.
    Quit,
    /// An [`OperatorInput::Shutdown`] was received.
    Shutdown,
    /// Every input sender was dropped.
    InputClosed,
}

pub struct OperatorListener {
    controller: RunStateController,
}

impl OperatorListener {
    pub fn new(controller: RunStateController) -> Self {
        Self { controller }
    }

    /// A reader of the run state this listener writes.
    pub fn watcher(&self) -> RunStateWatcher {
        self.controller.watcher()
    }

    /// Apply one intent.  Returns `true` if the run state changed.
    pub fn apply(&self, intent: OperatorIntent) -> bool {
        let changed = match intent {
            OperatorIntent::Pause => self.controller.pause(),
            OperatorIntent::Resume => self.controller.resume(),
            OperatorIntent::Quit => self.controller.stop(),
        };
        if changed {
            info!(?intent, state = %self.controller.current(), "operator command applied");
        } else {
            debug!(?intent, state = %self.controller.current(), "operator command had no effect");
        }
        changed
    }

    /// Consume input until the operator quits, a shutdown arrives or the
    /// channel closes.
    ///
    /// On [`ListenerExit::InputClosed`] the run state is left as it was.  The
    /// controller is dropped with the listener, so a paused run then reads as
    /// stopping to anyone waiting for a resume.
    pub async fn run(self, mut input: mpsc::Receiver<OperatorInput>) -> ListenerExit {
        while let Some(event) = input.recv().await {
            match event {
                OperatorInput::Shutdown => {
                    info!("shutdown requested");
                    self.controller.stop();
                    return ListenerExit::Shutdown;
                }
                OperatorInput::Key(key) => match OperatorIntent::from_key(key) {
                    Some(OperatorIntent::Quit) => {
                        self.apply(OperatorIntent::Quit);
                        return ListenerExit::Quit;
                    }
                    Some(intent) => {
                        self.apply(intent);
                    }
                    None => warn!(key = %key.escape_default(), "unknown operator command ignored"),
                },
            }
        }
        debug!("operator input closed");
        ListenerExit::InputClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patrol_kernel::run_state;
    use patrol_types::RunState;

    fn listener() -> (OperatorListener, RunStateWatcher) {
        let (controller, watcher) = run_state();
        (OperatorListener::new(controller), watcher)
    }

    #[test]
    fn keys_are_case_insensitive() {
        assert_eq!(OperatorIntent::from_key('p'), Some(OperatorIntent::Pause));
        assert_eq!(OperatorIntent::from_key('P'), Some(OperatorIntent::Pause));
        assert_eq!(OperatorIntent::from_key('R'), Some(OperatorIntent::Resume));
        assert_eq!(OperatorIntent::from_key('q'), Some(OperatorIntent::Quit));
        assert_eq!(OperatorIntent::from_key('x'), None);
        assert_eq!(OperatorIntent::from_key(' '), None);
    }

    #[test]
    fn key_round_trips_for_every_intent() {
        for intent in OperatorIntent::ALL {
            assert_eq!(OperatorIntent::from_key(intent.key()), Some(intent));
        }
    }

    #[test]
    fn pause_is_idempotent_and_resume_restores_running() {
        let (listener, watcher) = listener();
        assert!(listener.apply(OperatorIntent::Pause));
        assert!(!listener.apply(OperatorIntent::Pause));
        assert_eq!(watcher.current(), RunState::Paused);

        assert!(listener.apply(OperatorIntent::Resume));
        assert_eq!(watcher.current(), RunState::Running);
        assert!(!listener.apply(OperatorIntent::Resume));
    }

    #[test]
    fn nothing_leaves_stopping() {
        let (listener, watcher) = listener();
        listener.apply(OperatorIntent::Quit);
        assert!(!listener.apply(OperatorIntent::Resume));
        assert!(!listener.apply(OperatorIntent::Pause));
        assert_eq!(watcher.current(), RunState::Stopping);
    }

    #[tokio::test]
    async fn quit_key_stops_and_exits() {
        let (listener, watcher) = listener();
        let (tx, rx) = mpsc::channel(8);
        tx.send(OperatorInput::Key('p')).await.unwrap();
        tx.send(OperatorInput::Key('Z')).await.unwrap();
        tx.send(OperatorInput::Key('Q')).await.unwrap();
        // Never reached: the listener exits on quit.
        tx.send(OperatorInput::Key('r')).await.unwrap();

        assert_eq!(listener.run(rx).await, ListenerExit::Quit);
        assert_eq!(watcher.current(), RunState::Stopping);
    }

    #[tokio::test]
    async fn shutdown_signal_stops_and_exits() {
        let (listener, watcher) = listener();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(listener.run(rx));

        tx.send(OperatorInput::Key('p')).await.unwrap();
        tx.send(OperatorInput::Shutdown).await.unwrap();

        assert_eq!(task.await.unwrap(), ListenerExit::Shutdown);
        assert_eq!(watcher.current(), RunState::Stopping);
    }

    #[tokio::test]
    async fn closed_input_leaves_state_untouched() {
        let (listener, watcher) = listener();
        let (tx, rx) = mpsc::channel(8);
        tx.send(OperatorInput::Key('x')).await.unwrap();
        drop(tx);

        assert_eq!(listener.run(rx).await, ListenerExit::InputClosed);
        assert_eq!(watcher.current(), RunState::Running);
    }

    #[tokio::test]
    async fn paused_run_reads_as_stopping_once_input_is_gone() {
        let (listener, mut watcher) = listener();
        let (tx, rx) = mpsc::channel(8);
        tx.send(OperatorInput::Key('p')).await.unwrap();
        drop(tx);

        assert_eq!(listener.run(rx).await, ListenerExit::InputClosed);
        assert_eq!(watcher.wait_while_paused().await, RunState::Stopping);
    }
}
