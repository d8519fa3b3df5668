//! [`MotionWatchdog`] – supervises one navigation action to completion.
//!
//! ```text
//!  CREATING ──create failed──────────────────────────────▶ FAILED
//!     │
//!     ▼
//!  POLLING ──run state not RUNNING──cancel──────────────▶ PAUSED_ABORT
//!     │  ├──elapsed > max_wait──────cancel──────────────▶ TIMED_OUT
//!     │  ├──unreachable × comm_fail_limit──cancel───────▶ COMM_FAILED
//!     │  ├──status rejected─────────cancel──────────────▶ FAILED
//!     │  └──classified terminal─────────────────────────▶ SUCCEEDED / FAILED
//!     └──pending or transient failure: sleep poll_interval, repeat
//! ```
//!
//! The timeout and the communication-failure counter are independent: a
//! successful status read resets the counter but never the wall clock, and a
//! slow but reachable robot never accumulates communication failures.
//!
//! All cancels are best-effort: a failing cancel is logged and the original
//! outcome is still returned.

use std::sync::Arc;
use std::time::Duration;

use patrol_gateway::RobotGateway;
use patrol_types::{ActionHandle, GatewayError, RunState, WatchdogOutcome};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};

use crate::classifier::{ActionClassifier, Verdict, failure_reason};
use crate::run_state::RunStateWatcher;

/// Polling and liveness policy of a [`MotionWatchdog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Delay between two status reads.
    pub poll_interval: Duration,
    /// Wall-clock budget for one action, measured from its creation.
    pub max_wait: Duration,
    /// Consecutive unreachable status reads tolerated before giving up.
    pub comm_fail_limit: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            max_wait: Duration::from_secs(180),
            comm_fail_limit: 2,
        }
    }
}

/// Drives one action at a time through a [`RobotGateway`].
///
/// [`supervise`][Self::supervise] takes `&mut self`, so a single watchdog can
/// never have two actions in flight.
pub struct MotionWatchdog {
    gateway: Arc<dyn RobotGateway>,
    classifier: ActionClassifier,
    config: WatchdogConfig,
}

impl MotionWatchdog {
    /// Create a watchdog using the standard classification table.
    pub fn new(gateway: Arc<dyn RobotGateway>, config: WatchdogConfig) -> Self {
        Self::with_classifier(gateway, config, ActionClassifier::standard())
    }

    pub fn with_classifier(
        gateway: Arc<dyn RobotGateway>,
        config: WatchdogConfig,
        classifier: ActionClassifier,
    ) -> Self {
        Self {
            gateway,
            classifier,
            config,
        }
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Move the robot to `poi` and supervise the action until it reaches a
    /// terminal outcome.
    #[instrument(skip(self, run_state))]
    pub async fn supervise(&mut self, poi: &str, run_state: &RunStateWatcher) -> WatchdogOutcome {
        info!("moving to POI");
        let handle = match self.gateway.create_action(poi).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "could not create move action");
                return WatchdogOutcome::Failed(format!("could not create move action: {e}"));
            }
        };
        let outcome = self.poll(handle, run_state).await;
        match &outcome {
            WatchdogOutcome::Succeeded => info!(action_id = handle.id(), "arrived"),
            WatchdogOutcome::Paused => info!(action_id = handle.id(), "move aborted by operator"),
            other => warn!(action_id = handle.id(), outcome = ?other, "move did not complete"),
        }
        outcome
    }

    async fn poll(&self, handle: ActionHandle, run_state: &RunStateWatcher) -> WatchdogOutcome {
        let started = Instant::now();
        let mut comm_failures: u32 = 0;
        let mut polls: u64 = 0;

        loop {
            let state = run_state.current();
            if state != RunState::Running {
                info!(%state, "run state changed; cancelling current action");
                self.cancel_best_effort().await;
                return WatchdogOutcome::Paused;
            }

            let elapsed = started.elapsed();
            if elapsed > self.config.max_wait {
                warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    max_wait_ms = self.config.max_wait.as_millis() as u64,
                    "action exceeded its time budget"
                );
                self.cancel_best_effort().await;
                return WatchdogOutcome::TimedOut;
            }

            polls += 1;
            match self.gateway.get_status(handle).await {
                Ok(snapshot) => {
                    comm_failures = 0;
                    let classification = self.classifier.classify(&snapshot);
                    debug!(
                        poll = polls,
                        %snapshot,
                        verdict = ?classification.verdict,
                        rule = classification.rule.unwrap_or("-"),
                        "action status"
                    );
                    match classification.verdict {
                        Verdict::Pending => {}
                        Verdict::Succeeded => return WatchdogOutcome::Succeeded,
                        Verdict::Failed => {
                            return WatchdogOutcome::Failed(failure_reason(&snapshot));
                        }
                    }
                }
                Err(GatewayError::Unreachable(msg)) => {
                    comm_failures += 1;
                    warn!(
                        attempt = comm_failures,
                        limit = self.config.comm_fail_limit,
                        error = %msg,
                        "status read failed"
                    );
                    if comm_failures >= self.config.comm_fail_limit {
                        self.cancel_best_effort().await;
                        return WatchdogOutcome::CommFailure;
                    }
                }
                Err(rejected @ GatewayError::Rejected { .. }) => {
                    self.cancel_best_effort().await;
                    return WatchdogOutcome::Failed(rejected.to_string());
                }
            }

            sleep(self.config.poll_interval).await;
        }
    }

    async fn cancel_best_effort(&self) {
        if let Err(e) = self.gateway.cancel_current().await {
            warn!(error = %e, "cancel of current action failed; ignoring");
        }
    }
}
