//! [`TraversalLoop`] – endless round trip over the configured POIs.
//!
//! Each iteration:
//!
//! 1. **Gate** – wait (without polling) while the run is paused; leave the
//!    loop once it is stopping.
//! 2. **Move** – hand the current target to the [`MotionWatchdog`].
//! 3. **Advance** – on arrival move to the next POI (wrapping to the first);
//!    on an operator abort keep the same POI so it is retried after resume.
//!
//! Any other watchdog outcome is fatal and ends the loop with a
//! [`PatrolError`].

use patrol_kernel::{MotionWatchdog, RunStateWatcher};
use patrol_types::{PatrolError, PoiList, RunState, WatchdogOutcome};
use tracing::{Instrument, error, info, info_span};

/// Counters reported when the loop stops cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalSummary {
    /// Moves that reached their POI.
    pub legs_completed: u64,
    /// Moves aborted by the operator.
    pub interruptions: u64,
    /// The POI the next move would have targeted.
    pub next_target: String,
}

pub struct TraversalLoop {
    watchdog: MotionWatchdog,
    pois: PoiList,
    run_state: RunStateWatcher,
}

impl TraversalLoop {
    pub fn new(watchdog: MotionWatchdog, pois: PoiList, run_state: RunStateWatcher) -> Self {
        Self {
            watchdog,
            pois,
            run_state,
        }
    }

    /// Run until the run state becomes `STOPPING` or a move fails.
    pub async fn run(mut self) -> Result<TraversalSummary, PatrolError> {
        let mut index = 0;
        let mut legs_completed: u64 = 0;
        let mut interruptions: u64 = 0;

        info!(pois = self.pois.len(), "patrol started");
        loop {
            if self.run_state.current() == RunState::Paused {
                info!("patrol paused; waiting for resume");
            }
            if self.run_state.wait_while_paused().await == RunState::Stopping {
                break;
            }

            let target = self.pois.target(index);
            let outcome = self
                .watchdog
                .supervise(target, &self.run_state)
                .instrument(info_span!("leg", leg = legs_completed + 1, poi = target))
                .await;

            if let Some(err) = PatrolError::from_outcome(target, &outcome) {
                error!(error = %err, "patrol aborted");
                return Err(err);
            }
            if outcome == WatchdogOutcome::Succeeded {
                legs_completed += 1;
                index = self.pois.next_index(index);
            } else {
                interruptions += 1;
            }
        }

        let summary = TraversalSummary {
            legs_completed,
            interruptions,
            next_target: self.pois.target(index).to_string(),
        };
        info!(
            legs_completed = summary.legs_completed,
            interruptions = summary.interruptions,
            "patrol stopped"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use patrol_gateway::{RobotGateway, SimGateway};
    use patrol_kernel::{RunStateController, WatchdogConfig, run_state};
    use patrol_types::{ActionHandle, ActionSnapshot, GatewayError};

    type Hook = Box<dyn Fn(u32, &RunStateController) + Send + Sync>;

    /// Simulated robot with an operator attached: hooks fire on the n-th
    /// `create_action` and on the n-th `cancel_current` call.
    struct OperatedRobot {
        sim: SimGateway,
        controller: Arc<RunStateController>,
        on_create: Hook,
        on_cancel: Hook,
        creates: Mutex<u32>,
        cancels: Mutex<u32>,
    }

    impl OperatedRobot {
        fn new(sim: SimGateway, controller: Arc<RunStateController>) -> Self {
            Self {
                sim,
                controller,
                on_create: Box::new(|_, _| {}),
                on_cancel: Box::new(|_, _| {}),
                creates: Mutex::new(0),
                cancels: Mutex::new(0),
            }
        }

        fn bump(counter: &Mutex<u32>) -> u32 {
            let mut n = counter.lock().unwrap();
            *n += 1;
            *n
        }
    }

    #[async_trait]
    impl RobotGateway for OperatedRobot {
        async fn create_action(&self, poi_name: &str) -> Result<ActionHandle, GatewayError> {
            let n = Self::bump(&self.creates);
            (self.on_create)(n, &self.controller);
            self.sim.create_action(poi_name).await
        }

        async fn get_status(&self, handle: ActionHandle) -> Result<ActionSnapshot, GatewayError> {
            self.sim.get_status(handle).await
        }

        async fn cancel_current(&self) -> Result<(), GatewayError> {
            let n = Self::bump(&self.cancels);
            (self.on_cancel)(n, &self.controller);
            self.sim.cancel_current().await
        }
    }

    fn pois(names: &[&str]) -> PoiList {
        PoiList::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn traversal(
        gateway: Arc<dyn RobotGateway>,
        config: WatchdogConfig,
        names: &[&str],
        watcher: RunStateWatcher,
    ) -> TraversalLoop {
        TraversalLoop::new(MotionWatchdog::new(gateway, config), pois(names), watcher)
    }

    #[tokio::test(start_paused = true)]
    async fn visits_pois_in_order_and_wraps() {
        let (controller, watcher) = run_state();
        let mut robot = OperatedRobot::new(SimGateway::new().complete_after(1), Arc::new(controller));
        robot.on_create = Box::new(|n, c| {
            if n == 5 {
                c.stop();
            }
        });
        let robot = Arc::new(robot);

        let summary = traversal(robot.clone(), WatchdogConfig::default(), &["A", "B", "C"], watcher)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.legs_completed, 4);
        assert_eq!(summary.next_target, "B");
        assert_eq!(robot.sim.targets(), ["A", "B", "C", "A", "B"]);
        // Only the move interrupted by the stop is cancelled.
        assert_eq!(robot.sim.cancel_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_leg_is_retried_after_resume() {
        let (controller, watcher) = run_state();
        let mut robot = OperatedRobot::new(SimGateway::new().complete_after(2), Arc::new(controller));
        robot.on_create = Box::new(|n, c| match n {
            2 => {
                c.pause();
            }
            4 => {
                c.stop();
            }
            _ => {}
        });
        robot.on_cancel = Box::new(|n, c| {
            if n == 1 {
                c.resume();
            }
        });
        let robot = Arc::new(robot);

        let summary = traversal(robot.clone(), WatchdogConfig::default(), &["A", "B", "C"], watcher)
            .run()
            .await
            .unwrap();

        assert_eq!(robot.sim.targets(), ["A", "B", "B", "C"]);
        assert_eq!(summary.legs_completed, 2);
        assert_eq!(summary.interruptions, 2);
        assert_eq!(summary.next_target, "C");
    }

    #[tokio::test(start_paused = true)]
    async fn paused_loop_waits_without_issuing_moves() {
        let (controller, watcher) = run_state();
        let controller = Arc::new(controller);
        let mut robot = OperatedRobot::new(SimGateway::new(), controller.clone());
        robot.on_create = Box::new(|n, c| match n {
            2 => {
                c.pause();
            }
            3 => {
                c.stop();
            }
            _ => {}
        });
        let robot = Arc::new(robot);
        let task = tokio::spawn(
            traversal(robot.clone(), WatchdogConfig::default(), &["A", "B"], watcher).run(),
        );

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(!task.is_finished());
        assert_eq!(robot.sim.targets(), ["A", "B"]);
        assert_eq!(robot.sim.cancel_count(), 1);

        controller.resume();
        let summary = task.await.unwrap().unwrap();
        assert_eq!(robot.sim.targets(), ["A", "B", "B"]);
        assert_eq!(summary.legs_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_before_start_issues_nothing() {
        let (controller, watcher) = run_state();
        controller.stop();
        let sim = Arc::new(SimGateway::new());

        let summary = traversal(sim.clone(), WatchdogConfig::default(), &["A"], watcher)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.legs_completed, 0);
        assert_eq!(summary.next_target, "A");
        assert!(sim.targets().is_empty());
        assert_eq!(sim.cancel_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_move_aborts_with_the_failing_poi() {
        let (_controller, watcher) = run_state();
        let sim = Arc::new(SimGateway::new().reject_poi("B"));

        let err = traversal(sim.clone(), WatchdogConfig::default(), &["A", "B", "C"], watcher)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PatrolError::ActionFailed { ref poi, .. } if poi == "B"));
        assert_eq!(sim.targets(), ["A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_move_aborts_the_patrol() {
        let (_controller, watcher) = run_state();
        let sim = Arc::new(SimGateway::new().complete_after(u32::MAX));
        let config = WatchdogConfig {
            max_wait: Duration::from_secs(2),
            ..WatchdogConfig::default()
        };

        let err = traversal(sim.clone(), config, &["A", "B"], watcher)
            .run()
            .await
            .unwrap_err();

        assert_eq!(err, PatrolError::Timeout { poi: "A".into() });
        assert_eq!(sim.cancel_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_poi_is_revisited() {
        let (controller, watcher) = run_state();
        let mut robot = OperatedRobot::new(SimGateway::new(), Arc::new(controller));
        robot.on_create = Box::new(|n, c| {
            if n == 3 {
                c.stop();
            }
        });
        let robot = Arc::new(robot);

        let summary = traversal(robot.clone(), WatchdogConfig::default(), &["DOCK"], watcher)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.legs_completed, 2);
        assert_eq!(robot.sim.targets(), ["DOCK", "DOCK", "DOCK"]);
    }
}
