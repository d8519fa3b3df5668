//! In-process simulated robot for tests and dry runs without hardware.
//!
//! [`SimGateway`] implements [`RobotGateway`] entirely in memory.  Each
//! created action reports `RUNNING` for a configurable number of polls and
//! then `COMPLETED` with a zero result.  Every target and every cancel call
//! is recorded so that tests can assert on the traffic the supervisor
//! produced.
//!
//! # Example
//!
//! ```rust
//! use patrol_gateway::SimGateway;
//!
//! let sim = SimGateway::new().complete_after(2).reject_poi("DOCK");
//! assert!(sim.targets().is_empty());
//! ```

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use patrol_types::{ActionHandle, ActionSnapshot, ActionState, GatewayError};
use tracing::debug;

use crate::gateway::RobotGateway;

#[derive(Default)]
struct SimState {
    next_id: i64,
    /// The action currently executing and the number of polls it has seen.
    active: Option<(ActionHandle, u32)>,
    targets: Vec<String>,
    cancels: u32,
}

/// A simulated robot that always reaches its target.
#[derive(Default)]
pub struct SimGateway {
    pending_polls: u32,
    rejected: HashSet<String>,
    state: Mutex<SimState>,
}

impl SimGateway {
    /// A robot whose actions complete on the first poll.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `RUNNING` for `polls` status reads before completing.
    pub fn complete_after(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Refuse to create actions towards `poi_name`.
    pub fn reject_poi(mut self, poi_name: impl Into<String>) -> Self {
        self.rejected.insert(poi_name.into());
        self
    }

    /// Every target passed to `create_action`, in call order.
    pub fn targets(&self) -> Vec<String> {
        self.lock().targets.clone()
    }

    /// Number of `cancel_current` calls received.
    pub fn cancel_count(&self) -> u32 {
        self.lock().cancels
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RobotGateway for SimGateway {
    async fn create_action(&self, poi_name: &str) -> Result<ActionHandle, GatewayError> {
        let mut state = self.lock();
        state.targets.push(poi_name.to_string());
        if self.rejected.contains(poi_name) {
            return Err(GatewayError::rejected(format!(
                "POI '{poi_name}' not found on the robot"
            )));
        }
        state.next_id += 1;
        let handle = ActionHandle::new(state.next_id);
        state.active = Some((handle, 0));
        debug!(poi = poi_name, action_id = handle.id(), "sim: action created");
        Ok(handle)
    }

    async fn get_status(&self, handle: ActionHandle) -> Result<ActionSnapshot, GatewayError> {
        let mut state = self.lock();
        let Some((active, polls)) = state.active.as_mut() else {
            return Ok(ActionSnapshot::default());
        };
        if *active != handle {
            return Ok(ActionSnapshot::default());
        }
        let stage = if *polls >= self.pending_polls {
            "COMPLETED"
        } else {
            *polls += 1;
            "RUNNING"
        };
        Ok(ActionSnapshot {
            stage: Some(stage.to_string()),
            state: Some(ActionState {
                status: None,
                result: Some(0),
                reason: Some(String::new()),
            }),
        })
    }

    async fn cancel_current(&self) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.cancels += 1;
        state.active = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_after_configured_polls() {
        let sim = SimGateway::new().complete_after(2);
        let handle = sim.create_action("POI1").await.unwrap();

        for _ in 0..2 {
            let snap = sim.get_status(handle).await.unwrap();
            assert_eq!(snap.stage(), "RUNNING");
        }
        let snap = sim.get_status(handle).await.unwrap();
        assert_eq!(snap.stage(), "COMPLETED");
        assert_eq!(snap.result(), Some(0));
    }

    #[tokio::test]
    async fn records_targets_and_cancels() {
        let sim = SimGateway::new();
        sim.create_action("A").await.unwrap();
        sim.cancel_current().await.unwrap();
        sim.create_action("B").await.unwrap();

        assert_eq!(sim.targets(), ["A", "B"]);
        assert_eq!(sim.cancel_count(), 1);
    }

    #[tokio::test]
    async fn rejected_poi_fails_creation() {
        let sim = SimGateway::new().reject_poi("DOCK");
        let err = sim.create_action("DOCK").await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn cancelled_or_unknown_action_reports_empty_snapshot() {
        let sim = SimGateway::new().complete_after(5);
        let handle = sim.create_action("A").await.unwrap();
        sim.cancel_current().await.unwrap();
        assert_eq!(
            sim.get_status(handle).await.unwrap(),
            ActionSnapshot::default()
        );
        assert_eq!(
            sim.get_status(ActionHandle::new(99)).await.unwrap(),
            ActionSnapshot::default()
        );
    }

    #[tokio::test]
    async fn new_handles_are_unique() {
        let sim = SimGateway::new();
        let a = sim.create_action("A").await.unwrap();
        let b = sim.create_action("B").await.unwrap();
        assert_ne!(a, b);
    }
}
