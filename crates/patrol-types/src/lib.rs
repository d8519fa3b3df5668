//! `patrol-types` – shared data model for the patrol workspace.
//!
//! Action handles and status snapshots as the robot reports them, the
//! operator run state, watchdog outcomes, the POI list and the two error
//! enums ([`GatewayError`] at the robot boundary, [`PatrolError`] for fatal
//! traversal failures).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier of a robot-side action, as returned by the create-action
/// call.  Only ever compared and echoed back to the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionHandle(i64);

impl ActionHandle {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time read of an action's status.
///
/// Different firmware revisions populate different subsets of these fields,
/// so every field is optional and unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSnapshot {
    /// Coarse lifecycle stage, e.g. `"RUNNING"` or `"COMPLETED"`.
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub state: Option<ActionState>,
}

/// Nested state record of an [`ActionSnapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionState {
    #[serde(default)]
    pub status: Option<i64>,
    /// `0` means success; any other value is an action-level error.
    #[serde(default)]
    pub result: Option<i64>,
    /// Empty on success.
    #[serde(default)]
    pub reason: Option<String>,
}

impl ActionSnapshot {
    pub fn status(&self) -> Option<i64> {
        self.state.as_ref().and_then(|s| s.status)
    }

    pub fn result(&self) -> Option<i64> {
        self.state.as_ref().and_then(|s| s.result)
    }

    /// The robot-supplied reason, or `""` when absent.
    pub fn reason(&self) -> &str {
        self.state
            .as_ref()
            .and_then(|s| s.reason.as_deref())
            .unwrap_or("")
    }

    pub fn stage(&self) -> &str {
        self.stage.as_deref().unwrap_or("")
    }
}

impl fmt::Display for ActionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(v: Option<i64>) -> String {
            v.map_or_else(|| "-".to_string(), |n| n.to_string())
        }
        write!(
            f,
            "stage={} status={} result={} reason={:?}",
            if self.stage().is_empty() { "-" } else { self.stage() },
            opt(self.status()),
            opt(self.result()),
            self.reason(),
        )
    }
}

/// Operator-controlled run state shared between the command listener, the
/// traversal loop and the motion watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    Running,
    Paused,
    /// Terminal: the traversal exits once the current watchdog cycle unwinds.
    Stopping,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => write!(f, "RUNNING"),
            RunState::Paused => write!(f, "PAUSED"),
            RunState::Stopping => write!(f, "STOPPING"),
        }
    }
}

/// Result of supervising one navigation action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogOutcome {
    Succeeded,
    /// The action was rejected or the robot reported an error.
    Failed(String),
    /// The operator paused or stopped the run; the action was cancelled.
    Paused,
    TimedOut,
    CommFailure,
}

impl WatchdogOutcome {
    /// `true` for outcomes that abort the traversal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WatchdogOutcome::Failed(_) | WatchdogOutcome::TimedOut | WatchdogOutcome::CommFailure
        )
    }
}

/// A named waypoint with the pose the robot platform stores for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiPose {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

/// Ordered, non-empty list of waypoint names, visited cyclically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoiList(Vec<String>);

impl PoiList {
    /// Build a list, rejecting an empty list and blank names.
    pub fn new(names: Vec<String>) -> Result<Self, PatrolError> {
        if names.is_empty() {
            return Err(PatrolError::InvalidPoiList(
                "at least one POI is required".to_string(),
            ));
        }
        if let Some(idx) = names.iter().position(|n| n.trim().is_empty()) {
            return Err(PatrolError::InvalidPoiList(format!(
                "POI at position {idx} has an empty name"
            )));
        }
        Ok(Self(names))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Target at `index`, wrapping modulo the list length.
    pub fn target(&self, index: usize) -> &str {
        &self.0[index % self.0.len()]
    }

    /// Index following `index`, wrapping to 0 after the last entry.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Failures surfaced by a robot gateway.
///
/// Only [`GatewayError::Unreachable`] counts towards the watchdog's
/// communication-failure threshold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Network error or request timeout.
    #[error("robot unreachable: {0}")]
    Unreachable(String),

    /// The robot answered but refused the request (non-2xx, unknown POI,
    /// malformed reply).
    #[error("robot rejected request: {message}")]
    Rejected {
        /// HTTP status code, when the rejection came from a non-2xx reply.
        status: Option<u16>,
        message: String,
    },
}

impl GatewayError {
    pub fn rejected(message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Unreachable(_))
    }
}

/// Fatal traversal errors, reported to the operator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatrolError {
    #[error("invalid POI list: {0}")]
    InvalidPoiList(String),

    #[error("move to {poi} failed: {reason}")]
    ActionFailed { poi: String, reason: String },

    #[error("timed out moving to {poi}")]
    Timeout { poi: String },

    #[error("communication with the robot lost while moving to {poi}")]
    CommFailure { poi: String },
}

impl PatrolError {
    /// Map a fatal watchdog outcome to the error reported for `poi`.
    /// Returns `None` for non-fatal outcomes.
    pub fn from_outcome(poi: &str, outcome: &WatchdogOutcome) -> Option<Self> {
        let poi = poi.to_string();
        match outcome {
            WatchdogOutcome::Failed(reason) => Some(PatrolError::ActionFailed {
                poi,
                reason: reason.clone(),
            }),
            WatchdogOutcome::TimedOut => Some(PatrolError::Timeout { poi }),
            WatchdogOutcome::CommFailure => Some(PatrolError::CommFailure { poi }),
            WatchdogOutcome::Succeeded | WatchdogOutcome::Paused => None,
        }
    }
}
