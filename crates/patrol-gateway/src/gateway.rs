//! The [`RobotGateway`] contract consumed by the motion watchdog.

use async_trait::async_trait;
use patrol_types::{ActionHandle, ActionSnapshot, GatewayError};

/// Every robot backend must implement this trait.
///
/// # Contract
///
/// * Each call is bounded in latency; implementations enforce their own
///   request timeout and report it as [`GatewayError::Unreachable`].
/// * `create_action` fails with [`GatewayError::Rejected`] when the robot
///   refuses the target (e.g. unknown POI).
/// * `cancel_current` is idempotent and succeeds when no action is active.
///   Callers treat it as best-effort.
#[async_trait]
pub trait RobotGateway: Send + Sync {
    /// Start a navigation action towards `poi_name`.
    async fn create_action(&self, poi_name: &str) -> Result<ActionHandle, GatewayError>;

    /// Read the current status of `handle`.
    async fn get_status(&self, handle: ActionHandle) -> Result<ActionSnapshot, GatewayError>;

    /// Cancel whatever action the robot is currently executing.
    async fn cancel_current(&self) -> Result<(), GatewayError>;
}
