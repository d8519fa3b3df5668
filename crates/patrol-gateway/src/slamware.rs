//! [`SlamwareGateway`] – HTTP client for the robot's REST API.
//!
//! POI names are resolved through the artifact list
//! (`GET /api/core/artifact/v1/pois`) and the robot is then sent to the
//! resolved coordinate with a `MoveToAction`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use patrol_gateway::{MoveOptions, RobotGateway, SlamwareGateway};
//!
//! # async fn demo() -> Result<(), patrol_types::GatewayError> {
//! let robot = SlamwareGateway::new(
//!     "http://192.168.11.1:1448",
//!     Duration::from_secs(2),
//!     MoveOptions::default(),
//! );
//! let handle = robot.create_action("POI1").await?;
//! let snapshot = robot.get_status(handle).await?;
//! println!("{snapshot}");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use patrol_types::{ActionHandle, ActionSnapshot, GatewayError, PoiPose};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::gateway::RobotGateway;

const POWER_STATUS_PATH: &str = "/api/core/system/v1/power/status";
const POIS_PATH: &str = "/api/core/artifact/v1/pois";
const ACTIONS_PATH: &str = "/api/core/motion/v1/actions";
const CURRENT_ACTION_PATH: &str = "/api/core/motion/v1/actions/:current";
const MOVE_TO_ACTION: &str = "slamtec.agent.actions.MoveToAction";

/// Motion options applied to every move issued through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOptions {
    /// Ask the robot for a precise arrival (`"precise"` flag).
    pub precise: bool,
    /// Arrive with the yaw stored on the POI (`"with_yaw"` flag).
    pub use_poi_yaw: bool,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            precise: true,
            use_poi_yaw: true,
        }
    }
}

/// Power status as reported by the robot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerStatus {
    /// Some firmware reports fractional percentages.
    #[serde(default)]
    pub battery_percentage: Option<f64>,
    #[serde(default)]
    pub power_stage: Option<String>,
    #[serde(default)]
    pub is_charging: Option<bool>,
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.battery_percentage {
            Some(pct) => write!(f, "battery {pct}%")?,
            None => write!(f, "battery unknown")?,
        }
        if let Some(stage) = &self.power_stage {
            write!(f, ", stage {stage}")?;
        }
        if self.is_charging == Some(true) {
            write!(f, ", charging")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MoveToRequest {
    action_name: &'static str,
    options: MoveToOptions,
}

#[derive(Debug, Serialize)]
struct MoveToOptions {
    target: Target,
    move_options: MoveFlags,
}

#[derive(Debug, Serialize)]
struct Target {
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize)]
struct MoveFlags {
    mode: u8,
    flags: Vec<&'static str>,
    yaw: f64,
    acceptable_precision: f64,
    fail_retry_count: u32,
}

#[derive(Debug, Deserialize)]
struct CreateActionResponse {
    action_id: i64,
}

#[derive(Debug, Deserialize)]
struct ArtifactPoi {
    #[serde(default)]
    metadata: Option<ArtifactMetadata>,
    #[serde(default)]
    pose: Option<ArtifactPose>,
}

#[derive(Debug, Deserialize)]
struct ArtifactMetadata {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtifactPose {
    x: f64,
    y: f64,
    #[serde(default)]
    yaw: f64,
}

fn move_to_request(x: f64, y: f64, yaw: Option<f64>, precise: bool) -> MoveToRequest {
    let mut flags = Vec::new();
    if precise {
        flags.push("precise");
    }
    if yaw.is_some() {
        flags.push("with_yaw");
    }
    MoveToRequest {
        action_name: MOVE_TO_ACTION,
        options: MoveToOptions {
            target: Target { x, y },
            move_options: MoveFlags {
                mode: 0,
                flags,
                yaw: yaw.unwrap_or(0.0),
                acceptable_precision: 0.0,
                fail_retry_count: 0,
            },
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SlamwareGateway
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP gateway to a Slamware-based robot.
///
/// Construct once and share behind an `Arc`; the underlying connection pool
/// is reused across calls.
pub struct SlamwareGateway {
    base_url: String,
    timeout: Duration,
    options: MoveOptions,
    client: reqwest::Client,
}

impl SlamwareGateway {
    /// Create a gateway for `base_url` (e.g. `"http://192.168.11.1:1448"`).
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration, options: MoveOptions) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            options,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the robot's power status.
    pub async fn power_status(&self) -> Result<PowerStatus, GatewayError> {
        self.fetch_json(self.client.get(self.url(POWER_STATUS_PATH)))
            .await
    }

    /// List every POI stored on the robot that has a display name and a pose.
    pub async fn list_pois(&self) -> Result<Vec<PoiPose>, GatewayError> {
        let raw: Vec<ArtifactPoi> = self.fetch_json(self.client.get(self.url(POIS_PATH))).await?;
        let total = raw.len();
        let pois: Vec<PoiPose> = raw
            .into_iter()
            .filter_map(|p| {
                let name = p.metadata?.display_name?;
                let pose = p.pose?;
                Some(PoiPose {
                    name,
                    x: pose.x,
                    y: pose.y,
                    yaw: pose.yaw,
                })
            })
            .collect();
        if pois.len() < total {
            debug!(
                skipped = total - pois.len(),
                "ignoring POIs without a display name or pose"
            );
        }
        Ok(pois)
    }

    /// Resolve `poi_name` to its stored pose.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Rejected`] listing the available names when no POI
    /// carries that display name.
    pub async fn resolve_poi(&self, poi_name: &str) -> Result<PoiPose, GatewayError> {
        let pois = self.list_pois().await?;
        if let Some(pose) = pois.iter().find(|p| p.name == poi_name) {
            return Ok(pose.clone());
        }
        let available: Vec<&str> = pois.iter().map(|p| p.name.as_str()).collect();
        Err(GatewayError::rejected(format!(
            "POI '{poi_name}' not found on the robot; available: {available:?}"
        )))
    }

    /// Start a `MoveToAction` towards a coordinate.  A `yaw` of `None` lets
    /// the robot choose its arrival heading.
    pub async fn create_move_to_pose(
        &self,
        x: f64,
        y: f64,
        yaw: Option<f64>,
        precise: bool,
    ) -> Result<ActionHandle, GatewayError> {
        let body = move_to_request(x, y, yaw, precise);
        let response: CreateActionResponse = self
            .fetch_json(self.client.post(self.url(ACTIONS_PATH)).json(&body))
            .await?;
        Ok(ActionHandle::new(response.action_id))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send `request` and return the body of a 2xx reply.
    async fn execute(&self, request: RequestBuilder) -> Result<String, GatewayError> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: Some(status.as_u16()),
                message: format!("HTTP {status}: {}", body.trim()),
            });
        }
        Ok(body)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body)
            .map_err(|e| GatewayError::rejected(format!("malformed reply: {e}")))
    }
}

#[async_trait]
impl RobotGateway for SlamwareGateway {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn create_action(&self, poi_name: &str) -> Result<ActionHandle, GatewayError> {
        let pose = self.resolve_poi(poi_name).await?;
        let yaw = self.options.use_poi_yaw.then_some(pose.yaw);
        debug!(x = pose.x, y = pose.y, ?yaw, "resolved POI pose");
        self.create_move_to_pose(pose.x, pose.y, yaw, self.options.precise)
            .await
    }

    async fn get_status(&self, handle: ActionHandle) -> Result<ActionSnapshot, GatewayError> {
        let path = format!("{ACTIONS_PATH}/{}", handle.id());
        self.fetch_json(self.client.get(self.url(&path))).await
    }

    async fn cancel_current(&self) -> Result<(), GatewayError> {
        self.execute(self.client.delete(self.url(CURRENT_ACTION_PATH)))
            .await
            .map(|_| ())
    }
}
