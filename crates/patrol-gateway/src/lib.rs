//! `patrol-gateway` – the boundary to the robot.
//!
//! The supervisor never talks HTTP directly.  It drives a [`RobotGateway`],
//! and this crate provides the implementations:
//!
//! - [`gateway`] – the [`RobotGateway`] trait: create an action, read its
//!   status, cancel the current action.
//! - [`slamware`] – [`SlamwareGateway`][slamware::SlamwareGateway]: the HTTP
//!   client for the robot's REST API, including POI resolution through the
//!   artifact list and the power-status probe.
//! - [`sim`] – [`SimGateway`][sim::SimGateway]: an in-process robot that
//!   completes actions after a fixed number of polls, for tests and dry runs.

pub mod gateway;
pub mod sim;
pub mod slamware;

pub use gateway::RobotGateway;
pub use sim::SimGateway;
pub use slamware::{MoveOptions, PowerStatus, SlamwareGateway};
