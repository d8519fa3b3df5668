//! `patrol-kernel` – Motion Supervision
//!
//! Decides, from the outside, whether the robot's current navigation action
//! has finished, failed, stalled or lost contact.  It never issues motion on
//! its own initiative: every action it creates comes from the traversal loop,
//! and every action it abandons is cancelled.
//!
//! # Modules
//!
//! - [`classifier`] – [`ActionClassifier`][classifier::ActionClassifier]:
//!   an ordered rule table that turns a raw action snapshot into a
//!   pending/succeeded/failed verdict, tolerant of firmware that populates
//!   only some of the status fields.
//! - [`run_state`] – [`RunStateController`][run_state::RunStateController] and
//!   [`RunStateWatcher`][run_state::RunStateWatcher]: the operator's
//!   RUNNING/PAUSED/STOPPING state with a single writer and any number of
//!   readers.
//! - [`watchdog`] – [`MotionWatchdog`][watchdog::MotionWatchdog]:
//!   creates one action, polls it, and enforces the time budget, the
//!   communication-failure limit and operator pauses.

pub mod classifier;
pub mod run_state;
pub mod watchdog;

pub use classifier::{ActionClassifier, Classification, StatusRule, Verdict};
pub use run_state::{RunStateController, RunStateWatcher, run_state};
pub use watchdog::{MotionWatchdog, WatchdogConfig};
