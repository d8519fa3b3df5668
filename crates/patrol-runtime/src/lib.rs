//! `patrol-runtime` – The Patrol Loop
//!
//! Wires the motion watchdog into an endless POI traversal and lets an
//! operator steer it.
//!
//! # Modules
//!
//! - [`traversal`] – [`TraversalLoop`][traversal::TraversalLoop]:
//!   cycles through the configured POIs forever, one supervised move at a
//!   time.  Arrival advances to the next POI, an operator pause retries the
//!   same POI after resume, and any other outcome ends the patrol with a
//!   [`PatrolError`][patrol_types::PatrolError].
//! - [`operator`] – [`OperatorListener`][operator::OperatorListener]:
//!   consumes operator keystrokes (`p`, `r`, `q`) and the external shutdown
//!   signal from an async channel and is the only writer of the run state.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   installs the global `tracing` subscriber, optionally exporting spans to
//!   an OTLP collector when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

pub mod operator;
pub mod telemetry;
pub mod traversal;

pub use operator::{ListenerExit, OperatorInput, OperatorIntent, OperatorListener};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use traversal::{TraversalLoop, TraversalSummary};

// Re-exported so the CLI can build the whole loop from this crate alone.
pub use patrol_kernel::{MotionWatchdog, RunStateWatcher, WatchdogConfig, run_state};
