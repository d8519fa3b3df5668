//! `patrol-cli` – the `patrol` binary.
//!
//! 1. Loads `~/.patrol/config.toml` (writing a template on first run) and
//!    applies `PATROL_*` overrides.
//! 2. Checks the robot: power status, then every configured POI is resolved
//!    and its pose printed.  `--sim` skips this and drives an in-process
//!    simulated robot instead.
//! 3. Runs the patrol until the operator quits, Ctrl-C is pressed or a move
//!    fails.  `p`/`r`/`q` on stdin pause, resume and quit.
//!
//! Exit status: 0 on a clean stop, 1 when the patrol aborted, 2 on a
//! configuration or startup error.

mod config;
mod console;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use patrol_gateway::{RobotGateway, SimGateway, SlamwareGateway};
use patrol_runtime::{
    MotionWatchdog, OperatorListener, TraversalLoop, TraversalSummary,
    init_tracing, run_state,
};
use patrol_types::{PatrolError, PoiList};

use crate::config::Config;
use crate::console::Interrupt;

const EXIT_ABORTED: u8 = 1;
const EXIT_STARTUP: u8 = 2;
const EXIT_FORCED: i32 = 130;

#[derive(Parser)]
#[command(name = "patrol", about = "Drive a robot around a fixed list of POIs", version)]
struct Cli {
    /// Config file (default: ~/.patrol/config.toml)
    #[arg(long, env = "PATROL_CONFIG")]
    config: Option<PathBuf>,

    /// Run against a simulated robot instead of the configured one
    #[arg(long)]
    sim: bool,

    /// Status polls a simulated move reports RUNNING before it arrives
    #[arg(long, default_value_t = 3, requires = "sim")]
    sim_polls: u32,
}

/// Why [`run`] returned without a summary.
enum RunError {
    /// The robot could not be checked before the patrol began.
    Startup(String),
    Patrol(PatrolError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _telemetry = init_tracing("patrol");

    console::print_banner();

    let cfg = match load_config(cli.config.clone()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::from(EXIT_STARTUP);
        }
    };
    if let Err(e) = cfg.validate(!cli.sim) {
        eprintln!("{}: {}", "Config error".red(), e);
        return ExitCode::from(EXIT_STARTUP);
    }
    let pois = match cfg.poi_list() {
        Ok(pois) => pois,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start the async runtime");
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    match runtime.block_on(run(&cli, &cfg, pois)) {
        Ok(summary) => {
            println!(
                "\n  {} Patrol stopped after {} leg(s); next POI would have been {}.",
                "✓".green().bold(),
                summary.legs_completed,
                summary.next_target.bold()
            );
            ExitCode::SUCCESS
        }
        Err(RunError::Patrol(e)) => {
            println!("\n  {} {}", "✗ Patrol aborted:".red().bold(), e);
            ExitCode::from(EXIT_ABORTED)
        }
        Err(RunError::Startup(e)) => {
            eprintln!("{}: {}", "Startup error".red(), e);
            ExitCode::from(EXIT_STARTUP)
        }
    }
}

/// Load the config, writing the defaults as a template if none exists yet.
fn load_config(path: Option<PathBuf>) -> Result<Config, String> {
    let path = path.unwrap_or_else(config::config_path);
    if let Some(cfg) = config::load_from(&path)? {
        println!("  Config loaded from {}", path.display().to_string().bold());
        return Ok(cfg);
    }

    let mut cfg = Config::default();
    match config::save_to(&cfg, &path) {
        Ok(()) => println!(
            "  {} No config found; template written to {}",
            "!".yellow().bold(),
            path.display().to_string().bold()
        ),
        Err(e) => warn!(error = %e, "could not write config template"),
    }
    config::apply_env_overrides(&mut cfg);
    Ok(cfg)
}

async fn run(cli: &Cli, cfg: &Config, pois: PoiList) -> Result<TraversalSummary, RunError> {
    let gateway: Arc<dyn RobotGateway> = if cli.sim {
        println!(
            "  {} simulated robot ({} poll(s) per move)",
            "Using".bold(),
            cli.sim_polls
        );
        Arc::new(SimGateway::new().complete_after(cli.sim_polls))
    } else {
        let robot = SlamwareGateway::new(cfg.base_url(), cfg.request_timeout(), cfg.move_options());
        preflight(&robot, &pois).await.map_err(RunError::Startup)?;
        Arc::new(robot)
    };

    let (controller, watcher) = run_state();
    let listener = OperatorListener::new(controller);
    let (tx, rx) = mpsc::channel(16);

    let ctrlc_tx = tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        match console::forward_interrupt(&ctrlc_tx) {
            Interrupt::Forwarded => println!(
                "{}",
                "⚠  Ctrl-C received – cancelling the current move …".yellow().bold()
            ),
            Interrupt::Busy => {
                warn!("operator input queue full; press Ctrl-C again to stop");
            }
            // A second Ctrl-C after the listener exited forces the exit.
            Interrupt::ListenerGone => std::process::exit(EXIT_FORCED),
        }
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; use 'q' to stop");
    }

    if let Err(e) = console::spawn_stdin_reader(tx) {
        warn!(error = %e, "failed to read operator commands from stdin");
    }
    console::print_legend();

    let listener_task = tokio::spawn(listener.run(rx));
    let watchdog = MotionWatchdog::new(gateway, cfg.watchdog());
    let result = TraversalLoop::new(watchdog, pois, watcher).run().await;

    if listener_task.is_finished() {
        match listener_task.await {
            Ok(exit) => info!(?exit, "operator listener finished"),
            Err(e) => warn!(error = %e, "operator listener failed"),
        }
    } else {
        listener_task.abort();
    }
    result.map_err(RunError::Patrol)
}

/// Check that the robot answers and knows every configured POI.
async fn preflight(robot: &SlamwareGateway, pois: &PoiList) -> Result<(), String> {
    println!("  Connecting to robot at {} …", robot.base_url().dimmed());
    let power = robot
        .power_status()
        .await
        .map_err(|e| format!("power status check failed: {e}"))?;
    println!("  {} Robot online: {}", "✓".green().bold(), power);
    info!(%power, "robot online");

    let known = robot
        .list_pois()
        .await
        .map_err(|e| format!("could not list POIs: {e}"))?;
    println!("  POIs:");
    for name in pois.iter() {
        let Some(pose) = known.iter().find(|p| p.name == name) else {
            let available: Vec<&str> = known.iter().map(|p| p.name.as_str()).collect();
            return Err(format!(
                "POI '{name}' is not defined on the robot; available: {available:?}"
            ));
        };
        println!(
            "    • {} x={:>8.3}  y={:>8.3}  yaw={:>7.3}",
            format!("{:<16}", pose.name).bold(),
            pose.x,
            pose.y,
            pose.yaw
        );
    }
    println!();
    Ok(())
}
