//! Operator console – banner, command legend and the stdin key reader.

use std::io::{self, BufRead};
use std::thread;

use colored::Colorize;
use patrol_runtime::{OperatorInput, OperatorIntent};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// What happened to a Ctrl-C forwarded to the operator channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The listener will stop the patrol.
    Forwarded,
    /// The channel is full; the shutdown was not queued.
    Busy,
    /// The listener has exited.
    ListenerGone,
}

/// Queue a shutdown request without blocking (signal handler context).
pub fn forward_interrupt(tx: &mpsc::Sender<OperatorInput>) -> Interrupt {
    match tx.try_send(OperatorInput::Shutdown) {
        Ok(()) => Interrupt::Forwarded,
        Err(TrySendError::Full(_)) => Interrupt::Busy,
        Err(TrySendError::Closed(_)) => Interrupt::ListenerGone,
    }
}

/// Map one console line to an input: its first non-blank character.
/// Blank lines produce nothing.
pub fn parse_line(line: &str) -> Option<OperatorInput> {
    line.trim().chars().next().map(OperatorInput::Key)
}

/// Forward stdin lines to `tx` from a dedicated thread until stdin closes or
/// the receiver is gone.
pub fn spawn_stdin_reader(tx: mpsc::Sender<OperatorInput>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("patrol-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if let Some(input) = parse_line(&line)
                    && tx.blocking_send(input).is_err()
                {
                    break;
                }
            }
            debug!("stdin reader finished");
        })
}

pub fn print_banner() {
    println!();
    println!("{}", r#"                __             __"#.bold().cyan());
    println!("{}", r#"    ____  ____ _/ /__________  / /"#.bold().cyan());
    println!("{}", r#"   / __ \/ __ `/ __/ ___/ __ \/ / "#.bold().cyan());
    println!("{}", r#"  / /_/ / /_/ / /_/ /  / /_/ / /  "#.bold().cyan());
    println!("{}", r#" / .___/\__,_/\__/_/   \____/_/   "#.bold().cyan());
    println!("{}", r#"/_/                               "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "patrol".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  POI round-trip supervisor");
    println!();
}

pub fn print_legend() {
    println!("  Commands (type a key, then Enter):");
    for intent in OperatorIntent::ALL {
        println!("    {}  {}", intent.key().to_string().bold().cyan(), intent.describe());
    }
    println!("    {}  {}", "Ctrl-C".bold().cyan(), "stop the patrol and exit");
    println!();
}
