//! lightshow: host entry point.
//!
//! ```text
//!  stdin (JSON lines) ──▶ LightCommand::parse ──▶ BehaviorEngine
//!                                                   │        │
//!  stdout (JSON replies) ◀── Reply ◀── snapshot ◀───┘        ├──▶ SimulatedOutput
//!                                                            └──▶ LogNotifier
//! ```
//!
//! One request per line; every request gets exactly one reply line.  EOF
//! stops the running behavior and exits.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};

use lightshow::adapters::{LogNotifier, SimulatedOutput};
use lightshow::app::commands;
use lightshow::config::{LightConfig, OutputBackend};
use lightshow::{BehaviorEngine, ObserverId, Resolution};

/// Four-channel light controller driven by JSON requests on stdin.
#[derive(Parser, Debug)]
#[command(name = "lightshow", version, long_about = None)]
struct Args {
    /// JSON config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured output resolution (`binary` or `pwm`)
    #[arg(short, long)]
    resolution: Option<Resolution>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    // ── 1. Config ─────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => {
            let config = LightConfig::load(path)?;
            info!("Config loaded from {}", path.display());
            config
        }
        None => {
            info!("No config file given, using defaults");
            LightConfig::default()
        }
    };
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
        config.validate().context("resolution override")?;
    }
    if config.output == OutputBackend::Hardware {
        bail!("hardware output needs a board build; this binary only drives simulated lights");
    }

    // ── 2. Engine ─────────────────────────────────────────────
    let engine = BehaviorEngine::new(
        &config,
        SimulatedOutput::new(config.resolution),
        LogNotifier::new(),
    )
    .context("starting engine")?;
    engine.attach_observer(ObserverId(0));

    info!("lightshow v{} ready, reading requests from stdin", env!("CARGO_PKG_VERSION"));

    // ── 3. Request loop ───────────────────────────────────────
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("stdin read failed: {e}");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = commands::handle_request(&engine, line);
        writeln!(stdout, "{}", reply.to_json()).context("writing reply")?;
        stdout.flush().context("flushing reply")?;
    }

    // ── 4. Shutdown ───────────────────────────────────────────
    info!("stdin closed, shutting down");
    engine.shutdown();
    Ok(())
}
