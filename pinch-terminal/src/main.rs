//! Pinch terminal demo
//!
//! Manipulate a checkered card with emulated touches:
//!   - Left drag: primary touch (pan, or pinch/twist around the anchor)
//!   - Right click: place or lift a stationary anchor touch
//!   - R: reset the card
//!   - Q/ESC: quit

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use pinch_core::{Config, Trace, TracePlayer};
use pinch_terminal::TerminalApp;
use tracing_subscriber::EnvFilter;

/// Terminal cells are roughly 0.2 cm wide.
const TERMINAL_DOTS_PER_CM: f32 = 5.0;

/// Replayed frames without an explicit duration last this long.
const TRACE_FRAME_SECONDS: f32 = 1.0 / 30.0;

/// Manipulate a card in the terminal with pinch, twist and drag gestures
#[derive(Parser, Debug)]
#[command(name = "pinch-terminal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay a recorded touch trace instead of reading the mouse
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Log file (the terminal itself is taken by the renderer)
    #[arg(long, default_value = "pinch-terminal.log")]
    log: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = File::create(&cli.log)
        .with_context(|| format!("failed to create log file {}", cli.log.display()))?;
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let mut config = Config::default();
            config.gesture.dots_per_cm = TERMINAL_DOTS_PER_CM;
            config
        }
    };
    tracing::info!(?config, "starting");

    let mut app = TerminalApp::new(&config)?;
    if let Some(path) = &cli.trace {
        let trace = Trace::load(path)
            .with_context(|| format!("failed to load trace {}", path.display()))?;
        tracing::info!(frames = trace.frame_count(), "replaying trace");
        app = app.with_trace(TracePlayer::new(trace, TRACE_FRAME_SECONDS));
    }

    app.run()?;
    Ok(())
}
