//! Command-line interface definitions for autokey.

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use input_inject::MouseButton;
use logging::LogArgs;

/// Command-line interface for the `autokey` binary.
#[derive(Parser, Debug)]
#[command(
    name = "autokey",
    about = "Drive periodic and chained input automation",
    version
)]
pub struct Cli {
    /// Logging controls shared across autokey binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Optional path to an engine settings file (RON).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Which automation to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Click a mouse button repeatedly.
    Click(ClickArgs),
    /// Tap a key repeatedly.
    Press(PressArgs),
    /// Hold a key down, re-asserting it periodically.
    Run(RunArgs),
    /// Tap a sequence of keys with per-step delays.
    Chain(ChainArgs),
    /// Flood the bounded executor with jobs and report its counters.
    Burst(BurstArgs),
}

/// Arguments for the `click` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ClickArgs {
    /// Button to click (left|middle|right|back|forward).
    #[arg(long, default_value = "left")]
    pub button: MouseButton,

    /// Time between clicks; defaults to the configured interval.
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub interval: Option<Duration>,

    /// Emit single instantaneous clicks instead of press/hold/release.
    #[arg(long)]
    pub fast: bool,

    /// How long to keep clicking.
    #[arg(
        long = "for",
        value_parser = humantime::parse_duration,
        default_value = "3s",
        value_name = "DURATION"
    )]
    pub run_for: Duration,
}

/// Arguments for the `press` subcommand.
#[derive(Args, Debug, Clone)]
pub struct PressArgs {
    /// Key name, e.g. `a`, `space`, `f5`.
    pub key: String,

    /// Time between taps; defaults to the configured interval.
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub interval: Option<Duration>,

    /// How long to keep tapping.
    #[arg(
        long = "for",
        value_parser = humantime::parse_duration,
        default_value = "3s",
        value_name = "DURATION"
    )]
    pub run_for: Duration,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Key to hold, e.g. `w`.
    pub key: String,

    /// How long to hold it.
    #[arg(
        long = "for",
        value_parser = humantime::parse_duration,
        default_value = "3s",
        value_name = "DURATION"
    )]
    pub run_for: Duration,
}

/// Arguments for the `chain` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ChainArgs {
    /// Steps as `KEY:DELAY` (delay before the tap), e.g. `a:0s b:150ms c:1s`.
    #[arg(value_name = "KEY:DELAY", num_args = 1..)]
    pub steps: Vec<String>,

    /// Start over after the last step.
    #[arg(long = "loop")]
    pub looping: bool,

    /// Upper bound on how long the chain may run.
    #[arg(
        long = "for",
        value_parser = humantime::parse_duration,
        default_value = "10s",
        value_name = "DURATION"
    )]
    pub run_for: Duration,
}

/// Arguments for the `burst` subcommand.
#[derive(Args, Debug, Clone)]
pub struct BurstArgs {
    /// Number of jobs to submit back to back.
    #[arg(long, default_value_t = 32)]
    pub jobs: usize,

    /// Simulated work per job.
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "50ms",
        value_name = "DURATION"
    )]
    pub work: Duration,

    /// Overrun budget per job; defaults to the configured timeout.
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub timeout: Option<Duration>,
}
