#![warn(missing_docs)]

//! Entry point for the `autokey` binary.

mod burst;
mod cli;
mod error;
mod tasks;

use std::process;

use autokey_engine::Settings;
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, registry};

use crate::{
    cli::{Cli, Commands},
    error::Result,
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, load settings, and dispatch to the chosen subcommand.
fn run() -> Result<()> {
    let Cli {
        log,
        config,
        command,
    } = Cli::parse();
    registry()
        .with(log.env_filter())
        .with(fmt::layer().without_time())
        .try_init()
        .ok();

    let settings = match &config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    debug!(?config, ?settings, "settings_loaded");

    match command {
        Commands::Click(args) => tasks::click(&settings, &args),
        Commands::Press(args) => tasks::press(&settings, &args),
        Commands::Run(args) => tasks::run(&settings, &args),
        Commands::Chain(args) => tasks::chain(&settings, &args),
        Commands::Burst(args) => burst::run(&settings, &args),
    }
}
