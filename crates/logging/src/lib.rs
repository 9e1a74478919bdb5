#![warn(missing_docs)]

//! Shared logging CLI arguments and tracing filter helpers for the autokey workspace.
//!
//! Binaries flatten [`LogArgs`] into their clap parser, then turn it into an
//! [`EnvFilter`] with [`LogArgs::env_filter`]. Level flags only raise or lower
//! our own crates, so dependency noise stays at its default.

use std::env;

use clap::Args;
use tracing_subscriber::EnvFilter;

/// Verbosity flags shared by every autokey command.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Log every task and executor event (workspace crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Log task lifecycle and executor drain details (workspace crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Level applied to every workspace crate: error, warn, info, debug or trace
    #[arg(long)]
    pub log_level: Option<String>,

    /// Raw `EnvFilter` directive, used verbatim when given,
    /// e.g. "autokey_engine=trace,input_inject=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl LogArgs {
    /// Filter spec these flags resolve to, consulting `RUST_LOG` as a fallback.
    pub fn spec(&self) -> String {
        compute_spec(
            self.trace,
            self.debug,
            self.log_level.as_deref(),
            self.log_filter.as_deref(),
        )
    }

    /// `EnvFilter` for these flags.
    pub fn env_filter(&self) -> EnvFilter {
        env_filter_from_spec(&self.spec())
    }
}

/// Tracing targets of the workspace crates that level flags apply to.
pub fn our_crates() -> &'static [&'static str] {
    &["autokey", "autokey_engine", "input_inject", "logging"]
}

/// Directive giving each workspace target the same `level`, e.g. `autokey=warn,...`.
pub fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    our_crates()
        .iter()
        .map(|t| format!("{t}={lvl}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Resolve the filter directive for a set of flags.
///
/// An explicit `log_filter` is taken as is. Otherwise `trace`, then `debug`,
/// then `log_level` pick a level for the workspace targets. With none of
/// those, a non-blank `RUST_LOG` is used, and failing that every workspace
/// target logs at `info`.
pub fn compute_spec(
    trace: bool,
    debug: bool,
    log_level: Option<&str>,
    log_filter: Option<&str>,
) -> String {
    spec_with_env(
        trace,
        debug,
        log_level,
        log_filter,
        env::var("RUST_LOG").ok().as_deref(),
    )
}

/// [`compute_spec`] with the `RUST_LOG` value passed in explicitly.
fn spec_with_env(
    trace: bool,
    debug: bool,
    log_level: Option<&str>,
    log_filter: Option<&str>,
    rust_log: Option<&str>,
) -> String {
    if let Some(spec) = log_filter {
        return spec.to_string();
    }
    if trace {
        return level_spec_for("trace");
    }
    if debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = log_level {
        return level_spec_for(lvl);
    }
    match rust_log {
        Some(spec) if !spec.trim().is_empty() => spec.to_string(),
        _ => level_spec_for("info"),
    }
}

/// Parse a directive into a filter. Malformed parts are ignored by `EnvFilter`.
pub fn env_filter_from_spec(spec: &str) -> EnvFilter {
    EnvFilter::new(spec)
}
