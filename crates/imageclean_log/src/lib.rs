//! `imageclean_log` v1:
//! Process-wide `tracing` subscriber setup for the image-clean tools.
//!
//! Diagnostics go to stderr. `RUST_LOG`, when set, overrides the level chosen
//! from the command-line verbosity.

use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, ParseError};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

/// Environment variable that overrides the computed filter.
pub const C_ENV_LOG_FILTER: &str = "RUST_LOG";

/// Errors raised while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LogInitError {
    /// `RUST_LOG` holds a directive the filter cannot parse.
    #[error("Invalid log filter in {C_ENV_LOG_FILTER}: {0}")]
    InvalidFilter(#[from] ParseError),
    /// A global subscriber is already installed.
    #[error("Failed to install log subscriber")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Map `-v` count and `-q` onto a max level.
///
/// `-q` wins over any `-v`. Default is `INFO`; one `-v` gives `DEBUG`, two or
/// more give `TRACE`.
pub fn level_from_verbosity(n_verbosity: u8, if_quiet: bool) -> Level {
    if if_quiet {
        return Level::ERROR;
    }
    match n_verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global stderr subscriber.
pub fn init_logging(n_verbosity: u8, if_quiet: bool) -> Result<(), LogInitError> {
    let filter = build_filter(
        std::env::var(C_ENV_LOG_FILTER).ok().as_deref(),
        level_from_verbosity(n_verbosity, if_quiet),
    )?;

    let layer_stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer_stderr)
        .try_init()?;
    Ok(())
}

fn build_filter(directives_env: Option<&str>, level: Level) -> Result<EnvFilter, ParseError> {
    match directives_env {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => Ok(EnvFilter::new(level.as_str().to_ascii_lowercase())),
    }
}
