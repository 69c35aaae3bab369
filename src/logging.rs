//! Logging setup for the binary: `tracing` events formatted to stderr.
//!
//! Stdout carries the quiz itself, so diagnostics never go there.
//! `RUST_LOG` overrides the level picked from `-v` / `-q`.

use std::io;

use tracing::Level;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    pub with_target: bool,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            with_target: false,
            with_ansi: false,
        }
    }
}

impl LogConfig {
    /// - `-q`: errors only
    /// - default: warnings
    /// - `-v`: info, `-vv`: debug, `-vvv`: trace
    #[must_use]
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let level = if quiet {
            Level::ERROR
        } else {
            match verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            }
        };
        Self {
            level,
            with_target: verbose >= 2,
            ..Self::default()
        }
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(config: &LogConfig) -> Result<(), TryInitError> {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target)
        .without_time();

    tracing_subscriber::registry()
        .with(build_env_filter(config.level))
        .with(layer)
        .try_init()
}

fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,cantoquiz={level}")))
}
