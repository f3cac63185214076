// src/logging.rs

//! Logging for `scopebuild`, built on `tracing` + `tracing-subscriber`.
//!
//! The filter is chosen as follows:
//! 1. `--log-level` sets one global level.
//! 2. Otherwise `SCOPEBUILD_LOG` is read. A bare level ("debug") sets the
//!    global level; anything else is taken as `EnvFilter` directives, e.g.
//!    `scopebuild::exec=debug,info`.
//! 3. Otherwise `info`.
//!
//! Output goes to stderr. Stdout is reserved for the run report, the plan
//! and scope listings.

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "SCOPEBUILD_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV).ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("initialising logging: {e}"))
}

/// The subscriber filter for a flag value and a `SCOPEBUILD_LOG` value.
pub fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> EnvFilter {
    let env_value = env_value.map(str::trim).filter(|v| !v.is_empty());
    match (cli_level, env_value) {
        (None, Some(directives)) if parse_level_str(directives).is_none() => {
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .parse_lossy(directives)
        }
        _ => EnvFilter::default()
            .add_directive(LevelFilter::from_level(resolve_level(cli_level, env_value)).into()),
    }
}

/// The single global level implied by the flag and environment.
///
/// Directive strings and unknown words resolve to `INFO`.
pub fn resolve_level(cli_level: Option<LogLevel>, env_value: Option<&str>) -> tracing::Level {
    match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => env_value
            .and_then(parse_level_str)
            .unwrap_or(tracing::Level::INFO),
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
