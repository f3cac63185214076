// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `scopebuild`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scopebuild",
    version,
    about = "Cache-aware build orchestration over filtered workspace scopes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// A missing file is fine when it is the default path; builtin stages
    /// then run with their default commands.
    #[arg(long, value_name = "PATH", default_value = "Scopebuild.toml")]
    pub config: PathBuf,

    /// Workspace root. Defaults to the directory holding the config file.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Artifact store directory, overriding `[config].store`.
    #[arg(long, value_name = "DIR")]
    pub store: Option<String>,

    /// Maximum number of concurrently running stages.
    #[arg(
        long,
        short = 'j',
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub jobs: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCOPEBUILD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Ignore cached artifact sets. Results are still published.
    #[arg(long)]
    pub force: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run tasks and everything they depend on.
    ///
    /// Tasks: deps, build, test, lint (or clippy), doc, a declared binary
    /// name, or all.
    Run {
        #[arg(required = true, value_name = "TASK")]
        tasks: Vec<String>,
    },
    /// Print stages, upstreams, scopes and commands without running anything.
    Plan,
    /// Print the files a stage would read and their snapshot digest.
    Scope {
        #[arg(value_name = "STAGE")]
        stage: String,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
