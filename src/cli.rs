// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `spawnpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "spawnpipe",
    version,
    about = "Run chains of commands piped into each other, as configured in a TOML file.",
    long_about = None
)]
pub struct CliArgs {
    /// Targets to run, in the given order.
    ///
    /// If omitted, every target in the config file runs (sorted by name).
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SPAWNPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the pipelines, but don't spawn anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Feed this process's stdin into the first command of the first target.
    #[arg(long)]
    pub stdin: bool,
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
