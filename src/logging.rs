// src/logging.rs

//! Logging setup for `spawnpipe` using `tracing` + `tracing-subscriber`.
//!
//! The filter is picked in this order:
//! 1. `--log-level` CLI flag: one level for everything
//! 2. `SPAWNPIPE_LOG`: a full `EnvFilter` directive, e.g.
//!    `spawnpipe::exec=debug,warn`
//! 3. `warn`
//!
//! An unparsable `SPAWNPIPE_LOG` falls back to the default instead of
//! aborting the run. Logs go to STDERR, next to the children's diagnostics;
//! stdout carries only pipeline output.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable holding the filter directive.
pub const LOG_ENV_VAR: &str = "SPAWNPIPE_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_directive = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env_directive.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    Ok(())
}

/// Build the filter from the CLI flag and the raw `SPAWNPIPE_LOG` value.
pub fn build_filter(cli_level: Option<LogLevel>, env_directive: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.directive());
    }

    env_directive
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| match EnvFilter::try_new(d) {
            Ok(filter) => Some(filter),
            Err(e) => {
                eprintln!("spawnpipe: ignoring invalid {LOG_ENV_VAR}={d:?}: {e}");
                None
            }
        })
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
