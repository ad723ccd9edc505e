// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile, Target};
use crate::errors::SpawnPipeError;
use crate::exec::Pipeline;

pub use crate::exec::spawn_and_pipe;

/// High-level entry point used by `main.rs`.
///
/// Loads the config file, picks the requested targets and runs their
/// pipelines one after another. Returns the exit code for the process: `0`
/// if every target's last command exited with `0`, otherwise the code of the
/// first target that did not.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {:?}", config_path))?;

    let targets = select_targets(&cfg, &args.targets)?;

    if args.dry_run {
        print_dry_run(&targets);
        return Ok(0);
    }

    if args.stdin && targets.len() > 1 {
        warn!("--stdin only feeds the first target; later targets read from a null device");
    }

    let mut feed_stdin = args.stdin;
    for target in targets {
        info!(target = %target.name, "running target");

        let mut pipeline = Pipeline::new(target.commands.clone()).options(target.options.clone());
        if std::mem::take(&mut feed_stdin) {
            pipeline = pipeline.input(tokio::io::stdin());
        }

        let code = pipeline.spawn()?.wait().await;
        if code != 0 {
            warn!(target = %target.name, exit_code = code, "target failed");
            return Ok(code);
        }
        debug!(target = %target.name, "target succeeded");
    }

    Ok(0)
}

/// Resolve target names to targets, keeping the requested order. An empty
/// request selects every target.
pub fn select_targets<'a>(
    cfg: &'a ConfigFile,
    names: &[String],
) -> std::result::Result<Vec<&'a Target>, SpawnPipeError> {
    if names.is_empty() {
        return Ok(cfg.target.values().collect());
    }

    names
        .iter()
        .map(|name| {
            cfg.target.get(name).ok_or_else(|| {
                SpawnPipeError::ConfigError(format!(
                    "unknown target '{}' (available: {})",
                    name,
                    cfg.target_names().collect::<Vec<_>>().join(", ")
                ))
            })
        })
        .collect()
}

/// Simple dry-run output: targets, their pipelines and options.
fn print_dry_run(targets: &[&Target]) {
    println!("spawnpipe dry-run");
    println!();
    println!("targets ({}):", targets.len());
    for target in targets {
        println!("  - {}", target.name);
        println!("      pipeline: {}", target.commands);
        println!("      cwd: {}", target.options.working_dir.display());
        println!("      env vars: {}", target.options.env.len());
    }

    debug!("dry-run complete (no execution)");
}
