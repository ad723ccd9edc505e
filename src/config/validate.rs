// src/config/validate.rs

//! Shape checks for command lists and build-config files.
//!
//! [`validate_commands`] is the single gate in front of the executor: it runs
//! before any process exists and never has side effects.

use std::collections::BTreeMap;

use thiserror::Error;
use toml::Value;

use crate::config::model::{CommandList, CommandSpec, ConfigFile, RawConfigFile, Target};
use crate::config::options::{merge_options, resolve_options};
use crate::errors::{Result, SpawnPipeError};

/// Why a proposed command list was rejected. Rules are checked in order and
/// the first failure wins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandShapeError {
    #[error("commands must be an array, got {found}")]
    NotASequence { found: &'static str },

    #[error("commands array must not be empty")]
    EmptySequence,

    #[error("command #{index} must be a table, got {found}")]
    ElementNotARecord { index: usize, found: &'static str },

    #[error("command #{index} must contain a `cmd` key")]
    MissingExecutable { index: usize },

    #[error("command #{index} has an invalid `cmd`: expected a non-empty string")]
    InvalidExecutable { index: usize },

    #[error("command #{index} has invalid `args`: expected an array, got {found}")]
    InvalidArguments { index: usize, found: &'static str },

    #[error("command #{index} has an invalid argument at position {position}: expected a string, got {found}")]
    InvalidArgument {
        index: usize,
        position: usize,
        found: &'static str,
    },
}

/// Check `commands` against the command-list shape contract.
pub fn validate_commands(commands: &Value) -> std::result::Result<(), CommandShapeError> {
    let items = commands.as_array().ok_or(CommandShapeError::NotASequence {
        found: commands.type_str(),
    })?;

    if items.is_empty() {
        return Err(CommandShapeError::EmptySequence);
    }

    for (index, item) in items.iter().enumerate() {
        let table = item.as_table().ok_or(CommandShapeError::ElementNotARecord {
            index,
            found: item.type_str(),
        })?;

        match table.get("cmd") {
            None => return Err(CommandShapeError::MissingExecutable { index }),
            Some(Value::String(s)) if !s.is_empty() => {}
            Some(_) => return Err(CommandShapeError::InvalidExecutable { index }),
        }

        if let Some(args) = table.get("args") {
            let args = args.as_array().ok_or(CommandShapeError::InvalidArguments {
                index,
                found: args.type_str(),
            })?;

            for (position, arg) in args.iter().enumerate() {
                if !arg.is_str() {
                    return Err(CommandShapeError::InvalidArgument {
                        index,
                        position,
                        found: arg.type_str(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Description-or-nothing form of [`validate_commands`]: `Some(reason)` on
/// failure, `None` when the list is well formed.
pub fn validation_failure(commands: &Value) -> Option<String> {
    validate_commands(commands).err().map(|e| e.to_string())
}

impl TryFrom<&Value> for CommandList {
    type Error = CommandShapeError;

    fn try_from(value: &Value) -> std::result::Result<Self, Self::Error> {
        validate_commands(value)?;

        // Shape is guaranteed from here on; missing pieces mean "empty".
        let commands = value
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_table)
            .map(|table| {
                let executable = table
                    .get("cmd")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let arguments = table
                    .get("args")
                    .and_then(Value::as_array)
                    .map(|args| {
                        args.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                CommandSpec {
                    executable,
                    arguments,
                }
            })
            .collect();

        Ok(CommandList::new_unchecked(commands))
    }
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SpawnPipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_targets(&raw)?;

        let mut targets = BTreeMap::new();
        for (name, target) in raw.target.iter() {
            let commands = match target.commands.as_ref() {
                Some(commands @ Value::Array(_)) => commands,
                _ => {
                    return Err(SpawnPipeError::ConfigError(format!(
                        "target '{}': missing or invalid list of commands",
                        name
                    )));
                }
            };

            let commands = CommandList::try_from(commands).map_err(|e| {
                SpawnPipeError::ConfigError(format!("target '{}': {}", name, e))
            })?;

            let merged = merge_options(raw.options.as_ref(), target.options.as_ref());
            let options = resolve_options(merged.as_ref());

            targets.insert(
                name.clone(),
                Target {
                    name: name.clone(),
                    commands,
                    options,
                },
            );
        }

        Ok(ConfigFile::new_unchecked(targets))
    }
}

fn ensure_has_targets(cfg: &RawConfigFile) -> Result<()> {
    if cfg.target.is_empty() {
        return Err(SpawnPipeError::ConfigError(
            "config must contain at least one [target.<name>] section".to_string(),
        ));
    }
    Ok(())
}
