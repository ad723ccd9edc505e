// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::config::validate::CommandShapeError;

#[derive(Error, Debug)]
pub enum SpawnPipeError {
    /// The command list failed the shape check; nothing was spawned.
    #[error("Invalid command list: {0}")]
    InvalidCommands(#[from] CommandShapeError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SpawnPipeError>;
